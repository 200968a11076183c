//! Fully parsed drawing orders, as handed over by the protocol layer.
//!
//! Colours are in the session's source depth and are converted by the
//! executor. Raster codes are full 24-bit ternary codes or 1..=16
//! binary codes; see [`crate::rop`].

use serde::{Deserialize, Serialize};

use crate::error::GdiError;
use crate::surface::{PixelView, Surface};
use crate::types::{Point, Rect};

/// Destination-only blit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstBltOrder {
    pub rect: Rect,
    pub rop: u32,
}

/// Brush attached to a pattern blit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Brush {
    /// Wire style, see [`crate::brush::BrushStyle`].
    pub style: u8,
    /// Bits per pixel of `data`. 1 means a monochrome stipple.
    pub bpp: u8,
    /// Tiling origin.
    pub origin: Point,
    /// 8×8 pattern, packed row-major.
    pub data: Vec<u8>,
}

/// Pattern blit: fill with a solid colour or a tiled brush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatBltOrder {
    pub rect: Rect,
    pub rop: u32,
    pub fore_color: u32,
    pub back_color: u32,
    pub brush: Brush,
}

/// Screen-to-screen copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrBltOrder {
    pub rect: Rect,
    pub rop: u32,
    /// Top-left of the source rectangle.
    pub src: Point,
}

/// Solid copy-fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueRectOrder {
    pub rect: Rect,
    pub color: u32,
}

/// Several solid fills sharing one colour.
///
/// `rectangles[1..=num_rectangles]` are drawn; element 0 is reserved
/// and never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiOpaqueRectOrder {
    pub color: u32,
    pub num_rectangles: u32,
    pub rectangles: Vec<Rect>,
}

/// A single pen stroke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineToOrder {
    pub start: Point,
    pub end: Point,
    pub rop2: u32,
    pub pen_color: u32,
}

/// Connected strokes. Each delta is relative to the previous point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolylineOrder {
    pub start: Point,
    pub rop2: u32,
    pub pen_color: u32,
    pub deltas: Vec<Point>,
}

impl PolylineOrder {
    /// Absolute vertices, starting point included. Accumulation
    /// saturates at the `i32` range.
    pub fn points(&self) -> Vec<Point> {
        let mut current = self.start;
        let mut out = Vec::with_capacity(self.deltas.len() + 1);
        out.push(current);
        for d in &self.deltas {
            current = Point::new(current.x.saturating_add(d.x), current.y.saturating_add(d.y));
            out.push(current);
        }
        out
    }
}

/// Identifies a bitmap in the caller's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitmapKey {
    pub cache_id: u16,
    pub cache_index: u16,
}

/// Memory-to-screen copy from a cached bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemBltOrder {
    pub bitmap: BitmapKey,
    pub rect: Rect,
    pub rop: u32,
    /// Top-left inside the bitmap.
    pub src: Point,
}

/// A decoded bitmap owned by the caller. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBitmap {
    surface: Surface,
}

impl CachedBitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, GdiError> {
        Ok(Self {
            surface: Surface::from_pixels(width, height, pixels)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn view(&self) -> PixelView<'_> {
        self.surface.view()
    }
}

/// One bulk surface update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceBitsCommand {
    /// Wire codec id, see [`crate::codec::CodecId`].
    pub codec_id: u8,
    /// `width`/`height` give the decoded image size.
    pub dest: Rect,
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyline_deltas_are_cumulative() {
        let order = PolylineOrder {
            start: Point::new(1, 1),
            rop2: 13,
            pen_color: 0,
            deltas: vec![Point::new(10, 0), Point::new(0, 10), Point::new(-5, -5)],
        };
        assert_eq!(
            order.points(),
            vec![
                Point::new(1, 1),
                Point::new(11, 1),
                Point::new(11, 11),
                Point::new(6, 6),
            ]
        );
    }

    #[test]
    fn cached_bitmap_checks_size() {
        assert!(CachedBitmap::new(2, 2, vec![0; 3]).is_err());
        let bmp = CachedBitmap::new(2, 1, vec![4, 5]).unwrap();
        assert_eq!(bmp.view().get(1, 0), Some(5));
    }
}
