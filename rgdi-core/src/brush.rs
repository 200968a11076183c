//! Transient pixel resources built from packed order data.
//!
//! Colour brushes, monochrome stipples, and glyph masks are built for a
//! single draw and dropped straight after it. Nothing here is cached.

use crate::color::ColorContext;
use crate::error::GdiError;
use crate::types::Point;

// ── BrushStyle ───────────────────────────────────────────────────

/// Brush styles the order executor can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushStyle {
    Solid,
    Pattern,
}

impl BrushStyle {
    pub const SOLID: u8 = 0x00;
    pub const NULL: u8 = 0x01;
    pub const HATCHED: u8 = 0x02;
    pub const PATTERN: u8 = 0x03;

    /// Map the wire style. Null and hatched brushes are not drawn here.
    pub fn from_wire(style: u8) -> Result<Self, GdiError> {
        match style {
            Self::SOLID => Ok(BrushStyle::Solid),
            Self::PATTERN => Ok(BrushStyle::Pattern),
            other => Err(GdiError::UnsupportedBrushStyle(other)),
        }
    }
}

// ── BitOrder ─────────────────────────────────────────────────────

/// Which bit of a byte holds the leftmost pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

impl BitOrder {
    /// Bit order of the local display for pattern brushes.
    pub const PLATFORM: BitOrder = if cfg!(target_endian = "little") {
        BitOrder::LsbFirst
    } else {
        BitOrder::MsbFirst
    };
}

// ── ColorBrush ───────────────────────────────────────────────────

/// A colour pixel block, typically the 8×8 tile of a pattern brush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorBrush {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl ColorBrush {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel seen at surface position `(x, y)` when the brush is tiled
    /// from `origin`.
    pub fn tiled(&self, x: i32, y: i32, origin: Point) -> u32 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let tx = (x - origin.x).rem_euclid(self.width as i32) as usize;
        let ty = (y - origin.y).rem_euclid(self.height as i32) as usize;
        self.pixels[ty * self.width as usize + tx]
    }
}

/// Build a colour brush, converting `pixels` from `bpp` to local pixels.
/// Without pixel data the brush is allocated black.
pub fn build_color_brush(
    width: u32,
    height: u32,
    bpp: u8,
    pixels: Option<&[u8]>,
    colors: &ColorContext,
) -> Result<ColorBrush, GdiError> {
    let pixels = match pixels {
        Some(data) => colors.convert_pixels(data, bpp, width, height)?,
        None => vec![0; width as usize * height as usize],
    };
    Ok(ColorBrush {
        width,
        height,
        pixels,
    })
}

// ── MonoBitmap ───────────────────────────────────────────────────

/// A one-bit-per-pixel mask with rows padded to whole bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoBitmap {
    width: u32,
    height: u32,
    stride: usize,
    bits: Vec<u8>,
    order: BitOrder,
}

impl MonoBitmap {
    fn new(width: u32, height: u32, bits: &[u8], order: BitOrder) -> Result<Self, GdiError> {
        let stride = (width as usize).div_ceil(8);
        let needed = stride * height as usize;
        if bits.len() < needed {
            return Err(GdiError::malformed(format!(
                "mono bitmap {width}x{height} needs {needed} bytes, got {}",
                bits.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            bits: bits[..needed].to_vec(),
            order,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bit_order(&self) -> BitOrder {
        self.order
    }

    /// Whether the pixel at `(x, y)` is set. Out of range reads as unset.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.bits[y as usize * self.stride + x as usize / 8];
        let bit = match self.order {
            BitOrder::MsbFirst => 7 - (x % 8),
            BitOrder::LsbFirst => x % 8,
        };
        byte & (1 << bit) != 0
    }

    /// [`is_set`](Self::is_set) for the mask tiled from `origin`.
    pub fn tiled(&self, x: i32, y: i32, origin: Point) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let tx = (x - origin.x).rem_euclid(self.width as i32) as u32;
        let ty = (y - origin.y).rem_euclid(self.height as i32) as u32;
        self.is_set(tx, ty)
    }
}

/// Build a stipple for a monochrome pattern brush, in platform bit order.
pub fn build_mono_brush(width: u32, height: u32, bits: &[u8]) -> Result<MonoBitmap, GdiError> {
    MonoBitmap::new(width, height, bits, BitOrder::PLATFORM)
}

/// Build a glyph mask. Glyphs are always most-significant-bit first,
/// whatever the platform default.
pub fn build_glyph(width: u32, height: u32, bits: &[u8]) -> Result<MonoBitmap, GdiError> {
    MonoBitmap::new(width, height, bits, BitOrder::MsbFirst)
}

// ── Tests ────────────────────────────────────────────────────────
