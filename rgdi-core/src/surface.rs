//! Pixel surfaces and the primitives every order is built from.
//!
//! A [`Surface`] is an owned `0x00RRGGBB` pixel buffer. Drawing goes
//! through an explicit [`DrawStyle`] (compositing function, fill pixel,
//! clip region) passed with every call; surfaces carry no drawing state
//! of their own.
//!
//! [`SurfaceSet`] holds the primary (canonical desktop), window-visible,
//! and per-window scratch surfaces. Surfaces are created and resized by
//! session management; the engine only draws into them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::PIXEL_MASK;
use crate::error::GdiError;
use crate::rop::RasterOp;
use crate::types::{Point, Rect};

// ── DrawStyle ────────────────────────────────────────────────────

/// Everything a primitive needs to know about *how* to draw.
#[derive(Debug, Clone, Copy)]
pub struct DrawStyle<'a> {
    /// Compositing function.
    pub op: RasterOp,
    /// Source pixel for solid fills and lines.
    pub fill: u32,
    /// Optional clip region. Pixels outside every rectangle are left
    /// untouched. Rectangles may overlap.
    pub clip: Option<&'a [Rect]>,
}

impl<'a> DrawStyle<'a> {
    /// Plain copy, no fill, no clip.
    pub const COPY: DrawStyle<'static> = DrawStyle {
        op: RasterOp::Copy,
        fill: 0,
        clip: None,
    };

    pub const fn new(op: RasterOp, fill: u32) -> Self {
        Self {
            op,
            fill,
            clip: None,
        }
    }

    pub fn clipped(self, clip: Option<&'a [Rect]>) -> Self {
        Self { clip, ..self }
    }

    fn admits(&self, x: i32, y: i32) -> bool {
        match self.clip {
            None => true,
            Some(rects) => rects.iter().any(|r| r.contains(x, y)),
        }
    }
}

// ── PixelView ────────────────────────────────────────────────────

/// A borrowed, read-only block of local pixels.
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    width: u32,
    height: u32,
    /// Row pitch in **pixels**.
    stride: usize,
    pixels: &'a [u32],
}

impl<'a> PixelView<'a> {
    /// Wrap `pixels` as `height` rows of `stride` pixels.
    pub fn new(width: u32, height: u32, stride: usize, pixels: &'a [u32]) -> Result<Self, GdiError> {
        let needed = if height == 0 {
            0
        } else {
            stride * (height as usize - 1) + width as usize
        };
        if stride < width as usize || pixels.len() < needed {
            return Err(GdiError::malformed(format!(
                "pixel view {width}x{height} (stride {stride}) needs {needed} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at `(x, y)`, or `None` outside the view.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.stride + x as usize])
    }
}

/// Scanline order of a packed 32 bpp payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    TopDown,
    /// First row in the buffer is the bottom row of the image.
    BottomUp,
}

// ── Surface ──────────────────────────────────────────────────────

/// An owned pixel buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Surface {
    /// A black surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap existing pixels (row-major, tightly packed).
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, GdiError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(GdiError::malformed(format!(
                "surface {width}x{height} needs {expected} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.view().get(x, y)
    }

    pub fn view(&self) -> PixelView<'_> {
        PixelView {
            width: self.width,
            height: self.height,
            stride: self.width as usize,
            pixels: &self.pixels,
        }
    }

    /// Digest of the pixel contents, for comparing replays.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.height.to_le_bytes());
        for px in &self.pixels {
            hasher.update(&px.to_le_bytes());
        }
        hasher.finalize()
    }

    /// Resize, discarding contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Surface::new(width, height);
    }

    // ── Primitives ───────────────────────────────────────────────

    /// Composite `style.fill` over `rect`.
    pub fn fill_rect(&mut self, rect: Rect, style: &DrawStyle<'_>) {
        let (op, fill) = (style.op, style.fill);
        self.for_each_span(rect, style.clip, |row, _y, x0, x1| {
            for px in &mut row[x0..x1] {
                *px = op.apply(fill, *px);
            }
        });
    }

    /// Composite a per-pixel source over `rect`. `source` receives
    /// absolute surface coordinates.
    pub fn fill_with(&mut self, rect: Rect, style: &DrawStyle<'_>, source: impl Fn(i32, i32) -> u32) {
        let op = style.op;
        self.for_each_span(rect, style.clip, |row, y, x0, x1| {
            for (x, px) in (x0..x1).zip(&mut row[x0..x1]) {
                *px = op.apply(source(x as i32, y), *px);
            }
        });
    }

    /// Copy from `src` starting at `src_pt` into `dst`. Source pixels
    /// outside `src` leave the destination untouched.
    pub fn blit(&mut self, src: PixelView<'_>, src_pt: Point, dst: Rect, style: &DrawStyle<'_>) {
        let op = style.op;
        let (dx, dy) = (src_pt.x - dst.x, src_pt.y - dst.y);
        self.for_each_span(dst, style.clip, |row, y, x0, x1| {
            for (x, px) in (x0..x1).zip(&mut row[x0..x1]) {
                if let Some(s) = src.get(x as i32 + dx, y + dy) {
                    *px = op.apply(s, *px);
                }
            }
        });
    }

    /// Copy within this surface. Overlapping areas behave as if the
    /// source had been read in full before writing.
    pub fn copy_area(&mut self, src_pt: Point, dst: Rect, style: &DrawStyle<'_>) {
        let wanted = Rect::new(src_pt.x, src_pt.y, dst.width, dst.height);
        let Some(area) = wanted.intersect(&self.bounds()) else {
            return;
        };
        let snapshot = self.extract(area);
        let origin = Point::new(src_pt.x - area.x, src_pt.y - area.y);
        self.blit(snapshot.view(), origin, dst, style);
    }

    /// Write a packed little-endian 32 bpp (B, G, R, X) image into `dst`.
    ///
    /// `data` must hold `dst.height` rows of `stride` bytes.
    pub fn put_bgrx(
        &mut self,
        dst: Rect,
        data: &[u8],
        stride: usize,
        order: RowOrder,
        style: &DrawStyle<'_>,
    ) -> Result<(), GdiError> {
        let row_bytes = dst.width as usize * 4;
        let needed = if dst.height == 0 {
            0
        } else {
            stride * (dst.height as usize - 1) + row_bytes
        };
        if stride < row_bytes || data.len() < needed {
            return Err(GdiError::malformed(format!(
                "image {}x{} needs {needed} bytes, got {}",
                dst.width,
                dst.height,
                data.len()
            )));
        }

        let op = style.op;
        let last_row = dst.height as i32 - 1;
        self.for_each_span(dst, style.clip, |row, y, x0, x1| {
            let sy = (match order {
                RowOrder::TopDown => y - dst.y,
                RowOrder::BottomUp => last_row - (y - dst.y),
            }) as usize;
            for (x, px) in (x0..x1).zip(&mut row[x0..x1]) {
                let off = sy * stride + (x as i32 - dst.x) as usize * 4;
                let s = u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]);
                *px = op.apply(s & PIXEL_MASK, *px);
            }
        });
        Ok(())
    }

    /// Draw a one-pixel line from `from` to `to` inclusive. With
    /// `skip_first` the starting pixel is left alone, so connected
    /// segments touch each joint once.
    ///
    /// Pixels match an integer Bresenham walk. Step `j` along the major
    /// axis is computed directly, so only the steps that land on the
    /// surface are visited.
    pub fn draw_line(&mut self, from: Point, to: Point, style: &DrawStyle<'_>, skip_first: bool) {
        let (x0, y0) = (i64::from(from.x), i64::from(from.y));
        let (x1, y1) = (i64::from(to.x), i64::from(to.y));
        let (dx, dy) = ((x1 - x0).abs(), (y1 - y0).abs());
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };

        let x_major = dx >= dy;
        let (major, minor) = if x_major { (dx, dy) } else { (dy, dx) };
        let (origin, step, extent) = if x_major {
            (x0, sx, i64::from(self.width))
        } else {
            (y0, sy, i64::from(self.height))
        };

        // Steps whose major coordinate falls inside the surface.
        let (lo, hi) = if step > 0 {
            (-origin, extent - 1 - origin)
        } else {
            (origin - (extent - 1), origin)
        };
        let first = lo.max(i64::from(skip_first));
        let last = hi.min(major);

        for j in first..=last {
            let along = if major == 0 {
                0
            } else {
                let (minor, j, major) = (i128::from(minor), i128::from(j), i128::from(major));
                ((2 * minor * j + major) / (2 * major)) as i64
            };
            let (x, y) = if x_major {
                (x0 + sx * j, y0 + sy * along)
            } else {
                (x0 + sx * along, y0 + sy * j)
            };
            if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
                self.plot(x, y, style);
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────

    fn plot(&mut self, x: i32, y: i32, style: &DrawStyle<'_>) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        if !style.admits(x, y) {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = style.op.apply(style.fill, self.pixels[idx]);
    }

    fn extract(&self, area: Rect) -> Surface {
        let mut out = Surface::new(area.width, area.height);
        let w = area.width as usize;
        for row in 0..area.height as usize {
            let src = (area.y as usize + row) * self.width as usize + area.x as usize;
            out.pixels[row * w..(row + 1) * w].copy_from_slice(&self.pixels[src..src + w]);
        }
        out
    }

    /// Visit every visible horizontal span of `rect`: the callback gets
    /// the full row slice, the row's y, and the `[x0, x1)` columns.
    fn for_each_span(
        &mut self,
        rect: Rect,
        clip: Option<&[Rect]>,
        mut f: impl FnMut(&mut [u32], i32, usize, usize),
    ) {
        let Some(area) = rect.intersect(&self.bounds()) else {
            return;
        };
        let width = self.width as usize;
        let mut spans: Vec<(i32, i32)> = Vec::new();

        for y in area.y..area.bottom() {
            let row = &mut self.pixels[y as usize * width..(y as usize + 1) * width];
            let Some(clip) = clip else {
                f(row, y, area.x as usize, area.right() as usize);
                continue;
            };

            spans.clear();
            spans.extend(
                clip.iter()
                    .filter(|c| y >= c.y && y < c.bottom())
                    .map(|c| (c.x.max(area.x), c.right().min(area.right())))
                    .filter(|(a, b)| a < b),
            );
            spans.sort_unstable();

            // Merge overlaps so no pixel is composited twice.
            let mut current: Option<(i32, i32)> = None;
            for &(a, b) in &spans {
                match current {
                    Some((ca, cb)) if a <= cb => current = Some((ca, cb.max(b))),
                    Some((ca, cb)) => {
                        f(row, y, ca as usize, cb as usize);
                        current = Some((a, b));
                    }
                    None => current = Some((a, b)),
                }
            }
            if let Some((a, b)) = current {
                f(row, y, a as usize, b as usize);
            }
        }
    }
}

// ── SurfaceSet ───────────────────────────────────────────────────

/// Which surface an operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceId {
    /// Canonical off-screen desktop state.
    #[default]
    Primary,
    /// What the user sees.
    Window,
    /// A per-window surface used in remote-app mode.
    Scratch(u32),
}

/// The surfaces owned by one session.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSet {
    primary: Surface,
    window: Surface,
    scratch: HashMap<u32, Surface>,
}

impl SurfaceSet {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            primary: Surface::new(width, height),
            window: Surface::new(width, height),
            scratch: HashMap::new(),
        }
    }

    pub fn primary(&self) -> &Surface {
        &self.primary
    }

    pub fn window(&self) -> &Surface {
        &self.window
    }

    pub fn scratch(&self, id: u32) -> Option<&Surface> {
        self.scratch.get(&id)
    }

    /// Add or replace a per-window surface.
    pub fn insert_scratch(&mut self, id: u32, surface: Surface) -> Option<Surface> {
        self.scratch.insert(id, surface)
    }

    pub fn remove_scratch(&mut self, id: u32) -> Option<Surface> {
        self.scratch.remove(&id)
    }

    /// Resize primary and window, discarding contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.primary.resize(width, height);
        self.window.resize(width, height);
    }

    pub fn get(&self, id: SurfaceId) -> Result<&Surface, GdiError> {
        match id {
            SurfaceId::Primary => Ok(&self.primary),
            SurfaceId::Window => Ok(&self.window),
            SurfaceId::Scratch(n) => self.scratch.get(&n).ok_or(GdiError::UnknownSurface(id)),
        }
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Result<&mut Surface, GdiError> {
        match id {
            SurfaceId::Primary => Ok(&mut self.primary),
            SurfaceId::Window => Ok(&mut self.window),
            SurfaceId::Scratch(n) => self
                .scratch
                .get_mut(&n)
                .ok_or(GdiError::UnknownSurface(id)),
        }
    }

    /// Copy a rectangle between (or within) surfaces.
    pub fn copy(
        &mut self,
        src: SurfaceId,
        dst: SurfaceId,
        src_pt: Point,
        dst_rect: Rect,
        style: &DrawStyle<'_>,
    ) -> Result<(), GdiError> {
        if src == dst {
            self.get_mut(dst)?.copy_area(src_pt, dst_rect, style);
            return Ok(());
        }
        self.get(src)?;
        let mut target = std::mem::take(self.get_mut(dst)?);
        if let Ok(source) = self.get(src) {
            target.blit(source.view(), src_pt, dst_rect, style);
        }
        *self.get_mut(dst)? = target;
        Ok(())
    }

    /// Replicate a composited region of primary onto the window surface.
    pub fn mirror_primary(&mut self, rect: Rect, clip: Option<&[Rect]>) {
        let style = DrawStyle::COPY.clipped(clip);
        self.window
            .blit(self.primary.view(), rect.origin(), rect, &style);
    }
}

// ── DirtySink ────────────────────────────────────────────────────

/// Receives rectangles that need repainting. The engine reports, the
/// presentation layer schedules.
pub trait DirtySink {
    fn mark_dirty(&mut self, rect: Rect);
}

impl DirtySink for Vec<Rect> {
    fn mark_dirty(&mut self, rect: Rect) {
        self.push(rect);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_clipped_to_surface() {
        let mut s = Surface::new(4, 4);
        s.fill_rect(Rect::new(-2, -2, 4, 4), &DrawStyle::new(RasterOp::Copy, 7));
        assert_eq!(s.pixel(0, 0), Some(7));
        assert_eq!(s.pixel(1, 1), Some(7));
        assert_eq!(s.pixel(2, 2), Some(0));
    }

    #[test]
    fn overlapping_clip_rects_apply_once() {
        let mut s = Surface::new(8, 1);
        let clip = [Rect::new(0, 0, 4, 1), Rect::new(2, 0, 4, 1)];
        let style = DrawStyle::new(RasterOp::Xor, 0xFF).clipped(Some(&clip));
        s.fill_rect(Rect::new(0, 0, 8, 1), &style);
        assert_eq!(&s.pixels()[..7], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0]);
    }

    #[test]
    fn copy_area_handles_overlap() {
        let pixels = (0..8).collect();
        let mut s = Surface::from_pixels(8, 1, pixels).unwrap();
        s.copy_area(Point::new(0, 0), Rect::new(2, 0, 6, 1), &DrawStyle::COPY);
        assert_eq!(s.pixels(), &[0, 1, 0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn bottom_up_rows_are_flipped() {
        let mut s = Surface::new(1, 2);
        let data = [1, 0, 0, 0, 2, 0, 0, 0];
        s.put_bgrx(Rect::new(0, 0, 1, 2), &data, 4, RowOrder::BottomUp, &DrawStyle::COPY)
            .unwrap();
        assert_eq!(s.pixels(), &[2, 1]);
    }

    #[test]
    fn short_image_is_rejected_untouched() {
        let mut s = Surface::new(2, 2);
        let err = s
            .put_bgrx(Rect::new(0, 0, 2, 2), &[0xFF; 12], 8, RowOrder::TopDown, &DrawStyle::COPY)
            .unwrap_err();
        assert!(matches!(err, GdiError::MalformedPayload(_)));
        assert!(s.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn line_joints_are_drawn_once() {
        let mut s = Surface::new(4, 1);
        let style = DrawStyle::new(RasterOp::Xor, 1);
        s.draw_line(Point::new(0, 0), Point::new(2, 0), &style, false);
        s.draw_line(Point::new(2, 0), Point::new(3, 0), &style, true);
        assert_eq!(s.pixels(), &[1, 1, 1, 1]);
    }

    #[test]
    fn copy_between_surfaces() {
        let mut set = SurfaceSet::new(4, 4);
        set.get_mut(SurfaceId::Primary)
            .unwrap()
            .fill_rect(Rect::new(0, 0, 2, 2), &DrawStyle::new(RasterOp::Copy, 9));
        set.copy(
            SurfaceId::Primary,
            SurfaceId::Window,
            Point::new(0, 0),
            Rect::new(2, 2, 2, 2),
            &DrawStyle::COPY,
        )
        .unwrap();
        assert_eq!(set.window().pixel(3, 3), Some(9));
        assert_eq!(set.window().pixel(0, 0), Some(0));
        assert!(matches!(
            set.copy(SurfaceId::Scratch(3), SurfaceId::Window, Point::default(), Rect::new(0, 0, 1, 1), &DrawStyle::COPY),
            Err(GdiError::UnknownSurface(SurfaceId::Scratch(3)))
        ));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Surface::new(2, 2);
        let mut b = Surface::new(2, 2);
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.fill_rect(Rect::new(0, 0, 1, 1), &DrawStyle::new(RasterOp::Set, 0));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
