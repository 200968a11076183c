//! Primary drawing orders.

use super::{Gdi, logged};
use crate::brush::{BrushStyle, ColorBrush, MonoBitmap, build_color_brush, build_mono_brush};
use crate::error::GdiError;
use crate::order::{
    CachedBitmap, DstBltOrder, LineToOrder, MemBltOrder, MultiOpaqueRectOrder, OpaqueRectOrder,
    PatBltOrder, PolylineOrder, ScrBltOrder,
};
use crate::plan::{CompositingPlan, Replication};
use crate::rop::RasterOp;
use crate::surface::{DirtySink, DrawStyle, Surface, SurfaceId};
use crate::types::{Point, Rect};

/// Edge length of a pattern brush.
const BRUSH_SIZE: u32 = 8;

/// Fill source for a pattern blit, built before anything is drawn.
enum PatternSource {
    Solid(u32),
    Tiled(ColorBrush, Point),
    Stipple {
        mask: MonoBitmap,
        origin: Point,
        fore: u32,
        back: u32,
    },
}

impl PatternSource {
    fn pixel(&self, x: i32, y: i32) -> u32 {
        match self {
            PatternSource::Solid(c) => *c,
            PatternSource::Tiled(brush, origin) => brush.tiled(x, y, *origin),
            PatternSource::Stipple {
                mask,
                origin,
                fore,
                back,
            } => {
                if mask.tiled(x, y, *origin) {
                    *fore
                } else {
                    *back
                }
            }
        }
    }
}

impl Gdi {
    /// Destination-only blit: the ternary op is applied against a zero
    /// source, which covers BLACKNESS, WHITENESS, and DSTINVERT.
    pub fn dst_blt(&mut self, order: &DstBltOrder, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let op = self.ternary(order.rop);
        let result = self.solid_fill(order.rect, op, 0, dirty);
        logged("dst-blt", result)
    }

    /// Pattern blit with a solid, colour, or monochrome brush.
    pub fn pat_blt(&mut self, order: &PatBltOrder, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let result = self.pat_blt_inner(order, dirty);
        logged("pat-blt", result)
    }

    fn pat_blt_inner(&mut self, order: &PatBltOrder, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let op = self.ternary(order.rop);
        let fore = self.colors.convert(order.fore_color);
        let back = self.colors.convert(order.back_color);
        let brush = &order.brush;

        let source = match BrushStyle::from_wire(brush.style)? {
            BrushStyle::Solid => PatternSource::Solid(fore),
            BrushStyle::Pattern if brush.bpp > 1 => PatternSource::Tiled(
                build_color_brush(
                    BRUSH_SIZE,
                    BRUSH_SIZE,
                    brush.bpp,
                    Some(&brush.data),
                    &self.colors,
                )?,
                brush.origin,
            ),
            BrushStyle::Pattern => PatternSource::Stipple {
                mask: build_mono_brush(BRUSH_SIZE, BRUSH_SIZE, &brush.data)?,
                origin: brush.origin,
                fore,
                back,
            },
        };

        let plan = CompositingPlan::for_fill(&self.mode);
        let bounds = self.bounds;
        let clip = bounds.as_ref().map(std::slice::from_ref);
        let style = DrawStyle::new(op, fore).clipped(clip);
        let rect = order.rect;
        self.composite(&plan, rect, clip, dirty, |surfaces, id| {
            surfaces
                .get_mut(id)?
                .fill_with(rect, &style, |x, y| source.pixel(x, y));
            Ok(())
        })
    }

    /// Screen-to-screen copy.
    pub fn scr_blt(&mut self, order: &ScrBltOrder, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let op = self.ternary(order.rop);
        let plan = CompositingPlan::for_screen_copy(&self.mode);
        let bounds = self.bounds;
        let clip = bounds.as_ref().map(std::slice::from_ref);
        let style = DrawStyle::new(op, 0).clipped(clip);
        let (src_pt, rect) = (order.src, order.rect);

        let result = self.composite(&plan, rect, clip, dirty, |surfaces, id| {
            // The repeated copy reads the window, not primary.
            let source = if id == plan.target {
                plan.source
            } else {
                SurfaceId::Window
            };
            surfaces.copy(source, id, src_pt, rect, &style)
        });
        logged("scr-blt", result)
    }

    /// Copy-fill with a single colour.
    pub fn opaque_rect(
        &mut self,
        order: &OpaqueRectOrder,
        dirty: &mut dyn DirtySink,
    ) -> Result<(), GdiError> {
        let color = self.colors.convert(order.color);
        let result = self.solid_fill(order.rect, RasterOp::Copy, color, dirty);
        logged("opaque-rect", result)
    }

    /// Copy-fill `rectangles[1..=num_rectangles]`. Element 0 is never
    /// drawn.
    pub fn multi_opaque_rect(
        &mut self,
        order: &MultiOpaqueRectOrder,
        dirty: &mut dyn DirtySink,
    ) -> Result<(), GdiError> {
        let n = order.num_rectangles as usize;
        if order.rectangles.len() < n + 1 {
            return logged(
                "multi-opaque-rect",
                Err(GdiError::malformed(format!(
                    "{n} rectangles declared, {} supplied (slot 0 reserved)",
                    order.rectangles.len()
                ))),
            );
        }
        let color = self.colors.convert(order.color);
        for &rect in &order.rectangles[1..=n] {
            let result = self.solid_fill(rect, RasterOp::Copy, color, dirty);
            logged("multi-opaque-rect", result)?;
        }
        Ok(())
    }

    /// Single pen stroke.
    pub fn line_to(&mut self, order: &LineToOrder, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let op = self.binary(order.rop2);
        let pen = self.colors.convert(order.pen_color);
        let result = self.stroke(&[order.start, order.end], op, pen, dirty);
        logged("line-to", result)
    }

    /// Connected strokes. Each segment is reported dirty on its own.
    pub fn polyline(&mut self, order: &PolylineOrder, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let op = self.binary(order.rop2);
        let pen = self.colors.convert(order.pen_color);
        let result = self.stroke(&order.points(), op, pen, dirty);
        logged("polyline", result)
    }

    /// Memory-to-screen copy from a caller-owned bitmap.
    pub fn mem_blt(
        &mut self,
        order: &MemBltOrder,
        bitmap: &CachedBitmap,
        dirty: &mut dyn DirtySink,
    ) -> Result<(), GdiError> {
        let op = self.ternary(order.rop);
        let plan = CompositingPlan::for_memory_copy(&self.mode);
        let bounds = self.bounds;
        let clip = bounds.as_ref().map(std::slice::from_ref);
        let style = DrawStyle::new(op, 0).clipped(clip);
        let (src_pt, rect) = (order.src, order.rect);

        let result = self.composite(&plan, rect, clip, dirty, |surfaces, id| {
            surfaces.get_mut(id)?.blit(bitmap.view(), src_pt, rect, &style);
            Ok(())
        });
        logged("mem-blt", result)
    }

    // ── Shared ───────────────────────────────────────────────────

    fn solid_fill(
        &mut self,
        rect: Rect,
        op: RasterOp,
        fill: u32,
        dirty: &mut dyn DirtySink,
    ) -> Result<(), GdiError> {
        let plan = CompositingPlan::for_fill(&self.mode);
        let bounds = self.bounds;
        let clip = bounds.as_ref().map(std::slice::from_ref);
        let style = DrawStyle::new(op, fill).clipped(clip);
        self.composite(&plan, rect, clip, dirty, |surfaces, id| {
            surfaces.get_mut(id)?.fill_rect(rect, &style);
            Ok(())
        })
    }

    /// Draw `points` as connected segments, each joint touched once,
    /// and report one bounding box per segment.
    fn stroke(
        &mut self,
        points: &[Point],
        op: RasterOp,
        pen: u32,
        dirty: &mut dyn DirtySink,
    ) -> Result<(), GdiError> {
        let plan = CompositingPlan::for_stroke(&self.mode);
        let bounds = self.bounds;
        let clip = bounds.as_ref().map(std::slice::from_ref);
        let style = DrawStyle::new(op, pen).clipped(clip);

        let draw = |surface: &mut Surface| {
            for (i, seg) in points.windows(2).enumerate() {
                surface.draw_line(seg[0], seg[1], &style, i > 0);
            }
        };
        draw(self.surfaces.get_mut(plan.target)?);
        if plan.replicate == Replication::Repeat {
            draw(self.surfaces.get_mut(SurfaceId::Window)?);
        }
        if plan.invalidate {
            for seg in points.windows(2) {
                dirty.mark_dirty(Rect::spanning(seg[0], seg[1]));
            }
        }
        Ok(())
    }
}
