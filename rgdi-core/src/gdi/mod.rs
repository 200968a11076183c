//! The drawing engine: one [`Gdi`] per session.
//!
//! The protocol layer calls one handler per order or surface-update
//! command, strictly one at a time. Handlers never keep compositing
//! state between calls: each one resolves its [`DrawStyle`] and
//! [`CompositingPlan`] up front and drops both on return.
//!
//! Every handler returns `Result<(), GdiError>`. An error means the
//! order was abandoned; it has already been logged and the caller is
//! free to carry on with the next item.

mod orders;
mod surface_bits;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::{CodecSet, MotionSessions, ScratchBuffer, SlotCollisionPolicy};
use crate::color::{ColorContext, ColorDepth, PaletteEntry};
use crate::error::GdiError;
use crate::frame::{FrameMarker, FrameTracker};
use crate::plan::{CompositingPlan, Replication, SessionMode};
use crate::rop::{RasterOp, RopTranslator, UnsupportedRopPolicy};
use crate::surface::{DirtySink, SurfaceId, SurfaceSet};
use crate::types::{Bounds, Rect};

// ── GdiOptions ───────────────────────────────────────────────────

/// Engine settings fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdiOptions {
    /// Source colour depth of the session, in bits per pixel.
    pub color_depth: u8,
    /// Fallback for ternary codes with no local equivalent.
    pub unsupported_rop3: UnsupportedRopPolicy,
    /// Handling of motion session ids that share a slot.
    pub motion_collision: SlotCollisionPolicy,
}

impl Default for GdiOptions {
    fn default() -> Self {
        Self {
            color_depth: 32,
            unsupported_rop3: UnsupportedRopPolicy::default(),
            motion_collision: SlotCollisionPolicy::default(),
        }
    }
}

// ── Gdi ──────────────────────────────────────────────────────────

pub struct Gdi {
    surfaces: SurfaceSet,
    colors: ColorContext,
    mode: SessionMode,
    /// Order clip, exclusive edges. Surface updates ignore it.
    bounds: Option<Rect>,
    frames: FrameTracker,
    codecs: CodecSet,
    motion: MotionSessions,
    scratch: ScratchBuffer,
    rop_policy: UnsupportedRopPolicy,
}

impl Gdi {
    /// A session with a black `width`×`height` desktop and the default
    /// codec set.
    pub fn new(width: u32, height: u32, options: GdiOptions) -> Result<Self, GdiError> {
        let depth = ColorDepth::from_bpp(options.color_depth)?;
        Ok(Self {
            surfaces: SurfaceSet::new(width, height),
            colors: ColorContext::new(depth),
            mode: SessionMode::default(),
            bounds: None,
            frames: FrameTracker::new(),
            codecs: CodecSet::default(),
            motion: MotionSessions::new(options.motion_collision),
            scratch: ScratchBuffer::new(),
            rop_policy: options.unsupported_rop3,
        })
    }

    /// Replace the codec collaborators.
    pub fn with_codecs(mut self, codecs: CodecSet) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn surfaces(&self) -> &SurfaceSet {
        &self.surfaces
    }

    /// Session management creates, resizes, and removes surfaces here.
    pub fn surfaces_mut(&mut self) -> &mut SurfaceSet {
        &mut self.surfaces
    }

    pub fn colors(&self) -> &ColorContext {
        &self.colors
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SessionMode) {
        debug!(?mode, "session mode changed");
        self.mode = mode;
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn frames(&self) -> &FrameTracker {
        &self.frames
    }

    pub fn motion(&self) -> &MotionSessions {
        &self.motion
    }

    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    // ── Session state ────────────────────────────────────────────

    /// Restrict subsequent orders to `bounds`, or lift the restriction.
    pub fn set_bounds(&mut self, bounds: Option<Bounds>) {
        self.bounds = bounds.map(|b| b.to_rect());
    }

    /// Replace the palette used at 8 bpp.
    pub fn palette_update(&mut self, entries: Vec<PaletteEntry>) {
        debug!(count = entries.len(), "palette update");
        self.colors.set_palette(entries);
    }

    pub fn frame_marker(&mut self, marker: FrameMarker) {
        self.frames.record(marker);
    }

    // ── Helpers shared by handlers ───────────────────────────────

    /// Resolve a ternary code with a translator scoped to this order.
    fn ternary(&self, code: u32) -> RasterOp {
        let mut rop = RopTranslator::new(self.rop_policy);
        if let Err(e) = rop.set_ternary_op(code) {
            warn!(error = %e, fallback = ?rop.current(), "ternary raster operation");
        }
        rop.current()
    }

    /// Resolve a binary code. Out-of-range codes draw with
    /// [`RasterOp::Copy`].
    fn binary(&self, code: u32) -> RasterOp {
        let mut rop = RopTranslator::new(self.rop_policy);
        if let Err(e) = rop.set_binary_op(code) {
            warn!(error = %e, "binary raster operation");
        }
        rop.current()
    }

    /// Run `draw` against the plan's target, bring the window surface
    /// up to date, then report `area`.
    ///
    /// `draw` receives the surface set and the surface to write. For
    /// [`Replication::Repeat`] it is called a second time with
    /// [`SurfaceId::Window`].
    fn composite(
        &mut self,
        plan: &CompositingPlan,
        area: Rect,
        clip: Option<&[Rect]>,
        dirty: &mut dyn DirtySink,
        mut draw: impl FnMut(&mut SurfaceSet, SurfaceId) -> Result<(), GdiError>,
    ) -> Result<(), GdiError> {
        draw(&mut self.surfaces, plan.target)?;
        match plan.replicate {
            Replication::None => {}
            Replication::FromPrimary => self.surfaces.mirror_primary(area, clip),
            Replication::Repeat => draw(&mut self.surfaces, SurfaceId::Window)?,
        }
        if plan.invalidate {
            dirty.mark_dirty(area);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Gdi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gdi")
            .field("mode", &self.mode)
            .field("bounds", &self.bounds)
            .field("frame_id", &self.frames.current())
            .field("codecs", &self.codecs)
            .field("motion", &self.motion)
            .finish_non_exhaustive()
    }
}

/// Log an abandoned order and hand the result back.
fn logged(what: &'static str, result: Result<(), GdiError>) -> Result<(), GdiError> {
    if let Err(e) = &result {
        warn!(order = what, error = %e, "order abandoned");
    }
    result
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameAction;

    #[test]
    fn rejects_unknown_depth() {
        let options = GdiOptions {
            color_depth: 12,
            ..GdiOptions::default()
        };
        assert!(matches!(
            Gdi::new(4, 4, options),
            Err(GdiError::UnsupportedColorDepth(12))
        ));
    }

    #[test]
    fn bounds_are_converted_inclusive() {
        let mut gdi = Gdi::new(8, 8, GdiOptions::default()).unwrap();
        gdi.set_bounds(Some(Bounds::new(1, 1, 2, 3)));
        assert_eq!(gdi.bounds(), Some(Rect::new(1, 1, 2, 3)));
        gdi.set_bounds(None);
        assert_eq!(gdi.bounds(), None);
    }

    #[test]
    fn translators_are_per_order() {
        let gdi = Gdi::new(1, 1, GdiOptions::default()).unwrap();
        assert_eq!(gdi.ternary(0x0012_3456), RasterOp::Clear);
        assert_eq!(gdi.binary(0), RasterOp::Copy);
        assert_eq!(gdi.binary(7), RasterOp::Xor);
    }

    #[test]
    fn frame_markers_are_tracked() {
        let mut gdi = Gdi::new(1, 1, GdiOptions::default()).unwrap();
        gdi.frame_marker(FrameMarker { frame_id: 11, action: FrameAction::Begin });
        assert_eq!(gdi.frames().current(), 11);
    }
}
