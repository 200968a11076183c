//! Per-order destination selection.
//!
//! Session management supplies a [`SessionMode`]: remote-app on/off,
//! whether backing-store replication is suppressed, whether the window
//! is known to be unobscured, and which surface orders currently target.
//! Each handler turns that into a [`CompositingPlan`] once and then only
//! branches on the plan.

use serde::{Deserialize, Serialize};

use crate::surface::SurfaceId;

/// Externally supplied drawing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMode {
    /// Per-application windows replace the single desktop window.
    pub remote_app: bool,
    /// Draw straight into the visible surface; skip the primary copy.
    pub skip_backing_store: bool,
    /// The desktop window is known to be fully visible.
    pub unobscured: bool,
    /// Surface the protocol layer wants orders drawn into.
    pub target: SurfaceId,
}

impl SessionMode {
    fn targets_primary(&self) -> bool {
        self.target == SurfaceId::Primary
    }

    fn replicates(&self) -> bool {
        self.targets_primary() && !self.remote_app && !self.skip_backing_store
    }
}

/// How the window-visible surface is brought up to date after drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replication {
    /// Leave the window surface alone.
    None,
    /// Copy the composited rectangle from primary to window.
    FromPrimary,
    /// Repeat the same draw against the window surface. Copies read
    /// their source from the window when the source is the screen.
    Repeat,
}

/// The outcome of destination selection for one order or command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositingPlan {
    /// Surface copy orders read from. Equal to `target` for fills.
    pub source: SurfaceId,
    /// Surface that receives the pixels.
    pub target: SurfaceId,
    pub replicate: Replication,
    /// Report the affected rectangle to the presentation layer.
    pub invalidate: bool,
}

impl CompositingPlan {
    /// Fills: draw into the target, mirror primary to the window.
    /// With replication suppressed a primary target is drawn on the
    /// window directly.
    pub fn for_fill(mode: &SessionMode) -> Self {
        if mode.skip_backing_store {
            return Self::visible_only(mode, mode.target);
        }
        Self {
            source: mode.target,
            target: mode.target,
            replicate: if mode.replicates() {
                Replication::FromPrimary
            } else {
                Replication::None
            },
            invalidate: mode.targets_primary(),
        }
    }

    /// Lines: a dirty bounding box can be zero-sized, so the window
    /// copy is produced by drawing the stroke again.
    pub fn for_stroke(mode: &SessionMode) -> Self {
        if mode.skip_backing_store {
            return Self::visible_only(mode, mode.target);
        }
        Self {
            replicate: if mode.replicates() {
                Replication::Repeat
            } else {
                Replication::None
            },
            ..Self::for_fill(mode)
        }
    }

    /// Screen-to-screen copies.
    ///
    /// With replication suppressed the copy runs between the visible
    /// surfaces. Otherwise it reads primary, then either repeats the
    /// copy window-to-window (unobscured window) or re-derives the
    /// window from primary.
    pub fn for_screen_copy(mode: &SessionMode) -> Self {
        if mode.skip_backing_store {
            return Self::visible_only(mode, SurfaceId::Window);
        }
        let replicate = if mode.targets_primary() && !mode.remote_app {
            if mode.unobscured {
                Replication::Repeat
            } else {
                Replication::FromPrimary
            }
        } else {
            Replication::None
        };
        Self {
            source: SurfaceId::Primary,
            target: mode.target,
            replicate,
            invalidate: mode.targets_primary(),
        }
    }

    /// Memory-to-screen copies. `source` is meaningless here; the
    /// caller supplies the cached bitmap.
    pub fn for_memory_copy(mode: &SessionMode) -> Self {
        if mode.skip_backing_store {
            return Self::visible_only(mode, mode.target);
        }
        Self {
            source: mode.target,
            target: mode.target,
            replicate: if mode.targets_primary() && !mode.remote_app {
                Replication::Repeat
            } else {
                Replication::None
            },
            invalidate: mode.targets_primary(),
        }
    }

    /// Codecs that always composite into primary.
    pub fn for_primary_update(mode: &SessionMode) -> Self {
        Self {
            source: SurfaceId::Primary,
            target: SurfaceId::Primary,
            replicate: if mode.remote_app {
                Replication::None
            } else {
                Replication::FromPrimary
            },
            invalidate: true,
        }
    }

    /// Codecs that honour `skip_backing_store` by writing the window
    /// surface directly.
    pub fn for_direct_update(mode: &SessionMode) -> Self {
        if mode.skip_backing_store {
            return Self {
                source: SurfaceId::Window,
                target: SurfaceId::Window,
                replicate: Replication::None,
                invalidate: true,
            };
        }
        Self {
            replicate: if mode.remote_app {
                Replication::None
            } else {
                Replication::FromPrimary
            },
            ..Self::for_primary_update(mode)
        }
    }

    /// Visible-only copy: a primary target is redirected to the window.
    fn visible_only(mode: &SessionMode, source: SurfaceId) -> Self {
        let target = if mode.targets_primary() {
            SurfaceId::Window
        } else {
            mode.target
        };
        Self {
            source,
            target,
            replicate: Replication::None,
            invalidate: mode.targets_primary(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(remote_app: bool, skip: bool, unobscured: bool, target: SurfaceId) -> SessionMode {
        SessionMode {
            remote_app,
            skip_backing_store: skip,
            unobscured,
            target,
        }
    }

    #[test]
    fn fill_on_primary_replicates() {
        let plan = CompositingPlan::for_fill(&SessionMode::default());
        assert_eq!(plan.target, SurfaceId::Primary);
        assert_eq!(plan.replicate, Replication::FromPrimary);
        assert!(plan.invalidate);
    }

    #[test]
    fn fill_in_remote_app_only_invalidates() {
        let plan = CompositingPlan::for_fill(&mode(true, false, false, SurfaceId::Primary));
        assert_eq!(plan.replicate, Replication::None);
        assert!(plan.invalidate);

        let plan = CompositingPlan::for_fill(&mode(true, false, false, SurfaceId::Scratch(4)));
        assert_eq!(plan.target, SurfaceId::Scratch(4));
        assert!(!plan.invalidate);
    }

    #[test]
    fn fill_and_stroke_skip_backing_store_draw_on_window() {
        let skip = mode(false, true, false, SurfaceId::Primary);
        for plan in [CompositingPlan::for_fill(&skip), CompositingPlan::for_stroke(&skip)] {
            assert_eq!(plan.target, SurfaceId::Window);
            assert_eq!(plan.replicate, Replication::None);
            assert!(plan.invalidate);
        }

        let scratch = CompositingPlan::for_fill(&mode(true, true, false, SurfaceId::Scratch(2)));
        assert_eq!(scratch.target, SurfaceId::Scratch(2));
        assert!(!scratch.invalidate);
    }

    #[test]
    fn screen_copy_routes() {
        let skip = CompositingPlan::for_screen_copy(&mode(false, true, false, SurfaceId::Primary));
        assert_eq!((skip.source, skip.target), (SurfaceId::Window, SurfaceId::Window));
        assert!(skip.invalidate);

        let skip_scratch =
            CompositingPlan::for_screen_copy(&mode(false, true, false, SurfaceId::Scratch(1)));
        assert_eq!(skip_scratch.target, SurfaceId::Scratch(1));
        assert!(!skip_scratch.invalidate);

        let clear = CompositingPlan::for_screen_copy(&mode(false, false, true, SurfaceId::Primary));
        assert_eq!(clear.replicate, Replication::Repeat);

        let obscured = CompositingPlan::for_screen_copy(&SessionMode::default());
        assert_eq!(obscured.replicate, Replication::FromPrimary);
    }

    #[test]
    fn direct_update_honours_skip() {
        let plan = CompositingPlan::for_direct_update(&mode(false, true, false, SurfaceId::Primary));
        assert_eq!(plan.target, SurfaceId::Window);
        assert_eq!(plan.replicate, Replication::None);

        let plan = CompositingPlan::for_primary_update(&mode(false, true, false, SurfaceId::Primary));
        assert_eq!(plan.target, SurfaceId::Primary);
        assert_eq!(plan.replicate, Replication::FromPrimary);
    }
}
