//! Records carried by a replay stream.
//!
//! Each record is one call the protocol layer would make into the
//! engine, with its already-parsed arguments.

use rgdi_core::color::PaletteEntry;
use rgdi_core::frame::FrameMarker;
use rgdi_core::order::{
    BitmapKey, DstBltOrder, LineToOrder, MemBltOrder, MultiOpaqueRectOrder, OpaqueRectOrder,
    PatBltOrder, PolylineOrder, ScrBltOrder, SurfaceBitsCommand,
};
use rgdi_core::plan::SessionMode;
use rgdi_core::types::Bounds;
use serde::{Deserialize, Serialize};

/// A bitmap to place in the replay's cache, as packed pixel data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapRecord {
    pub key: BitmapKey,
    pub width: u32,
    pub height: u32,
    /// Bits per pixel of `data`.
    pub bpp: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRecord {
    // ── Session state ────────────────────────────────────────────
    Mode(SessionMode),
    Palette(Vec<PaletteEntry>),
    SetBounds(Option<Bounds>),
    CacheBitmap(BitmapRecord),

    // ── Orders ───────────────────────────────────────────────────
    DstBlt(DstBltOrder),
    PatBlt(PatBltOrder),
    ScrBlt(ScrBltOrder),
    OpaqueRect(OpaqueRectOrder),
    MultiOpaqueRect(MultiOpaqueRectOrder),
    LineTo(LineToOrder),
    Polyline(PolylineOrder),
    MemBlt(MemBltOrder),

    // ── Surface updates ──────────────────────────────────────────
    FrameMarker(FrameMarker),
    SurfaceBits(SurfaceBitsCommand),
}

impl UpdateRecord {
    /// Short name used in logs and statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateRecord::Mode(_) => "mode",
            UpdateRecord::Palette(_) => "palette",
            UpdateRecord::SetBounds(_) => "set-bounds",
            UpdateRecord::CacheBitmap(_) => "cache-bitmap",
            UpdateRecord::DstBlt(_) => "dst-blt",
            UpdateRecord::PatBlt(_) => "pat-blt",
            UpdateRecord::ScrBlt(_) => "scr-blt",
            UpdateRecord::OpaqueRect(_) => "opaque-rect",
            UpdateRecord::MultiOpaqueRect(_) => "multi-opaque-rect",
            UpdateRecord::LineTo(_) => "line-to",
            UpdateRecord::Polyline(_) => "polyline",
            UpdateRecord::MemBlt(_) => "mem-blt",
            UpdateRecord::FrameMarker(_) => "frame-marker",
            UpdateRecord::SurfaceBits(_) => "surface-bits",
        }
    }

    /// Whether the record is a drawing order.
    pub fn is_order(&self) -> bool {
        matches!(
            self,
            UpdateRecord::DstBlt(_)
                | UpdateRecord::PatBlt(_)
                | UpdateRecord::ScrBlt(_)
                | UpdateRecord::OpaqueRect(_)
                | UpdateRecord::MultiOpaqueRect(_)
                | UpdateRecord::LineTo(_)
                | UpdateRecord::Polyline(_)
                | UpdateRecord::MemBlt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgdi_core::types::Rect;

    #[test]
    fn kinds_and_order_classification() {
        let fill = UpdateRecord::OpaqueRect(OpaqueRectOrder {
            rect: Rect::new(0, 0, 1, 1),
            color: 0,
        });
        assert_eq!(fill.kind(), "opaque-rect");
        assert!(fill.is_order());

        let bounds = UpdateRecord::SetBounds(None);
        assert_eq!(bounds.kind(), "set-bounds");
        assert!(!bounds.is_order());
    }

    #[test]
    fn bincode_preserves_nested_enums() {
        let record = UpdateRecord::Mode(SessionMode {
            remote_app: true,
            target: rgdi_core::SurfaceId::Scratch(7),
            ..SessionMode::default()
        });
        let bytes = bincode::serialize(&record).unwrap();
        let back: UpdateRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, record);
    }
}
