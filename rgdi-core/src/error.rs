//! Error types for order execution and surface updates.
//!
//! Every failure here is non-fatal: the offending order or command is
//! abandoned, the error is logged, and the caller moves on to the next
//! item. Handlers still return `Result<(), GdiError>` so callers can
//! observe what happened.

use thiserror::Error;

use crate::surface::SurfaceId;

/// The canonical error type for the rendering engine.
#[derive(Debug, Error)]
pub enum GdiError {
    // ── Raster / brush errors ────────────────────────────────────
    /// A binary or ternary raster operation code has no local equivalent.
    #[error("unsupported {kind} raster operation: {code:#08x}")]
    UnsupportedOperation { kind: &'static str, code: u32 },

    /// The brush style is neither solid nor pattern.
    #[error("unsupported brush style: {0}")]
    UnsupportedBrushStyle(u8),

    /// Pixel data arrived at a colour depth we cannot convert.
    #[error("unsupported colour depth: {0} bpp")]
    UnsupportedColorDepth(u8),

    // ── Surface update errors ────────────────────────────────────
    /// A surface-update payload is shorter than its own framing claims.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A codec collaborator reported an error.
    #[error("{codec} decode failed: {reason}")]
    DecodeFailure { codec: &'static str, reason: String },

    /// The motion codec delivered a frame that would need scaling.
    #[error("unsupported stretch: {src_width}x{src_height} -> {dst_width}x{dst_height}")]
    UnsupportedStretch {
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    /// The codec id does not map to any known codec.
    #[error("unknown codec id: {0:#04x}")]
    UnknownCodec(u8),

    /// The codec is known but no decoder has been registered for it.
    #[error("no decoder registered for {0}")]
    MissingDecoder(&'static str),

    /// A motion session landed on a slot owned by another session.
    #[error("motion slot {slot} is owned by session {owner}, rejected session {session_id}")]
    SessionCollision {
        slot: usize,
        owner: u32,
        session_id: u32,
    },

    // ── Resource errors ──────────────────────────────────────────
    /// The drawing target names a surface that does not exist.
    #[error("unknown surface: {0:?}")]
    UnknownSurface(SurfaceId),

    /// A memory blit references a bitmap the caller does not hold.
    #[error("unknown cached bitmap {cache_id}:{cache_index}")]
    UnknownBitmap { cache_id: u16, cache_index: u16 },
}

impl GdiError {
    /// Shorthand for [`GdiError::MalformedPayload`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        GdiError::MalformedPayload(reason.into())
    }

    /// Shorthand for [`GdiError::DecodeFailure`].
    pub fn decode(codec: &'static str, reason: impl ToString) -> Self {
        GdiError::DecodeFailure {
            codec,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = GdiError::UnsupportedOperation {
            kind: "ternary",
            code: 0x00B8_074A,
        };
        assert!(e.to_string().contains("ternary"));
        assert!(e.to_string().contains("b8074a"));

        let e = GdiError::UnsupportedStretch {
            src_width: 640,
            src_height: 480,
            dst_width: 1280,
            dst_height: 960,
        };
        assert!(e.to_string().contains("640x480"));
        assert!(e.to_string().contains("1280x960"));
    }

    #[test]
    fn helper_constructors() {
        assert!(matches!(
            GdiError::malformed("short header"),
            GdiError::MalformedPayload(_)
        ));
        let e = GdiError::decode("color-cell", "bad plane");
        assert_eq!(e.to_string(), "color-cell decode failed: bad plane");
    }
}
