//! Error types for the replay driver.
//!
//! Engine failures (`GdiError`) are per-record and never stop a replay;
//! they are counted, not propagated. `ReplayError` covers what does
//! stop it: unreadable input, broken framing, and output failures.

use rgdi_core::GdiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    // ── Stream errors ────────────────────────────────────────────
    /// Reading the recording or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A length prefix exceeds the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The stream ended in the middle of a record.
    #[error("truncated stream: {0} trailing bytes")]
    Truncated(usize),

    /// A record body could not be (de)serialised.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Session errors ───────────────────────────────────────────
    /// The engine could not be set up from the configuration.
    #[error("engine setup failed: {0}")]
    Engine(#[from] GdiError),

    /// Writing the PNG dump failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<Box<bincode::ErrorKind>> for ReplayError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ReplayError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = ReplayError::FrameTooLarge { size: 1000, max: 500 };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));
        assert_eq!(
            ReplayError::Truncated(3).to_string(),
            "truncated stream: 3 trailing bytes"
        );
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let e: ReplayError = io_err.into();
        assert!(matches!(e, ReplayError::Io(_)));
    }

    #[test]
    fn from_engine() {
        let e: ReplayError = GdiError::UnsupportedColorDepth(12).into();
        assert!(e.to_string().contains("12 bpp"));
    }
}
