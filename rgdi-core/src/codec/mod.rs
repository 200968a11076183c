//! Codec collaborators for bulk surface updates.
//!
//! The byte-level internals of each codec live outside this crate. The
//! engine talks to them through the traits below and only parses the
//! thin framing around the motion payload itself.

pub mod jpeg;
pub mod motion;
pub mod scratch;

use crate::error::GdiError;
use crate::surface::PixelView;
use crate::types::Rect;

pub use jpeg::JpegDecoder;
pub use motion::{MotionFlags, MotionHeader, MotionSessions, SlotCollisionPolicy, MOTION_SLOTS};
pub use scratch::ScratchBuffer;

// ── CodecId ──────────────────────────────────────────────────────

/// Codecs a surface-bits command may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// Raw bottom-up 32 bpp pixels.
    Uncompressed,
    ColorCell,
    BaselineImage,
    TileTransform,
    Motion,
}

impl CodecId {
    pub const NONE: u8 = 0x00;
    pub const COLOR_CELL: u8 = 0x01;
    pub const BASELINE_IMAGE: u8 = 0x02;
    pub const TILE_TRANSFORM: u8 = 0x03;
    pub const MOTION: u8 = 0x04;

    pub fn from_wire(id: u8) -> Result<Self, GdiError> {
        match id {
            Self::NONE => Ok(CodecId::Uncompressed),
            Self::COLOR_CELL => Ok(CodecId::ColorCell),
            Self::BASELINE_IMAGE => Ok(CodecId::BaselineImage),
            Self::TILE_TRANSFORM => Ok(CodecId::TileTransform),
            Self::MOTION => Ok(CodecId::Motion),
            other => Err(GdiError::UnknownCodec(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecId::Uncompressed => "uncompressed",
            CodecId::ColorCell => "color-cell",
            CodecId::BaselineImage => "baseline-image",
            CodecId::TileTransform => "tile-transform",
            CodecId::Motion => "motion",
        }
    }
}

// ── Tile transform ───────────────────────────────────────────────

/// Edge length of a tile-transform tile.
pub const TILE_SIZE: u32 = 64;

/// One decoded tile, positioned relative to the command's destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    /// `TILE_SIZE * TILE_SIZE` local pixels, row-major.
    pub pixels: Vec<u32>,
}

/// Output of the tile-transform decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMessage {
    pub tiles: Vec<Tile>,
    /// Regions actually updated, relative to the destination origin.
    pub rects: Vec<Rect>,
}

pub trait TileDecoder {
    fn decode(&mut self, payload: &[u8]) -> Result<TileMessage, GdiError>;
}

// ── Color cell ───────────────────────────────────────────────────

pub trait ColorCellDecoder {
    /// Decode a full frame into bottom-up B, G, R, X rows of
    /// `width * 4` bytes.
    fn decode(&mut self, payload: &[u8], width: u32, height: u32) -> Result<Vec<u8>, GdiError>;
}

// ── Baseline image ───────────────────────────────────────────────

pub trait ImageDecoder {
    /// Decode into `out`, which holds exactly `width * height * 4`
    /// bytes of top-down B, G, R, X rows.
    fn decode_into(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<(), GdiError>;
}

// ── Motion ───────────────────────────────────────────────────────

/// A stateful decoder bound to one motion session.
pub trait MotionDecoder {
    /// Feed one compressed frame.
    fn decode(&mut self, data: &[u8]) -> Result<(), GdiError>;

    /// The most recently decoded frame, borrowed from the decoder.
    fn frame(&self) -> Option<PixelView<'_>>;
}

/// Creates motion decoders sized to a session's source dimensions.
pub trait MotionDecoderFactory {
    fn create(&self, width: u32, height: u32) -> Result<Box<dyn MotionDecoder>, GdiError>;
}

// ── CodecSet ─────────────────────────────────────────────────────

/// The decoders available to one engine. Codecs without a decoder fail
/// with [`GdiError::MissingDecoder`].
pub struct CodecSet {
    pub tile: Option<Box<dyn TileDecoder>>,
    pub color_cell: Option<Box<dyn ColorCellDecoder>>,
    pub image: Option<Box<dyn ImageDecoder>>,
    pub motion: Option<Box<dyn MotionDecoderFactory>>,
}

impl CodecSet {
    /// No decoders at all, uncompressed updates only.
    pub fn empty() -> Self {
        Self {
            tile: None,
            color_cell: None,
            image: None,
            motion: None,
        }
    }

    pub fn with_tile(mut self, decoder: impl TileDecoder + 'static) -> Self {
        self.tile = Some(Box::new(decoder));
        self
    }

    pub fn with_color_cell(mut self, decoder: impl ColorCellDecoder + 'static) -> Self {
        self.color_cell = Some(Box::new(decoder));
        self
    }

    pub fn with_image(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.image = Some(Box::new(decoder));
        self
    }

    pub fn with_motion(mut self, factory: impl MotionDecoderFactory + 'static) -> Self {
        self.motion = Some(Box::new(factory));
        self
    }
}

impl Default for CodecSet {
    /// Baseline images are decoded with [`JpegDecoder`]; everything else
    /// must be registered by the caller.
    fn default() -> Self {
        Self::empty().with_image(JpegDecoder)
    }
}

impl std::fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecSet")
            .field("tile", &self.tile.is_some())
            .field("color_cell", &self.color_cell.is_some())
            .field("image", &self.image.is_some())
            .field("motion", &self.motion.is_some())
            .finish()
    }
}
