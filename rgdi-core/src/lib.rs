//! # rgdi-core
//!
//! Rendering backend for a remote desktop client. Takes already-parsed
//! drawing orders and compressed surface updates and applies them to
//! local pixel surfaces.
//!
//! ## Modules
//!
//! - [`rop`]: raster-operation translation (ROP2 / ROP3 codes).
//! - [`brush`]: transient colour brushes, stipples, and glyph masks.
//! - [`gdi`]: the per-session engine, order handlers, and the
//!   surface-update dispatcher.
//! - [`codec`]: decoder collaborator traits, motion framing, and the
//!   built-in baseline-image decoder.
//! - [`frame`]: frame marker tracking and acknowledgement.
//! - [`plan`]: per-order destination and replication choice.
//! - [`surface`], [`color`], [`types`], [`order`]: the data model.

pub mod brush;
pub mod codec;
pub mod color;
pub mod error;
pub mod frame;
pub mod gdi;
pub mod order;
pub mod plan;
pub mod rop;
pub mod surface;
pub mod types;

pub use error::GdiError;
pub use gdi::{Gdi, GdiOptions};
pub use surface::{DirtySink, DrawStyle, Surface, SurfaceId, SurfaceSet};
pub use types::{Bounds, Point, Rect};
