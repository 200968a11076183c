//! # rgdi-replay
//!
//! Offline driver for `rgdi-core`: reads a recorded stream of orders
//! and surface updates, applies it to a fresh engine, and reports what
//! happened.
//!
//! - [`stream`]: length-prefixed bincode framing, optionally zstd'd.
//! - [`record`]: the records a stream carries.
//! - [`replay`]: the engine wrapper and its statistics.
//! - [`present`]: dirty-rectangle and frame-acknowledgement sinks.
//! - [`config`]: TOML configuration.

pub mod config;
pub mod error;
pub mod present;
pub mod record;
pub mod replay;
pub mod stream;

pub use error::ReplayError;
pub use record::UpdateRecord;
pub use replay::{ReplayStats, Replayer};
