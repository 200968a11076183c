//! Replay driver configuration.

use std::path::Path;

use rgdi_core::GdiOptions;
use rgdi_core::codec::motion::SlotCollisionPolicy;
use rgdi_core::plan::SessionMode;
use rgdi_core::rop::UnsupportedRopPolicy;
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// Top-level configuration for the replay driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Desktop geometry and initial session mode.
    pub session: SessionConfig,
    /// Engine policies.
    pub rendering: RenderingConfig,
    /// What to produce after the replay.
    pub output: OutputConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Desktop geometry and initial session mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    /// Session colour depth in bits per pixel.
    pub color_depth: u8,
    pub remote_app: bool,
    pub skip_backing_store: bool,
    pub unobscured: bool,
}

/// Engine policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// "clear" or "noop".
    pub unsupported_rop3: UnsupportedRopPolicy,
    /// "evict" or "reject".
    pub motion_slot_collision: SlotCollisionPolicy,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write the primary surface to this PNG; empty disables.
    pub dump_png: String,
    /// Print the primary surface digest.
    pub print_fingerprint: bool,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            rendering: RenderingConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            color_depth: 32,
            remote_app: false,
            skip_backing_store: false,
            unobscured: false,
        }
    }
}

impl Default for RenderingConfig {
    fn default() -> Self {
        let options = GdiOptions::default();
        Self {
            unsupported_rop3: options.unsupported_rop3,
            motion_slot_collision: options.motion_collision,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dump_png: String::new(),
            print_fingerprint: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ReplayConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ReplayError> {
        toml::to_string_pretty(self).map_err(|e| ReplayError::Encoding(e.to_string()))
    }

    /// Write the defaults to `path`, for `--gen-config <path>`.
    pub fn write_default(path: &Path) -> Result<(), ReplayError> {
        std::fs::write(path, Self::default().to_toml()?)?;
        Ok(())
    }

    pub fn gdi_options(&self) -> GdiOptions {
        GdiOptions {
            color_depth: self.session.color_depth,
            unsupported_rop3: self.rendering.unsupported_rop3,
            motion_collision: self.rendering.motion_slot_collision,
        }
    }

    /// Initial mode; orders target the primary surface.
    pub fn session_mode(&self) -> SessionMode {
        SessionMode {
            remote_app: self.session.remote_app,
            skip_backing_store: self.session.skip_backing_store,
            unobscured: self.session.unobscured,
            ..SessionMode::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
