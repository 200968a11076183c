//! Feeds recorded updates through the engine.
//!
//! Engine errors are per-record: they are logged by the engine, counted
//! here, and the replay moves on. Only stream errors stop a run.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use futures::{Stream, StreamExt};
use image::{Rgba, RgbaImage};
use rgdi_core::codec::CodecSet;
use rgdi_core::frame::FrameAckSink;
use rgdi_core::order::{BitmapKey, CachedBitmap};
use rgdi_core::{Gdi, GdiError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReplayConfig;
use crate::error::ReplayError;
use crate::present::DirtyLog;
use crate::record::{BitmapRecord, UpdateRecord};

/// Counters for one replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    /// Records applied, successful or not.
    pub records: u64,
    /// Drawing orders among them.
    pub orders: u64,
    /// Surface-bits commands among them.
    pub surface_updates: u64,
    /// Records the engine abandoned.
    pub failures: u64,
    /// Records seen, by kind.
    pub by_kind: BTreeMap<&'static str, u64>,
}

/// One engine plus the state a protocol layer would own around it.
pub struct Replayer {
    gdi: Gdi,
    bitmaps: HashMap<BitmapKey, CachedBitmap>,
    dirty: DirtyLog,
    stats: ReplayStats,
}

impl Replayer {
    pub fn new(config: &ReplayConfig) -> Result<Self, ReplayError> {
        let mut gdi = Gdi::new(
            config.session.width,
            config.session.height,
            config.gdi_options(),
        )?;
        gdi.set_mode(config.session_mode());
        Ok(Self {
            gdi,
            bitmaps: HashMap::new(),
            dirty: DirtyLog::new(),
            stats: ReplayStats::default(),
        })
    }

    /// Replace the decoder set.
    pub fn with_codecs(mut self, codecs: CodecSet) -> Self {
        self.gdi = self.gdi.with_codecs(codecs);
        self
    }

    pub fn gdi(&self) -> &Gdi {
        &self.gdi
    }

    pub fn dirty(&self) -> &DirtyLog {
        &self.dirty
    }

    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    pub fn cached_bitmaps(&self) -> usize {
        self.bitmaps.len()
    }

    /// Apply one record.
    pub fn apply(&mut self, record: &UpdateRecord, acks: &mut dyn FrameAckSink) -> Result<(), GdiError> {
        self.stats.records += 1;
        *self.stats.by_kind.entry(record.kind()).or_default() += 1;
        if record.is_order() {
            self.stats.orders += 1;
        }

        let dirty = &mut self.dirty;
        let result = match record {
            UpdateRecord::Mode(mode) => {
                self.gdi.set_mode(*mode);
                Ok(())
            }
            UpdateRecord::Palette(entries) => {
                self.gdi.palette_update(entries.clone());
                Ok(())
            }
            UpdateRecord::SetBounds(bounds) => {
                self.gdi.set_bounds(*bounds);
                Ok(())
            }
            UpdateRecord::CacheBitmap(bitmap) => cache_bitmap(&self.gdi, &mut self.bitmaps, bitmap),
            UpdateRecord::DstBlt(order) => self.gdi.dst_blt(order, dirty),
            UpdateRecord::PatBlt(order) => self.gdi.pat_blt(order, dirty),
            UpdateRecord::ScrBlt(order) => self.gdi.scr_blt(order, dirty),
            UpdateRecord::OpaqueRect(order) => self.gdi.opaque_rect(order, dirty),
            UpdateRecord::MultiOpaqueRect(order) => self.gdi.multi_opaque_rect(order, dirty),
            UpdateRecord::LineTo(order) => self.gdi.line_to(order, dirty),
            UpdateRecord::Polyline(order) => self.gdi.polyline(order, dirty),
            UpdateRecord::MemBlt(order) => match self.bitmaps.get(&order.bitmap) {
                Some(bitmap) => self.gdi.mem_blt(order, bitmap, dirty),
                None => {
                    let e = GdiError::UnknownBitmap {
                        cache_id: order.bitmap.cache_id,
                        cache_index: order.bitmap.cache_index,
                    };
                    warn!(error = %e, "mem-blt skipped");
                    Err(e)
                }
            },
            UpdateRecord::FrameMarker(marker) => {
                self.gdi.frame_marker(*marker);
                Ok(())
            }
            UpdateRecord::SurfaceBits(cmd) => {
                self.stats.surface_updates += 1;
                self.gdi.surface_bits(cmd, dirty, acks)
            }
        };

        if result.is_err() {
            self.stats.failures += 1;
        }
        result
    }

    /// Drain a record stream. Stops at the first stream error.
    pub async fn run<S>(&mut self, mut stream: S, acks: &mut dyn FrameAckSink) -> Result<&ReplayStats, ReplayError>
    where
        S: Stream<Item = Result<UpdateRecord, ReplayError>> + Unpin,
    {
        while let Some(record) = stream.next().await {
            let record = record?;
            // Engine errors are already logged and counted.
            let _ = self.apply(&record, acks);
        }
        info!(
            records = self.stats.records,
            failures = self.stats.failures,
            dirty = self.dirty.len(),
            "replay finished"
        );
        Ok(&self.stats)
    }

    /// Hex digest of the primary surface.
    pub fn fingerprint(&self) -> String {
        self.gdi.surfaces().primary().fingerprint().to_hex().to_string()
    }

    /// Write the primary surface as an opaque PNG.
    pub fn dump_png(&self, path: &Path) -> Result<(), ReplayError> {
        let primary = self.gdi.surfaces().primary();
        let img = RgbaImage::from_fn(primary.width(), primary.height(), |x, y| {
            let px = primary.pixel(x as i32, y as i32).unwrap_or(0);
            Rgba([(px >> 16) as u8, (px >> 8) as u8, px as u8, 0xFF])
        });
        img.save(path)?;
        debug!(path = %path.display(), "primary surface written");
        Ok(())
    }
}

impl std::fmt::Debug for Replayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replayer")
            .field("gdi", &self.gdi)
            .field("bitmaps", &self.bitmaps.len())
            .field("dirty", &self.dirty.len())
            .field("stats", &self.stats)
            .finish()
    }
}

fn cache_bitmap(
    gdi: &Gdi,
    cache: &mut HashMap<BitmapKey, CachedBitmap>,
    record: &BitmapRecord,
) -> Result<(), GdiError> {
    let result = gdi
        .colors()
        .convert_pixels(&record.data, record.bpp, record.width, record.height)
        .and_then(|pixels| CachedBitmap::new(record.width, record.height, pixels));
    match result {
        Ok(bitmap) => {
            cache.insert(record.key, bitmap);
            Ok(())
        }
        Err(e) => {
            warn!(key = ?record.key, error = %e, "bitmap not cached");
            Err(e)
        }
    }
}
