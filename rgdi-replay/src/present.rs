//! Presentation-side collaborators: where dirty rectangles and frame
//! acknowledgements go during a replay.

use std::collections::BTreeSet;

use rgdi_core::frame::FrameAckSink;
use rgdi_core::{DirtySink, Rect};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

// ── Dirty rectangles ─────────────────────────────────────────────

/// Tallies invalidated regions: a count, the summed area, and the
/// running extent. Individual rectangles are not retained.
#[derive(Debug, Clone, Default)]
pub struct DirtyLog {
    count: usize,
    area: u64,
    extent: Option<Rect>,
}

impl DirtyLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangles reported so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of reported areas. Overlaps are counted twice.
    pub fn area(&self) -> u64 {
        self.area
    }

    /// Smallest rectangle covering every report, if any.
    pub fn extent(&self) -> Option<Rect> {
        self.extent
    }
}

impl DirtySink for DirtyLog {
    fn mark_dirty(&mut self, rect: Rect) {
        trace!(?rect, "dirty");
        self.count += 1;
        self.area += u64::from(rect.width) * u64::from(rect.height);
        self.extent = Some(match self.extent {
            None => rect,
            Some(e) => {
                let (x0, y0) = (e.x.min(rect.x), e.y.min(rect.y));
                let x1 = i64::from(e.right().max(rect.right()));
                let y1 = i64::from(e.bottom().max(rect.bottom()));
                Rect::new(
                    x0,
                    y0,
                    (x1 - i64::from(x0)).min(i64::from(u32::MAX)) as u32,
                    (y1 - i64::from(y0)).min(i64::from(u32::MAX)) as u32,
                )
            }
        });
    }
}

// ── Frame acknowledgements ───────────────────────────────────────

/// Forwards acknowledgements to a collector task.
#[derive(Debug, Clone)]
pub struct AckForwarder {
    tx: mpsc::UnboundedSender<u32>,
}

impl AckForwarder {
    pub fn new(tx: mpsc::UnboundedSender<u32>) -> Self {
        Self { tx }
    }
}

impl FrameAckSink for AckForwarder {
    fn acknowledge_frame(&mut self, frame_id: u32) {
        if self.tx.send(frame_id).is_err() {
            debug!(frame_id, "ack collector gone; dropping acknowledgement");
        }
    }
}

/// What the collector saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AckSummary {
    /// Acknowledgements received.
    pub count: u64,
    /// Last acknowledged frame id.
    pub last: Option<u32>,
    /// Distinct frame ids acknowledged.
    pub distinct: usize,
}

/// Spawn a task that drains acknowledgements until every forwarder is
/// dropped, then reports a summary.
pub fn spawn_ack_collector() -> (AckForwarder, JoinHandle<AckSummary>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
    let handle = tokio::spawn(async move {
        let mut summary = AckSummary::default();
        let mut seen = BTreeSet::new();
        while let Some(frame_id) = rx.recv().await {
            summary.count += 1;
            summary.last = Some(frame_id);
            seen.insert(frame_id);
        }
        summary.distinct = seen.len();
        summary
    });
    (AckForwarder::new(tx), handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_log_extent_and_area() {
        let mut log = DirtyLog::new();
        assert_eq!(log.extent(), None);
        log.mark_dirty(Rect::new(2, 2, 2, 2));
        log.mark_dirty(Rect::new(5, 0, 1, 3));
        assert_eq!(log.len(), 2);
        assert_eq!(log.area(), 7);
        assert_eq!(log.extent(), Some(Rect::new(2, 0, 4, 4)));
    }

    #[test]
    fn dirty_log_running_totals_over_many_reports() {
        let mut log = DirtyLog::new();
        for i in 0..10_000 {
            log.mark_dirty(Rect::new(i % 100, i / 100, 1, 1));
        }
        assert_eq!(log.len(), 10_000);
        assert_eq!(log.area(), 10_000);
        assert_eq!(log.extent(), Some(Rect::new(0, 0, 100, 100)));

        log.mark_dirty(Rect::new(i32::MIN, i32::MIN, u32::MAX, u32::MAX));
        let extent = log.extent().unwrap();
        assert_eq!((extent.x, extent.y), (i32::MIN, i32::MIN));
        assert_eq!(extent.width, (1u32 << 31) + 100);
    }

    #[tokio::test]
    async fn collector_summarises_after_drop() {
        let (mut fwd, handle) = spawn_ack_collector();
        for id in [3, 3, 4] {
            fwd.acknowledge_frame(id);
        }
        drop(fwd);
        let summary = handle.await.unwrap();
        assert_eq!(
            summary,
            AckSummary {
                count: 3,
                last: Some(4),
                distinct: 2,
            }
        );
    }
}
