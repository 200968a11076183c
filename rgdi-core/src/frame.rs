//! Frame lifecycle: remembers the last begun frame and acknowledges it
//! once per surface-update command.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Frame marker action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameAction {
    Begin,
    End,
}

impl FrameAction {
    /// Map the wire value. Anything but 0 is treated as an end marker.
    pub fn from_wire(action: u16) -> Self {
        if action == 0 {
            FrameAction::Begin
        } else {
            FrameAction::End
        }
    }
}

/// A surface frame marker as delivered by the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMarker {
    pub frame_id: u32,
    pub action: FrameAction,
}

/// Receives frame acknowledgements for the remote peer's flow control.
pub trait FrameAckSink {
    fn acknowledge_frame(&mut self, frame_id: u32);
}

impl FrameAckSink for Vec<u32> {
    fn acknowledge_frame(&mut self, frame_id: u32) {
        self.push(frame_id);
    }
}

/// Holds the id of the most recently begun frame. There is no queue:
/// a newer begin marker simply replaces the older id.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTracker {
    frame_id: u32,
}

impl FrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a marker. Only [`FrameAction::Begin`] changes state.
    pub fn record(&mut self, marker: FrameMarker) {
        match marker.action {
            FrameAction::Begin => {
                debug!(frame_id = marker.frame_id, "frame begin");
                self.frame_id = marker.frame_id;
            }
            FrameAction::End => debug!(frame_id = marker.frame_id, "frame end"),
        }
    }

    pub fn current(&self) -> u32 {
        self.frame_id
    }

    /// Send the recorded id to `sink`. The id is kept, so a second
    /// command without a new marker acknowledges the same frame again.
    pub fn acknowledge(&self, sink: &mut dyn FrameAckSink) {
        debug!(frame_id = self.frame_id, "acknowledging frame");
        sink.acknowledge_frame(self.frame_id);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_begin_records() {
        let mut t = FrameTracker::new();
        assert_eq!(t.current(), 0);
        t.record(FrameMarker { frame_id: 7, action: FrameAction::Begin });
        t.record(FrameMarker { frame_id: 9, action: FrameAction::End });
        assert_eq!(t.current(), 7);
    }

    #[test]
    fn acknowledge_keeps_id() {
        let mut t = FrameTracker::new();
        t.record(FrameMarker { frame_id: 3, action: FrameAction::Begin });
        let mut acks = Vec::new();
        t.acknowledge(&mut acks);
        t.acknowledge(&mut acks);
        assert_eq!(acks, vec![3, 3]);
    }

    #[test]
    fn wire_actions() {
        assert_eq!(FrameAction::from_wire(0), FrameAction::Begin);
        assert_eq!(FrameAction::from_wire(1), FrameAction::End);
    }
}
