//! Motion codec framing and the bounded decoder-session table.
//!
//! Payload layout, all little-endian:
//!
//! ```text
//! u32 flags | u32 session_id | u16 src_w | u16 src_h | u16 dst_w | u16 dst_h
//! u16 rect_count | rect_count × { u16 x, u16 y, u16 w, u16 h }
//! u32 data_len | data_len bytes
//! ```

use bitflags::bitflags;
use bytes::Buf;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{MotionDecoder, MotionDecoderFactory};
use crate::error::GdiError;
use crate::types::Rect;

/// Number of concurrent decoder sessions.
pub const MOTION_SLOTS: usize = 16;

/// Fixed part of the header, up to and including the rect count.
const FIXED_HEADER_LEN: usize = 18;

bitflags! {
    /// Header flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MotionFlags: u32 {
        /// Tear down the session's decoder.
        const DELETE = 0x0000_0002;
    }
}

// ── MotionHeader ─────────────────────────────────────────────────

/// A fully validated motion payload, borrowing the compressed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionHeader<'a> {
    pub flags: MotionFlags,
    pub session_id: u32,
    pub src_width: u32,
    pub src_height: u32,
    pub dst_width: u32,
    pub dst_height: u32,
    /// Update rectangles relative to the destination origin.
    pub rects: Vec<Rect>,
    pub data: &'a [u8],
}

impl<'a> MotionHeader<'a> {
    /// Parse and length-check the whole payload. Every length is
    /// verified before anything is returned, so callers can rely on a
    /// successful parse before touching decoder state.
    pub fn parse(payload: &'a [u8]) -> Result<Self, GdiError> {
        let mut buf = payload;
        if buf.remaining() < FIXED_HEADER_LEN {
            return Err(GdiError::malformed(format!(
                "motion header needs {FIXED_HEADER_LEN} bytes, got {}",
                buf.remaining()
            )));
        }
        let flags = MotionFlags::from_bits_retain(buf.get_u32_le());
        let session_id = buf.get_u32_le();
        let src_width = u32::from(buf.get_u16_le());
        let src_height = u32::from(buf.get_u16_le());
        let dst_width = u32::from(buf.get_u16_le());
        let dst_height = u32::from(buf.get_u16_le());
        let rect_count = buf.get_u16_le() as usize;

        let needed = rect_count * 8 + 4;
        if buf.remaining() < needed {
            return Err(GdiError::malformed(format!(
                "motion rect list needs {needed} bytes, got {}",
                buf.remaining()
            )));
        }
        let rects = (0..rect_count)
            .map(|_| {
                let x = i32::from(buf.get_u16_le());
                let y = i32::from(buf.get_u16_le());
                let w = u32::from(buf.get_u16_le());
                let h = u32::from(buf.get_u16_le());
                Rect::new(x, y, w, h)
            })
            .collect();

        let data_len = buf.get_u32_le() as usize;
        if buf.remaining() < data_len {
            return Err(GdiError::malformed(format!(
                "motion data needs {data_len} bytes, got {}",
                buf.remaining()
            )));
        }

        Ok(Self {
            flags,
            session_id,
            src_width,
            src_height,
            dst_width,
            dst_height,
            rects,
            data: &buf[..data_len],
        })
    }

    pub fn slot(&self) -> usize {
        slot_of(self.session_id)
    }

    pub fn is_same_size(&self) -> bool {
        self.src_width == self.dst_width && self.src_height == self.dst_height
    }
}

fn slot_of(session_id: u32) -> usize {
    session_id as usize % MOTION_SLOTS
}

// ── MotionSessions ───────────────────────────────────────────────

/// What happens when a session id lands on a slot owned by another id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlotCollisionPolicy {
    /// Drop the resident decoder and start over for the newcomer.
    #[default]
    #[serde(rename = "evict")]
    Evict,
    /// Refuse the newcomer with [`GdiError::SessionCollision`].
    #[serde(rename = "reject")]
    Reject,
}

struct Session {
    id: u32,
    decoder: Box<dyn MotionDecoder>,
}

/// Up to [`MOTION_SLOTS`] live decoders, keyed by `session_id % 16`.
/// Each slot remembers the full id of the session that owns it.
pub struct MotionSessions {
    slots: [Option<Session>; MOTION_SLOTS],
    policy: SlotCollisionPolicy,
}

impl MotionSessions {
    pub fn new(policy: SlotCollisionPolicy) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            policy,
        }
    }

    pub fn policy(&self) -> SlotCollisionPolicy {
        self.policy
    }

    /// Number of live decoders.
    pub fn active(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Session id owning the slot `session_id` maps to, if any.
    pub fn owner(&self, session_id: u32) -> Option<u32> {
        self.slots[slot_of(session_id)].as_ref().map(|s| s.id)
    }

    /// Release the decoder for `session_id`. A slot held by a different
    /// session is left alone.
    pub fn delete(&mut self, session_id: u32) {
        let slot = slot_of(session_id);
        match &self.slots[slot] {
            Some(s) if s.id == session_id => {
                debug!(session_id, slot, "motion session deleted");
                self.slots[slot] = None;
            }
            Some(s) => warn!(
                session_id,
                owner = s.id,
                slot,
                "ignoring delete for motion slot owned by another session"
            ),
            None => {}
        }
    }

    /// The decoder for `session_id`, creating one sized to
    /// `width`×`height` when the slot is free.
    pub fn decoder_for(
        &mut self,
        session_id: u32,
        width: u32,
        height: u32,
        factory: &dyn MotionDecoderFactory,
    ) -> Result<&mut dyn MotionDecoder, GdiError> {
        let slot = slot_of(session_id);
        let resident = self.slots[slot].as_ref().map(|s| s.id);
        if let Some(owner) = resident.filter(|&owner| owner != session_id) {
            match self.policy {
                SlotCollisionPolicy::Reject => {
                    return Err(GdiError::SessionCollision {
                        slot,
                        owner,
                        session_id,
                    });
                }
                SlotCollisionPolicy::Evict => {
                    warn!(session_id, owner, slot, "evicting motion session on slot collision");
                    self.slots[slot] = None;
                }
            }
        }

        if self.slots[slot].is_none() {
            let decoder = factory.create(width, height)?;
            debug!(session_id, slot, width, height, "motion decoder created");
            self.slots[slot] = Some(Session {
                id: session_id,
                decoder,
            });
        }
        match self.slots[slot].as_mut() {
            Some(session) => Ok(session.decoder.as_mut()),
            None => Err(GdiError::MissingDecoder("motion")),
        }
    }
}

impl Default for MotionSessions {
    fn default() -> Self {
        Self::new(SlotCollisionPolicy::default())
    }
}

impl std::fmt::Debug for MotionSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let owners: Vec<_> = self.slots.iter().flatten().map(|s| s.id).collect();
        f.debug_struct("MotionSessions")
            .field("policy", &self.policy)
            .field("owners", &owners)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::PixelView;

    struct Null;

    impl MotionDecoder for Null {
        fn decode(&mut self, _data: &[u8]) -> Result<(), GdiError> {
            Ok(())
        }

        fn frame(&self) -> Option<PixelView<'_>> {
            None
        }
    }

    struct NullFactory;

    impl MotionDecoderFactory for NullFactory {
        fn create(&self, _w: u32, _h: u32) -> Result<Box<dyn MotionDecoder>, GdiError> {
            Ok(Box::new(Null))
        }
    }

    fn payload(rects: &[(u16, u16, u16, u16)], data: &[u8], declared: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&0u32.to_le_bytes());
        p.extend_from_slice(&5u32.to_le_bytes());
        for v in [8u16, 8, 8, 8, rects.len() as u16] {
            p.extend_from_slice(&v.to_le_bytes());
        }
        for &(x, y, w, h) in rects {
            for v in [x, y, w, h] {
                p.extend_from_slice(&v.to_le_bytes());
            }
        }
        p.extend_from_slice(&declared.to_le_bytes());
        p.extend_from_slice(data);
        p
    }

    #[test]
    fn parses_full_payload() {
        let p = payload(&[(1, 2, 3, 4)], &[9, 9], 2);
        let h = MotionHeader::parse(&p).unwrap();
        assert_eq!(h.session_id, 5);
        assert_eq!(h.rects, vec![Rect::new(1, 2, 3, 4)]);
        assert_eq!(h.data, &[9, 9]);
        assert!(h.is_same_size());
    }

    #[test]
    fn short_payloads_are_malformed() {
        assert!(MotionHeader::parse(&[0; 17]).is_err());
        let mut p = payload(&[(0, 0, 1, 1)], &[], 0);
        p.truncate(FIXED_HEADER_LEN + 6);
        assert!(matches!(MotionHeader::parse(&p), Err(GdiError::MalformedPayload(_))));
        let p = payload(&[], &[1], 10);
        assert!(matches!(MotionHeader::parse(&p), Err(GdiError::MalformedPayload(_))));
    }

    #[test]
    fn collision_evicts_by_default() {
        let mut s = MotionSessions::default();
        s.decoder_for(3, 8, 8, &NullFactory).unwrap();
        s.decoder_for(19, 8, 8, &NullFactory).unwrap();
        assert_eq!(s.owner(3), Some(19));
        assert_eq!(s.active(), 1);
    }

    #[test]
    fn collision_can_reject() {
        let mut s = MotionSessions::new(SlotCollisionPolicy::Reject);
        s.decoder_for(3, 8, 8, &NullFactory).unwrap();
        let err = s.decoder_for(19, 8, 8, &NullFactory).err();
        assert!(matches!(
            err,
            Some(GdiError::SessionCollision { slot: 3, owner: 3, session_id: 19 })
        ));
        assert_eq!(s.owner(19), Some(3));
    }

    #[test]
    fn delete_respects_owner() {
        let mut s = MotionSessions::default();
        s.decoder_for(4, 8, 8, &NullFactory).unwrap();
        s.delete(20);
        assert_eq!(s.active(), 1);
        s.delete(4);
        assert_eq!(s.active(), 0);
    }
}
