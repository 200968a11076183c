//! Replay stream framing.
//!
//! A recording is a sequence of length-prefixed records:
//!
//! ```text
//! ┌───────────────┬─────────────────────────┐
//! │ len: u32 (LE) │ bincode(UpdateRecord)   │
//! └───────────────┴─────────────────────────┘
//! ```
//!
//! The whole file may additionally be zstd-compressed; this is detected
//! from the zstd frame magic.

use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, Encoder, FramedRead};

use crate::error::ReplayError;
use crate::record::UpdateRecord;

/// Size of the length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Largest record body accepted by default (16 MiB).
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Leading bytes of a zstd frame.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Length-prefixed bincode codec for [`UpdateRecord`].
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    max_record: usize,
}

impl RecordCodec {
    pub fn new(max_record: usize) -> Self {
        Self { max_record }
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(MAX_RECORD_SIZE)
    }
}

impl Decoder for RecordCodec {
    type Item = UpdateRecord;
    type Error = ReplayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX]);
        let len = u32::from_le_bytes(prefix) as usize;
        if len > self.max_record {
            return Err(ReplayError::FrameTooLarge {
                size: len,
                max: self.max_record,
            });
        }

        if src.len() < LENGTH_PREFIX + len {
            src.reserve(LENGTH_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        let body = src.split_to(len);
        let record = bincode::deserialize(&body)?;
        Ok(Some(record))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None => Err(ReplayError::Truncated(src.len())),
        }
    }
}

impl Encoder<UpdateRecord> for RecordCodec {
    type Error = ReplayError;

    fn encode(&mut self, item: UpdateRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = bincode::serialize(&item)?;
        if body.len() > self.max_record {
            return Err(ReplayError::FrameTooLarge {
                size: body.len(),
                max: self.max_record,
            });
        }
        dst.reserve(LENGTH_PREFIX + body.len());
        dst.put_u32_le(body.len() as u32);
        dst.extend_from_slice(&body);
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Whether `data` starts with a zstd frame.
pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(&ZSTD_MAGIC)
}

/// Inflate a zstd-compressed recording; plain recordings pass through.
pub fn decompress_if_needed(data: Vec<u8>) -> Result<Vec<u8>, ReplayError> {
    if !is_compressed(&data) {
        return Ok(data);
    }
    let inflated = zstd::decode_all(data.as_slice())?;
    Ok(inflated)
}

/// Read a whole recording from disk.
pub async fn read_stream(path: &Path) -> Result<Vec<u8>, ReplayError> {
    let data = tokio::fs::read(path).await?;
    decompress_if_needed(data)
}

/// Frame an async reader into records.
pub fn records<R: AsyncRead>(reader: R) -> FramedRead<R, RecordCodec> {
    FramedRead::new(reader, RecordCodec::default())
}

/// Serialise records into a recording, zstd-compressed at `level` if
/// given.
pub fn encode_stream(records: &[UpdateRecord], level: Option<i32>) -> Result<Vec<u8>, ReplayError> {
    let mut codec = RecordCodec::default();
    let mut buf = BytesMut::new();
    for record in records {
        codec.encode(record.clone(), &mut buf)?;
    }
    match level {
        Some(level) => Ok(zstd::encode_all(&buf[..], level)?),
        None => Ok(buf.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgdi_core::types::Bounds;

    #[test]
    fn partial_prefix_waits() {
        let mut codec = RecordCodec::default();
        let mut buf = BytesMut::from(&[1u8, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn oversize_prefix_rejected() {
        let mut codec = RecordCodec::new(8);
        let mut buf = BytesMut::new();
        buf.put_u32_le(9);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ReplayError::FrameTooLarge { size: 9, max: 8 }));
    }

    #[test]
    fn encode_then_decode_one_record() {
        let mut codec = RecordCodec::default();
        let record = UpdateRecord::SetBounds(Some(Bounds {
            left: 1,
            top: 2,
            right: 3,
            bottom: 4,
        }));
        let mut buf = BytesMut::new();
        codec.encode(record.clone(), &mut buf).unwrap();
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(record));
        assert!(buf.is_empty());
    }

    #[test]
    fn magic_detection() {
        let packed = zstd::encode_all(&b"hello"[..], 1).unwrap();
        assert!(is_compressed(&packed));
        assert!(!is_compressed(b"hello"));
        assert_eq!(decompress_if_needed(packed).unwrap(), b"hello");
    }
}
