//! Integration tests for the replay driver: stream framing over split
//! reads, compressed recordings, and end-to-end replays.

use futures::StreamExt;
use rgdi_core::frame::{FrameAction, FrameMarker};
use rgdi_core::order::{BitmapKey, MemBltOrder, OpaqueRectOrder, SurfaceBitsCommand};
use rgdi_core::rop::rop3;
use rgdi_core::{Bounds, Point, Rect};
use rgdi_replay::config::ReplayConfig;
use rgdi_replay::present::{AckSummary, spawn_ack_collector};
use rgdi_replay::record::BitmapRecord;
use rgdi_replay::stream::{
    MAX_RECORD_SIZE, decompress_if_needed, encode_stream, is_compressed, read_stream, records,
};
use rgdi_replay::{ReplayError, Replayer, UpdateRecord};

// ── Helpers ──────────────────────────────────────────────────────

fn small_config() -> ReplayConfig {
    let mut cfg = ReplayConfig::default();
    cfg.session.width = 16;
    cfg.session.height = 16;
    cfg
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("rgdi-replay-{}-{name}", std::process::id()))
}

/// Opaque red fill, a 2x2 uncompressed update, an unknown codec, a blit
/// from a missing bitmap, then a good cache-and-blit.
fn session_records() -> Vec<UpdateRecord> {
    let key = BitmapKey {
        cache_id: 1,
        cache_index: 3,
    };
    let blit = MemBltOrder {
        bitmap: key,
        rect: Rect::new(8, 8, 2, 2),
        rop: rop3::SRCCOPY,
        src: Point::new(0, 0),
    };
    vec![
        UpdateRecord::FrameMarker(FrameMarker {
            frame_id: 5,
            action: FrameAction::Begin,
        }),
        UpdateRecord::OpaqueRect(OpaqueRectOrder {
            rect: Rect::new(0, 0, 4, 4),
            color: 0x0000_00FF,
        }),
        UpdateRecord::SurfaceBits(SurfaceBitsCommand {
            codec_id: 0,
            dest: Rect::new(0, 0, 2, 2),
            payload: [0x10, 0x20, 0x30, 0x00].repeat(4),
        }),
        UpdateRecord::SurfaceBits(SurfaceBitsCommand {
            codec_id: 9,
            dest: Rect::new(0, 0, 2, 2),
            payload: vec![],
        }),
        UpdateRecord::MemBlt(blit.clone()),
        UpdateRecord::CacheBitmap(BitmapRecord {
            key,
            width: 2,
            height: 2,
            bpp: 32,
            data: [0x00, 0xFF, 0x00, 0x00].repeat(4),
        }),
        UpdateRecord::MemBlt(blit),
    ]
}

// ── Framing ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_records_survive_split_reads() {
    let sent = session_records();
    let bytes = encode_stream(&sent, None).unwrap();

    let mock = tokio_test::io::Builder::new()
        .read(&bytes[..3])
        .read(&bytes[3..17])
        .read(&bytes[17..])
        .build();
    let received: Vec<UpdateRecord> = records(mock)
        .map(|r| r.unwrap())
        .collect()
        .await;
    assert_eq!(received, sent);
}

#[tokio::test]
async fn test_truncated_stream_is_reported() {
    let bytes = encode_stream(&[UpdateRecord::SetBounds(Some(Bounds::new(0, 0, 9, 9)))], None).unwrap();
    let cut = &bytes[..bytes.len() - 1];

    let mut stream = records(cut);
    match stream.next().await {
        Some(Err(ReplayError::Truncated(n))) => assert_eq!(n, cut.len()),
        other => panic!("expected truncation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversize_record_is_rejected() {
    let prefix = ((MAX_RECORD_SIZE + 1) as u32).to_le_bytes();
    let mut stream = records(&prefix[..]);
    assert!(matches!(
        stream.next().await,
        Some(Err(ReplayError::FrameTooLarge { .. }))
    ));
}

#[tokio::test]
async fn test_compressed_recording_from_disk() {
    let sent = session_records();
    let packed = encode_stream(&sent, Some(3)).unwrap();
    assert!(is_compressed(&packed));

    let path = temp_path("compressed.bin");
    tokio::fs::write(&path, &packed).await.unwrap();
    let data = read_stream(&path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    assert_eq!(data, encode_stream(&sent, None).unwrap());
    assert_eq!(decompress_if_needed(data.clone()).unwrap(), data);
}

// ── Replay ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_replay_counts_and_acks() {
    let bytes = encode_stream(&session_records(), None).unwrap();
    let mut replayer = Replayer::new(&small_config()).unwrap();
    let blank = replayer.fingerprint();

    let (mut acks, collector) = spawn_ack_collector();
    let stats = replayer
        .run(records(bytes.as_slice()), &mut acks)
        .await
        .unwrap()
        .clone();
    drop(acks);
    let acks = collector.await.unwrap();

    assert_eq!(stats.records, 7);
    assert_eq!(stats.orders, 3);
    assert_eq!(stats.surface_updates, 2);
    // Unknown codec and the blit before its bitmap arrived.
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.by_kind.get("mem-blt"), Some(&2));
    assert_eq!(
        acks,
        AckSummary {
            count: 2,
            last: Some(5),
            distinct: 1,
        }
    );
    assert_eq!(replayer.cached_bitmaps(), 1);
    assert_ne!(replayer.fingerprint(), blank);

    let primary = replayer.gdi().surfaces().primary();
    assert_eq!(primary.pixel(3, 3), Some(0x00FF_0000));
    assert_eq!(primary.pixel(0, 0), Some(0x0030_2010));
    assert_eq!(primary.pixel(9, 9), Some(0x0000_FF00));
}

#[tokio::test]
async fn test_replay_stops_on_stream_error() {
    let mut bytes = encode_stream(&session_records()[..2], None).unwrap();
    bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0x7F]);

    let mut replayer = Replayer::new(&small_config()).unwrap();
    let mut acks = Vec::new();
    let err = replayer
        .run(records(bytes.as_slice()), &mut acks)
        .await
        .unwrap_err();
    assert!(matches!(err, ReplayError::FrameTooLarge { .. }));
    assert_eq!(replayer.stats().records, 2);
}

#[tokio::test]
async fn test_dump_png_matches_primary() {
    let mut replayer = Replayer::new(&small_config()).unwrap();
    let mut acks = Vec::new();
    for record in &session_records() {
        let _ = replayer.apply(record, &mut acks);
    }
    assert_eq!(acks, vec![5, 5]);

    let path = temp_path("primary.png");
    replayer.dump_png(&path).unwrap();
    let img = image::open(&path).unwrap().to_rgba8();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(img.dimensions(), (16, 16));
    assert_eq!(img.get_pixel(3, 3).0, [0xFF, 0x00, 0x00, 0xFF]);
    assert_eq!(img.get_pixel(1, 1).0, [0x30, 0x20, 0x10, 0xFF]);
    assert_eq!(img.get_pixel(15, 15).0, [0x00, 0x00, 0x00, 0xFF]);
}
