//! End-to-end decodes of real JPEG files.
//!
//! Every fixture is encoded with the `image` crate, written to a temp
//! file, and decoded through [`StreamDecoder`]. Pixel content is checked
//! against a direct `jpeg-decoder` decode of the same bytes, so the tests
//! verify row addressing and ordering rather than codec accuracy.

use std::sync::Arc;

use scanline_decoder::{DecoderConfig, ImageDecoder, StreamDecoder};
use scanline_pixels::PixelBuffer;
use scanline_tests::{
    EngineCounters, Fixture, RecordingSink, SinkCall, counting_jpeg, grey_jpeg, reference_decode,
    rgb_jpeg,
};

// ── Row streaming ─────────────────────────────────────────────────────────────

#[test]
fn two_by_two_rgb_commits_two_rows_in_order() {
    let bytes = rgb_jpeg(2, 2);
    let fixture = Fixture::write("2x2.jpg", &bytes);
    let (reference, _, _) = reference_decode(&bytes);
    let mut sink = RecordingSink::default();

    let info = StreamDecoder::new()
        .decode_path(fixture.path(), &mut sink)
        .expect("2x2 fixture should decode");

    assert_eq!((info.width, info.height, info.components), (2, 2, 3));
    assert_eq!(
        sink.calls,
        vec![
            SinkCall::Open {
                width: 2,
                height: 2
            },
            SinkCall::FillRow {
                row: 0,
                bytes: reference[0..6].to_vec(),
                stride: 6,
                bits_per_pixel: 24,
            },
            SinkCall::FillRow {
                row: 1,
                bytes: reference[6..12].to_vec(),
                stride: 6,
                bits_per_pixel: 24,
            },
        ]
    );
}

#[test]
fn every_row_index_appears_once_in_increasing_order() {
    let bytes = rgb_jpeg(17, 23);
    let fixture = Fixture::write("odd.jpg", &bytes);
    let mut sink = RecordingSink::default();

    StreamDecoder::new()
        .decode_path(fixture.path(), &mut sink)
        .unwrap();

    let rows: Vec<u32> = sink
        .calls
        .iter()
        .filter_map(|c| match c {
            SinkCall::FillRow { row, .. } => Some(*row),
            SinkCall::Open { .. } => None,
        })
        .collect();
    assert_eq!(rows, (0..23).collect::<Vec<_>>());
    assert_eq!(sink.calls[0], SinkCall::Open { width: 17, height: 23 });
}

#[test]
fn row_bytes_match_reference_decode() {
    let bytes = rgb_jpeg(40, 30);
    let fixture = Fixture::write("gradient.jpg", &bytes);
    let (reference, width, height) = reference_decode(&bytes);
    let mut sink = RecordingSink::default();

    StreamDecoder::new()
        .decode_path(fixture.path(), &mut sink)
        .unwrap();

    assert_eq!((width, height), (40, 30));
    assert_eq!(sink.pixels(), reference);
}

#[test]
fn greyscale_is_eight_bits_per_pixel() {
    let bytes = grey_jpeg(9, 4);
    let fixture = Fixture::write("grey.jpg", &bytes);
    let mut sink = RecordingSink::default();

    let info = StreamDecoder::new()
        .decode_path(fixture.path(), &mut sink)
        .unwrap();

    assert_eq!(info.components, 1);
    assert_eq!(info.bits_per_pixel(), 8);
    assert!(sink.calls.iter().skip(1).all(|c| matches!(
        c,
        SinkCall::FillRow {
            stride: 9,
            bits_per_pixel: 8,
            ..
        }
    )));
}

// ── PixelBuffer target ────────────────────────────────────────────────────────

#[test]
fn pixel_buffer_is_complete_and_addressable() {
    let bytes = rgb_jpeg(12, 8);
    let fixture = Fixture::write("buffer.jpg", &bytes);
    let (reference, _, _) = reference_decode(&bytes);
    let mut pixels = PixelBuffer::new();

    StreamDecoder::new()
        .decode_path(fixture.path(), &mut pixels)
        .unwrap();

    assert!(pixels.is_complete());
    assert_eq!((pixels.width(), pixels.height()), (12, 8));
    assert_eq!(pixels.bits_per_pixel(), Some(24));
    assert_eq!(pixels.as_bytes(), reference.as_slice());

    let offset = (5 * 12 + 7) * 3;
    assert_eq!(
        pixels.pixel(7, 5),
        Some(&reference[offset..offset + 3])
    );
}

#[test]
fn decoding_twice_gives_identical_buffers() {
    let bytes = rgb_jpeg(33, 21);
    let fixture = Fixture::write("twice.jpg", &bytes);
    let decoder = StreamDecoder::new();

    let mut first = PixelBuffer::new();
    let mut second = PixelBuffer::new();
    decoder.decode_path(fixture.path(), &mut first).unwrap();
    decoder.decode_path(fixture.path(), &mut second).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        blake3::hash(first.as_bytes()),
        blake3::hash(second.as_bytes())
    );
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[test]
fn scale_to_shrinks_output() {
    let bytes = rgb_jpeg(64, 64);
    let fixture = Fixture::write("scale.jpg", &bytes);
    let mut pixels = PixelBuffer::new();

    let info = StreamDecoder::new()
        .with_config(DecoderConfig::default().with_scale_to(16, 16))
        .decode_path(fixture.path(), &mut pixels)
        .unwrap();

    assert_eq!((info.width, info.height), (16, 16));
    assert_eq!((pixels.width(), pixels.height()), (16, 16));
    assert!(pixels.is_complete());
}

#[test]
fn scale_to_is_reached_in_one_dimension_only() {
    let bytes = rgb_jpeg(64, 32);
    let fixture = Fixture::write("wide.jpg", &bytes);
    let mut pixels = PixelBuffer::new();

    let info = StreamDecoder::new()
        .with_config(DecoderConfig::default().with_scale_to(16, 16))
        .decode_path(fixture.path(), &mut pixels)
        .unwrap();

    assert_eq!((info.width, info.height), (16, 8));
    assert!(pixels.is_complete());
}

#[test]
fn scale_to_never_enlarges() {
    let bytes = rgb_jpeg(12, 10);
    let fixture = Fixture::write("small.jpg", &bytes);

    let info = StreamDecoder::new()
        .with_config(DecoderConfig::default().with_scale_to(100, 100))
        .decode_path(fixture.path(), &mut PixelBuffer::new())
        .unwrap();

    assert_eq!((info.width, info.height), (12, 10));
}

#[test]
fn unlimited_config_still_decodes() {
    let bytes = rgb_jpeg(8, 8);
    let fixture = Fixture::write("unlimited.jpg", &bytes);

    StreamDecoder::new()
        .with_config(DecoderConfig::unlimited())
        .decode_path(fixture.path(), &mut PixelBuffer::new())
        .unwrap();
}

// ── Concurrency and lifecycle ─────────────────────────────────────────────────

#[test]
fn concurrent_decodes_use_independent_engines() {
    let bytes = rgb_jpeg(24, 24);
    let fixture = Fixture::write("shared.jpg", &bytes);
    let (reference, _, _) = reference_decode(&bytes);
    let counters = Arc::new(EngineCounters::default());
    let decoder = StreamDecoder::with_engine(counting_jpeg(&counters));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let mut pixels = PixelBuffer::new();
                decoder.decode_path(fixture.path(), &mut pixels).unwrap();
                assert_eq!(pixels.as_bytes(), reference.as_slice());
            });
        }
    });

    assert_eq!(counters.created(), 4);
    assert_eq!(counters.live(), 0);
}

#[test]
fn successful_decode_releases_its_engine() {
    let bytes = rgb_jpeg(4, 4);
    let fixture = Fixture::write("ok.jpg", &bytes);
    let counters = Arc::new(EngineCounters::default());
    let decoder = StreamDecoder::with_engine(counting_jpeg(&counters));

    decoder
        .decode_path(fixture.path(), &mut PixelBuffer::new())
        .unwrap();

    assert_eq!(counters.created(), 1);
    assert_eq!(counters.live(), 0);
}
