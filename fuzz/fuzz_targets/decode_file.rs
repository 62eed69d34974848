#![no_main]

use std::io::Write;
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use scanline_decoder::{DecoderConfig, ImageDecoder, StreamDecoder};
use scanline_pixels::PixelBuffer;

// Fuzz target: full decode of an arbitrary file.
//
// Writes the input to a temp file and runs `decode_path` into a
// `PixelBuffer`. Catches bugs in:
// - Header parsing and the tables-only / empty-image checks
// - Pixel limit enforcement (kept small so bombs stay cheap)
// - Scanline hand-out and the cursor cross-check
// - Sink validation of stride and depth
//
// On success the buffer must be complete.
fuzz_target!(|data: &[u8]| {
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }

    let decoder = StreamDecoder::new()
        .with_config(DecoderConfig::default().with_max_pixels(1 << 20))
        .on_message(Arc::new(|_: &str| {}));

    let mut pixels = PixelBuffer::new();
    if let Ok(info) = decoder.decode_path(file.path(), &mut pixels) {
        assert!(pixels.is_complete());
        assert_eq!(pixels.width(), info.width);
        assert_eq!(pixels.height(), info.height);
    }
});
