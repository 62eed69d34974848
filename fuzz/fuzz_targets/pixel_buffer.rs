#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scanline_pixels::{PixelBuffer, PixelSink};

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Open {
        width: u8,
        height: u8,
    },
    FillRow {
        row: u16,
        raw: Vec<u8>,
        stride: u16,
        bits_per_pixel: u8,
    },
    Read {
        x: u16,
        y: u16,
    },
}

// Fuzz target: arbitrary sequences of sink calls.
//
// Exercises `PixelBuffer` validation with mismatched strides, depths,
// short rows and out-of-range indices. Accepted rows must read back
// byte-for-byte; nothing may panic.
fuzz_target!(|ops: Vec<FuzzOp>| {
    let mut buffer = PixelBuffer::new();
    for op in ops {
        match op {
            FuzzOp::Open { width, height } => {
                let _ = buffer.open(u32::from(width), u32::from(height));
            }
            FuzzOp::FillRow {
                row,
                raw,
                stride,
                bits_per_pixel,
            } => {
                let stride = usize::from(stride);
                let row = u32::from(row);
                if buffer
                    .fill_row(row, &raw, stride, u32::from(bits_per_pixel))
                    .is_ok()
                {
                    assert_eq!(buffer.row(row), Some(&raw[..stride]));
                }
            }
            FuzzOp::Read { x, y } => {
                let _ = buffer.pixel(u32::from(x), u32::from(y));
                let _ = buffer.rgba(u32::from(x), u32::from(y));
            }
        }
    }
});
