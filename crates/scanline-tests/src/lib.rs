//! Shared fixtures for the scanline integration tests and benchmarks.
//!
//! Nothing here is checked in as binary data. JPEG fixtures are encoded
//! on the fly with the `image` crate and written into a temporary
//! directory that lives as long as the returned [`Fixture`].

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::ColorType;
use image::codecs::jpeg::JpegEncoder;
use scanline_decoder::{
    Abort, CompressionEngine, DecoderConfig, ErrorContext, HeaderStatus, JpegEngine, OutputInfo,
    Source,
};
use scanline_pixels::{PixelSink, SinkError};
use tempfile::TempDir;

// ── Pixel generators ──────────────────────────────────────────────────────────

/// Deterministic pseudo-random RGB pixels (xorshift32).
///
/// Noise compresses badly, which keeps the entropy-coded segment large
/// relative to the header. Truncation tests rely on that.
#[must_use]
pub fn noise_rgb(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..width * height * 3)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect()
}

/// Smooth RGB gradient: red along x, green along y, constant blue.
#[must_use]
pub fn gradient_rgb(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push(scale(x, width));
            pixels.push(scale(y, height));
            pixels.push(128);
        }
    }
    pixels
}

fn scale(v: u32, extent: u32) -> u8 {
    if extent <= 1 {
        return 0;
    }
    u8::try_from(v * 255 / (extent - 1)).unwrap_or(u8::MAX)
}

// ── JPEG encoding ─────────────────────────────────────────────────────────────

/// Encode raw pixels as a baseline JPEG.
///
/// # Panics
///
/// If the encoder rejects the input (wrong length for the colour type).
#[must_use]
pub fn encode_jpeg(pixels: &[u8], width: u32, height: u32, color: ColorType, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(pixels, width, height, color)
        .unwrap_or_else(|e| panic!("failed to encode {width}x{height} fixture: {e}"));
    out
}

#[must_use]
pub fn rgb_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_jpeg(&gradient_rgb(width, height), width, height, ColorType::Rgb8, 90)
}

#[must_use]
pub fn grey_jpeg(width: u32, height: u32) -> Vec<u8> {
    let grey: Vec<u8> = gradient_rgb(width, height).chunks(3).map(|p| p[0]).collect();
    encode_jpeg(&grey, width, height, ColorType::L8, 90)
}

#[must_use]
pub fn noisy_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_jpeg(&noise_rgb(width, height, 0x5EED), width, height, ColorType::Rgb8, 95)
}

/// SOI, one quantisation table, EOI. Valid markers, no frame, no scan.
#[must_use]
pub fn tables_only_jpeg() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43, 0x00];
    bytes.extend(std::iter::repeat_n(16u8, 64));
    bytes.extend([0xFF, 0xD9]);
    bytes
}

/// Decode `bytes` directly with `jpeg-decoder`, bypassing the crate under
/// test. Returns `(pixels, width, height)`.
///
/// # Panics
///
/// If the reference decoder fails.
#[must_use]
pub fn reference_decode(bytes: &[u8]) -> (Vec<u8>, u32, u32) {
    let mut decoder = jpeg_decoder::Decoder::new(bytes);
    let pixels = decoder
        .decode()
        .unwrap_or_else(|e| panic!("reference decode failed: {e}"));
    let info = decoder.info().expect("reference decoder has no info");
    (pixels, u32::from(info.width), u32::from(info.height))
}

// ── Files on disk ─────────────────────────────────────────────────────────────

/// A file inside a temporary directory, removed on drop.
pub struct Fixture {
    _dir: TempDir,
    path: PathBuf,
}

impl Fixture {
    /// Write `bytes` to `<tmp>/<name>`.
    ///
    /// # Panics
    ///
    /// If the temporary directory or file cannot be created.
    #[must_use]
    pub fn write(name: &str, bytes: &[u8]) -> Self {
        let dir = tempfile::tempdir().expect("failed to create fixture dir");
        let path = dir.path().join(name);
        fs::write(&path, bytes)
            .unwrap_or_else(|e| panic!("failed to write fixture {}: {e}", path.display()));
        Self { _dir: dir, path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ── Recording sink ────────────────────────────────────────────────────────────

/// One call observed by a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkCall {
    Open { width: u32, height: u32 },
    FillRow {
        row: u32,
        bytes: Vec<u8>,
        stride: usize,
        bits_per_pixel: u32,
    },
}

/// Sink that accepts everything and logs each call in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    /// Every committed row's bytes, concatenated in call order.
    #[must_use]
    pub fn pixels(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::FillRow { bytes, .. } => Some(bytes.as_slice()),
                SinkCall::Open { .. } => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Call log without pixel bytes, one call per line.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.calls.iter().fold(String::new(), |mut out, call| {
            match call {
                SinkCall::Open { width, height } => {
                    let _ = writeln!(out, "open({width}, {height})");
                }
                SinkCall::FillRow {
                    row,
                    bytes,
                    stride,
                    bits_per_pixel,
                } => {
                    let _ = writeln!(
                        out,
                        "fill_row({row}, {} bytes, stride={stride}, bpp={bits_per_pixel})",
                        bytes.len()
                    );
                }
            }
            out
        })
    }
}

impl PixelSink for RecordingSink {
    fn open(&mut self, width: u32, height: u32) -> Result<(), SinkError> {
        self.calls.push(SinkCall::Open { width, height });
        Ok(())
    }

    fn fill_row(
        &mut self,
        row: u32,
        raw: &[u8],
        stride: usize,
        bits_per_pixel: u32,
    ) -> Result<(), SinkError> {
        self.calls.push(SinkCall::FillRow {
            row,
            bytes: raw[..stride].to_vec(),
            stride,
            bits_per_pixel,
        });
        Ok(())
    }
}

// ── Counting engine ───────────────────────────────────────────────────────────

/// Engine lifecycle counters shared between a factory and a test.
#[derive(Debug, Default)]
pub struct EngineCounters {
    pub created: AtomicUsize,
    pub dropped: AtomicUsize,
}

impl EngineCounters {
    /// Engines currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.created.load(Ordering::SeqCst) - self.dropped.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

/// Delegates to an inner engine and records creation and drop.
pub struct CountingEngine<E> {
    inner: E,
    counters: Arc<EngineCounters>,
}

impl<E> CountingEngine<E> {
    pub fn new(inner: E, counters: Arc<EngineCounters>) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Self { inner, counters }
    }
}

impl<E> Drop for CountingEngine<E> {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl<E: CompressionEngine> CompressionEngine for CountingEngine<E> {
    fn attach_source(&mut self, source: Source, errors: &mut ErrorContext) -> Result<(), Abort> {
        self.inner.attach_source(source, errors)
    }

    fn read_header(
        &mut self,
        require_image: bool,
        errors: &mut ErrorContext,
    ) -> Result<HeaderStatus, Abort> {
        self.inner.read_header(require_image, errors)
    }

    fn configure(&mut self, config: &DecoderConfig, errors: &mut ErrorContext) -> Result<(), Abort> {
        self.inner.configure(config, errors)
    }

    fn start_decompress(&mut self, errors: &mut ErrorContext) -> Result<OutputInfo, Abort> {
        self.inner.start_decompress(errors)
    }

    fn read_scanline(&mut self, row: &mut [u8], errors: &mut ErrorContext) -> Result<u32, Abort> {
        self.inner.read_scanline(row, errors)
    }

    fn output_scanline(&self) -> u32 {
        self.inner.output_scanline()
    }

    fn finish_decompress(&mut self, errors: &mut ErrorContext) -> Result<(), Abort> {
        self.inner.finish_decompress(errors)
    }
}

/// Factory producing counted JPEG engines.
pub fn counting_jpeg(counters: &Arc<EngineCounters>) -> impl Fn() -> CountingEngine<JpegEngine> + Sync {
    let counters = Arc::clone(counters);
    move || CountingEngine::new(JpegEngine::new(), Arc::clone(&counters))
}
