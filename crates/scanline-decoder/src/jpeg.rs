//! [`CompressionEngine`] backed by the `jpeg-decoder` crate.
//!
//! `jpeg-decoder` parses headers incrementally (`read_info`) but decodes
//! the entire frame in a single `decode` call. `JpegEngine` runs that call
//! in `start_decompress` and then hands the frame out one scanline at a
//! time, so callers see the same row-streaming contract as any other
//! engine.
//!
//! For frames larger than 128x128, `decode` fans the per-component work
//! out to `jpeg-decoder`'s own worker threads. It returns only after every
//! worker has handed back its output. The workers exit once `decode`
//! drops their channels.

use std::io::{self, Read};
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use jpeg_decoder::{Decoder, Error as JpegError, PixelFormat};

use crate::config::DecoderConfig;
use crate::engine::{
    Abort, CompressionEngine, EngineFault, ErrorContext, HeaderStatus, ImageHeader, OutputInfo,
    Source,
};

/// End Of Image marker.
const EOI: u16 = 0xFFD9;

/// Source wrapper that remembers the last two bytes handed to the
/// decoder.
///
/// `jpeg-decoder` reports a stream that ends before any frame as a plain
/// format error. If its final read was the EOI marker, the stream was
/// well-formed and simply held no image.
struct Tracked {
    inner: Source,
    tail: Arc<AtomicU16>,
}

impl Read for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let tail = match buf[..n] {
            [] => return Ok(0),
            [last] => (self.tail.load(Ordering::Relaxed) << 8) | u16::from(last),
            [.., a, b] => u16::from_be_bytes([a, b]),
        };
        self.tail.store(tail, Ordering::Relaxed);
        Ok(n)
    }
}

enum Stage {
    Idle,
    Attached(Decoder<Tracked>),
    Header(Decoder<Tracked>),
    Decompressing { pixels: Vec<u8>, info: OutputInfo },
    Finished,
    /// A previous call failed; only dropping the engine is legal.
    Poisoned,
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Attached(_) => "source attached",
            Stage::Header(_) => "header read",
            Stage::Decompressing { .. } => "decompressing",
            Stage::Finished => "finished",
            Stage::Poisoned => "poisoned",
        }
    }
}

/// Baseline and progressive JPEG engine.
///
/// Output formats:
///
/// ```text
/// ┌─────────────┬────────────┬─────────────────┐
/// │ PixelFormat │ components │ bytes per pixel │
/// ├─────────────┼────────────┼─────────────────┤
/// │ L8          │ 1          │ 1               │
/// │ L16         │ 1          │ 2 (big-endian)  │
/// │ RGB24       │ 3          │ 3               │
/// │ CMYK32      │ 4          │ 4               │
/// └─────────────┴────────────┴─────────────────┘
/// ```
pub struct JpegEngine {
    stage: Stage,
    next: u32,
    tail: Arc<AtomicU16>,
}

impl Default for JpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            next: 0,
            tail: Arc::new(AtomicU16::new(0)),
        }
    }

    /// True if the last bytes the decoder consumed were an EOI marker.
    fn reached_eoi(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == EOI
    }

    /// Take the current stage, leaving `Poisoned` behind. Callers put a
    /// valid stage back on success.
    fn take(&mut self) -> Stage {
        mem::replace(&mut self.stage, Stage::Poisoned)
    }

    /// The stream held tables but no frame. Nothing is left to decode.
    fn tables_only(
        &mut self,
        require_image: bool,
        errors: &mut ErrorContext,
    ) -> Result<HeaderStatus, Abort> {
        if require_image {
            return Err(errors.error_exit(EngineFault::NoImage));
        }
        tracing::debug!("abbreviated stream: tables only");
        self.stage = Stage::Finished;
        Ok(HeaderStatus::TablesOnly)
    }

    fn bad_state(&self, errors: &mut ErrorContext) -> Abort {
        errors.error_exit(EngineFault::BadState {
            state: self.stage.name(),
        })
    }
}

fn fault_from(err: JpegError) -> EngineFault {
    match err {
        JpegError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => EngineFault::PrematureEnd,
        JpegError::Io(e) => EngineFault::Read(e),
        JpegError::Format(msg) => EngineFault::Corrupt(msg),
        JpegError::Unsupported(feature) => EngineFault::Unsupported(format!("{feature:?}")),
        other => EngineFault::Corrupt(other.to_string()),
    }
}

/// `(components, bytes_per_pixel)` for a decoder output format.
fn layout(format: PixelFormat) -> (u8, u8) {
    match format {
        PixelFormat::L8 => (1, 1),
        PixelFormat::L16 => (1, 2),
        PixelFormat::RGB24 => (3, 3),
        PixelFormat::CMYK32 => (4, 4),
    }
}

impl CompressionEngine for JpegEngine {
    fn attach_source(&mut self, source: Source, errors: &mut ErrorContext) -> Result<(), Abort> {
        if !matches!(self.stage, Stage::Idle) {
            return Err(self.bad_state(errors));
        }
        self.tail.store(0, Ordering::Relaxed);
        self.stage = Stage::Attached(Decoder::new(Tracked {
            inner: source,
            tail: Arc::clone(&self.tail),
        }));
        Ok(())
    }

    fn read_header(
        &mut self,
        require_image: bool,
        errors: &mut ErrorContext,
    ) -> Result<HeaderStatus, Abort> {
        let mut decoder = match self.take() {
            Stage::Attached(decoder) => decoder,
            other => {
                self.stage = other;
                return Err(self.bad_state(errors));
            }
        };

        if let Err(err) = decoder.read_info() {
            if decoder.info().is_some() || !self.reached_eoi() {
                return Err(errors.error_exit(fault_from(err)));
            }
            // Clean EOI with no frame: an abbreviated tables-only stream.
            return self.tables_only(require_image, errors);
        }

        let Some(info) = decoder.info() else {
            return self.tables_only(require_image, errors);
        };

        let (components, _) = layout(info.pixel_format);
        self.stage = Stage::Header(decoder);
        Ok(HeaderStatus::Image(ImageHeader {
            width: u32::from(info.width),
            height: u32::from(info.height),
            components,
        }))
    }

    fn configure(&mut self, config: &DecoderConfig, errors: &mut ErrorContext) -> Result<(), Abort> {
        let Stage::Header(decoder) = &mut self.stage else {
            return Err(self.bad_state(errors));
        };
        if let Some((width, height)) = config.scale_to {
            let (scaled_w, scaled_h) = decoder
                .scale(width, height)
                .map_err(|e| errors.error_exit(fault_from(e)))?;
            tracing::debug!(
                requested_width = width,
                requested_height = height,
                scaled_w,
                scaled_h,
                "output scaled"
            );
        }
        Ok(())
    }

    fn start_decompress(&mut self, errors: &mut ErrorContext) -> Result<OutputInfo, Abort> {
        let mut decoder = match self.take() {
            Stage::Header(decoder) => decoder,
            other => {
                self.stage = other;
                return Err(self.bad_state(errors));
            }
        };

        let pixels = decoder
            .decode()
            .map_err(|e| errors.error_exit(fault_from(e)))?;
        let Some(meta) = decoder.info() else {
            return Err(errors.error_exit(EngineFault::NoImage));
        };

        let (components, bytes_per_pixel) = layout(meta.pixel_format);
        let info = OutputInfo {
            width: u32::from(meta.width),
            height: u32::from(meta.height),
            components,
            bytes_per_pixel,
        };
        let expected = info.row_stride() * info.height as usize;
        if pixels.len() < expected {
            return Err(errors.error_exit(EngineFault::Corrupt(format!(
                "decoded frame holds {} bytes, {expected} expected",
                pixels.len()
            ))));
        }

        self.next = 0;
        self.stage = Stage::Decompressing { pixels, info };
        Ok(info)
    }

    fn read_scanline(&mut self, row: &mut [u8], errors: &mut ErrorContext) -> Result<u32, Abort> {
        let Stage::Decompressing { pixels, info } = &self.stage else {
            return Err(self.bad_state(errors));
        };
        if self.next >= info.height {
            return Err(errors.error_exit(EngineFault::TooManyScanlines));
        }
        let stride = info.row_stride();
        if row.len() < stride {
            return Err(errors.error_exit(EngineFault::BufferTooSmall {
                needed: stride,
                got: row.len(),
            }));
        }

        let start = self.next as usize * stride;
        row[..stride].copy_from_slice(&pixels[start..start + stride]);
        self.next += 1;
        Ok(1)
    }

    fn output_scanline(&self) -> u32 {
        self.next
    }

    fn finish_decompress(&mut self, errors: &mut ErrorContext) -> Result<(), Abort> {
        let height = match &self.stage {
            Stage::Decompressing { info, .. } => info.height,
            _ => return Err(self.bad_state(errors)),
        };
        if self.next < height {
            return Err(errors.error_exit(EngineFault::TooFewScanlines {
                read: self.next,
                height,
            }));
        }
        self.stage = Stage::Finished;
        Ok(())
    }
}
