use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use crate::config::DecoderConfig;

/// Byte source handed to an engine. The engine owns it for the rest of
/// the decode and closes it when the engine is dropped.
pub type Source = BufReader<File>;

/// Diagnostic sink for engine messages. Must not panic.
pub type MessageHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Geometry declared by a stream header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

impl ImageHeader {
    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Outcome of header parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderStatus {
    /// Frame header found; image data follows.
    Image(ImageHeader),
    /// Only table segments were present (an "abbreviated" stream).
    TablesOnly,
}

/// Output geometry fixed once decompression has started.
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────┐
/// │ Field           │ Meaning                                  │
/// ├─────────────────┼──────────────────────────────────────────┤
/// │ width, height   │ Output size after any scaling            │
/// │ components      │ Colour channels (1 grey, 3 RGB, 4 CMYK)  │
/// │ bytes_per_pixel │ Storage per pixel (2 for 16-bit grey)    │
/// └─────────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputInfo {
    pub width: u32,
    pub height: u32,
    pub components: u8,
    pub bytes_per_pixel: u8,
}

impl OutputInfo {
    /// Bytes in one scanline.
    #[must_use]
    pub fn row_stride(&self) -> usize {
        self.width as usize * usize::from(self.bytes_per_pixel)
    }

    #[must_use]
    pub fn bits_per_pixel(&self) -> u32 {
        u32::from(self.bytes_per_pixel) * 8
    }
}

/// Fatal conditions an engine can report.
///
/// The display strings follow the wording of the classic JPEG library
/// messages so logs read the same whichever engine produced them.
#[derive(Debug, thiserror::Error)]
pub enum EngineFault {
    #[error("improper call to JPEG library in state {state}")]
    BadState { state: &'static str },

    #[error("JPEG datastream contains no image")]
    NoImage,

    #[error("empty JPEG image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("maximum supported image dimension exceeded: {width}x{height} is over {limit} pixels")]
    ImageTooBig { width: u32, height: u32, limit: u64 },

    #[error("premature end of data segment")]
    PrematureEnd,

    #[error("error reading input: {0}")]
    Read(std::io::Error),

    #[error("unsupported JPEG feature: {0}")]
    Unsupported(String),

    #[error("corrupt JPEG data: {0}")]
    Corrupt(String),

    #[error("scanline buffer holds {got} bytes, {needed} required")]
    BufferTooSmall { needed: usize, got: usize },

    #[error("application transferred too few scanlines ({read} of {height})")]
    TooFewScanlines { read: u32, height: u32 },

    #[error("application transferred too many scanlines")]
    TooManyScanlines,

    #[error("engine reported scanline {actual} where {expected} was expected")]
    ScanlineMismatch { expected: u32, actual: u32 },
}

/// Proof that a fatal error was routed through [`ErrorContext::error_exit`].
///
/// Engines cannot build an `Abort` themselves. Every fatal path therefore
/// emits its diagnostic exactly once before the error starts travelling
/// back to the caller's recovery point.
#[must_use]
#[derive(Debug)]
pub struct Abort {
    message: String,
}

impl Abort {
    /// The formatted diagnostic that was emitted.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Per-decode error channel shared by the session and its engine.
///
/// One `ErrorContext` is created for each decode call and handed by
/// `&mut` to every engine operation. It is never shared between calls.
pub struct ErrorContext {
    hook: MessageHook,
    emitted: u32,
}

impl ErrorContext {
    #[must_use]
    pub fn new(hook: MessageHook) -> Self {
        Self { hook, emitted: 0 }
    }

    /// Context whose messages go to `tracing` at error level.
    #[must_use]
    pub fn with_tracing() -> Self {
        Self::new(tracing_hook())
    }

    /// Emit a diagnostic through the installed hook.
    pub fn output_message(&mut self, message: &str) {
        self.emitted += 1;
        (self.hook)(message);
    }

    /// Report a fatal fault: format it, emit it, and hand back the token
    /// the caller must propagate. Control never resumes inside the engine
    /// operation that raised it.
    pub fn error_exit(&mut self, fault: EngineFault) -> Abort {
        let message = fault.to_string();
        self.output_message(&message);
        Abort { message }
    }

    /// Messages emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl fmt::Debug for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorContext")
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

/// Default hook: engine diagnostics become `tracing` error events.
#[must_use]
pub fn tracing_hook() -> MessageHook {
    Arc::new(|message: &str| tracing::error!(target: "scanline::engine", "{message}"))
}

/// A stateful decompression engine.
///
/// Operations must be called in this order, once each unless noted:
///
/// ```text
///   attach_source → read_header → configure → start_decompress
///     → read_scanline (output_height times) → finish_decompress
/// ```
///
/// Calls out of order are reported as [`EngineFault::BadState`].
/// Every fatal condition is reported by returning the [`Abort`] produced
/// by `errors.error_exit(..)`.
///
/// There is no explicit destroy step. Dropping the engine releases its
/// state and the attached source, on success and failure alike.
/// [`DecodeSession`](crate::DecodeSession) enforces the order at the type
/// level; implementors still validate it.
pub trait CompressionEngine {
    /// Take ownership of the compressed byte stream.
    ///
    /// # Errors
    ///
    /// [`Abort`] if a source is already attached.
    fn attach_source(&mut self, source: Source, errors: &mut ErrorContext) -> Result<(), Abort>;

    /// Parse header segments up to the first frame.
    ///
    /// With `require_image` set, a stream holding only tables is a fatal
    /// [`EngineFault::NoImage`].
    ///
    /// # Errors
    ///
    /// [`Abort`] on malformed or truncated header data.
    fn read_header(
        &mut self,
        require_image: bool,
        errors: &mut ErrorContext,
    ) -> Result<HeaderStatus, Abort>;

    /// Apply decompression parameters between header and start.
    ///
    /// # Errors
    ///
    /// [`Abort`] if the engine rejects a parameter.
    fn configure(&mut self, config: &DecoderConfig, errors: &mut ErrorContext) -> Result<(), Abort> {
        let _ = (config, errors);
        Ok(())
    }

    /// Begin decompression and report the output geometry.
    ///
    /// # Errors
    ///
    /// [`Abort`] on corrupt or truncated data.
    fn start_decompress(&mut self, errors: &mut ErrorContext) -> Result<OutputInfo, Abort>;

    /// Decode the next scanline into `row`, returning the number of lines
    /// produced (0 or 1).
    ///
    /// # Errors
    ///
    /// [`Abort`] on corrupt data, a short buffer, or reading past the end.
    fn read_scanline(&mut self, row: &mut [u8], errors: &mut ErrorContext) -> Result<u32, Abort>;

    /// Count of scanlines handed out so far.
    fn output_scanline(&self) -> u32;

    /// Complete decompression after the last scanline.
    ///
    /// # Errors
    ///
    /// [`Abort`] if scanlines remain unread.
    fn finish_decompress(&mut self, errors: &mut ErrorContext) -> Result<(), Abort>;
}

/// Builds one fresh engine per decode call.
pub trait EngineFactory {
    type Engine: CompressionEngine;

    fn create(&self) -> Self::Engine;
}

impl<E, F> EngineFactory for F
where
    E: CompressionEngine,
    F: Fn() -> E,
{
    type Engine = E;

    fn create(&self) -> E {
        self()
    }
}
