use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use scanline_pixels::{PixelSink, SinkError};

use crate::config::DecoderConfig;
use crate::engine::{Abort, EngineFactory, ErrorContext, MessageHook, OutputInfo, tracing_hook};
use crate::error::DecodeError;
use crate::jpeg::JpegEngine;
use crate::session::{Created, DecodeSession};

/// Uniform entry contract shared by every codec.
///
/// A format-dispatch layer sniffs the input, picks one `ImageDecoder`,
/// and calls either entry point. The trait is object safe.
pub trait ImageDecoder {
    /// Short codec name used in diagnostics (e.g. `"JPEG"`).
    fn name(&self) -> &'static str;

    /// Decode the file at `path` into `sink`.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`]. After an error the sink must be discarded.
    fn decode_path(&self, path: &Path, sink: &mut dyn PixelSink) -> Result<OutputInfo, DecodeError>;

    /// Decode an in-memory compressed image into `sink`.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`]. Codecs that only read files return
    /// [`DecodeError::UnsupportedSource`] unconditionally.
    fn decode_buffer(&self, bytes: &[u8], sink: &mut dyn PixelSink)
    -> Result<OutputInfo, DecodeError>;
}

/// Why [`StreamDecoder::drive`] stopped early.
enum Interrupt {
    Engine(Abort),
    Sink(SinkError),
}

impl From<Abort> for Interrupt {
    fn from(abort: Abort) -> Self {
        Interrupt::Engine(abort)
    }
}

impl From<SinkError> for Interrupt {
    fn from(err: SinkError) -> Self {
        Interrupt::Sink(err)
    }
}

/// Row-streaming image decoder.
///
/// Each [`decode_path`](ImageDecoder::decode_path) call runs one complete
/// session:
///
/// ```text
///   open file ──▶ create engine ──▶ attach ──▶ header ──▶ start
///                                                         │
///        sink.open(width, height) ◀───────────────────────┘
///        loop { engine → row buffer → sink.fill_row(i, …) }
///   finish ──▶ drop engine ──▶ close file
/// ```
///
/// A fresh engine and error context are created per call and dropped
/// before it returns, on success and failure alike. Nothing persists
/// between calls, so one `StreamDecoder` may be shared by many threads
/// as long as its factory is `Sync`.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use scanline_decoder::{ImageDecoder, StreamDecoder};
/// use scanline_pixels::PixelBuffer;
///
/// let mut pixels = PixelBuffer::new();
/// let info = StreamDecoder::new()
///     .decode_path(Path::new("photo.jpg"), &mut pixels)
///     .unwrap();
/// assert_eq!(pixels.width(), info.width);
/// ```
pub struct StreamDecoder<F = fn() -> JpegEngine> {
    factory: F,
    config: DecoderConfig,
    hook: MessageHook,
    name: &'static str,
}

impl StreamDecoder {
    /// A JPEG decoder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(JpegEngine::new as fn() -> JpegEngine).named("JPEG")
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: EngineFactory> StreamDecoder<F> {
    /// A decoder that builds its engines with `factory`.
    pub fn with_engine(factory: F) -> Self {
        Self {
            factory,
            config: DecoderConfig::default(),
            hook: tracing_hook(),
            name: "stream",
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Route engine diagnostics to `hook` instead of `tracing`.
    #[must_use]
    pub fn on_message(mut self, hook: MessageHook) -> Self {
        self.hook = hook;
        self
    }

    /// Codec name reported by [`ImageDecoder::name`] and in
    /// [`DecodeError::UnsupportedSource`].
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Run a session to completion. Every `?` in here unwinds to the
    /// single recovery point in `decode_path`; dropping `session` on the
    /// way out releases the engine and its source.
    fn drive(
        &self,
        session: DecodeSession<F::Engine, Created>,
        source: BufReader<File>,
        sink: &mut dyn PixelSink,
    ) -> Result<OutputInfo, Interrupt> {
        let mut session = session
            .attach_source(source)?
            .read_header()?
            .start(&self.config)?;

        let info = session.info();
        sink.open(info.width, info.height)?;

        let stride = info.row_stride();
        let bits_per_pixel = info.bits_per_pixel();
        let mut row = vec![0u8; stride];
        while let Some(index) = session.read_scanline(&mut row)? {
            sink.fill_row(index, &row, stride, bits_per_pixel)?;
        }

        session.finish()?;
        Ok(info)
    }
}

impl<F: EngineFactory> ImageDecoder for StreamDecoder<F> {
    fn name(&self) -> &'static str {
        self.name
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
    fn decode_path(&self, path: &Path, sink: &mut dyn PixelSink) -> Result<OutputInfo, DecodeError> {
        let file = File::open(path).map_err(|source| DecodeError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let session = DecodeSession::new(self.factory.create(), ErrorContext::new(self.hook.clone()));

        // Recovery point: every engine abort and sink refusal lands here,
        // after the session has already been torn down.
        match self.drive(session, BufReader::new(file), sink) {
            Ok(info) => {
                tracing::debug!(
                    width = info.width,
                    height = info.height,
                    bits_per_pixel = info.bits_per_pixel(),
                    "decode complete"
                );
                Ok(info)
            }
            Err(Interrupt::Engine(abort)) => Err(DecodeError::DecodeFailed {
                message: abort.into_message(),
            }),
            Err(Interrupt::Sink(err)) => {
                tracing::warn!(error = %err, "pixel sink rejected decoded data");
                Err(DecodeError::Sink(err))
            }
        }
    }

    fn decode_buffer(
        &self,
        bytes: &[u8],
        _sink: &mut dyn PixelSink,
    ) -> Result<OutputInfo, DecodeError> {
        tracing::debug!(len = bytes.len(), codec = self.name, "in-memory decode refused");
        Err(DecodeError::UnsupportedSource { codec: self.name })
    }
}
