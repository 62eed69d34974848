use crate::config::DecoderConfig;
use crate::engine::{
    Abort, CompressionEngine, EngineFault, ErrorContext, HeaderStatus, ImageHeader, OutputInfo,
    Source,
};

/// One decode, from engine creation to teardown.
///
/// The session is a typestate machine over the engine's call order:
///
/// ```text
///   Created ──attach_source──▶ Attached ──read_header──▶ HeaderRead
///                                                          │ start
///                                                          ▼
///                    (dropped) ◀──finish── Decompressing ◀─┘
///                                            │  ▲
///                                            └──┘ read_scanline
/// ```
///
/// Each state exposes only the operations that are legal in it, so an
/// out-of-order engine call does not compile. Transitions consume the
/// session. If an operation fails, the session (and with it the engine
/// and its source) is dropped before the `Abort` reaches the caller.
/// Engine state is released exactly once on every path without any
/// cleanup code at the call site.
pub struct DecodeSession<E, S> {
    engine: E,
    errors: ErrorContext,
    state: S,
}

/// Engine created, nothing attached yet.
pub struct Created;

/// Source attached, header not yet parsed.
pub struct Attached;

/// Header parsed and validated.
pub struct HeaderRead {
    header: ImageHeader,
}

/// Decompression running; `cursor` is the next row to produce.
pub struct Decompressing {
    info: OutputInfo,
    cursor: u32,
}

impl<E, S> DecodeSession<E, S> {
    fn advance<T>(self, state: T) -> DecodeSession<E, T> {
        DecodeSession {
            engine: self.engine,
            errors: self.errors,
            state,
        }
    }

    /// Raise `fault` through the session's error channel.
    fn fail(&mut self, fault: EngineFault) -> Abort {
        self.errors.error_exit(fault)
    }

    /// Diagnostics emitted so far in this session.
    pub fn messages_emitted(&self) -> u32 {
        self.errors.emitted()
    }
}

impl<E: CompressionEngine> DecodeSession<E, Created> {
    pub fn new(engine: E, errors: ErrorContext) -> Self {
        Self {
            engine,
            errors,
            state: Created,
        }
    }

    /// Hand the opened stream to the engine.
    ///
    /// # Errors
    ///
    /// Propagates the engine's [`Abort`].
    pub fn attach_source(mut self, source: Source) -> Result<DecodeSession<E, Attached>, Abort> {
        self.engine.attach_source(source, &mut self.errors)?;
        tracing::trace!("source attached");
        Ok(self.advance(Attached))
    }
}

impl<E: CompressionEngine> DecodeSession<E, Attached> {
    /// Parse the header. Image data is required: a tables-only stream
    /// or one declaring a zero dimension is fatal.
    ///
    /// # Errors
    ///
    /// [`Abort`] on a malformed, tables-only, or empty header.
    pub fn read_header(mut self) -> Result<DecodeSession<E, HeaderRead>, Abort> {
        let header = match self.engine.read_header(true, &mut self.errors)? {
            HeaderStatus::Image(header) => header,
            HeaderStatus::TablesOnly => return Err(self.fail(EngineFault::NoImage)),
        };
        if header.width == 0 || header.height == 0 {
            return Err(self.fail(EngineFault::EmptyImage {
                width: header.width,
                height: header.height,
            }));
        }
        tracing::debug!(
            width = header.width,
            height = header.height,
            components = header.components,
            "header parsed"
        );
        Ok(self.advance(HeaderRead { header }))
    }
}

impl<E: CompressionEngine> DecodeSession<E, HeaderRead> {
    pub fn header(&self) -> ImageHeader {
        self.state.header
    }

    /// Enforce the pixel limit, apply `config`, and start decompression.
    ///
    /// # Errors
    ///
    /// [`Abort`] if the image exceeds `config.max_pixels`, the engine
    /// rejects the configuration, or decompression cannot start.
    pub fn start(mut self, config: &DecoderConfig) -> Result<DecodeSession<E, Decompressing>, Abort> {
        let header = self.state.header;
        if let Some(limit) = config.max_pixels
            && header.pixel_count() > limit
        {
            return Err(self.fail(EngineFault::ImageTooBig {
                width: header.width,
                height: header.height,
                limit,
            }));
        }

        self.engine.configure(config, &mut self.errors)?;
        let info = self.engine.start_decompress(&mut self.errors)?;
        if info.width == 0 || info.height == 0 || info.bytes_per_pixel == 0 {
            return Err(self.fail(EngineFault::EmptyImage {
                width: info.width,
                height: info.height,
            }));
        }
        tracing::debug!(
            width = info.width,
            height = info.height,
            bits_per_pixel = info.bits_per_pixel(),
            "decompression started"
        );
        Ok(self.advance(Decompressing { info, cursor: 0 }))
    }
}

impl<E: CompressionEngine> DecodeSession<E, Decompressing> {
    pub fn info(&self) -> OutputInfo {
        self.state.info
    }

    /// Index of the next row the engine will produce.
    pub fn cursor(&self) -> u32 {
        self.state.cursor
    }

    /// Decode one scanline into `row`.
    ///
    /// Returns `Some(i)` where `i` is the index of the row just written
    /// into `row`, or `None` once all `output_height` rows have been
    /// produced. The index is cross-checked against the engine's own
    /// scanline counter, so a skipped or repeated row is caught here
    /// rather than committed to the wrong place in the sink.
    ///
    /// # Errors
    ///
    /// [`Abort`] if the engine fails, produces no line, or its counter
    /// disagrees with the session cursor.
    pub fn read_scanline(&mut self, row: &mut [u8]) -> Result<Option<u32>, Abort> {
        let index = self.state.cursor;
        if index >= self.state.info.height {
            return Ok(None);
        }

        let produced = self.engine.read_scanline(row, &mut self.errors)?;
        if produced != 1 {
            return Err(self.fail(EngineFault::PrematureEnd));
        }

        let reported = self.engine.output_scanline();
        if reported != index + 1 {
            return Err(self.fail(EngineFault::ScanlineMismatch {
                expected: index + 1,
                actual: reported,
            }));
        }

        self.state.cursor = index + 1;
        Ok(Some(index))
    }

    /// Finish decompression. Consumes the session; the engine is dropped
    /// on return.
    ///
    /// # Errors
    ///
    /// [`Abort`] if rows remain unread or the engine's finish step fails.
    pub fn finish(mut self) -> Result<(), Abort> {
        let Decompressing { info, cursor } = self.state;
        if cursor < info.height {
            return Err(self.fail(EngineFault::TooFewScanlines {
                read: cursor,
                height: info.height,
            }));
        }
        self.engine.finish_decompress(&mut self.errors)?;
        tracing::trace!(rows = cursor, "decompression finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{Script, ScriptedEngine, quiet, scratch_source};

    fn started(script: Script) -> DecodeSession<ScriptedEngine, Decompressing> {
        DecodeSession::new(ScriptedEngine::new(script), quiet())
            .attach_source(scratch_source())
            .unwrap()
            .read_header()
            .unwrap()
            .start(&DecoderConfig::default())
            .unwrap()
    }

    #[test]
    fn rows_come_out_in_order_then_none() {
        let mut session = started(Script::rgb(2, &[&[1; 6], &[2; 6]]));
        let mut row = vec![0; session.info().row_stride()];

        assert_eq!(session.read_scanline(&mut row).unwrap(), Some(0));
        assert_eq!(row, vec![1; 6]);
        assert_eq!(session.read_scanline(&mut row).unwrap(), Some(1));
        assert_eq!(row, vec![2; 6]);
        assert_eq!(session.read_scanline(&mut row).unwrap(), None);
        assert_eq!(session.cursor(), 2);

        session.finish().unwrap();
    }

    #[test]
    fn tables_only_header_is_fatal() {
        let script = Script {
            header: HeaderStatus::TablesOnly,
            ..Script::rgb(1, &[&[0; 3]])
        };
        let live = script.live.clone();
        let err = DecodeSession::new(ScriptedEngine::new(script), quiet())
            .attach_source(scratch_source())
            .unwrap()
            .read_header()
            .err()
            .unwrap();

        assert_eq!(err.message(), "JPEG datastream contains no image");
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_height_header_is_fatal() {
        let script = Script {
            header: HeaderStatus::Image(ImageHeader {
                width: 4,
                height: 0,
                components: 3,
            }),
            ..Script::rgb(4, &[])
        };
        let err = DecodeSession::new(ScriptedEngine::new(script), quiet())
            .attach_source(scratch_source())
            .unwrap()
            .read_header()
            .err()
            .unwrap();
        assert_eq!(err.message(), "empty JPEG image (4x0)");
    }

    #[test]
    fn pixel_limit_checked_before_start() {
        let script = Script::rgb(4, &[&[0; 12], &[0; 12]]);
        let live = script.live.clone();
        let started = script.started.clone();
        let err = DecodeSession::new(ScriptedEngine::new(script), quiet())
            .attach_source(scratch_source())
            .unwrap()
            .read_header()
            .unwrap()
            .start(&DecoderConfig::default().with_max_pixels(7))
            .err()
            .unwrap();

        assert!(err.message().contains("4x2 is over 7 pixels"));
        assert!(!started.load(Ordering::SeqCst));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn skewed_engine_counter_is_caught() {
        let script = Script {
            skew: 1,
            ..Script::rgb(1, &[&[0; 3], &[0; 3]])
        };
        let mut session = started(script);
        let mut row = vec![0; 3];
        let err = session.read_scanline(&mut row).unwrap_err();
        assert_eq!(
            err.message(),
            "engine reported scanline 2 where 1 was expected"
        );
    }

    #[test]
    fn engine_that_stalls_is_premature_end() {
        let script = Script {
            stall_at: Some(1),
            ..Script::rgb(1, &[&[0; 3], &[0; 3]])
        };
        let mut session = started(script);
        let mut row = vec![0; 3];
        session.read_scanline(&mut row).unwrap();
        let err = session.read_scanline(&mut row).unwrap_err();
        assert_eq!(err.message(), "premature end of data segment");
    }

    #[test]
    fn finish_with_rows_left_is_fatal() {
        let session = started(Script::rgb(1, &[&[0; 3], &[0; 3]]));
        let err = session.finish().unwrap_err();
        assert_eq!(
            err.message(),
            "application transferred too few scanlines (0 of 2)"
        );
    }

    #[test]
    fn engine_released_when_dropped_mid_stream() {
        let script = Script::rgb(1, &[&[0; 3], &[0; 3]]);
        let live = script.live.clone();
        {
            let mut session = started(script);
            let mut row = vec![0; 3];
            session.read_scanline(&mut row).unwrap();
            assert_eq!(live.load(Ordering::SeqCst), 1);
        }
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}
