//! Scripted engine for unit tests.

use std::io::BufReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};

use crate::engine::{
    Abort, CompressionEngine, EngineFault, ErrorContext, HeaderStatus, ImageHeader, OutputInfo,
    Source,
};

/// What a [`ScriptedEngine`] will report.
pub(crate) struct Script {
    pub header: HeaderStatus,
    pub bytes_per_pixel: u8,
    pub rows: Vec<Vec<u8>>,
    /// Raise a corrupt-data fault when this row is requested.
    pub fail_at: Option<u32>,
    /// Return zero lines when this row is requested.
    pub stall_at: Option<u32>,
    /// Added to the reported scanline counter.
    pub skew: u32,
    /// Engines alive (created minus dropped).
    pub live: Arc<AtomicIsize>,
    pub started: Arc<AtomicBool>,
}

impl Script {
    pub fn rgb(width: u32, rows: &[&[u8]]) -> Self {
        Self {
            header: HeaderStatus::Image(ImageHeader {
                width,
                height: u32::try_from(rows.len()).unwrap(),
                components: 3,
            }),
            bytes_per_pixel: 3,
            rows: rows.iter().map(|r| r.to_vec()).collect(),
            fail_at: None,
            stall_at: None,
            skew: 0,
            live: Arc::new(AtomicIsize::new(0)),
            started: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    Created,
    Attached,
    Header,
    Running,
    Done,
}

pub(crate) struct ScriptedEngine {
    script: Script,
    stage: Stage,
    next: u32,
    _source: Option<Source>,
}

impl ScriptedEngine {
    pub fn new(script: Script) -> Self {
        script.live.fetch_add(1, Ordering::SeqCst);
        Self {
            script,
            stage: Stage::Created,
            next: 0,
            _source: None,
        }
    }

    fn expect(&self, stage: Stage, errors: &mut ErrorContext) -> Result<(), Abort> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(errors.error_exit(EngineFault::BadState { state: "scripted" }))
        }
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.script.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CompressionEngine for ScriptedEngine {
    fn attach_source(&mut self, source: Source, errors: &mut ErrorContext) -> Result<(), Abort> {
        self.expect(Stage::Created, errors)?;
        self._source = Some(source);
        self.stage = Stage::Attached;
        Ok(())
    }

    fn read_header(
        &mut self,
        _require_image: bool,
        errors: &mut ErrorContext,
    ) -> Result<HeaderStatus, Abort> {
        self.expect(Stage::Attached, errors)?;
        self.stage = Stage::Header;
        Ok(self.script.header)
    }

    fn start_decompress(&mut self, errors: &mut ErrorContext) -> Result<OutputInfo, Abort> {
        self.expect(Stage::Header, errors)?;
        self.script.started.store(true, Ordering::SeqCst);
        let HeaderStatus::Image(header) = self.script.header else {
            return Err(errors.error_exit(EngineFault::NoImage));
        };
        self.stage = Stage::Running;
        Ok(OutputInfo {
            width: header.width,
            height: header.height,
            components: header.components,
            bytes_per_pixel: self.script.bytes_per_pixel,
        })
    }

    fn read_scanline(&mut self, row: &mut [u8], errors: &mut ErrorContext) -> Result<u32, Abort> {
        self.expect(Stage::Running, errors)?;
        if self.script.fail_at == Some(self.next) {
            return Err(errors.error_exit(EngineFault::Corrupt(format!(
                "bad huffman code in row {}",
                self.next
            ))));
        }
        if self.script.stall_at == Some(self.next) {
            return Ok(0);
        }
        let Some(data) = self.script.rows.get(self.next as usize) else {
            return Err(errors.error_exit(EngineFault::TooManyScanlines));
        };
        row[..data.len()].copy_from_slice(data);
        self.next += 1;
        Ok(1)
    }

    fn output_scanline(&self) -> u32 {
        self.next + self.script.skew
    }

    fn finish_decompress(&mut self, errors: &mut ErrorContext) -> Result<(), Abort> {
        self.expect(Stage::Running, errors)?;
        self.stage = Stage::Done;
        Ok(())
    }
}

/// An error context that drops messages.
pub(crate) fn quiet() -> ErrorContext {
    ErrorContext::new(Arc::new(|_: &str| {}))
}

/// A throwaway source for engines that ignore their input.
pub(crate) fn scratch_source() -> Source {
    BufReader::new(tempfile::tempfile().unwrap())
}
