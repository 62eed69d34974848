#![warn(clippy::pedantic)]

pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod jpeg;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::DecoderConfig;
pub use decoder::{ImageDecoder, StreamDecoder};
pub use engine::{
    Abort, CompressionEngine, EngineFactory, EngineFault, ErrorContext, HeaderStatus, ImageHeader,
    MessageHook, OutputInfo, Source,
};
pub use error::DecodeError;
pub use jpeg::JpegEngine;
pub use session::DecodeSession;
