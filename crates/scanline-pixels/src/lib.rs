#![warn(clippy::pedantic)]

pub mod buffer;
pub mod error;
pub mod sink;

pub use buffer::{DEFAULT_MAX_PIXELS, PixelBuffer};
pub use error::SinkError;
pub use sink::PixelSink;
