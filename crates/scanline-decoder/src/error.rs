use std::path::PathBuf;

use scanline_pixels::SinkError;

/// Errors returned by an [`ImageDecoder`](crate::ImageDecoder).
///
/// ```text
///   DecodeError
///   ├── SourceUnavailable  ← path could not be opened; no engine created
///   ├── UnsupportedSource  ← request kind (in-memory buffer) not supported
///   ├── DecodeFailed       ← engine reported a fatal condition
///   └── Sink(SinkError)    ← the pixel sink refused a commit
/// ```
///
/// After any error the sink's contents are unspecified and must be
/// discarded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input file could not be opened for reading.
    #[error("cannot open {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// This decoder cannot read from the requested kind of source.
    ///
    /// Returned unconditionally by `decode_buffer` for codecs that only
    /// read from files. Callers must not retry with the same decoder.
    #[error("{codec} decoder does not support in-memory buffers")]
    UnsupportedSource { codec: &'static str },

    /// The engine hit a fatal condition. `message` is the engine's own
    /// diagnostic, as emitted through the message hook.
    #[error("decode failed: {message}")]
    DecodeFailed { message: String },

    /// The pixel sink rejected `open` or `fill_row`.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
