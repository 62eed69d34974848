/// Errors a [`PixelSink`](crate::PixelSink) raises when a decoder hands it
/// something it cannot store.
///
/// Each variant carries the values involved so a failed commit can be
/// diagnosed without re-running the decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// `open` was asked for a zero-width or zero-height image.
    #[error("cannot allocate an empty {width}x{height} pixel buffer")]
    EmptyDimensions { width: u32, height: u32 },

    /// `open` was asked for more pixels than the buffer's limit allows.
    #[error("pixel buffer {width}x{height} exceeds the limit of {limit} pixels")]
    OverLimit { width: u32, height: u32, limit: u64 },

    /// `width * height * bytes_per_pixel` does not fit in memory.
    #[error("pixel buffer {width}x{height} at {bits_per_pixel} bpp overflows the address space")]
    TooLarge {
        width: u32,
        height: u32,
        bits_per_pixel: u32,
    },

    /// A row was committed before `open`.
    #[error("row committed before the pixel buffer was opened")]
    NotOpen,

    /// Row index past the allocated height.
    #[error("row {row} out of range for height {height}")]
    RowOutOfRange { row: u32, height: u32 },

    /// Bit depth that is zero or not a whole number of bytes.
    #[error("unsupported bit depth {bits_per_pixel}")]
    UnsupportedDepth { bits_per_pixel: u32 },

    /// A row arrived with a different depth than the rows before it.
    #[error("row depth {actual} bpp does not match buffer depth {expected} bpp")]
    DepthMismatch { expected: u32, actual: u32 },

    /// The stride does not describe exactly `width` pixels.
    #[error("stride {stride} does not match {width} pixels at {bits_per_pixel} bpp")]
    StrideMismatch {
        stride: usize,
        width: u32,
        bits_per_pixel: u32,
    },

    /// Fewer bytes than one stride were supplied.
    #[error("row {row} holds {len} bytes, stride is {stride}")]
    ShortRow { row: u32, len: usize, stride: usize },
}
