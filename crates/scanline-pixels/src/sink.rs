use crate::error::SinkError;

/// Destination for decoded pixel rows.
///
/// A decoder drives a sink in two phases:
///
/// ```text
///   open(width, height)                      ← exactly once, after the header
///   fill_row(0, bytes, stride, bpp)          ┐
///   fill_row(1, bytes, stride, bpp)          │ one call per scanline,
///   ...                                      │ increasing row index
///   fill_row(height - 1, bytes, stride, bpp) ┘
/// ```
///
/// `stride` is the number of meaningful bytes in `raw` (`width` pixels at
/// `bits_per_pixel`). `raw` may be longer than `stride`; trailing bytes are
/// ignored.
///
/// The trait is object safe so decoders can accept `&mut dyn PixelSink`.
///
/// If a decode fails part way through, the sink holds whatever rows were
/// committed before the failure. Callers must discard it.
pub trait PixelSink {
    /// Allocate storage for a `width` x `height` image.
    ///
    /// # Errors
    ///
    /// Implementations reject dimensions they cannot hold.
    fn open(&mut self, width: u32, height: u32) -> Result<(), SinkError>;

    /// Commit one fully decoded row.
    ///
    /// # Errors
    ///
    /// Implementations reject rows that do not fit the opened geometry.
    fn fill_row(
        &mut self,
        row: u32,
        raw: &[u8],
        stride: usize,
        bits_per_pixel: u32,
    ) -> Result<(), SinkError>;
}

impl<S: PixelSink + ?Sized> PixelSink for &mut S {
    fn open(&mut self, width: u32, height: u32) -> Result<(), SinkError> {
        (**self).open(width, height)
    }

    fn fill_row(
        &mut self,
        row: u32,
        raw: &[u8],
        stride: usize,
        bits_per_pixel: u32,
    ) -> Result<(), SinkError> {
        (**self).fill_row(row, raw, stride, bits_per_pixel)
    }
}
