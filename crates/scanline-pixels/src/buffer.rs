use crate::error::SinkError;
use crate::sink::PixelSink;

/// Default ceiling on the pixels one [`PixelBuffer`] will `open` for: 2^28.
pub const DEFAULT_MAX_PIXELS: u64 = 1 << 28;

/// In-memory, randomly addressable pixel store.
///
/// `PixelBuffer` is the stock [`PixelSink`]. Rows are stored packed,
/// top to bottom, with no padding:
///
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │ row 0: width * bpp/8 bytes                   │
/// │ row 1: width * bpp/8 bytes                   │
/// │ ...                                          │
/// │ row height-1                                 │
/// └──────────────────────────────────────────────┘
/// ```
///
/// The bit depth is not known at `open` time (a decoder only learns it
/// once decompression starts), so the pixel storage is sized by the first
/// committed row. Every later row must use the same depth.
///
/// `open` refuses images over [`DEFAULT_MAX_PIXELS`] unless the limit is
/// changed with [`with_max_pixels`](Self::with_max_pixels). Nothing is
/// allocated for a refused size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bits_per_pixel: Option<u32>,
    opened: bool,
    max_pixels: Option<u64>,
    data: Vec<u8>,
    filled: Vec<bool>,
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            bits_per_pixel: None,
            opened: false,
            max_pixels: Some(DEFAULT_MAX_PIXELS),
            data: Vec::new(),
            filled: Vec::new(),
        }
    }
}

impl PixelBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest `width * height` that `open` accepts. `None`
    /// removes the limit; allocation failures are still reported.
    #[must_use]
    pub fn with_max_pixels(mut self, limit: Option<u64>) -> Self {
        self.max_pixels = limit;
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Depth of the stored pixels, or `None` before the first row.
    #[must_use]
    pub fn bits_per_pixel(&self) -> Option<u32> {
        self.bits_per_pixel
    }

    /// Bytes occupied by one stored row.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.bits_per_pixel
            .map_or(0, |bpp| self.width as usize * (bpp as usize / 8))
    }

    /// Number of distinct rows committed since the last `open`.
    #[must_use]
    pub fn rows_filled(&self) -> usize {
        self.filled.iter().filter(|f| **f).count()
    }

    /// True once every row of the opened image has been committed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.opened && self.filled.iter().all(|f| *f)
    }

    /// The packed pixel bytes, row-major.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of row `y`, or `None` if it is out of range or never filled.
    #[must_use]
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if !self.filled.get(y as usize).copied().unwrap_or(false) {
            return None;
        }
        let stride = self.stride();
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }

    /// Bytes of the pixel at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width {
            return None;
        }
        let bytes = self.bits_per_pixel? as usize / 8;
        let start = x as usize * bytes;
        self.row(y)?.get(start..start + bytes)
    }

    /// The pixel at `(x, y)` widened to RGBA8.
    ///
    /// ```text
    ///   8 bpp  grey          → (g, g, g, 255)
    ///   16 bpp grey (BE)     → (hi, hi, hi, 255)
    ///   24 bpp RGB           → (r, g, b, 255)
    ///   32 bpp CMYK          → None
    /// ```
    #[must_use]
    pub fn rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        match *self.pixel(x, y)? {
            [g] | [g, _] => Some([g, g, g, u8::MAX]),
            [r, g, b] => Some([r, g, b, u8::MAX]),
            _ => None,
        }
    }

    fn allocate(&mut self, bits_per_pixel: u32) -> Result<(), SinkError> {
        let too_large = || SinkError::TooLarge {
            width: self.width,
            height: self.height,
            bits_per_pixel,
        };
        let len = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(bits_per_pixel as usize / 8))
            .ok_or_else(too_large)?;
        self.data = vec![0; len];
        self.bits_per_pixel = Some(bits_per_pixel);
        Ok(())
    }
}

impl PixelSink for PixelBuffer {
    /// Reset the buffer to an empty `width` x `height` image.
    ///
    /// Calling `open` again discards everything committed so far.
    fn open(&mut self, width: u32, height: u32) -> Result<(), SinkError> {
        if width == 0 || height == 0 {
            return Err(SinkError::EmptyDimensions { width, height });
        }
        if let Some(limit) = self.max_pixels
            && u64::from(width) * u64::from(height) > limit
        {
            return Err(SinkError::OverLimit {
                width,
                height,
                limit,
            });
        }

        let mut filled = Vec::new();
        filled
            .try_reserve_exact(height as usize)
            .map_err(|_| SinkError::TooLarge {
                width,
                height,
                bits_per_pixel: 8,
            })?;
        filled.resize(height as usize, false);

        self.width = width;
        self.height = height;
        self.bits_per_pixel = None;
        self.data = Vec::new();
        self.filled = filled;
        self.opened = true;
        Ok(())
    }

    fn fill_row(
        &mut self,
        row: u32,
        raw: &[u8],
        stride: usize,
        bits_per_pixel: u32,
    ) -> Result<(), SinkError> {
        if !self.opened {
            return Err(SinkError::NotOpen);
        }
        if row >= self.height {
            return Err(SinkError::RowOutOfRange {
                row,
                height: self.height,
            });
        }
        if bits_per_pixel == 0 || bits_per_pixel % 8 != 0 {
            return Err(SinkError::UnsupportedDepth { bits_per_pixel });
        }
        match self.bits_per_pixel {
            Some(expected) if expected != bits_per_pixel => {
                return Err(SinkError::DepthMismatch {
                    expected,
                    actual: bits_per_pixel,
                });
            }
            Some(_) => {}
            None => self.allocate(bits_per_pixel)?,
        }
        if stride != self.stride() {
            return Err(SinkError::StrideMismatch {
                stride,
                width: self.width,
                bits_per_pixel,
            });
        }
        if raw.len() < stride {
            return Err(SinkError::ShortRow {
                row,
                len: raw.len(),
                stride,
            });
        }

        let start = row as usize * stride;
        self.data[start..start + stride].copy_from_slice(&raw[..stride]);
        self.filled[row as usize] = true;
        Ok(())
    }
}
