/// Default ceiling on decoded pixels: 2^28 (e.g. 16384 x 16384). Same
/// value [`PixelBuffer`](scanline_pixels::PixelBuffer) applies on `open`.
pub const DEFAULT_MAX_PIXELS: u64 = scanline_pixels::DEFAULT_MAX_PIXELS;

/// Configuration for a [`StreamDecoder`](crate::StreamDecoder).
///
/// ```text
/// ┌────────────┬───────────────────────────────────────────────────────┐
/// │ Field      │ Purpose                                               │
/// ├────────────┼───────────────────────────────────────────────────────┤
/// │ max_pixels │ Reject headers declaring more pixels than this        │
/// │ scale_to   │ Ask the engine to downscale towards this size         │
/// └────────────┴───────────────────────────────────────────────────────┘
/// ```
///
/// `max_pixels` is checked right after the header is parsed, before the
/// sink is allocated. A stream over the limit fails with
/// [`DecodeError::DecodeFailed`](crate::DecodeError::DecodeFailed), the
/// same as any other fatal engine condition. `None` disables the check.
///
/// `scale_to` is a request, not a guarantee. JPEG engines can only scale
/// by fixed IDCT factors (1/8, 1/4, 1/2, 1) applied to both axes alike.
/// The engine picks the smallest factor whose output reaches the request
/// in at least one dimension; the other may come out smaller. A 64x32
/// image asked for 16x16 decodes at 16x8. Images already smaller than
/// the request are left at full size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    pub max_pixels: Option<u64>,
    pub scale_to: Option<(u16, u16)>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_pixels: Some(DEFAULT_MAX_PIXELS),
            scale_to: None,
        }
    }
}

impl DecoderConfig {
    /// Configuration with no pixel limit.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_pixels: None,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_pixels(mut self, limit: u64) -> Self {
        self.max_pixels = Some(limit);
        self
    }

    #[must_use]
    pub fn with_scale_to(mut self, width: u16, height: u16) -> Self {
        self.scale_to = Some((width, height));
        self
    }
}
