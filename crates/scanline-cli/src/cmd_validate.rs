/// Implementation of `scanline validate`.
///
/// Runs one full decode into a [`PixelBuffer`] and reports either a series
/// of success checkmarks (`✓`) or a diagnostic failure line (`✗`). The
/// main dispatcher turns the returned `Err` into exit code 1.
///
/// # Success output
///
/// ```text
/// ✓ Source: photo.jpg opened
/// ✓ Header: 640x480, 3 components
/// ✓ Scanlines: 480 of 480 rows decoded
/// ✓ Buffer: complete (921600 bytes)
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Error: corrupt stream: premature end of data segment
/// ```
use anyhow::{Result, anyhow};
use scanline_decoder::{DecodeError, ImageDecoder};
use scanline_pixels::PixelBuffer;

use crate::ValidateArgs;

/// Run the `scanline validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, does not decode, or
/// decodes into an incomplete buffer.
pub fn run(
    decoder: &dyn ImageDecoder,
    mut pixels: PixelBuffer,
    args: &ValidateArgs,
) -> Result<()> {
    match decoder.decode_path(&args.file, &mut pixels) {
        Ok(info) => {
            println!("✓ Source: {} opened", args.file.display());
            println!(
                "✓ Header: {}x{}, {} component{}",
                info.width,
                info.height,
                info.components,
                if info.components == 1 { "" } else { "s" }
            );
            println!(
                "✓ Scanlines: {} of {} rows decoded",
                pixels.rows_filled(),
                info.height
            );
            if !pixels.is_complete() {
                println!("✗ Error: buffer incomplete after a successful decode");
                return Err(anyhow!("validation failed"));
            }
            println!("✓ Buffer: complete ({} bytes)", pixels.as_bytes().len());
            Ok(())
        }

        Err(e) => {
            println!("✗ Error: {}", diagnostic(&e));
            Err(anyhow!("validation failed"))
        }
    }
}

// ── Error formatting ──────────────────────────────────────────────────────────

/// Converts a `DecodeError` into a one-line diagnostic.
///
/// ```text
/// ┌───────────────────┬──────────────────────────────────────────┐
/// │ DecodeError       │ Diagnostic prefix                        │
/// ├───────────────────┼──────────────────────────────────────────┤
/// │ SourceUnavailable │ "cannot open <path>: <io error>"         │
/// │ UnsupportedSource │ "<codec> decoder does not support …"     │
/// │ DecodeFailed      │ "corrupt stream: <engine message>"       │
/// │ Sink              │ "pixel buffer rejected data: <error>"    │
/// └───────────────────┴──────────────────────────────────────────┘
/// ```
fn diagnostic(e: &DecodeError) -> String {
    match e {
        DecodeError::DecodeFailed { message } => format!("corrupt stream: {message}"),
        DecodeError::Sink(inner) => format!("pixel buffer rejected data: {inner}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use scanline_pixels::SinkError;

    use super::*;

    #[test]
    fn diagnostics() {
        assert_eq!(
            diagnostic(&DecodeError::DecodeFailed {
                message: "premature end of data segment".into()
            }),
            "corrupt stream: premature end of data segment"
        );
        assert_eq!(
            diagnostic(&DecodeError::Sink(SinkError::NotOpen)),
            format!("pixel buffer rejected data: {}", SinkError::NotOpen)
        );
        let missing = DecodeError::SourceUnavailable {
            path: PathBuf::from("x.jpg"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(diagnostic(&missing).starts_with("cannot open x.jpg: "));
    }
}
