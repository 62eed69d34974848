/// Implementation of `scanline inspect`.
///
/// Decodes a JPEG file into a [`PixelBuffer`] and prints its geometry and
/// a BLAKE3 digest of the packed pixel data. With `--rows`, every row gets
/// its own digest, which makes it easy to spot where two decodes diverge.
///
/// # Output format
///
/// ```text
/// File:       photo.jpg (48213 bytes)
/// Size:       640x480, 3 components, 24 bits/pixel
/// Stride:     1920 bytes
/// Pixels:     blake3 4f1c…e90a
/// Row 0:      blake3 a02b…77c1
/// Row 1:      blake3 19de…03f5
/// ```
use std::fs;

use anyhow::{Context, Result};
use scanline_decoder::{ImageDecoder, OutputInfo};
use scanline_pixels::PixelBuffer;
use serde::Serialize;

use crate::InspectArgs;

/// Everything `inspect` reports, in the shape `--json` prints it.
#[derive(Serialize)]
struct Report {
    file: String,
    file_bytes: u64,
    width: u32,
    height: u32,
    components: u8,
    bits_per_pixel: u32,
    stride: usize,
    digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<String>>,
}

/// Run the `scanline inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or does not decode.
pub fn run(
    decoder: &dyn ImageDecoder,
    mut pixels: PixelBuffer,
    args: &InspectArgs,
) -> Result<()> {
    let file_bytes = fs::metadata(&args.file)
        .with_context(|| format!("cannot stat {}", args.file.display()))?
        .len();

    let info = decoder
        .decode_path(&args.file, &mut pixels)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    let file = args.file.display().to_string();
    let report = build_report(&file, file_bytes, &info, &pixels, args.rows);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }
    Ok(())
}

fn build_report(
    file: &str,
    file_bytes: u64,
    info: &OutputInfo,
    pixels: &PixelBuffer,
    with_rows: bool,
) -> Report {
    let rows = with_rows.then(|| {
        (0..pixels.height())
            .filter_map(|y| pixels.row(y))
            .map(|row| blake3::hash(row).to_hex().to_string())
            .collect()
    });

    Report {
        file: file.to_string(),
        file_bytes,
        width: info.width,
        height: info.height,
        components: info.components,
        bits_per_pixel: info.bits_per_pixel(),
        stride: info.row_stride(),
        digest: blake3::hash(pixels.as_bytes()).to_hex().to_string(),
        rows,
    }
}

fn print_text(report: &Report) {
    println!("File:       {} ({} bytes)", report.file, report.file_bytes);
    println!(
        "Size:       {}x{}, {} component{}, {} bits/pixel",
        report.width,
        report.height,
        report.components,
        if report.components == 1 { "" } else { "s" },
        report.bits_per_pixel
    );
    println!("Stride:     {} bytes", report.stride);
    println!("Pixels:     blake3 {}", short(&report.digest));

    if let Some(rows) = &report.rows {
        for (y, digest) in rows.iter().enumerate() {
            let label = format!("Row {y}:");
            println!("{label:<11} blake3 {}", short(digest));
        }
    }
}

/// First and last four hex digits, enough to tell digests apart by eye.
fn short(hex: &str) -> String {
    if hex.len() <= 8 {
        return hex.to_string();
    }
    format!("{}…{}", &hex[..4], &hex[hex.len() - 4..])
}
