/// Scanline command-line tool: decode JPEG files through the row-streaming
/// decoder and report what came out.
///
/// # Command overview
///
/// ```text
/// scanline <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print geometry and pixel digests of a decoded image
///   validate   Check that a file decodes cleanly
///   help       Print help information
///
/// Global options:
///   -v, --verbose          Log decoder lifecycle events (debug level)
///   --max-pixels <N>       Refuse images with more than N pixels
///   --scale <WxH>          Ask the decoder to downscale towards WxH
///   -h, --help             Print help
///   -V, --version          Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                    |
/// |------|--------------------------------------------|
/// | 0    | Success                                    |
/// | 1    | Error (missing file, corrupt stream, etc.) |
///
/// Diagnostics and logs go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use scanline_decoder::{DecoderConfig, StreamDecoder};
use scanline_pixels::PixelBuffer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod cmd_inspect;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Row-streaming JPEG decoder CLI.
#[derive(Parser)]
#[command(name = "scanline", version, about = "Row-streaming JPEG decoder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decoder lifecycle events. `RUST_LOG` overrides this.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Refuse images declaring more than this many pixels (0 = no limit).
    #[arg(long, global = true)]
    max_pixels: Option<u64>,

    /// Downscale output towards this size, e.g. `320x240`.
    #[arg(long, global = true, value_parser = parse_scale)]
    scale: Option<(u16, u16)>,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Decode a file and print its geometry and pixel digests.
    Inspect(InspectArgs),
    /// Check that a file decodes without error.
    Validate(ValidateArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `scanline inspect`.
///
/// ```text
/// ┌────────┬──────────────────────────────────────────────────┐
/// │ Flag   │ Effect                                           │
/// ├────────┼──────────────────────────────────────────────────┤
/// │ --rows │ Also print a BLAKE3 digest for every row         │
/// │ --json │ Emit one JSON object instead of text             │
/// └────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the JPEG file to inspect.
    pub file: PathBuf,

    /// Print a digest for every decoded row.
    #[arg(long)]
    pub rows: bool,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `scanline validate`.
///
/// Runs a full decode and reports `✓` lines on success or a `✗`
/// diagnostic. Exits with code 1 on any failure.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the JPEG file to validate.
    pub file: PathBuf,
}

// ── Shared setup ──────────────────────────────────────────────────────────────

/// Parse `WxH` (either `x` or `X`) into a pair of non-zero dimensions.
fn parse_scale(s: &str) -> Result<(u16, u16)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: u16 = w.trim().parse().with_context(|| format!("bad width {w:?}"))?;
    let height: u16 = h.trim().parse().with_context(|| format!("bad height {h:?}"))?;
    if width == 0 || height == 0 {
        return Err(anyhow!("scale dimensions must be non-zero"));
    }
    Ok((width, height))
}

impl Cli {
    fn config(&self) -> DecoderConfig {
        let mut config = DecoderConfig::default();
        match self.max_pixels {
            Some(0) => config.max_pixels = None,
            Some(limit) => config.max_pixels = Some(limit),
            None => {}
        }
        config.scale_to = self.scale;
        config
    }

    fn decoder(&self) -> StreamDecoder {
        StreamDecoder::new().with_config(self.config())
    }

    /// Target buffer sharing the decoder's pixel limit.
    fn pixels(&self) -> PixelBuffer {
        PixelBuffer::new().with_max_pixels(self.config().max_pixels)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let decoder = cli.decoder();

    let result = match &cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&decoder, cli.pixels(), args),
        Commands::Validate(args) => cmd_validate::run(&decoder, cli.pixels(), args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
