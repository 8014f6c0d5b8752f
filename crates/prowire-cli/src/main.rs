//! prowire - Inspect protobuf wire data as an annotated hex dump
//!
//! Reads raw bytes from a file (or standard input), scans them for
//! plausible wire structure in permissive mode, and prints each recognized
//! field alongside a hex dump with every defensible interpretation of its
//! value. Bytes with no plausible structure are shown as opaque gaps.

use anyhow::{Context, Result};
use clap::Parser;
use prowire_core::inspect::{render_to_string, scan, RenderContext};
use prowire_core::MAX_SERIALIZED_SIZE;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Inspect protobuf wire data as an annotated hex dump
#[derive(Parser, Debug)]
#[command(name = "prowire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File holding the wire bytes; standard input when omitted
    file: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let data = match cli.file {
        Some(ref path) => read_file(path)?,
        None => read_stdin()?,
    };
    debug!("read {} bytes", data.len());

    let spans = scan(&data, true);
    debug!("recognized {} spans", spans.len());

    let text = render_to_string(&data, &spans, &RenderContext::new());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())
        .context("failed to write to stdout")?;

    Ok(())
}

/// Reads up to the codec's maximum serialized size from `path`
fn read_file(path: &Path) -> Result<Vec<u8>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open input file: {}", path.display()))?;
    read_limited(file)
}

/// Reads up to the codec's maximum serialized size from standard input
fn read_stdin() -> Result<Vec<u8>> {
    read_limited(io::stdin().lock()).context("failed to read standard input")
}

fn read_limited(reader: impl Read) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    reader
        .take(MAX_SERIALIZED_SIZE as u64)
        .read_to_end(&mut data)?;
    Ok(data)
}
