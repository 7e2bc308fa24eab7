//! occ_decode: decodes pre-cropped LED-matrix region images.
//!
//! Every input image is treated as one region handed over by the object
//! detector, in the order given (directories are expanded and sorted by name).

use anyhow::{Context, Result};
use clap::Parser;
use occ_decoder::{DecoderConfig, FrameRecord, LedMatrixDecoder, Region};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "occ_decode")]
#[command(about = "Decode OCC telemetry from cropped LED-matrix images")]
#[command(version)]
struct Cli {
    /// Image files or directories of images, decoded in order.
    #[arg(long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// JSON decoder configuration. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log a session report every N regions.
    #[arg(long)]
    report_every: Option<u64>,

    /// Print one JSON object per region instead of a text line.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    path: String,
    record: &'a FrameRecord,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DecoderConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DecoderConfig::default(),
    };
    if cli.report_every.is_some() {
        config.report_every = cli.report_every;
    }
    let mut decoder = LedMatrixDecoder::new(config).context("invalid decoder configuration")?;

    let paths = collect_inputs(&cli.input)?;
    tracing::info!("{} region images queued", paths.len());

    for path in &paths {
        let image = image::open(path)
            .with_context(|| format!("reading {}", path.display()))?
            .to_rgb8();
        let record = decoder.decode(&Region::from(&image));
        print_record(path, &record, cli.json)?;
    }

    let snapshot = decoder.snapshot();
    if cli.json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!(
            "regions={} valid={} ber={:.4} mean_latency={:.2}ms",
            snapshot.total, snapshot.valid, snapshot.bit_error_rate, snapshot.mean_latency_ms
        );
    }
    Ok(())
}

fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("listing {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            entries.sort();
            paths.extend(entries);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn print_record(path: &Path, record: &FrameRecord, json: bool) -> Result<()> {
    if json {
        let line = JsonLine {
            path: path.display().to_string(),
            record,
        };
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }
    match record.telemetry {
        Some(t) => println!(
            "{} #{}: temperature={}*C humidity={}% distance={}cm",
            path.display(),
            record.sequence,
            t.temperature,
            t.humidity,
            t.distance
        ),
        None => println!(
            "{} #{}: {:?} (blobs={}, grid={:?})",
            path.display(),
            record.sequence,
            record.status,
            record.blob_count,
            record.grid_source
        ),
    }
    Ok(())
}
