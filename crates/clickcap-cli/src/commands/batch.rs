//! Batch command - solve every captcha listed in a CSV manifest.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{debug, error, warn};

use clickcap_core::SolveResult;

use super::{load_config, load_image_bytes, load_solver};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// CSV manifest with `image,instruction` columns
    #[arg(required = true)]
    manifest: PathBuf,

    /// Directory for per-captcha JSON results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue when an image cannot be read
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// One manifest row.
#[derive(Debug, Deserialize, PartialEq)]
struct ManifestEntry {
    image: String,
    instruction: String,
}

/// Outcome for one manifest row.
struct BatchItem {
    image: String,
    result: Option<SolveResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let entries = read_manifest(&args.manifest)?;
    if entries.is_empty() {
        anyhow::bail!("Manifest is empty: {}", args.manifest.display());
    }

    println!(
        "{} Found {} captchas to solve",
        style("ℹ").blue(),
        entries.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let solver = load_solver(args.model_dir.as_deref(), &config)?;
    let base_dir = args.manifest.parent().unwrap_or_else(|| Path::new("."));

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} captchas")?
            .progress_chars("=>-"),
    );

    let mut items = Vec::with_capacity(entries.len());

    for entry in entries {
        let item_start = Instant::now();
        let source = resolve_source(base_dir, &entry.image);

        match load_image_bytes(&source) {
            Ok(bytes) => {
                let result = solver.solve(&bytes, &entry.instruction);
                debug!("{}: {}", entry.image, result.status());
                items.push(BatchItem {
                    image: entry.image,
                    result: Some(result),
                    error: None,
                    processing_time_ms: item_start.elapsed().as_millis() as u64,
                });
            }
            Err(e) => {
                let error_msg = format!("{:#}", e);
                if args.continue_on_error {
                    warn!("Skipping {}: {}", entry.image, error_msg);
                    items.push(BatchItem {
                        image: entry.image,
                        result: None,
                        error: Some(error_msg),
                        processing_time_ms: item_start.elapsed().as_millis() as u64,
                    });
                } else {
                    error!("Failed to read {}: {}", entry.image, error_msg);
                    anyhow::bail!("Batch aborted: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if let Some(ref output_dir) = args.output_dir {
        for (index, item) in items.iter().enumerate() {
            if let Some(ref result) = item.result {
                let output_path = output_dir.join(output_name(index, &item.image));
                fs::write(&output_path, serde_json::to_string_pretty(result)?)?;
                debug!("Wrote result to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &items)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let count = |status: &str| {
        items
            .iter()
            .filter(|i| i.result.as_ref().map(SolveResult::status) == Some(status))
            .count()
    };
    let errors = items.iter().filter(|i| i.error.is_some()).count();

    println!();
    println!(
        "{} Solved {} captchas in {:?}",
        style("✓").green(),
        items.len(),
        start.elapsed()
    );
    println!(
        "   {} success, {} partial, {} failure, {} unreadable",
        style(count("success")).green(),
        style(count("partial")).yellow(),
        style(count("failure")).red(),
        style(errors).red()
    );

    Ok(())
}

fn read_manifest(path: &Path) -> anyhow::Result<Vec<ManifestEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut entries = Vec::new();
    for row in reader.deserialize() {
        entries.push(row?);
    }
    Ok(entries)
}

/// Manifest image paths are relative to the manifest; data URIs pass through.
fn resolve_source(base_dir: &Path, image: &str) -> String {
    if image.starts_with("data:") || Path::new(image).is_absolute() {
        image.to_string()
    } else {
        base_dir.join(image).to_string_lossy().into_owned()
    }
}

/// `<row>_<stem>.json`, the row prefix keeps repeated images apart.
fn output_name(index: usize, image: &str) -> String {
    let stem = if image.starts_with("data:") {
        "inline"
    } else {
        Path::new(image)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("captcha")
    };
    format!("{:04}_{}.json", index + 1, stem)
}

fn write_summary(path: &Path, items: &[BatchItem]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "image",
        "status",
        "clicks",
        "missing",
        "reason",
        "processing_time_ms",
        "error",
    ])?;

    for item in items {
        let image = if item.image.starts_with("data:") {
            "inline"
        } else {
            item.image.as_str()
        };

        match &item.result {
            Some(result) => {
                let clicks = result
                    .click_points()
                    .iter()
                    .map(|p| format!("{}:{},{}", p.character, p.x, p.y))
                    .collect::<Vec<_>>()
                    .join(" ");
                let (missing, reason) = match result {
                    SolveResult::PartialSuccess { missing, .. } => {
                        (missing.iter().collect::<String>(), String::new())
                    }
                    SolveResult::Failure { reason } => (String::new(), reason.to_string()),
                    SolveResult::Success { .. } => (String::new(), String::new()),
                };

                wtr.write_record([
                    image,
                    result.status(),
                    &clicks,
                    &missing,
                    &reason,
                    &item.processing_time_ms.to_string(),
                    "",
                ])?;
            }
            None => {
                wtr.write_record([
                    image,
                    "error",
                    "",
                    "",
                    "",
                    &item.processing_time_ms.to_string(),
                    item.error.as_deref().unwrap_or(""),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
