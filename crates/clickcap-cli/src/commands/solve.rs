//! Solve command - resolve a single captcha into click points.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use clickcap_core::driver::{PlannedClick, click_plan};
use clickcap_core::{DebugRenderer, SolveResult};

use super::{load_config, load_image_bytes, load_solver};

/// Arguments for the solve command.
#[derive(Args)]
pub struct SolveArgs {
    /// Captcha image file, or an inline `data:image/...;base64,` URI
    #[arg(required = true)]
    image: String,

    /// Instruction text shown with the captcha
    #[arg(short, long)]
    instruction: String,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write an annotated copy of the captcha to this PNG
    #[arg(long)]
    debug_image: Option<PathBuf>,

    /// On-page origin of the captcha element as X,Y; adds paced page clicks
    #[arg(long, value_parser = parse_origin)]
    origin: Option<(f64, f64)>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

/// Solve result plus driver-facing extras.
#[derive(Serialize)]
pub struct SolveReport<'a> {
    #[serde(flatten)]
    pub result: &'a SolveResult,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_clicks: Option<Vec<PlannedClick>>,

    pub processing_time_ms: u64,
}

pub async fn run(args: SolveArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let bytes = load_image_bytes(&args.image)?;
    debug!("Read {} image bytes", bytes.len());

    let mut solver = load_solver(args.model_dir.as_deref(), &config)?;
    if let Some(ref path) = args.debug_image {
        solver = solver.with_observer(DebugRenderer::new(path));
    }

    info!("Solving {}", args.image);
    let result = solver.solve(&bytes, &args.instruction);

    let report = SolveReport {
        result: &result,
        page_clicks: args.origin.map(|origin| {
            click_plan(
                result.click_points(),
                origin,
                &config.retry,
                &mut rand::thread_rng(),
            )
        }),
        processing_time_ms: start.elapsed().as_millis() as u64,
    };

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => format_text(&report),
    };
    println!("{}", output);

    Ok(())
}

/// Parse an `X,Y` origin.
fn parse_origin(value: &str) -> Result<(f64, f64), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", value))?;

    let x = x.trim().parse::<f64>().map_err(|e| format!("invalid X: {}", e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("invalid Y: {}", e))?;
    Ok((x, y))
}

pub fn format_text(report: &SolveReport<'_>) -> String {
    let mut output = String::new();
    let result = report.result;

    let status = match result {
        SolveResult::Success { .. } => style("success").green(),
        SolveResult::PartialSuccess { .. } => style("partial").yellow(),
        SolveResult::Failure { .. } => style("failure").red(),
    };
    output.push_str(&format!("Status: {}\n", status));

    if !result.click_points().is_empty() {
        output.push_str("Clicks:\n");
    }
    for (i, point) in result.click_points().iter().enumerate() {
        output.push_str(&format!(
            "  {}. {} at ({}, {}) confidence {:.2}",
            i + 1,
            point.character,
            point.x,
            point.y,
            point.confidence
        ));
        if let Some(click) = report.page_clicks.as_ref().and_then(|p| p.get(i)) {
            output.push_str(&format!(
                " -> page ({:.1}, {:.1}) after {}ms",
                click.x, click.y, click.pause_ms
            ));
        }
        output.push('\n');
    }

    match result {
        SolveResult::PartialSuccess { missing, .. } => {
            let missing: String = missing.iter().collect();
            output.push_str(&format!("Missing: {}\n", missing));
        }
        SolveResult::Failure { reason } => {
            output.push_str(&format!("Reason: {}\n", reason));
        }
        SolveResult::Success { .. } => {}
    }

    if result.needs_refresh() {
        output.push_str("Refresh the captcha and try again.\n");
    }

    output.push_str(&format!("Time: {}ms\n", report.processing_time_ms));
    output
}
