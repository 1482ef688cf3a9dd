//! Batch processing command for multiple label images.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use labelscan_core::{Nutrient, NutritionOcrProcessor, PureOnnxDetector, ProcessingResult};

use super::config::load_config;
use super::process::{check_input, format_result, OutputFormat};
use super::{extension_of, SUPPORTED_EXTENSIONS};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input images
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Outcome for a single file.
struct FileOutcome {
    path: PathBuf,
    result: Option<ProcessingResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

impl FileOutcome {
    fn succeeded(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.success)
    }

    fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.result.as_ref().and_then(|r| r.error.as_deref()))
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(model_dir) = &args.model_dir {
        config.models.model_dir = model_dir.clone();
    }

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| SUPPORTED_EXTENSIONS.contains(&extension_of(p).as_str()))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // One processor for the whole batch so the models load once.
    let processor = Arc::new(NutritionOcrProcessor::with_models(config));
    let init = Arc::clone(&processor);
    tokio::task::spawn_blocking(move || init.initialize())
        .await?
        .map_err(|e| anyhow::anyhow!("Failed to load OCR models: {}", e))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut outcomes = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = process_single_file(&processor, &path).await;
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        let outcome = match outcome {
            Ok(result) => FileOutcome {
                path,
                result: Some(result),
                error: None,
                processing_time_ms,
            },
            Err(e) => FileOutcome {
                path,
                result: None,
                error: Some(e.to_string()),
                processing_time_ms,
            },
        };

        if !outcome.succeeded() {
            let message = outcome.error_message().unwrap_or("unknown error").to_string();
            if args.continue_on_error {
                warn!("Failed to process {}: {}", outcome.path.display(), message);
            } else {
                pb.abandon();
                error!("Failed to process {}: {}", outcome.path.display(), message);
                anyhow::bail!("Processing failed for {}: {}", outcome.path.display(), message);
            }
        }

        outcomes.push(outcome);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        write_outputs(output_dir, &outcomes, args.format)?;
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<&FileOutcome> = outcomes.iter().filter(|o| !o.succeeded()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            println!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.error_message().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn process_single_file(
    processor: &Arc<NutritionOcrProcessor<PureOnnxDetector>>,
    path: &Path,
) -> anyhow::Result<ProcessingResult> {
    check_input(path)?;

    let processor = Arc::clone(processor);
    let path = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || processor.process_nutrition_label(path)).await?;

    Ok(result)
}

fn write_outputs(output_dir: &Path, outcomes: &[FileOutcome], format: OutputFormat) -> anyhow::Result<()> {
    for outcome in outcomes {
        let Some(result) = &outcome.result else {
            continue;
        };

        let output_name = outcome
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("label");
        let output_path = output_dir.join(format!("{}.{}", output_name, format.extension()));

        fs::write(&output_path, format_result(result, format)?)?;
        debug!("Wrote output to {}", output_path.display());
    }

    Ok(())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status"];
    header.extend(Nutrient::CORE.iter().map(|n| n.as_str()));
    header.extend(["warnings", "processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let status = if outcome.succeeded() { "success" } else { "error" };

        let mut row = vec![filename.to_string(), status.to_string()];
        let nutrition = outcome.result.as_ref().and_then(|r| r.nutrition.as_ref());
        row.extend(Nutrient::CORE.iter().map(|&n| {
            nutrition
                .and_then(|m| m.get(n))
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        let warnings = outcome
            .result
            .as_ref()
            .and_then(|r| r.validation.as_ref())
            .map_or(0, |v| v.warnings.len());
        row.push(warnings.to_string());
        row.push(outcome.processing_time_ms.to_string());
        row.push(outcome.error_message().unwrap_or("").to_string());

        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
