//! Process command - read nutrient values from a single label image.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use labelscan_core::models::config::LabelScanConfig;
use labelscan_core::{Nutrient, NutritionOcrProcessor, ProcessingResult};

use super::{config::load_config, extension_of, MAX_INPUT_BYTES, SUPPORTED_EXTENSIONS};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Print validation warnings to stderr
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(model_dir) = &args.model_dir {
        config.models.model_dir = model_dir.clone();
    }

    check_input(&args.input)?;
    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Reading label...");

    let result = process_file(&args.input, config).await?;

    pb.finish_and_clear();

    if args.show_warnings {
        print_warnings(&result);
    }

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if !result.success {
        anyhow::bail!(
            "Processing failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

/// Reject missing, oversized and non-raster inputs before touching the pipeline.
pub fn check_input(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let extension = extension_of(path);
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    let size = fs::metadata(path)?.len();
    if size > MAX_INPUT_BYTES {
        anyhow::bail!(
            "Input file too large: {} bytes (limit {} bytes)",
            size,
            MAX_INPUT_BYTES
        );
    }

    Ok(())
}

async fn process_file(path: &Path, config: LabelScanConfig) -> anyhow::Result<ProcessingResult> {
    let path = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let processor = NutritionOcrProcessor::with_models(config);
        processor.process_nutrition_label(path)
    })
    .await?;

    Ok(result)
}

fn print_warnings(result: &ProcessingResult) {
    let Some(validation) = &result.validation else {
        return;
    };
    if validation.warnings.is_empty() {
        return;
    }

    eprintln!("{}", style("Validation warnings:").yellow());
    for warning in &validation.warnings {
        eprintln!("  - {}", warning.message);
    }
}

pub fn format_result(result: &ProcessingResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_csv(result: &ProcessingResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["success"];
    header.extend(Nutrient::ALL.iter().map(|n| n.as_str()));
    header.extend(["warnings", "error"]);
    wtr.write_record(&header)?;

    let mut row = vec![result.success.to_string()];
    row.extend(Nutrient::ALL.iter().map(|&n| {
        result
            .nutrition
            .as_ref()
            .and_then(|m| m.get(n))
            .map(|v| v.to_string())
            .unwrap_or_default()
    }));
    row.push(
        result
            .validation
            .as_ref()
            .map_or(0, |v| v.warnings.len())
            .to_string(),
    );
    row.push(result.error.clone().unwrap_or_default());
    wtr.write_record(&row)?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ProcessingResult) -> String {
    let mut output = String::new();

    let status = if result.success { "success" } else { "failed" };
    output.push_str(&format!("Status: {}\n", status));
    if let Some(error) = &result.error {
        output.push_str(&format!("Error: {}\n", error));
    }

    if let Some(nutrition) = &result.nutrition {
        output.push_str("\nNutrition:\n");
        for nutrient in Nutrient::ALL {
            let value = nutrition
                .get(nutrient)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            let flag = if result.missing.contains(&nutrient) { " (not found)" } else { "" };
            output.push_str(&format!("  {:<14} {}{}\n", nutrient.as_str(), value, flag));
        }
    }

    if let Some(validation) = &result.validation {
        if let Some(calculated) = validation.calculated_calories {
            output.push_str(&format!("\nCalculated energy: {:.1} kcal\n", calculated));
        }
        if !validation.warnings.is_empty() {
            output.push_str("\nWarnings:\n");
            for warning in &validation.warnings {
                output.push_str(&format!("  - {}\n", warning.message));
            }
        }
    }

    if !result.detected_texts.is_empty() {
        output.push_str("\nDetected text:\n");
        for text in &result.detected_texts {
            output.push_str(&format!("  {}\n", text));
        }
    }

    output
}
