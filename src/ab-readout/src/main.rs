//! ab-readout — statistical validity and business impact of an A/B test from
//! raw visit records.
//!
//! Loads configuration, ingests the visit file, runs the analysis pipeline and
//! writes the report to stdout or a file. Logs go to stderr.

mod render;

use anyhow::Context;
use clap::Parser;
use readout_analytics::RecordLoader;
use readout_core::config::{AppConfig, OutputFormat};
use readout_reporting::AnalysisPipeline;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ab-readout")]
#[command(about = "Significance and revenue impact of an A/B test from raw visit records")]
#[command(version)]
struct Cli {
    /// Visit records file (overrides config)
    #[arg(long, env = "AB_READOUT__INPUT__PATH")]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report format: json or text (overrides config)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Write the report here instead of stdout (overrides config)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Assumed monthly visitors for the impact projection (overrides config)
    #[arg(long)]
    monthly_visitors: Option<f64>,

    /// Assumed revenue per conversion (overrides config)
    #[arg(long)]
    revenue_per_conversion: Option<f64>,
}

/// A malformed file or `AB_READOUT__` value fails the run; there is no
/// fallback to defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => AppConfig::load(None)
            .context("failed to load configuration from AB_READOUT__ environment"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ab_readout=info,readout_reporting=info,readout_analytics=info".into()
            }),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(input) = cli.input {
        config.input.path = input.display().to_string();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(output) = cli.output {
        config.output.path = Some(output.display().to_string());
    }
    if let Some(visitors) = cli.monthly_visitors {
        config.impact.monthly_visitors = visitors;
    }
    if let Some(revenue) = cli.revenue_per_conversion {
        config.impact.revenue_per_conversion = revenue;
    }

    info!(
        input = %config.input.path,
        format = %config.output.format,
        monthly_visitors = config.impact.monthly_visitors,
        revenue_per_conversion = config.impact.revenue_per_conversion,
        "Configuration loaded"
    );

    let pipeline = AnalysisPipeline::new(&config)?;
    let loader = RecordLoader::new(&config.input)?;
    let records = loader
        .load_path(Path::new(&config.input.path))
        .with_context(|| format!("failed to load {}", config.input.path))?;

    let report = pipeline.run(&records);

    let rendered = match config.output.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => render::text(&report),
    };

    match &config.output.path {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write report to {}", path))?;
            info!(path = %path, "Report written");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
