use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use volley::{JsonReporter, LogReporter, Overrides, Reporter, Runner, StressConfig};

/// Stress test HTTP APIs and verify every response.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the JSON config describing the APIs to test.
    #[arg(long, default_value = "./stress_conf.json")]
    config: PathBuf,
    /// Send every request to this host instead of the configured one.
    #[arg(long)]
    host: Option<String>,
    /// Replace the configured scheme (http or https).
    #[arg(long)]
    scheme: Option<String>,
    /// Only run the API with this name.
    #[arg(long)]
    only: Option<String>,
    /// Where run summaries go.
    #[arg(long, value_enum, default_value_t = Format::Log)]
    format: Format,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Structured log lines.
    Log,
    /// One JSON object per API on stdout.
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = StressConfig::from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::info!("[config path] {}", cli.config.display());

    let overrides = Overrides {
        host: cli.host,
        scheme: cli.scheme,
        only: cli.only,
    };

    match cli.format {
        Format::Log => run(config, overrides, LogReporter).await,
        Format::Json => run(config, overrides, JsonReporter).await,
    }
}

async fn run<R: Reporter>(config: StressConfig, overrides: Overrides, reporter: R) -> anyhow::Result<()> {
    Runner::builder()
        .endpoints(config.apis)
        .overrides(overrides)
        .reporter(reporter)
        .build()
        .run()
        .await?;
    Ok(())
}
