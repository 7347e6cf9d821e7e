use std::process::ExitCode;

use aeflow_core::config::{check_required_vars, EngineConfig};
use aeflow_worker::Cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| aeflow_worker::DEFAULT_LOG_FILTER.into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    check_required_vars(|key| std::env::var(key).ok())?;
    let config = EngineConfig::from_env()?;
    tracing::info!(
        workplace = %config.workplace.display(),
        templates = %config.templates.local_path.display(),
        "Loaded engine configuration",
    );

    let report = aeflow_worker::run(cli, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report.json)?);

    Ok(if report.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
