//! WebGuard scenario driver.
//!
//! `webguard-engine [--config webguard.yaml] <scenario.yaml>`
//! - boots one frame with the guard installed
//! - replays the scenario's steps against it
//! - prints step outcomes, the durable Rule Set and metrics

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use webguard_core::error::Result;
use webguard_engine::config::{self, GuardConfig};
use webguard_engine::obs::GuardMetrics;
use webguard_engine::scenario;
use webguard_engine::storage::{DurableStore, FileStore, MemoryStore};

#[derive(Parser, Debug)]
#[command(name = "webguard-engine", about = "Replay a page scenario against the same-origin guard")]
struct Cli {
    /// Engine config (YAML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Scenario to replay
    scenario: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match run(cli.config.as_deref(), &cli.scenario).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.kind().as_str(), error = %e, "scenario failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg_path: Option<&str>, scenario_path: &str) -> Result<()> {
    let cfg = match cfg_path {
        Some(path) => config::load_from_file(path)?,
        None => GuardConfig::default(),
    };
    let scenario = scenario::load_from_file(scenario_path)?;

    let durable: Arc<dyn DurableStore> = match &cfg.storage.durable_path {
        Some(path) => Arc::new(FileStore::open(path).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let metrics = Arc::new(GuardMetrics::default());

    tracing::info!(top = %scenario.top_url, steps = scenario.steps.len(), "webguard scenario starting");
    let report = scenario::run(&scenario, &cfg, durable, metrics.clone()).await?;

    println!("top origin: {} ({:?})", report.top_origin, report.frame);
    if report.removed {
        println!("frame removed: document cleared");
    }
    for (i, step) in report.steps.iter().enumerate() {
        let verdict = if step.executed { "executed" } else { "suppressed" };
        println!(
            "step {}: {} from {} -> {}",
            i + 1,
            step.label,
            step.script.as_deref().unwrap_or("<inline>"),
            verdict
        );
    }
    println!("session origins: {}", report.session_origins.join(", "));
    println!("rules: {}", report.rules.to_json()?);
    print!("{}", metrics.render());
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn scenario_alone_uses_default_config() {
        let cli = Cli::try_parse_from(["webguard-engine", "demo.yaml"]).unwrap();
        assert_eq!(cli.scenario, "demo.yaml");
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_flag_is_optional() {
        let cli = Cli::try_parse_from(["webguard-engine", "--config", "wg.yaml", "demo.yaml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("wg.yaml"));
        let cli = Cli::try_parse_from(["webguard-engine", "-c", "wg.yaml", "demo.yaml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("wg.yaml"));
    }

    #[test]
    fn missing_scenario_is_rejected() {
        assert!(Cli::try_parse_from(["webguard-engine"]).is_err());
    }
}
