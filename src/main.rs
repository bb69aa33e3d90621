//! irrigation-scheduler - optimize soil-moisture triggers and write the
//! daily irrigation schedule.
//!
//! # Usage
//!
//! ```bash
//! # Run with ./scheduler.toml (or built-in defaults)
//! irrigation-scheduler
//!
//! # Explicit config, reproducible scan, forced sequential scoring
//! irrigation-scheduler --config runs/potato.toml --seed 42 --sequential
//!
//! # Smoke run against the bundled stand-in model
//! irrigation-scheduler --simulator synthetic-simulator
//! ```
//!
//! # Environment Variables
//!
//! - `IRRIGATION_CONFIG`: path to the TOML config (used when `--config` is absent)
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use irrigation_scheduler::config::SchedulerConfig;
use irrigation_scheduler::optimization::SearchMode;
use irrigation_scheduler::Orchestrator;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "irrigation-scheduler")]
#[command(about = "Soil-moisture trigger optimization and irrigation schedule generation")]
#[command(version)]
struct CliArgs {
    /// Path to the scheduler TOML config
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seed for the start-point scan (overrides [search] seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of random start candidates (overrides [search] num_searches)
    #[arg(long)]
    searches: Option<usize>,

    /// Score start candidates on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Schedule CSV destination (overrides [paths] output)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Crop model program (overrides [simulator] command; extra args go in the config)
    #[arg(long, value_name = "PROGRAM")]
    simulator: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "IRRIGATION_LOG_JSON")]
    log_json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl CliArgs {
    fn apply(&self, config: &mut SchedulerConfig) {
        if let Some(seed) = self.seed {
            config.search.seed = Some(seed);
        }
        if let Some(n) = self.searches {
            config.search.num_searches = n;
        }
        if self.sequential {
            config.search.mode = SearchMode::Sequential;
        }
        if let Some(output) = &self.output {
            config.paths.output = output.clone();
        }
        if let Some(program) = &self.simulator {
            config.simulator.command = vec![program.clone()];
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let (mut config, source) =
        SchedulerConfig::load(args.config.as_deref()).context("Failed to load scheduler config")?;
    info!(source = %source, "Configuration loaded");

    args.apply(&mut config);
    config.validate().context("Invalid configuration after CLI overrides")?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let orchestrator = Orchestrator::from_config(config).context("Failed to wire the crop model")?;
    let outcome = orchestrator.run().context("Optimization run failed")?;

    println!("optimal triggers: {}", outcome.optimal);
    if outcome.start_origin.is_fallback() {
        println!("note: start-point search produced no scored candidate, refined from the default");
    }
    if let Some(d) = &outcome.diagnostics {
        println!(
            "expected yield: {:.3} t/ha, seasonal irrigation: {:.1} mm",
            d.yield_t_ha, d.irrigation_mm
        );
    }
    println!(
        "schedule: {} ({} days, {:.1} mm)",
        outcome.schedule_path.display(),
        outcome.schedule_days,
        outcome.schedule_total_mm
    );
    Ok(())
}
