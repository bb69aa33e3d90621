//! synthetic-simulator - stand-in crop model speaking the scheduler's JSON
//! protocol: one `SimulationRequest` on stdin, one `SimulationOutput` on stdout.
//!
//! ```bash
//! irrigation-scheduler --simulator synthetic-simulator
//! echo "$REQUEST" | synthetic-simulator --optimum 70,65,60,55
//! ```
//!
//! Logs go to stderr so stdout stays a clean JSON document.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use irrigation_scheduler::simulator::{CropSimulator, SimulationRequest, SyntheticSimulator};

#[derive(Parser, Debug)]
#[command(name = "synthetic-simulator", about = "Deterministic stand-in crop model")]
#[command(version)]
struct CliArgs {
    /// Trigger vector of peak yield; a single value applies to every stage
    #[arg(long, value_delimiter = ',', default_value = "70")]
    optimum: Vec<f64>,

    /// Yield at the optimum (t/ha)
    #[arg(long, default_value_t = 12.0)]
    peak_yield: f64,

    /// Squared-distance scale of the response surface
    #[arg(long, default_value_t = 20_000.0)]
    width: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read request from stdin")?;
    let request: SimulationRequest =
        serde_json::from_str(&raw).context("Request is not a valid SimulationRequest")?;

    let optimum = match args.optimum.as_slice() {
        [single] => vec![*single; request.irrigation.smt.len()],
        many => many.to_vec(),
    };
    let simulator = SyntheticSimulator::new(optimum)
        .with_peak_yield(args.peak_yield)
        .with_width(args.width);

    let output = simulator.simulate(&request)?;
    debug!(seasons = output.seasons.len(), days = output.water_flux.len(), "Simulation complete");

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, &output).context("Failed to write output")?;
    stdout.flush()?;
    Ok(())
}
