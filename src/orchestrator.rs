//! Orchestrator: one optimization run from configuration to artifact.
//!
//! ```text
//! precondition check ─► build scenario ─► start-point search ─► refine
//!        │                                                        │
//!   data provider                                   clip ◄────────┘
//!                                                     │
//!                                      diagnostics ─► materialize ─► outcome
//! ```
//!
//! Every failure propagates to the caller; nothing is retried here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::acquisition::{ArtifactKind, CommandProvider, DataProvider, DisabledProvider, MissingArtifact};
use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::inputs::{read_soil_layers, read_weather, WeatherSeries};
use crate::optimization::{LocalRefiner, ObjectiveEvaluator, StartPointSearch};
use crate::schedule::ScheduleMaterializer;
use crate::simulator::{CommandSimulator, CropSimulator};
use crate::types::{parse_sim_date, OptimizationOutcome, PlantingDate, Scenario, SoilProfile};

pub struct Orchestrator {
    config: SchedulerConfig,
    simulator: Arc<dyn CropSimulator>,
    provider: Box<dyn DataProvider>,
}

impl Orchestrator {
    /// Wire an explicit simulator; the data provider comes from `[acquisition]`.
    pub fn new(config: SchedulerConfig, simulator: Arc<dyn CropSimulator>) -> Self {
        let provider: Box<dyn DataProvider> =
            match CommandProvider::from_command_line(&config.acquisition.command) {
                Some(p) => Box::new(p.with_working_dir(config.acquisition.working_dir.clone())),
                None => Box::new(DisabledProvider),
            };
        Self {
            config,
            simulator,
            provider,
        }
    }

    /// Wire the external crop model from `[simulator]`.
    pub fn from_config(config: SchedulerConfig) -> SchedulerResult<Self> {
        let simulator = CommandSimulator::from_command_line(&config.simulator.command)
            .ok_or_else(|| {
                SchedulerError::invalid_input(
                    "simulator.command",
                    "no crop model command configured (set [simulator] command = [\"program\", ...])",
                )
            })?
            .with_working_dir(config.simulator.working_dir.clone());
        Ok(Self::new(config, Arc::new(simulator)))
    }

    pub fn with_provider(mut self, provider: Box<dyn DataProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run the full pipeline and return the clipped optimum and artifact path.
    pub fn run(&self) -> SchedulerResult<OptimizationOutcome> {
        let cfg = &self.config;
        info!(
            simulator = self.simulator.name(),
            stages = cfg.search.stages,
            num_searches = cfg.search.num_searches,
            "Starting trigger optimization"
        );

        self.ensure_inputs()?;
        let scenario = Arc::new(self.build_scenario()?);
        let evaluator = ObjectiveEvaluator::new(Arc::clone(&self.simulator), Arc::clone(&scenario));

        let start = StartPointSearch::new(scenario.stages, cfg.search.num_searches)
            .with_mode(cfg.search.mode)
            .with_seed(cfg.search.seed)
            .with_max_workers(cfg.search.max_workers)
            .find_start(&evaluator)?;
        if start.origin.is_fallback() {
            warn!(start = %start.vector, "Refining from the default start point");
        } else {
            info!(
                start = %start.vector,
                origin = ?start.origin,
                objective = start.objective,
                "Start point found"
            );
        }

        let refined = LocalRefiner::nelder_mead(&cfg.refine).refine(&evaluator, &start.vector)?;
        let optimal = refined.clipped();
        if optimal != refined {
            info!(refined = %refined, clipped = %optimal, "Refined triggers clipped to [0, 100]");
        }

        let diagnostics = match evaluator.evaluate_diagnostic(optimal.as_slice()) {
            Ok(d) => {
                info!(
                    yield_t_ha = d.yield_t_ha,
                    irrigation_mm = d.irrigation_mm,
                    "Expected performance of optimized triggers"
                );
                Some(d)
            }
            Err(e) => {
                warn!(error = %e, "Diagnostic evaluation failed, continuing without it");
                None
            }
        };

        let artifact = ScheduleMaterializer::new(Arc::clone(&self.simulator)).materialize(
            &optimal,
            &scenario,
            &cfg.paths.output,
        )?;

        Ok(OptimizationOutcome {
            optimal,
            start_origin: start.origin,
            diagnostics,
            schedule_days: artifact.schedule.len(),
            schedule_total_mm: artifact.schedule.total_mm(),
            schedule_path: artifact.path,
        })
    }

    /// Regenerate missing weather/soil files through the data provider.
    pub fn ensure_inputs(&self) -> SchedulerResult<()> {
        let missing = self.missing_inputs();
        if missing.is_empty() {
            return Ok(());
        }
        for m in &missing {
            warn!(kind = %m.kind, path = %m.path.display(), "Input missing, requesting regeneration");
        }
        self.provider.provide(&missing)?;

        if let Some(still) = self.missing_inputs().into_iter().next() {
            return Err(SchedulerError::MissingInput {
                detail: format!(
                    "data provider '{}' finished but produced no {} file",
                    self.provider.name(),
                    still.kind
                ),
                path: still.path,
            });
        }
        info!(provider = self.provider.name(), "Missing inputs regenerated");
        Ok(())
    }

    fn missing_inputs(&self) -> Vec<MissingArtifact> {
        let paths = &self.config.paths;
        [
            (ArtifactKind::Weather, paths.weather.as_path()),
            (ArtifactKind::Soil, paths.soil.as_path()),
        ]
        .into_iter()
        .filter_map(|(kind, path)| MissingArtifact::check(kind, path))
        .collect()
    }

    /// Parse dates, read the soil profile and check weather coverage.
    pub fn build_scenario(&self) -> SchedulerResult<Scenario> {
        let cfg = &self.config;
        let s = &cfg.scenario;

        let planting_date = PlantingDate::parse(&s.planting_date)?;
        let sim_start = parse_sim_date("scenario.sim_start", &s.sim_start)?;
        let sim_end = parse_sim_date("scenario.sim_end", &s.sim_end)?;
        if sim_end < sim_start {
            return Err(SchedulerError::invalid_input(
                "scenario.sim_end",
                format!("{} precedes scenario.sim_start {}", s.sim_end, s.sim_start),
            ));
        }
        if cfg.search.stages == 0 {
            return Err(SchedulerError::invalid_input("search.stages", "must be > 0"));
        }

        let layers = read_soil_layers(&cfg.paths.soil)?;
        let scenario = Scenario {
            crop: s.crop.clone(),
            planting_date,
            soil: SoilProfile {
                soil_type: s.soil_type.clone(),
                dz: s.layer_thicknesses.clone(),
                layers,
            },
            initial_water: s.initial_water.clone(),
            irrigation_method: s.irrigation_method,
            seasonal_cap_mm: s.seasonal_cap_mm,
            stages: cfg.search.stages,
            sim_start,
            sim_end,
            weather_path: cfg.paths.weather.clone(),
        };

        let weather = read_weather(&cfg.paths.weather)?;
        check_weather_coverage(&weather, &scenario)?;
        info!(
            crop = %scenario.crop,
            start = %scenario.sim_start,
            end = %scenario.sim_end,
            soil_layers = scenario.soil.layers.len(),
            weather_days = weather.days.len(),
            precipitation_mm = weather.total_precipitation(),
            "Scenario built"
        );
        Ok(scenario)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("simulator", &self.simulator.name())
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

/// The series must span the whole-year window simulated during search.
fn check_weather_coverage(weather: &WeatherSeries, scenario: &Scenario) -> SchedulerResult<()> {
    let (required_start, required_end) = scenario.evaluation_window();
    if weather.covers(required_start, required_end) {
        return Ok(());
    }
    match (weather.first_date(), weather.last_date()) {
        (Some(first), Some(last)) => Err(SchedulerError::WeatherCoverage {
            path: weather.path.clone(),
            first,
            last,
            required_start,
            required_end,
        }),
        _ => Err(SchedulerError::MissingInput {
            path: weather.path.clone(),
            detail: "weather file holds no daily rows".to_string(),
        }),
    }
}
