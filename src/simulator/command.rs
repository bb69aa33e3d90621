//! External-process simulator adapter.
//!
//! Each `simulate()` call spawns the configured program, writes the
//! [`SimulationRequest`] as JSON to its stdin and reads a
//! [`SimulationOutput`] as JSON from its stdout. A process per evaluation
//! keeps workers fully isolated: no simulator state is shared between
//! concurrent start-point evaluations.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{CropSimulator, SimulationError, SimulationOutput, SimulationRequest};

/// Maximum stderr characters kept in a failure message.
const STDERR_EXCERPT_CHARS: usize = 2048;

#[derive(Debug, Clone)]
pub struct CommandSimulator {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandSimulator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Build from a `[program, args...]` list. Returns `None` when empty.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl CropSimulator for CommandSimulator {
    fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutput, SimulationError> {
        let payload = serde_json::to_vec(request)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| SimulationError::Launch {
            program: self.program.clone(),
            source,
        })?;

        // A model that exits early breaks the pipe; reap it first so its
        // stderr is reported instead of the write error.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&payload),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(STDERR_EXCERPT_CHARS).collect();
            return Err(SimulationError::Failed {
                status: output.status.to_string(),
                stderr: excerpt.trim().to_string(),
            });
        }

        written?;

        let parsed: SimulationOutput = serde_json::from_slice(&output.stdout)?;
        debug!(
            program = %self.program,
            seasons = parsed.seasons.len(),
            flux_days = parsed.water_flux.len(),
            "Simulator run complete"
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line() {
        let cmd = vec!["python".to_string(), "run_model.py".to_string(), "--quiet".to_string()];
        let sim = CommandSimulator::from_command_line(&cmd).unwrap();
        assert_eq!(sim.program(), "python");
        assert_eq!(sim.args, vec!["run_model.py", "--quiet"]);
        assert!(CommandSimulator::from_command_line(&[]).is_none());
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let sim = CommandSimulator::new("definitely-not-a-crop-model-binary", Vec::new());
        let scenario = crate::types::sample_scenario("2025/01/01", "2025/12/31");
        let (s, e) = scenario.evaluation_window();
        let req = SimulationRequest::for_scenario(&scenario, &[50.0; 4], s, e);
        let err = sim.simulate(&req).unwrap_err();
        assert!(matches!(err, SimulationError::Launch { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_early_exit_reports_status_and_stderr() {
        let sim = CommandSimulator::new(
            "sh",
            vec!["-c".to_string(), "echo 'no licence for crop model' >&2; exit 3".to_string()],
        );
        let scenario = crate::types::sample_scenario("2025/01/01", "2025/12/31");
        let (s, e) = scenario.evaluation_window();
        let req = SimulationRequest::for_scenario(&scenario, &[50.0; 4], s, e);
        match sim.simulate(&req).unwrap_err() {
            SimulationError::Failed { status, stderr } => {
                assert!(status.contains('3'), "{status}");
                assert_eq!(stderr, "no licence for crop model");
            }
            other => panic!("expected Failed, got {other}"),
        }
    }
}
