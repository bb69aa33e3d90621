//! Data-acquisition collaborators.
//!
//! Weather and soil inputs are fetched and cleaned by external tooling. The
//! orchestrator only asks a [`DataProvider`] to (re)produce whichever
//! artifacts are missing, then re-checks that they exist.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

/// Kind of upstream artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Weather,
    Soil,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Weather => write!(f, "weather"),
            ArtifactKind::Soil => write!(f, "soil"),
        }
    }
}

/// An upstream artifact that is absent from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl MissingArtifact {
    /// Returns `Some` if nothing exists at `path`.
    pub fn check(kind: ArtifactKind, path: &Path) -> Option<Self> {
        if path.exists() {
            None
        } else {
            Some(Self {
                kind,
                path: path.to_path_buf(),
            })
        }
    }
}

/// Produces missing input artifacts.
pub trait DataProvider: Send + Sync {
    fn provide(&self, missing: &[MissingArtifact]) -> Result<(), ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no data provider configured to regenerate {kind} data")]
    Disabled { kind: ArtifactKind, path: PathBuf },

    #[error("failed to launch data provider '{program}' for {kind} data: {source}")]
    Launch {
        program: String,
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("data provider '{program}' exited with {status} while preparing {kind} data: {stderr}")]
    Failed {
        program: String,
        status: String,
        kind: ArtifactKind,
        path: PathBuf,
        stderr: String,
    },
}

impl ProviderError {
    /// Path of the artifact the provider was asked for.
    pub fn artifact_path(&self) -> PathBuf {
        match self {
            ProviderError::Disabled { path, .. }
            | ProviderError::Launch { path, .. }
            | ProviderError::Failed { path, .. } => path.clone(),
        }
    }
}

// ============================================================================
// Disabled provider
// ============================================================================

/// Provider used when no acquisition command is configured.
///
/// Any missing artifact is reported as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProvider;

impl DataProvider for DisabledProvider {
    fn provide(&self, missing: &[MissingArtifact]) -> Result<(), ProviderError> {
        match missing.first() {
            Some(m) => Err(ProviderError::Disabled {
                kind: m.kind,
                path: m.path.clone(),
            }),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// ============================================================================
// Command provider
// ============================================================================

/// Runs an external preparation command once for the whole missing set.
///
/// The command receives the artifact locations through the
/// `IRRIGATION_WEATHER_PATH` / `IRRIGATION_SOIL_PATH` environment variables
/// (only the missing ones are set).
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandProvider {
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
}

impl DataProvider for CommandProvider {
    fn provide(&self, missing: &[MissingArtifact]) -> Result<(), ProviderError> {
        let Some(first) = missing.first() else {
            return Ok(());
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for m in missing {
            let var = match m.kind {
                ArtifactKind::Weather => "IRRIGATION_WEATHER_PATH",
                ArtifactKind::Soil => "IRRIGATION_SOIL_PATH",
            };
            cmd.env(var, &m.path);
        }

        info!(
            program = %self.program,
            missing = missing.len(),
            "Running data provider for missing inputs"
        );
        let output = cmd.output().map_err(|source| ProviderError::Launch {
            program: self.program.clone(),
            kind: first.kind,
            path: first.path.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ProviderError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                kind: first.kind,
                path: first.path.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
