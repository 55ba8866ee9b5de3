//! Inference configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Knobs for one inference run.
///
/// The default places no limit on the solver. The worklist always shrinks
/// or stalls, and stalls are caught by the no-progress check, so a budget
/// is only needed to cap the running time on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferConfig {
    /// Hard limit on worklist steps (0 = unlimited)
    pub max_solver_steps: usize,
    /// Log every solver step at trace level
    pub trace_solver: bool,
}

/// On-disk form of the configuration (goat.toml)
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub solver: SolverSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SolverSection {
    #[serde(default)]
    pub max_steps: usize,
    #[serde(default)]
    pub trace: bool,
}

impl From<ConfigFile> for InferConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            max_solver_steps: file.solver.max_steps,
            trace_solver: file.solver.trace,
        }
    }
}

impl From<&InferConfig> for ConfigFile {
    fn from(config: &InferConfig) -> Self {
        Self {
            solver: SolverSection {
                max_steps: config.max_solver_steps,
                trace: config.trace_solver,
            },
        }
    }
}

impl InferConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.into())
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let content = toml::to_string_pretty(&ConfigFile::from(self))?;
        fs::write(path, content).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether the step budget is bounded.
    pub fn is_bounded(&self) -> bool {
        self.max_solver_steps > 0
    }
}
