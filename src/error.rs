//! Crate-level error type.

use crate::compiler::generator::InferError;
use crate::compiler::solver::SolverError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The solved substitution set is `{Error}`.
    #[error("type error in program")]
    TypeError,

    #[error("internal inference fault: {0}")]
    Infer(#[from] InferError),

    #[error("internal inference fault: {0}")]
    Solver(#[from] SolverError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid program tree: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Whether this is a fault in the inference engine or its inputs'
    /// preconditions rather than a user type error.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Infer(_) | Error::Solver(_))
    }
}
