pub mod ast;
pub mod constraints;
pub mod dump;
pub mod generator;
pub mod solver;
pub mod substitution;
pub mod types;
pub mod unify;

pub use generator::{ConstraintGenerator, InferError, generate};
pub use solver::{SolverError, solve, solve_with, solve_worklist};
pub use unify::unify;

use crate::compiler::ast::Program;
use crate::compiler::constraints::ConstraintSet;
use crate::compiler::substitution::SubstitutionSet;
use crate::compiler::types::Type;
use crate::config::InferConfig;
use crate::error::Error;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber for the binary.
///
/// Only takes effect when `RUST_LOG` is set or `trace_solver` is requested.
/// Later calls are no-ops.
pub fn init_tracing(trace_solver: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let from_env = std::env::var("RUST_LOG").is_ok();
        if !from_env && !trace_solver {
            return;
        }

        let mut filter = if from_env {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new("warn")
        };
        if trace_solver {
            if let Ok(directive) =
                "goat::compiler::solver=trace".parse::<tracing_subscriber::filter::Directive>()
            {
                filter = filter.add_directive(directive);
            }
        }

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

/// Where the optional intermediate dumps go. `Some(None)` means stderr.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    pub dump_constraints: Option<Option<PathBuf>>,
    pub dump_typed: Option<Option<PathBuf>>,
}

/// Result of a successful inference run.
#[derive(Debug, Clone)]
pub struct Inference {
    /// Tree as the generator annotated it, before substitution.
    pub annotated: Program<Type>,
    pub constraints: ConstraintSet,
    pub substitutions: SubstitutionSet,
}

impl Inference {
    /// Whether a unification failed somewhere.
    pub fn is_error(&self) -> bool {
        self.substitutions.is_error()
    }

    /// The annotated tree with every type resolved through the solved
    /// substitutions.
    pub fn resolved(&self) -> Program<Type> {
        resolve(self.annotated.clone(), &self.substitutions)
    }
}

/// Apply `substitutions` to every type in the tree.
pub fn resolve(program: Program<Type>, substitutions: &SubstitutionSet) -> Program<Type> {
    program.map_info(&mut |ty| substitutions.apply(&ty))
}

/// Generate and solve. A type error is reported inside the returned value,
/// not as an `Err`; faults in the engine or its inputs are `Err`.
pub fn infer_program(program: Program, config: &InferConfig) -> Result<Inference, Error> {
    let (annotated, constraints) = generate(program)?;
    let substitutions = solve_with(constraints.clone(), config)?;
    Ok(Inference {
        annotated,
        constraints,
        substitutions,
    })
}

/// Infer types for `program` and return the fully resolved tree.
///
/// A solved set of `{Error}` becomes [`Error::TypeError`].
pub fn check_program(program: Program, config: &InferConfig) -> Result<Program<Type>, Error> {
    let inference = infer_program(program, config)?;
    if inference.is_error() {
        return Err(Error::TypeError);
    }
    Ok(inference.resolved())
}

/// Read a program tree from a JSON file.
///
/// Nesting depth is not limited. The stack grows on demand while the tree
/// is parsed, so long operator chains load like any other program.
pub fn load_program(path: &Path) -> Result<Program, Error> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&content);
    deserializer.disable_recursion_limit();
    let program: Program = Program::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(program)
}

/// Type check a JSON program file.
pub fn check_file(path: &Path, config: &InferConfig) -> Result<Program<Type>, Error> {
    check_file_with_dump(path, config, &DumpOptions::default())
}

/// Type check a JSON program file, writing the requested dumps along the way.
///
/// Dumps are written before the type error, if any, is reported.
pub fn check_file_with_dump(
    path: &Path,
    config: &InferConfig,
    dump_opts: &DumpOptions,
) -> Result<Program<Type>, Error> {
    let program = load_program(path)?;
    let inference = infer_program(program, config)?;

    if let Some(target) = &dump_opts.dump_constraints {
        let output = format!(
            "{}{}",
            dump::format_constraints(&inference.constraints),
            dump::format_substitutions(&inference.substitutions)
        );
        write_dump(target.as_deref(), &output)?;
    }

    if inference.is_error() {
        return Err(Error::TypeError);
    }
    let resolved = inference.resolved();

    if let Some(target) = &dump_opts.dump_typed {
        write_dump(target.as_deref(), &dump::format_tree(&resolved))?;
    }

    Ok(resolved)
}

fn write_dump(target: Option<&Path>, output: &str) -> Result<(), Error> {
    match target {
        Some(path) => fs::write(path, output).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut stderr = std::io::stderr().lock();
            stderr
                .write_all(output.as_bytes())
                .map_err(|source| Error::Io {
                    path: PathBuf::from("<stderr>"),
                    source,
                })
        }
    }
}
