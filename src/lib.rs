//! Goat - constraint-based type inference for the goat language
//!
//! This library provides the inference front end: constraint generation over
//! a name-resolved program tree, unification, and the constraint solver.

pub mod compiler;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use compiler::{check_file, check_program, infer_program};
pub use config::InferConfig;
pub use error::Error;
