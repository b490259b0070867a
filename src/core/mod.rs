// This module holds the infrastructure shared by every backend pass: the error types reported
// while parsing and building graphs, and the compilation session that runs the passes over
// method bodies and keeps statistics about them.

//! Core infrastructure.
//!
//! ## Errors (`error`)
//! - [`CompileError`] for graph construction and driver failures
//! - [`ParseError`] with line and column of the offending TIR text
//!
//! ## Session (`session`)
//! - [`CompilationSession`] builds a CFG per body and runs the requested passes
//! - [`SessionStats`] summarizes what the session did

pub mod error;
pub mod session;

pub use error::{CompileError, CompileResult, ParseError};
pub use session::{
    CompilationSession, CompiledBody, PipelineOptions, PrintOptions, SessionStats,
};
