//! tirflow - control flow analysis for a tree IR backend.
//!
//! The crate takes method bodies in TIR, a flat statement-list tree IR, and
//! runs the passes a compiler backend needs before emitting code: basic block
//! construction, reachability, live variable analysis, greedy trace layout and
//! jump fixing.
//!
//! # Primary Usage
//!
//! ```
//! use tirflow::core::{CompilationSession, PipelineOptions};
//! use tirflow::tir::Program;
//!
//! let program = Program::parse(
//!     "func f { (move (temp x) (const 1)) (return (temp x)) }",
//! )?;
//! let mut session = CompilationSession::new(PipelineOptions::default());
//! let bodies = session.compile_program(&program, None)?;
//! assert_eq!(bodies[0].cfg.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - [`tir`] - statement and expression types, text parser, filetest checker
//! - [`cfg`] - basic blocks and the control flow graph builder
//! - [`analysis`] - reachability and liveness
//! - [`layout`] - greedy block reordering and jump fixing
//! - [`core`] - errors and the compilation session

pub mod analysis;
pub mod cfg;
pub mod core;
pub mod layout;
pub mod tir;

pub use analysis::{Liveness, Reachability};
pub use cfg::{BasicBlock, BlockId, Cfg, CfgBuilder, Terminator};
pub use core::{
    CompilationSession, CompileError, CompileResult, CompiledBody, ParseError, PipelineOptions,
    PrintOptions, SessionStats,
};
pub use layout::{linearize, GreedyReordering, Trace};
pub use tir::{Expr, Function, Program, Stmt};
