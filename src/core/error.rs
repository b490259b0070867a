// This module defines error types for tirflow using the thiserror crate for idiomatic Rust
// error handling. CompileError covers the malformed-IR conditions the backend refuses to paper
// over: a label defined twice in one method body and an edge inserted with a block id that is
// not in the graph arena. ParseError reports problems in hand-written TIR text together with
// the line and column where parsing stopped. CompileResult<T> is the convenience alias used by
// every pass so failures propagate with `?` instead of being silently skipped.

//! Error types for tirflow.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

use crate::cfg::BlockId;

/// Main error type for building and analysing a method body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Label {name} is defined more than once")]
    DuplicateLabel {
        name: String,
    },

    #[error("Edge {from} -> {to} refers to a block that does not exist")]
    UnknownBlock {
        from: BlockId,
        to: BlockId,
    },

    #[error("Function not found: {name}")]
    FunctionNotFound {
        name: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Error produced while reading TIR text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
