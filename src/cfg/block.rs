//! Basic blocks.

use std::collections::BTreeSet;

use crate::tir::{CJump, Expr, Stmt};

use super::BlockId;

/// Control transfer ending a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Jump(String),
    CJump(CJump),
    Return(Option<Expr>),
}

impl Terminator {
    /// Labels this terminator may transfer control to.
    pub fn target_labels(&self) -> Vec<&str> {
        match self {
            Terminator::Jump(target) => vec![target],
            Terminator::CJump(cjump) => {
                let mut labels = vec![cjump.true_label.as_str()];
                labels.extend(cjump.false_label.as_deref());
                labels
            }
            Terminator::Return(_) => Vec::new(),
        }
    }
}

impl From<Terminator> for Stmt {
    fn from(term: Terminator) -> Self {
        match term {
            Terminator::Jump(target) => Stmt::Jump(target),
            Terminator::CJump(cjump) => Stmt::CJump(cjump),
            Terminator::Return(value) => Stmt::Return(value),
        }
    }
}

/// Maximal straight-line run of statements with a single entry.
///
/// The body holds ordinary statements and comments only; the optional label
/// heads the block and the optional terminator ends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    id: BlockId,
    label: Option<String>,
    body: Vec<Stmt>,
    terminator: Option<Terminator>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId, label: Option<String>) -> Self {
        Self {
            id,
            label,
            body: Vec::new(),
            terminator: None,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn body(&self) -> &[Stmt] {
        &self.body
    }

    pub fn terminator(&self) -> Option<&Terminator> {
        self.terminator.as_ref()
    }

    pub(crate) fn push(&mut self, stmt: Stmt) {
        debug_assert!(!stmt.is_control_transfer() && !matches!(stmt, Stmt::Label(_)));
        self.body.push(stmt);
    }

    pub(crate) fn terminate(&mut self, term: Terminator) {
        debug_assert!(self.terminator.is_none());
        self.terminator = Some(term);
    }

    /// The block's statements in program order, label and terminator included.
    pub fn statements(&self) -> Vec<Stmt> {
        let mut stmts = Vec::with_capacity(self.body.len() + 2);
        stmts.extend(self.label.clone().map(Stmt::Label));
        stmts.extend(self.body.iter().cloned());
        stmts.extend(self.terminator.clone().map(Stmt::from));
        stmts
    }

    /// Upward-exposed uses and definitions of the block.
    ///
    /// A variable is in `use` when some statement reads it before any write
    /// in this block, and in `def` when any statement writes it.
    pub fn use_def(&self) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut uses = BTreeSet::new();
        let mut defs = BTreeSet::new();

        let term = self.terminator.clone().map(Stmt::from);
        for stmt in self.body.iter().chain(term.as_ref()) {
            for var in stmt.reads() {
                if !defs.contains(var) {
                    uses.insert(var.to_string());
                }
            }
            if let Some(var) = stmt.written() {
                defs.insert(var.to_string());
            }
        }

        (uses, defs)
    }
}
