// This module holds the control flow graph of one method body. Basic blocks live in a dense
// arena indexed by BlockId and are owned only by the Cfg; predecessor and successor relations
// are ordered sets of block ids kept side by side with the arena, so the graph never holds
// references into itself and every query is deterministic (ascending id order). Block 0 is the
// entry block, the one holding the first non-comment statement of the stream. An empty stream
// produces a Cfg without blocks, reported through is_empty_body() instead of a missing entry.
// The Display impl is the stable dump used by golden filetests.

//! Control flow graph of basic blocks.

use std::collections::BTreeSet;
use std::fmt;

use hashbrown::HashMap;

use crate::core::{CompileError, CompileResult};

mod block;
pub mod builder;

pub use block::{BasicBlock, Terminator};
pub use builder::CfgBuilder;

/// Index of a basic block in its [`Cfg`]. Ids are assigned in statement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Control flow graph for a single method body.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    blocks: Vec<BasicBlock>,
    succs: Vec<BTreeSet<BlockId>>,
    preds: Vec<BTreeSet<BlockId>>,
    labels: HashMap<String, BlockId>,
    unresolved: Vec<String>,
    /// Block reached by running off the end of each block, if any.
    fallthrough: Vec<Option<BlockId>>,
}

impl Cfg {
    /// Build the graph for a statement stream. See [`CfgBuilder`].
    pub fn build<I>(stmts: I) -> CompileResult<Self>
    where
        I: IntoIterator<Item = crate::tir::Stmt>,
    {
        CfgBuilder::build(stmts)
    }

    /// Entry block, `None` for an empty body.
    pub fn entry(&self) -> Option<BlockId> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(BlockId(0))
        }
    }

    /// Whether the method body had no statements to put in a block.
    pub fn is_empty_body(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// All blocks in ascending id order.
    pub fn blocks(&self) -> std::slice::Iter<'_, BasicBlock> {
        self.blocks.iter()
    }

    pub fn block_ids(&self) -> impl DoubleEndedIterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Successors of `id` in ascending id order. Unknown ids have none.
    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.succs.get(id.index()).into_iter().flatten().copied()
    }

    /// Predecessors of `id` in ascending id order. Unknown ids have none.
    pub fn predecessors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.preds.get(id.index()).into_iter().flatten().copied()
    }

    pub fn has_edge(&self, from: BlockId, to: BlockId) -> bool {
        self.succs
            .get(from.index())
            .is_some_and(|succs| succs.contains(&to))
    }

    pub fn edge_count(&self) -> usize {
        self.succs.iter().map(BTreeSet::len).sum()
    }

    /// Whether the block ends in a conditional jump.
    pub fn is_branch_node(&self, id: BlockId) -> bool {
        self.branch_condition(id).is_some()
    }

    pub fn branch_condition(&self, id: BlockId) -> Option<&crate::tir::Expr> {
        match self.block(id)?.terminator() {
            Some(Terminator::CJump(cjump)) => Some(&cjump.cond),
            _ => None,
        }
    }

    /// Block headed by the given label.
    pub fn block_for_label(&self, label: &str) -> Option<BlockId> {
        self.labels.get(label).copied()
    }

    /// Block that control reaches when `id` ends without transferring it.
    ///
    /// Set for blocks without a terminator and for conditional jumps without
    /// a false label. `None` means control leaves the body.
    pub fn fallthrough(&self, id: BlockId) -> Option<BlockId> {
        self.fallthrough.get(id.index()).copied().flatten()
    }

    /// Jump targets that never appeared as a label in the body, sorted.
    pub fn unresolved_labels(&self) -> &[String] {
        &self.unresolved
    }

    /// Insert the edge `from -> to`. Both blocks must already exist.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> CompileResult<()> {
        let len = self.blocks.len();
        if from.index() >= len || to.index() >= len {
            return Err(CompileError::UnknownBlock { from, to });
        }
        log::trace!("Adding edge from node {} to node {}", from, to);
        self.succs[from.index()].insert(to);
        self.preds[to.index()].insert(from);
        Ok(())
    }

    pub(crate) fn push_block(&mut self, label: Option<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, label));
        self.succs.push(BTreeSet::new());
        self.preds.push(BTreeSet::new());
        self.fallthrough.push(None);
        id
    }

    /// Insert the edge taken when `from` runs off its end into `to`.
    pub(crate) fn add_fallthrough(&mut self, from: BlockId, to: BlockId) -> CompileResult<()> {
        self.add_edge(from, to)?;
        self.fallthrough[from.index()] = Some(to);
        Ok(())
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    pub(crate) fn define_label(&mut self, label: String, id: BlockId) {
        self.labels.insert(label, id);
    }

    pub(crate) fn set_unresolved(&mut self, mut labels: Vec<String>) {
        labels.sort();
        self.unresolved = labels;
    }
}

fn write_ids(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    ids: impl Iterator<Item = BlockId>,
) -> fmt::Result {
    write!(f, "{}:", title)?;
    for id in ids {
        write!(f, " {}", id)?;
    }
    writeln!(f)
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty_body() {
            return writeln!(f, "No entry node. Method is empty.");
        }

        writeln!(f, "CFG has {} nodes", self.blocks.len())?;
        for id in self.block_ids() {
            writeln!(f, "Node {}", id)?;
            writeln!(f, "Is a branch node? {}", self.is_branch_node(id))?;
            if let Some(cond) = self.branch_condition(id) {
                writeln!(f, "Condition: {}", cond)?;
            }
            write_ids(f, "Predecessors", self.predecessors(id))?;
            write_ids(f, "Successors", self.successors(id))?;
        }
        Ok(())
    }
}
