// This module implements live variable analysis over a method's control flow graph. Each block
// contributes its upward-exposed uses and its definitions; live-in and live-out sets are then
// grown to the fixpoint of out(n) = union of in(s) over successors s and in(n) = use(n) plus
// (out(n) minus def(n)). The sweep visits blocks in reverse id order, which for code laid out
// in statement order processes successors before predecessors and converges in few passes, and
// repeats until a full pass changes nothing. Sets only grow over a finite universe of variable
// names, so the loop terminates on any graph, loops included. Results are kept per block in
// ordered sets so dumps are stable. The same data drives the dead-store report.

//! Live variable analysis.

use std::collections::BTreeSet;
use std::fmt;

use crate::cfg::{BlockId, Cfg};
use crate::tir::Stmt;

/// Set of variable names.
pub type VarSet = BTreeSet<String>;

/// Liveness information for a single block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveInfo {
    /// Variables read before any write in the block.
    pub uses: VarSet,
    /// Variables written anywhere in the block.
    pub defs: VarSet,
    /// Variables live on entry.
    pub live_in: VarSet,
    /// Variables live on exit.
    pub live_out: VarSet,
}

/// A move into a variable that nothing reads afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadStore {
    pub block: BlockId,
    /// Index into the block body.
    pub stmt: usize,
    pub var: String,
}

/// Per-block liveness of a whole graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    info: Vec<LiveInfo>,
    passes: usize,
}

impl Liveness {
    /// Compute use/def and iterate in/out to the fixpoint.
    pub fn compute(cfg: &Cfg) -> Self {
        let mut info: Vec<LiveInfo> = cfg
            .blocks()
            .map(|block| {
                let (uses, defs) = block.use_def();
                LiveInfo {
                    uses,
                    defs,
                    ..LiveInfo::default()
                }
            })
            .collect();

        let mut passes = 0;
        loop {
            passes += 1;
            if !sweep(cfg, &mut info) {
                break;
            }
        }

        log::debug!(
            "liveness converged after {} passes over {} blocks",
            passes,
            info.len()
        );
        Self { info, passes }
    }

    pub fn info(&self, id: BlockId) -> Option<&LiveInfo> {
        self.info.get(id.index())
    }

    /// Number of full passes, including the final one that changed nothing.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Whether another sweep over `cfg` would leave every set unchanged.
    pub fn is_fixpoint(&self, cfg: &Cfg) -> bool {
        let mut copy = self.info.clone();
        !sweep(cfg, &mut copy)
    }

    /// Moves into variables that are not live right after the move.
    ///
    /// Side effects of the moved expression (calls) are not considered.
    pub fn dead_stores(&self, cfg: &Cfg) -> Vec<DeadStore> {
        let mut dead = Vec::new();

        for block in cfg.blocks() {
            let Some(info) = self.info(block.id()) else {
                continue;
            };
            let mut live = info.live_out.clone();

            if let Some(term) = block.terminator() {
                let term = Stmt::from(term.clone());
                live.extend(term.reads().into_iter().map(str::to_string));
            }

            let mut block_dead = Vec::new();
            for (idx, stmt) in block.body().iter().enumerate().rev() {
                if let Some(var) = stmt.written() {
                    if !live.contains(var) {
                        block_dead.push(DeadStore {
                            block: block.id(),
                            stmt: idx,
                            var: var.to_string(),
                        });
                    }
                    live.remove(var);
                }
                live.extend(stmt.reads().into_iter().map(str::to_string));
            }

            block_dead.reverse();
            dead.extend(block_dead);
        }

        dead
    }
}

/// One round-robin pass in reverse block order. Returns whether anything changed.
fn sweep(cfg: &Cfg, info: &mut [LiveInfo]) -> bool {
    let mut changed = false;

    for id in cfg.block_ids().rev() {
        let mut live_out = VarSet::new();
        for succ in cfg.successors(id) {
            live_out.extend(info[succ.index()].live_in.iter().cloned());
        }

        let node = &mut info[id.index()];
        let mut live_in = node.uses.clone();
        live_in.extend(live_out.difference(&node.defs).cloned());

        if node.live_out != live_out || node.live_in != live_in {
            node.live_out = live_out;
            node.live_in = live_in;
            changed = true;
        }
    }

    changed
}

fn write_set(f: &mut fmt::Formatter<'_>, title: &str, set: &VarSet) -> fmt::Result {
    write!(f, " {} {{", title)?;
    for (idx, var) in set.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", var)?;
    }
    write!(f, "}}")
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, info) in self.info.iter().enumerate() {
            write!(f, "Block {}:", idx)?;
            write_set(f, "use", &info.uses)?;
            write_set(f, "def", &info.defs)?;
            write_set(f, "in", &info.live_in)?;
            write_set(f, "out", &info.live_out)?;
            writeln!(f)?;
        }
        Ok(())
    }
}
