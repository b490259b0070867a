// This module lays basic blocks out for emission with greedy trace scheduling. Starting from
// the smallest unmarked reachable block, a trace keeps growing through the lowest-id unmarked
// successor of its last block, so a branch continues into one of its targets and an
// unconditional jump into the next block becomes fallthrough. When the tail has no unmarked
// successor left the trace is finished and the next one is seeded. Concatenating the traces
// gives the final order, which covers every reachable block exactly once; dead blocks are left
// out since nothing can transfer control to them. Tie-breaking by id makes the layout a pure
// function of the graph.

//! Greedy maximal-trace block layout.

use std::collections::BTreeSet;
use std::fmt;

use crate::analysis::Reachability;
use crate::cfg::{BlockId, Cfg};

/// Linear block order made of greedily grown traces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    traces: Vec<Vec<BlockId>>,
    order: Vec<BlockId>,
}

impl Trace {
    /// The final block order.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    /// The individual traces whose concatenation is [`Trace::order`].
    pub fn traces(&self) -> &[Vec<BlockId>] {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Block laid out right after `id`, if any.
    pub fn next_after(&self, id: BlockId) -> Option<BlockId> {
        let pos = self.order.iter().position(|&b| b == id)?;
        self.order.get(pos + 1).copied()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, trace) in self.traces.iter().enumerate() {
            write!(f, "Trace {}:", idx)?;
            for id in trace {
                write!(f, " {}", id)?;
            }
            writeln!(f)?;
        }
        write!(f, "Order:")?;
        for id in &self.order {
            write!(f, " {}", id)?;
        }
        writeln!(f)
    }
}

/// Greedy trace scheduling.
pub struct GreedyReordering;

impl GreedyReordering {
    /// Compute the layout of every block reachable from the entry.
    pub fn run(cfg: &Cfg) -> Trace {
        let reach = Reachability::compute(cfg);
        let mut unmarked: BTreeSet<BlockId> = reach.reachable().collect();
        let mut traces = Vec::new();

        while let Some(seed) = unmarked.pop_first() {
            let mut trace = vec![seed];
            let mut tail = seed;

            while let Some(next) = cfg.successors(tail).find(|succ| unmarked.contains(succ)) {
                unmarked.remove(&next);
                trace.push(next);
                tail = next;
            }

            log::trace!("trace {}: {:?}", traces.len(), trace);
            traces.push(trace);
        }

        let order: Vec<BlockId> = traces.iter().flatten().copied().collect();
        log::debug!(
            "laid out {} blocks in {} traces",
            order.len(),
            traces.len()
        );
        Trace { traces, order }
    }
}
