//! Forward reachability from the entry block.

use std::collections::VecDeque;

use crate::cfg::{BlockId, Cfg};

/// Which blocks control can reach from the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachability {
    reachable: Vec<bool>,
}

impl Reachability {
    /// Breadth-first search along successor edges. An empty body reaches nothing.
    pub fn compute(cfg: &Cfg) -> Self {
        let mut reachable = vec![false; cfg.len()];
        let mut queue = VecDeque::new();

        if let Some(entry) = cfg.entry() {
            reachable[entry.index()] = true;
            queue.push_back(entry);
        }

        while let Some(block) = queue.pop_front() {
            for succ in cfg.successors(block) {
                if !reachable[succ.index()] {
                    reachable[succ.index()] = true;
                    queue.push_back(succ);
                }
            }
        }

        let dead = reachable.iter().filter(|r| !**r).count();
        if dead > 0 {
            log::debug!("{} of {} blocks are unreachable", dead, cfg.len());
        }

        Self { reachable }
    }

    pub fn is_reachable(&self, id: BlockId) -> bool {
        self.reachable.get(id.index()).copied().unwrap_or(false)
    }

    /// Reachable blocks in ascending id order.
    pub fn reachable(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.ids_where(true)
    }

    /// Dead blocks in ascending id order.
    pub fn unreachable(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.ids_where(false)
    }

    fn ids_where(&self, wanted: bool) -> impl Iterator<Item = BlockId> + '_ {
        self.reachable
            .iter()
            .enumerate()
            .filter(move |(_, r)| **r == wanted)
            .map(|(idx, _)| BlockId(idx))
    }
}
