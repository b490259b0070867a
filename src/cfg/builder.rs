// This module implements CfgBuilder, the single left-to-right pass that splits a TIR statement
// stream into basic blocks and connects them. A label always starts a new block and, when the
// previous block is still open, records the fallthrough edge into it. Jumps, conditional jumps
// and returns end the current block. Forward references are the interesting part: a jump to a
// label that has not been seen yet is parked in name_to_pred until the label shows up, and a
// conditional jump without a false label parks its block in pending_by_stmt, keyed by the index
// of the statement that follows it. Comments never move a block boundary. All of this state
// lives in one builder value per build() call, so nothing leaks between method bodies.

//! Construction of a [`Cfg`] from a TIR statement stream.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::core::{CompileError, CompileResult};
use crate::tir::{CJump, Effect, Stmt};

use super::{BlockId, Cfg, Terminator};

/// Single-pass translator from a statement stream to a [`Cfg`].
#[derive(Default)]
pub struct CfgBuilder {
    cfg: Cfg,
    /// Block currently receiving statements.
    current: Option<BlockId>,
    /// Comments seen while no block was open; they go to the next block.
    held_comments: Vec<Stmt>,
    /// Label name -> blocks that jump to it before it was defined.
    name_to_pred: HashMap<String, Vec<BlockId>>,
    /// Statement index -> blocks that continue at that statement.
    pending_by_stmt: BTreeMap<usize, Vec<BlockId>>,
}

impl CfgBuilder {
    /// Build the control flow graph of one method body.
    ///
    /// Block ids increase with statement order and the entry block (id 0)
    /// holds the first non-comment statement. A stream without such a
    /// statement yields an empty-body graph.
    pub fn build<I>(stmts: I) -> CompileResult<Cfg>
    where
        I: IntoIterator<Item = Stmt>,
    {
        let mut builder = Self::default();
        for (idx, stmt) in stmts.into_iter().enumerate() {
            builder.visit_stmt(idx, stmt)?;
        }
        builder.finish()
    }

    fn visit_stmt(&mut self, idx: usize, stmt: Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Label(name) => self.visit_label(idx, name),
            Stmt::Jump(target) => self.visit_jump(idx, target),
            Stmt::CJump(cjump) => self.visit_cjump(idx, cjump),
            Stmt::Return(value) => {
                let id = self.current_or_start(idx)?;
                self.terminate(id, Terminator::Return(value));
                Ok(())
            }
            Stmt::Comment(text) => {
                self.visit_comment(idx, text);
                Ok(())
            }
            Stmt::Ordinary(effect) => self.visit_ordinary(idx, effect),
        }
    }

    fn visit_label(&mut self, idx: usize, name: String) -> CompileResult<()> {
        if self.cfg.block_for_label(&name).is_some() {
            return Err(CompileError::DuplicateLabel { name });
        }

        let prev = self.current.take();
        let id = self.start_block(idx, Some(name.clone()))?;
        if let Some(prev) = prev {
            self.cfg.add_fallthrough(prev, id)?;
        }

        if let Some(preds) = self.name_to_pred.remove(&name) {
            for pred in preds {
                self.cfg.add_edge(pred, id)?;
            }
        }
        self.cfg.define_label(name, id);
        Ok(())
    }

    fn visit_jump(&mut self, idx: usize, target: String) -> CompileResult<()> {
        let id = self.current_or_start(idx)?;
        self.link_to_label(id, target.clone())?;
        self.terminate(id, Terminator::Jump(target));
        Ok(())
    }

    fn visit_cjump(&mut self, idx: usize, cjump: CJump) -> CompileResult<()> {
        let id = self.current_or_start(idx)?;
        self.link_to_label(id, cjump.true_label.clone())?;
        match &cjump.false_label {
            Some(false_label) => self.link_to_label(id, false_label.clone())?,
            None => self.pending_by_stmt.entry(idx + 1).or_default().push(id),
        }
        self.terminate(id, Terminator::CJump(cjump));
        Ok(())
    }

    fn visit_comment(&mut self, idx: usize, text: String) {
        match self.current {
            Some(id) => self.cfg.block_mut(id).push(Stmt::Comment(text)),
            None => {
                self.held_comments.push(Stmt::Comment(text));
                // Whatever continues here really continues at the next statement.
                if let Some(preds) = self.pending_by_stmt.remove(&idx) {
                    self.pending_by_stmt.entry(idx + 1).or_default().extend(preds);
                }
            }
        }
    }

    fn visit_ordinary(&mut self, idx: usize, effect: Effect) -> CompileResult<()> {
        let id = self.current_or_start(idx)?;
        self.cfg.block_mut(id).push(Stmt::Ordinary(effect));
        Ok(())
    }

    fn current_or_start(&mut self, idx: usize) -> CompileResult<BlockId> {
        match self.current {
            Some(id) => Ok(id),
            None => self.start_block(idx, None),
        }
    }

    fn start_block(&mut self, idx: usize, label: Option<String>) -> CompileResult<BlockId> {
        let id = self.cfg.push_block(label);
        log::trace!("block {} starts at statement {}", id, idx);

        for comment in self.held_comments.drain(..) {
            self.cfg.block_mut(id).push(comment);
        }
        if let Some(preds) = self.pending_by_stmt.remove(&idx) {
            for pred in preds {
                self.cfg.add_fallthrough(pred, id)?;
            }
        }

        self.current = Some(id);
        Ok(id)
    }

    fn link_to_label(&mut self, from: BlockId, label: String) -> CompileResult<()> {
        match self.cfg.block_for_label(&label) {
            Some(to) => self.cfg.add_edge(from, to),
            None => {
                self.name_to_pred.entry(label).or_default().push(from);
                Ok(())
            }
        }
    }

    fn terminate(&mut self, id: BlockId, term: Terminator) {
        self.cfg.block_mut(id).terminate(term);
        self.current = None;
    }

    fn finish(mut self) -> CompileResult<Cfg> {
        if !self.held_comments.is_empty() {
            log::trace!("dropping {} trailing comments", self.held_comments.len());
        }
        for (idx, preds) in &self.pending_by_stmt {
            log::debug!(
                "blocks {:?} fall through past the end of the body (statement {})",
                preds,
                idx
            );
        }

        let unresolved: Vec<String> = self.name_to_pred.drain().map(|(label, _)| label).collect();
        for label in &unresolved {
            log::warn!("jump target {} is never defined in this body", label);
        }
        self.cfg.set_unresolved(unresolved);

        log::debug!(
            "built CFG with {} blocks and {} edges",
            self.cfg.len(),
            self.cfg.edge_count()
        );
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tir::{BinOpKind, Expr};

    fn ids(iter: impl Iterator<Item = BlockId>) -> Vec<usize> {
        iter.map(BlockId::index).collect()
    }

    #[test]
    fn test_jump_to_next_label() {
        let cfg = CfgBuilder::build(vec![
            Stmt::label("L0"),
            Stmt::jump("L1"),
            Stmt::label("L1"),
            Stmt::Return(None),
        ])
        .unwrap();

        assert_eq!(cfg.len(), 2);
        assert_eq!(ids(cfg.successors(BlockId(0))), vec![1]);
        assert_eq!(ids(cfg.predecessors(BlockId(1))), vec![0]);
        assert_eq!(cfg.edge_count(), 1);
    }

    #[test]
    fn test_fallthrough_into_label() {
        let cfg = CfgBuilder::build(vec![
            Stmt::mov(Expr::temp("x"), Expr::Const(1)),
            Stmt::label("L1"),
            Stmt::Return(Some(Expr::temp("x"))),
        ])
        .unwrap();

        assert_eq!(cfg.len(), 2);
        assert!(cfg.has_edge(BlockId(0), BlockId(1)));
        assert_eq!(cfg.fallthrough(BlockId(0)), Some(BlockId(1)));
        assert_eq!(cfg.fallthrough(BlockId(1)), None);
        assert_eq!(cfg.block_for_label("L1"), Some(BlockId(1)));
    }

    #[test]
    fn test_backward_jump_resolves_immediately() {
        let cfg = CfgBuilder::build(vec![
            Stmt::label("Lloop"),
            Stmt::mov(Expr::temp("x"), Expr::Const(1)),
            Stmt::jump("Lloop"),
        ])
        .unwrap();

        assert_eq!(cfg.len(), 1);
        assert_eq!(ids(cfg.successors(BlockId(0))), vec![0]);
        assert_eq!(ids(cfg.predecessors(BlockId(0))), vec![0]);
    }

    #[test]
    fn test_code_after_return_is_its_own_block() {
        let cfg = CfgBuilder::build(vec![
            Stmt::Return(None),
            Stmt::mov(Expr::temp("x"), Expr::Const(1)),
            Stmt::Return(None),
        ])
        .unwrap();

        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg.edge_count(), 0);
    }

    #[test]
    fn test_cjump_without_false_label_targets_next_statement() {
        let cfg = CfgBuilder::build(vec![
            Stmt::CJump(CJump {
                cond: Expr::temp("c"),
                true_label: "Lt".to_string(),
                false_label: None,
            }),
            Stmt::comment("false branch"),
            Stmt::mov(Expr::temp("x"), Expr::Const(0)),
            Stmt::Return(Some(Expr::temp("x"))),
            Stmt::label("Lt"),
            Stmt::Return(Some(Expr::Const(1))),
        ])
        .unwrap();

        assert_eq!(cfg.len(), 3);
        assert_eq!(ids(cfg.successors(BlockId(0))), vec![1, 2]);
        assert_eq!(cfg.fallthrough(BlockId(0)), Some(BlockId(1)));
        let false_block = cfg.block(BlockId(1)).unwrap();
        assert_eq!(false_block.body()[0], Stmt::comment("false branch"));
    }

    #[test]
    fn test_fallthrough_off_the_end_leaves_the_body() {
        let cfg = CfgBuilder::build(vec![
            Stmt::label("Lt"),
            Stmt::mov(Expr::temp("x"), Expr::Const(1)),
            Stmt::CJump(CJump {
                cond: Expr::temp("c"),
                true_label: "Lt".to_string(),
                false_label: None,
            }),
        ])
        .unwrap();

        // The only edge is the back edge; the false path exits.
        assert_eq!(ids(cfg.successors(BlockId(0))), vec![0]);
        assert_eq!(cfg.fallthrough(BlockId(0)), None);
    }

    #[test]
    fn test_cjump_false_to_same_block_as_true() {
        let cfg = CfgBuilder::build(vec![
            Stmt::CJump(CJump {
                cond: Expr::temp("c"),
                true_label: "L".to_string(),
                false_label: None,
            }),
            Stmt::label("L"),
            Stmt::Return(None),
        ])
        .unwrap();

        assert_eq!(ids(cfg.successors(BlockId(0))), vec![1]);
        assert_eq!(cfg.fallthrough(BlockId(0)), Some(BlockId(1)));
    }

    #[test]
    fn test_cjump_to_same_label_twice_is_one_edge() {
        let cond = Expr::binop(BinOpKind::Eq, Expr::temp("a"), Expr::Const(0));
        let cfg = CfgBuilder::build(vec![
            Stmt::cjump(cond, "L", "L"),
            Stmt::label("L"),
            Stmt::Return(None),
        ])
        .unwrap();

        assert_eq!(ids(cfg.successors(BlockId(0))), vec![1]);
        assert!(cfg.is_branch_node(BlockId(0)));
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let err = CfgBuilder::build(vec![
            Stmt::label("L"),
            Stmt::Return(None),
            Stmt::label("L"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateLabel {
                name: "L".to_string()
            }
        );
    }

    #[test]
    fn test_unresolved_target_is_recorded() {
        let cfg = CfgBuilder::build(vec![Stmt::jump("Lnowhere")]).unwrap();
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.edge_count(), 0);
        assert_eq!(cfg.unresolved_labels(), ["Lnowhere".to_string()]);
    }

    #[test]
    fn test_only_comments_is_empty_body() {
        let cfg = CfgBuilder::build(vec![Stmt::comment("nothing here")]).unwrap();
        assert!(cfg.is_empty_body());
        assert_eq!(cfg.entry(), None);
    }
}
