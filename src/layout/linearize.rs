// This module turns a laid-out graph back into a flat statement list for emission. Jumps are
// rewritten against the chosen block order: a jump to the block that follows is dropped, a
// conditional jump keeps a single explicit target (inverting its condition when the true
// target is the one that follows, and adding an explicit jump when neither target follows),
// and a block that used to fall through gets an explicit jump whenever its successor ended up
// elsewhere. Running off the end of the body is a target too: it is free for the last block in
// the layout and becomes a return anywhere else. Afterwards labels no jump refers to are
// removed. Blocks without a label that still need one get a synthetic _bb<id> label.

//! Jump fixing after block layout.

use hashbrown::HashSet;

use crate::cfg::{BasicBlock, BlockId, Cfg, Terminator};
use crate::tir::{CJump, Expr, Stmt};

use super::Trace;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Block(BlockId),
    /// Label never defined in the body; kept verbatim.
    Unresolved(String),
    /// Control leaves the body.
    Exit,
}

enum Emit {
    Label(BlockId),
    Body(Stmt),
    Jump(Target),
    CJump(Expr, Target),
    Return(Option<Expr>),
}

fn resolve(cfg: &Cfg, label: &str) -> Target {
    match cfg.block_for_label(label) {
        Some(id) => Target::Block(id),
        None => Target::Unresolved(label.to_string()),
    }
}

fn fallthrough(cfg: &Cfg, id: BlockId) -> Target {
    cfg.fallthrough(id).map_or(Target::Exit, Target::Block)
}

fn label_name(cfg: &Cfg, id: BlockId) -> String {
    cfg.block(id)
        .and_then(BasicBlock::label)
        .map(str::to_string)
        .unwrap_or_else(|| format!("_bb{}", id))
}

/// Transfer control to `target` unless it is where `next` already goes.
fn goto(emitted: &mut Vec<Emit>, target: Target, next: &Target) {
    if target == *next {
        return;
    }
    match target {
        Target::Exit => emitted.push(Emit::Return(None)),
        target => emitted.push(Emit::Jump(target)),
    }
}

/// Emit the blocks of `cfg` in `trace` order with jumps fixed up.
///
/// Every conditional jump in the result has exactly one target and falls
/// through otherwise. A block that used to run off the end of the body ends
/// in a return unless it is laid out last.
pub fn linearize(cfg: &Cfg, trace: &Trace) -> Vec<Stmt> {
    let order = trace.order();
    let mut emitted = Vec::new();

    for (pos, &id) in order.iter().enumerate() {
        let Some(block) = cfg.block(id) else {
            continue;
        };
        let next = order.get(pos + 1).map_or(Target::Exit, |&b| Target::Block(b));

        emitted.push(Emit::Label(id));
        emitted.extend(block.body().iter().cloned().map(Emit::Body));

        match block.terminator() {
            Some(Terminator::Return(value)) => emitted.push(Emit::Return(value.clone())),
            Some(Terminator::Jump(label)) => goto(&mut emitted, resolve(cfg, label), &next),
            Some(Terminator::CJump(cjump)) => {
                let true_target = resolve(cfg, &cjump.true_label);
                let false_target = match &cjump.false_label {
                    Some(label) => resolve(cfg, label),
                    None => fallthrough(cfg, id),
                };

                if next == true_target && false_target != Target::Exit {
                    emitted.push(Emit::CJump(cjump.cond.clone().negate(), false_target));
                } else {
                    emitted.push(Emit::CJump(cjump.cond.clone(), true_target));
                    goto(&mut emitted, false_target, &next);
                }
            }
            None => goto(&mut emitted, fallthrough(cfg, id), &next),
        }
    }

    let mut referenced: HashSet<BlockId> = HashSet::new();
    for emit in &emitted {
        if let Emit::Jump(Target::Block(id)) | Emit::CJump(_, Target::Block(id)) = emit {
            referenced.insert(*id);
        }
    }

    let target_name = |target: Target| match target {
        Target::Block(id) => label_name(cfg, id),
        Target::Unresolved(label) => label,
        // Exits are emitted as returns, never as jump targets.
        Target::Exit => String::new(),
    };

    let first = order.first().copied();
    let mut stmts = Vec::with_capacity(emitted.len());
    for emit in emitted {
        match emit {
            Emit::Label(id) => {
                let keep = referenced.contains(&id)
                    || (Some(id) == first && cfg.block(id).and_then(BasicBlock::label).is_some());
                if keep {
                    stmts.push(Stmt::Label(label_name(cfg, id)));
                }
            }
            Emit::Body(stmt) => stmts.push(stmt),
            Emit::Jump(target) => stmts.push(Stmt::Jump(target_name(target))),
            Emit::CJump(cond, target) => stmts.push(Stmt::CJump(CJump {
                cond,
                true_label: target_name(target),
                false_label: None,
            })),
            Emit::Return(value) => stmts.push(Stmt::Return(value)),
        }
    }

    log::debug!(
        "linearized {} blocks into {} statements",
        order.len(),
        stmts.len()
    );
    stmts
}
