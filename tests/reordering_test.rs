//! Greedy block layout and jump fixing.

use std::collections::{BTreeMap, BTreeSet};

use tirflow::analysis::Reachability;
use tirflow::layout::{linearize, GreedyReordering};
use tirflow::tir::{BinOpKind, Effect, Expr, Program, Stmt};
use tirflow::{BlockId, Cfg};

const SOURCE: &str = r#"
func switchy {
    (cjump (eq (temp k) (const 0)) Lzero Lrest)
    (label Lrest)
    (cjump (eq (temp k) (const 1)) Lone Lother)
    (label Lzero)
    (move (temp r) (const 10))
    (jump Lout)
    (label Lone)
    (move (temp r) (const 11))
    (jump Lout)
    (label Lother)
    (move (temp r) (const 12))
    (label Lout)
    (return (temp r))
    (move (temp r) (const 13))
}
"#;

fn switchy() -> Cfg {
    let program = Program::parse(SOURCE).unwrap();
    let function = program.function("switchy").unwrap();
    Cfg::build(function.body.clone()).unwrap()
}

#[test]
fn test_trace_covers_reachable_blocks_once() {
    let cfg = switchy();
    let trace = GreedyReordering::run(&cfg);
    let reach = Reachability::compute(&cfg);

    let scheduled: BTreeSet<BlockId> = trace.order().iter().copied().collect();
    let reachable: BTreeSet<BlockId> = reach.reachable().collect();
    assert_eq!(scheduled.len(), trace.len());
    assert_eq!(scheduled, reachable);
    assert_eq!(trace.order().first(), cfg.entry().as_ref());
    assert!(!scheduled.contains(&BlockId(6)));
}

#[test]
fn test_traces_follow_edges() {
    let cfg = switchy();
    let trace = GreedyReordering::run(&cfg);

    for run in trace.traces() {
        for pair in run.windows(2) {
            assert!(cfg.has_edge(pair[0], pair[1]));
        }
    }
}

#[test]
fn test_layout_is_deterministic() {
    let cfg = switchy();
    assert_eq!(GreedyReordering::run(&cfg), GreedyReordering::run(&cfg));
}

#[test]
fn test_self_loop_is_its_own_trace() {
    let cfg = Cfg::build(vec![
        Stmt::label("Lloop"),
        Stmt::exp(Expr::temp("x")),
        Stmt::jump("Lloop"),
    ])
    .unwrap();

    let trace = GreedyReordering::run(&cfg);
    assert_eq!(trace.traces(), &[vec![BlockId(0)]]);
}

#[test]
fn test_linear_code_is_well_formed() {
    let cfg = switchy();
    let trace = GreedyReordering::run(&cfg);
    let stmts = linearize(&cfg, &trace);

    let defined: BTreeSet<&str> = stmts
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::Label(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();

    for (idx, stmt) in stmts.iter().enumerate() {
        match stmt {
            Stmt::Jump(target) => {
                assert!(defined.contains(target.as_str()));
                assert_ne!(
                    stmts.get(idx + 1),
                    Some(&Stmt::label(target.as_str())),
                    "jump to the next statement at {}",
                    idx
                );
            }
            Stmt::CJump(cjump) => {
                assert!(cjump.false_label.is_none());
                assert!(defined.contains(cjump.true_label.as_str()));
            }
            _ => {}
        }
    }

    // The dead store after the return is gone with its block.
    assert!(!stmts
        .iter()
        .any(|stmt| stmt == &Stmt::mov(Expr::temp("r"), Expr::Const(13))));
}

type Env = BTreeMap<String, i64>;

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Finished { value: Option<i64>, env: Env },
    Diverged,
}

fn eval(expr: &Expr, env: &Env) -> i64 {
    match expr {
        Expr::Const(value) => *value,
        Expr::Temp(name) => env.get(name).copied().unwrap_or(0),
        Expr::BinOp { op, lhs, rhs } => {
            let (a, b) = (eval(lhs, env), eval(rhs, env));
            match op {
                BinOpKind::Add => a.wrapping_add(b),
                BinOpKind::Sub => a.wrapping_sub(b),
                BinOpKind::Mul => a.wrapping_mul(b),
                BinOpKind::Div => a.checked_div(b).unwrap_or(0),
                BinOpKind::Mod => a.checked_rem(b).unwrap_or(0),
                BinOpKind::And => a & b,
                BinOpKind::Or => a | b,
                BinOpKind::Xor => a ^ b,
                BinOpKind::Eq => (a == b) as i64,
                BinOpKind::Neq => (a != b) as i64,
                BinOpKind::Lt => (a < b) as i64,
                BinOpKind::Gt => (a > b) as i64,
                BinOpKind::Leq => (a <= b) as i64,
                BinOpKind::Geq => (a >= b) as i64,
            }
        }
        Expr::Name(_) | Expr::Mem(_) | Expr::Call { .. } => 0,
    }
}

/// Execute a statement list; running past the last statement leaves the body.
fn execute(stmts: &[Stmt], mut env: Env) -> Outcome {
    let find = |label: &str| {
        stmts
            .iter()
            .position(|stmt| matches!(stmt, Stmt::Label(l) if l == label))
            .expect("jump to a label that is not in the body")
    };

    let mut pc = 0;
    for _ in 0..10_000 {
        let Some(stmt) = stmts.get(pc) else {
            return Outcome::Finished { value: None, env };
        };
        pc += 1;
        match stmt {
            Stmt::Label(_) | Stmt::Comment(_) => {}
            Stmt::Jump(target) => pc = find(target),
            Stmt::CJump(cjump) => {
                if eval(&cjump.cond, &env) != 0 {
                    pc = find(&cjump.true_label);
                } else if let Some(label) = &cjump.false_label {
                    pc = find(label);
                }
            }
            Stmt::Return(value) => {
                let value = value.as_ref().map(|v| eval(v, &env));
                return Outcome::Finished { value, env };
            }
            Stmt::Ordinary(Effect::Move { dst, src }) => {
                let value = eval(src, &env);
                if let Expr::Temp(name) = dst {
                    env.insert(name.clone(), value);
                }
            }
            Stmt::Ordinary(Effect::Exp(_)) => {}
        }
    }
    Outcome::Diverged
}

const BEHAVIOR: &str = r#"
func choose {
    (cjump (lt (temp x) (const 10)) Ltrue Lfalse)
    (label Ltrue)
    (move (temp a) (const 1))
    (jump Lend)
    (label Lfalse)
    (move (temp b) (const 2))
    (label Lend)
}

func guard {
    (label Lt)
    (move (temp x) (add (temp x) (const 1)))
    (cjump (lt (temp x) (temp n)) Lt)
}

func early {
    (jump Lhead)
    (label Lt)
    (return (const 1))
    (label Lhead)
    (cjump (eq (temp c) (const 1)) Lt)
}

func implicit {
    (cjump (temp c) Ldone)
    (move (temp x) (const 7))
    (label Ldone)
    (move (temp y) (add (temp x) (const 1)))
}

func count {
    (move (temp i) (const 0))
    (label Lhead)
    (cjump (lt (temp i) (temp n)) Lbody Lexit)
    (label Lbody)
    (move (temp i) (add (temp i) (const 1)))
    (jump Lhead)
    (label Lexit)
    (return (temp i))
}

func nested {
    (move (temp i) (const 0))
    (label Louter)
    (cjump (lt (temp i) (temp n)) Lbody Ldone)
    (label Lbody)
    (move (temp j) (const 0))
    (label Linner)
    (cjump (lt (temp j) (temp i)) Lstep Lnext)
    (label Lstep)
    (move (temp s) (add (temp s) (temp j)))
    (move (temp j) (add (temp j) (const 1)))
    (jump Linner)
    (label Lnext)
    (move (temp i) (add (temp i) (const 1)))
    (jump Louter)
    (label Ldone)
}
"#;

#[test]
fn test_linear_code_preserves_control_flow() {
    let program = Program::parse(BEHAVIOR).unwrap();
    let program = Program {
        functions: program
            .functions
            .into_iter()
            .chain(Program::parse(SOURCE).unwrap().functions)
            .collect(),
    };

    for function in &program.functions {
        let cfg = Cfg::build(function.body.clone()).unwrap();
        let trace = GreedyReordering::run(&cfg);
        let linear = linearize(&cfg, &trace);

        for value in -1..12 {
            let env: Env = ["x", "k", "c", "n"]
                .iter()
                .map(|var| (var.to_string(), value))
                .collect();

            let expected = execute(&function.body, env.clone());
            assert_ne!(expected, Outcome::Diverged, "{} with {}", function.name, value);
            assert_eq!(
                execute(&linear, env),
                expected,
                "{} with inputs = {}",
                function.name,
                value
            );
        }
    }
}
