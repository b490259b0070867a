// This module defines the tree IR (TIR) that the lowering stage hands to the backend. A method
// body is a flat sequence of statements: labels, unconditional and conditional jumps, returns,
// comments and ordinary statements whose effect is either a move or an expression evaluated for
// its side effects. Statements and expressions are closed tagged unions so every pass dispatches
// with an exhaustive match. The module also knows which variables (temps) each statement reads
// and writes, which feeds the per-block use/def sets of live variable analysis, and it prints
// everything back in the same s-expression syntax the parser accepts.

//! Tree IR (TIR) statements and expressions.
//!
//! The textual form is a small s-expression syntax:
//!
//! ```text
//! ; Comments start with semicolon
//! func sum {
//!     (move (temp i) (const 0))
//!     (label Lhead)
//!     (cjump (lt (temp i) (temp n)) Lbody Lexit)
//!     (label Lbody)
//!     (move (temp i) (add (temp i) (const 1)))
//!     (jump Lhead)
//!     (label Lexit)
//!     (return (temp i))
//! }
//! ```

use std::fmt;

pub mod check;
pub mod parser;

pub use check::{CheckDirective, TestRunner, TestSpec};
pub use parser::parse_program;

/// Binary operators of TIR expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
}

impl BinOpKind {
    pub const fn keyword(self) -> &'static str {
        use BinOpKind::*;
        match self {
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Mod => "mod",
            And => "and",
            Or => "or",
            Xor => "xor",
            Eq => "eq",
            Neq => "neq",
            Lt => "lt",
            Gt => "gt",
            Leq => "leq",
            Geq => "geq",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        use BinOpKind::*;
        let op = match s {
            "add" => Add,
            "sub" => Sub,
            "mul" => Mul,
            "div" => Div,
            "mod" => Mod,
            "and" => And,
            "or" => Or,
            "xor" => Xor,
            "eq" => Eq,
            "neq" => Neq,
            "lt" => Lt,
            "gt" => Gt,
            "leq" => Leq,
            "geq" => Geq,
            _ => return None,
        };
        Some(op)
    }

    /// The comparison that holds exactly when `self` does not.
    pub const fn negated(self) -> Option<Self> {
        use BinOpKind::*;
        match self {
            Eq => Some(Neq),
            Neq => Some(Eq),
            Lt => Some(Geq),
            Geq => Some(Lt),
            Gt => Some(Leq),
            Leq => Some(Gt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(i64),
    /// A variable.
    Temp(String),
    /// Address of a named entity, e.g. a function.
    Name(String),
    Mem(Box<Expr>),
    BinOp {
        op: BinOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        target: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn temp(name: impl Into<String>) -> Self {
        Expr::Temp(name.into())
    }

    pub fn binop(op: BinOpKind, lhs: Expr, rhs: Expr) -> Self {
        Expr::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Boolean negation. Comparisons flip their operator; anything else is
    /// compared against zero.
    pub fn negate(self) -> Expr {
        match self {
            Expr::BinOp { op, lhs, rhs } => match op.negated() {
                Some(neg) => Expr::BinOp { op: neg, lhs, rhs },
                None => Expr::binop(BinOpKind::Eq, Expr::BinOp { op, lhs, rhs }, Expr::Const(0)),
            },
            other => Expr::binop(BinOpKind::Eq, other, Expr::Const(0)),
        }
    }

    /// Every variable read while evaluating this expression, in evaluation order.
    pub fn collect_temps<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Const(_) | Expr::Name(_) => {}
            Expr::Temp(name) => out.push(name),
            Expr::Mem(addr) => addr.collect_temps(out),
            Expr::BinOp { lhs, rhs, .. } => {
                lhs.collect_temps(out);
                rhs.collect_temps(out);
            }
            Expr::Call { target, args } => {
                target.collect_temps(out);
                for arg in args {
                    arg.collect_temps(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "(const {})", value),
            Expr::Temp(name) => write!(f, "(temp {})", name),
            Expr::Name(name) => write!(f, "(name {})", name),
            Expr::Mem(addr) => write!(f, "(mem {})", addr),
            Expr::BinOp { op, lhs, rhs } => write!(f, "({} {} {})", op.keyword(), lhs, rhs),
            Expr::Call { target, args } => {
                write!(f, "(call {}", target)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Conditional jump. A missing false label means control falls through to
/// the lexically next statement when the condition does not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CJump {
    pub cond: Expr,
    pub true_label: String,
    pub false_label: Option<String>,
}

/// Effect of an ordinary (non control flow) statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Move { dst: Expr, src: Expr },
    Exp(Expr),
}

impl Effect {
    fn collect_reads<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Effect::Move { dst, src } => {
                src.collect_temps(out);
                match dst {
                    Expr::Temp(_) => {}
                    Expr::Mem(addr) => addr.collect_temps(out),
                    other => other.collect_temps(out),
                }
            }
            Effect::Exp(expr) => expr.collect_temps(out),
        }
    }

    fn written(&self) -> Option<&str> {
        match self {
            Effect::Move {
                dst: Expr::Temp(name),
                ..
            } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Label(String),
    Jump(String),
    CJump(CJump),
    Return(Option<Expr>),
    Comment(String),
    Ordinary(Effect),
}

impl Stmt {
    pub fn label(name: impl Into<String>) -> Self {
        Stmt::Label(name.into())
    }

    pub fn jump(target: impl Into<String>) -> Self {
        Stmt::Jump(target.into())
    }

    pub fn cjump(cond: Expr, true_label: impl Into<String>, false_label: impl Into<String>) -> Self {
        Stmt::CJump(CJump {
            cond,
            true_label: true_label.into(),
            false_label: Some(false_label.into()),
        })
    }

    pub fn mov(dst: Expr, src: Expr) -> Self {
        Stmt::Ordinary(Effect::Move { dst, src })
    }

    pub fn exp(expr: Expr) -> Self {
        Stmt::Ordinary(Effect::Exp(expr))
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Stmt::Comment(text.into())
    }

    pub fn is_control_transfer(&self) -> bool {
        matches!(self, Stmt::Jump(_) | Stmt::CJump(_) | Stmt::Return(_))
    }

    /// Variables this statement reads. Reads happen before the write.
    pub fn reads(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Stmt::Label(_) | Stmt::Jump(_) | Stmt::Comment(_) | Stmt::Return(None) => {}
            Stmt::CJump(cjump) => cjump.cond.collect_temps(&mut out),
            Stmt::Return(Some(value)) => value.collect_temps(&mut out),
            Stmt::Ordinary(effect) => effect.collect_reads(&mut out),
        }
        out
    }

    /// The variable this statement writes, if any.
    pub fn written(&self) -> Option<&str> {
        match self {
            Stmt::Ordinary(effect) => effect.written(),
            _ => None,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Label(name) => write!(f, "(label {})", name),
            Stmt::Jump(target) => write!(f, "(jump {})", target),
            Stmt::CJump(CJump {
                cond,
                true_label,
                false_label,
            }) => match false_label {
                Some(false_label) => write!(f, "(cjump {} {} {})", cond, true_label, false_label),
                None => write!(f, "(cjump {} {})", cond, true_label),
            },
            Stmt::Return(Some(value)) => write!(f, "(return {})", value),
            Stmt::Return(None) => write!(f, "(return)"),
            Stmt::Comment(text) => {
                write!(f, "(comment \"")?;
                for ch in text.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        _ => write!(f, "{}", ch)?,
                    }
                }
                write!(f, "\")")
            }
            Stmt::Ordinary(Effect::Move { dst, src }) => write!(f, "(move {} {})", dst, src),
            Stmt::Ordinary(Effect::Exp(expr)) => write!(f, "(exp {})", expr),
        }
    }
}

/// One method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub body: Vec<Stmt>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func {} {{", self.name)?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        write!(f, "}}")
    }
}

/// A parsed TIR file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn parse(text: &str) -> Result<Self, crate::core::ParseError> {
        parser::parse_program(text)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|func| func.name == name)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, func) in self.functions.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", func)?;
        }
        Ok(())
    }
}
