#![forbid(unsafe_code)]

use std::fmt;

use crate::expr::{Expr, Quantifier, Subscript};
use crate::op::Op;
use crate::stmt::{Stmt, Target};

// Binding strength of atoms and sign prefixes; above every binary operator.
const ATOM: u8 = 9;
const SIGN: u8 = 8;
const QUANT: u8 = 0;

fn precedence(e: &Expr) -> u8 {
    match e {
        Expr::Var(_) | Expr::Lit(_) | Expr::Subscript(_) | Expr::Store { .. } | Expr::Slice { .. } => ATOM,
        Expr::Unary { op: Op::Not, .. } => Op::Not.precedence(),
        Expr::Unary { .. } => SIGN,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Quantifier(_) => QUANT,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, e: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({e})")
    } else {
        write!(f, "{e}")
    }
}

/// `base{k -> v, ...}`; the braces are omitted when there are no writes.
fn write_updated(f: &mut fmt::Formatter<'_>, base: &Expr, writes: &[(Expr, Expr)]) -> fmt::Result {
    write_operand(f, base, precedence(base) < ATOM)?;
    if !writes.is_empty() {
        f.write_str("{")?;
        for (i, (k, v)) in writes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k} -> {v}")?;
        }
        f.write_str("}")?;
    }
    Ok(())
}

fn write_subscript(f: &mut fmt::Formatter<'_>, sub: &Subscript) -> fmt::Result {
    write_updated(f, &sub.base, &sub.overrides)?;
    write!(f, "[{}]", sub.index)
}

fn write_quantifier(f: &mut fmt::Formatter<'_>, q: &Quantifier) -> fmt::Result {
    write!(f, "{} {}", q.kind.keyword(), q.var)?;
    if let Some(ty) = q.ty {
        write!(f, ": {ty}")?;
    }
    write!(f, " :: {}", q.body)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => f.write_str(name),
            Expr::Lit(v) => write!(f, "{v}"),
            Expr::Unary { op: Op::Not, operand } => {
                f.write_str("not ")?;
                write_operand(f, operand, precedence(operand) <= Op::Not.precedence())
            }
            Expr::Unary { op, operand } => {
                write!(f, "{op}")?;
                write_operand(f, operand, precedence(operand) < ATOM)
            }
            Expr::Binary { left, op, right } => {
                let p = op.precedence();
                write_operand(f, left, precedence(left) < p)?;
                write!(f, " {op} ")?;
                write_operand(f, right, precedence(right) <= p)
            }
            Expr::Subscript(sub) => write_subscript(f, sub),
            Expr::Store { base, writes } => write_updated(f, base, writes),
            Expr::Slice { lower, upper } => {
                write!(f, "{lower}:")?;
                if let Some(upper) = upper {
                    write!(f, "{upper}")?;
                }
                Ok(())
            }
            Expr::Quantifier(q) => write_quantifier(f, q),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Var(name) => f.write_str(name),
            Target::Element { array, index } => write!(f, "{array}[{index}]"),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Skip => f.write_str("skip"),
            Stmt::Assign { target, value } => write!(f, "{target} := {value}"),
            Stmt::Seq(a, b) => write!(f, "{a}; {b}"),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "if {cond} {{ {then_branch} }} else {{ {else_branch} }}"),
            Stmt::Assert(e) => write!(f, "assert {e}"),
            Stmt::Assume(e) => write!(f, "assume {e}"),
            Stmt::Havoc(name) => write!(f, "havoc {name}"),
            Stmt::While {
                invariant,
                cond,
                body,
            } => write!(f, "while {cond} invariant {invariant} {{ {body} }}"),
        }
    }
}
