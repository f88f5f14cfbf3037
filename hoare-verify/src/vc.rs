#![forbid(unsafe_code)]

use std::fmt;

use hoare_ast::Expr;
use serde::Serialize;

/// Where a verification condition came from. Decides how a refutation is
/// reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VcKind {
    /// Produced by the loop encoding: the invariant is not established or
    /// not preserved.
    Invariant,
    /// Everything else: the postcondition, an assertion, or a loop exit.
    General,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vc {
    pub kind: VcKind,
    pub label: String,
    pub expr: Expr,
}

impl Vc {
    pub fn general(label: impl Into<String>, expr: Expr) -> Self {
        Self {
            kind: VcKind::General,
            label: label.into(),
            expr,
        }
    }

    pub fn invariant(label: impl Into<String>, expr: Expr) -> Self {
        Self {
            kind: VcKind::Invariant,
            label: label.into(),
            expr,
        }
    }
}

impl fmt::Display for Vc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.expr)
    }
}
