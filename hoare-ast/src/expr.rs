#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::fresh::{base_name, FreshNames, FRESH_SEP};
use crate::op::Op;
use crate::types::VarType;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuantKind {
    Forall,
    Exists,
}

impl QuantKind {
    pub fn keyword(self) -> &'static str {
        match self {
            QuantKind::Forall => "forall",
            QuantKind::Exists => "exists",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quantifier {
    pub kind: QuantKind,
    pub var: String,
    /// Declared or inferred sort of the bound variable.
    pub ty: Option<VarType>,
    pub body: Box<Expr>,
    /// Set once the bound variable carries a fresh name and `exists` has been
    /// rewritten. Substitution and solving assume it.
    pub sanitized: bool,
}

/// `base[index]`, read through a list of pending element writes.
///
/// `overrides` holds `(index, value)` pairs accumulated by
/// [`Expr::substitute_element`]. They are consulted in order and the first
/// entry whose index equals the read index supplies the value; otherwise the
/// read falls through to `base`. An `index` that is an [`Expr::Slice`] makes
/// the node an array view rather than an element read.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subscript {
    pub base: Box<Expr>,
    pub index: Box<Expr>,
    pub overrides: Vec<(Expr, Expr)>,
}

impl Subscript {
    pub fn base_var(&self) -> Option<&str> {
        self.base.as_var()
    }

    pub fn is_slice(&self) -> bool {
        matches!(*self.index, Expr::Slice { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Var(String),
    Lit(Value),
    Unary {
        op: Op,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: Op,
        right: Box<Expr>,
    },
    Subscript(Subscript),
    /// The whole array `base` after the element writes in `writes`, with the
    /// same first-match-wins order as [`Subscript::overrides`]. Produced when
    /// an element write reaches a bare array operand.
    Store {
        base: Box<Expr>,
        writes: Vec<(Expr, Expr)>,
    },
    /// Bounds of a slice; only meaningful as the index of a [`Subscript`].
    Slice {
        lower: Box<Expr>,
        upper: Option<Box<Expr>>,
    },
    Quantifier(Quantifier),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::Lit(Value::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Lit(Value::Bool(b))
    }

    pub fn unary(op: Op, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(left: Expr, op: Op, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn negate(e: Expr) -> Self {
        Expr::unary(Op::Not, e)
    }

    pub fn and(l: Expr, r: Expr) -> Self {
        Expr::binary(l, Op::And, r)
    }

    pub fn implies(l: Expr, r: Expr) -> Self {
        Expr::binary(l, Op::Implies, r)
    }

    pub fn equals(l: Expr, r: Expr) -> Self {
        Expr::binary(l, Op::Eq, r)
    }

    pub fn subscript(base: impl Into<String>, index: Expr) -> Self {
        Expr::Subscript(Subscript {
            base: Box::new(Expr::Var(base.into())),
            index: Box::new(index),
            overrides: Vec::new(),
        })
    }

    /// `lower` defaults to `0` when omitted.
    pub fn slice(lower: Option<Expr>, upper: Option<Expr>) -> Self {
        Expr::Slice {
            lower: Box::new(lower.unwrap_or(Expr::int(0))),
            upper: upper.map(Box::new),
        }
    }

    pub fn quantifier(kind: QuantKind, var: impl Into<String>, ty: Option<VarType>, body: Expr) -> Self {
        Expr::Quantifier(Quantifier {
            kind,
            var: var.into(),
            ty,
            body: Box::new(body),
            sanitized: false,
        })
    }

    /// Left-nested conjunction; `True` when empty.
    pub fn conjunction(parts: impl IntoIterator<Item = Expr>) -> Self {
        parts
            .into_iter()
            .reduce(Expr::and)
            .unwrap_or(Expr::bool(true))
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var(name) => Some(name),
            _ => None,
        }
    }

    /// True for an array view (`a[l:u]`), not for element reads.
    pub fn is_slice_view(&self) -> bool {
        matches!(self, Expr::Subscript(sub) if sub.is_slice())
    }

    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut out);
        out
    }

    fn collect_free(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Lit(_) => {}
            Expr::Unary { operand, .. } => operand.collect_free(out),
            Expr::Binary { left, right, .. } => {
                left.collect_free(out);
                right.collect_free(out);
            }
            Expr::Subscript(sub) => {
                sub.base.collect_free(out);
                sub.index.collect_free(out);
                for (k, v) in &sub.overrides {
                    k.collect_free(out);
                    v.collect_free(out);
                }
            }
            Expr::Store { base, writes } => {
                base.collect_free(out);
                for (k, v) in writes {
                    k.collect_free(out);
                    v.collect_free(out);
                }
            }
            Expr::Slice { lower, upper } => {
                lower.collect_free(out);
                if let Some(upper) = upper {
                    upper.collect_free(out);
                }
            }
            Expr::Quantifier(q) => {
                let mut inner = q.body.free_variables();
                inner.remove(&q.var);
                out.extend(inner);
            }
        }
    }

    /// Capture-avoiding `self[replacement/name]`.
    ///
    /// Only free occurrences are replaced. A quantifier binding `name` shadows
    /// it; a quantifier whose bound variable occurs free in `replacement` is
    /// renamed first.
    pub fn substitute(&self, name: &str, replacement: &Expr) -> Expr {
        match self {
            Expr::Var(v) if v == name => replacement.clone(),
            Expr::Var(_) | Expr::Lit(_) => self.clone(),
            Expr::Unary { op, operand } => Expr::unary(*op, operand.substitute(name, replacement)),
            Expr::Binary { left, op, right } => Expr::binary(
                left.substitute(name, replacement),
                *op,
                right.substitute(name, replacement),
            ),
            Expr::Subscript(sub) => Expr::Subscript(Subscript {
                base: Box::new(sub.base.substitute(name, replacement)),
                index: Box::new(sub.index.substitute(name, replacement)),
                overrides: sub
                    .overrides
                    .iter()
                    .map(|(k, v)| (k.substitute(name, replacement), v.substitute(name, replacement)))
                    .collect(),
            }),
            Expr::Store { base, writes } => Expr::Store {
                base: Box::new(base.substitute(name, replacement)),
                writes: writes
                    .iter()
                    .map(|(k, v)| (k.substitute(name, replacement), v.substitute(name, replacement)))
                    .collect(),
            },
            Expr::Slice { lower, upper } => Expr::Slice {
                lower: Box::new(lower.substitute(name, replacement)),
                upper: upper
                    .as_ref()
                    .map(|u| Box::new(u.substitute(name, replacement))),
            },
            Expr::Quantifier(q) => Expr::Quantifier(q.rebind(name, replacement.free_variables(), |body| {
                body.substitute(name, replacement)
            })),
        }
    }

    /// Weakest-precondition substitution for the element write
    /// `array[index] := value`.
    ///
    /// Reads of `array` gain an override entry instead of being rewritten
    /// into a conditional tree. A bare `array` (used as a whole-array operand)
    /// becomes the [`Expr::Store`] `array{index -> value}`.
    pub fn substitute_element(&self, array: &str, index: &Expr, value: &Expr) -> Expr {
        match self {
            Expr::Var(v) if v == array => Expr::Store {
                base: Box::new(self.clone()),
                writes: vec![(index.clone(), value.clone())],
            },
            Expr::Var(_) | Expr::Lit(_) => self.clone(),
            Expr::Unary { op, operand } => Expr::unary(*op, operand.substitute_element(array, index, value)),
            Expr::Binary { left, op, right } => Expr::binary(
                left.substitute_element(array, index, value),
                *op,
                right.substitute_element(array, index, value),
            ),
            Expr::Subscript(sub) => {
                let (base, overrides) = write_through(&sub.base, &sub.overrides, array, index, value);
                Expr::Subscript(Subscript {
                    base,
                    index: Box::new(sub.index.substitute_element(array, index, value)),
                    overrides,
                })
            }
            Expr::Store { base, writes } => {
                let (base, writes) = write_through(base, writes, array, index, value);
                Expr::Store { base, writes }
            }
            Expr::Slice { lower, upper } => Expr::Slice {
                lower: Box::new(lower.substitute_element(array, index, value)),
                upper: upper
                    .as_ref()
                    .map(|u| Box::new(u.substitute_element(array, index, value))),
            },
            Expr::Quantifier(q) => {
                let mut incoming = index.free_variables();
                incoming.extend(value.free_variables());
                Expr::Quantifier(q.rebind(array, incoming, |body| body.substitute_element(array, index, value)))
            }
        }
    }

    /// Give every quantifier a fresh bound name and rewrite `exists x :: P`
    /// as `not forall x' :: not P[x'/x]`. Already-sanitized quantifiers are
    /// left untouched.
    pub fn sanitize(&self, fresh: &mut FreshNames) -> Expr {
        match self {
            Expr::Var(_) | Expr::Lit(_) => self.clone(),
            Expr::Unary { op, operand } => Expr::unary(*op, operand.sanitize(fresh)),
            Expr::Binary { left, op, right } => Expr::binary(left.sanitize(fresh), *op, right.sanitize(fresh)),
            Expr::Subscript(sub) => Expr::Subscript(Subscript {
                base: Box::new(sub.base.sanitize(fresh)),
                index: Box::new(sub.index.sanitize(fresh)),
                overrides: sub
                    .overrides
                    .iter()
                    .map(|(k, v)| (k.sanitize(fresh), v.sanitize(fresh)))
                    .collect(),
            }),
            Expr::Store { base, writes } => Expr::Store {
                base: Box::new(base.sanitize(fresh)),
                writes: writes
                    .iter()
                    .map(|(k, v)| (k.sanitize(fresh), v.sanitize(fresh)))
                    .collect(),
            },
            Expr::Slice { lower, upper } => Expr::Slice {
                lower: Box::new(lower.sanitize(fresh)),
                upper: upper.as_ref().map(|u| Box::new(u.sanitize(fresh))),
            },
            Expr::Quantifier(q) => q.sanitize(fresh),
        }
    }

    pub fn is_sanitized(&self) -> bool {
        match self {
            Expr::Var(_) | Expr::Lit(_) => true,
            Expr::Unary { operand, .. } => operand.is_sanitized(),
            Expr::Binary { left, right, .. } => left.is_sanitized() && right.is_sanitized(),
            Expr::Subscript(sub) => {
                sub.base.is_sanitized()
                    && sub.index.is_sanitized()
                    && sub
                        .overrides
                        .iter()
                        .all(|(k, v)| k.is_sanitized() && v.is_sanitized())
            }
            Expr::Store { base, writes } => {
                base.is_sanitized() && writes.iter().all(|(k, v)| k.is_sanitized() && v.is_sanitized())
            }
            Expr::Slice { lower, upper } => {
                lower.is_sanitized() && upper.as_ref().is_none_or(|u| u.is_sanitized())
            }
            Expr::Quantifier(q) => q.sanitized && q.kind == QuantKind::Forall && q.body.is_sanitized(),
        }
    }
}

impl Quantifier {
    fn sanitize(&self, fresh: &mut FreshNames) -> Expr {
        if self.sanitized {
            return Expr::Quantifier(self.clone());
        }
        let name = fresh.fresh(&self.var);
        let body = self
            .body
            .sanitize(fresh)
            .substitute(&self.var, &Expr::Var(name.clone()));
        let forall = |body: Expr| {
            Expr::Quantifier(Quantifier {
                kind: QuantKind::Forall,
                var: name.clone(),
                ty: self.ty,
                body: Box::new(body),
                sanitized: true,
            })
        };
        match self.kind {
            QuantKind::Forall => forall(body),
            QuantKind::Exists => Expr::negate(forall(Expr::negate(body))),
        }
    }

    /// Apply `f` to the body unless `target` is shadowed or absent, renaming
    /// the bound variable first if it occurs in `incoming`.
    fn rebind(&self, target: &str, incoming: BTreeSet<String>, f: impl FnOnce(&Expr) -> Expr) -> Quantifier {
        let body_free = self.body.free_variables();
        if self.var == target || !body_free.contains(target) {
            return self.clone();
        }
        let (var, body) = if incoming.contains(&self.var) {
            let mut avoid = body_free;
            avoid.extend(incoming);
            let renamed = unused_name(&self.var, &avoid);
            let body = self.body.substitute(&self.var, &Expr::Var(renamed.clone()));
            (renamed, body)
        } else {
            (self.var.clone(), (*self.body).clone())
        };
        Quantifier {
            kind: self.kind,
            var,
            ty: self.ty,
            body: Box::new(f(&body)),
            sanitized: self.sanitized,
        }
    }
}

/// Push the write `array[index] := value` through an override list over
/// `base`. The entry is added only when `base` is `array` itself and no equal
/// key already shadows it.
fn write_through(
    base: &Expr,
    entries: &[(Expr, Expr)],
    array: &str,
    index: &Expr,
    value: &Expr,
) -> (Box<Expr>, Vec<(Expr, Expr)>) {
    let mut entries: Vec<(Expr, Expr)> = entries
        .iter()
        .map(|(k, v)| {
            (
                k.substitute_element(array, index, value),
                v.substitute_element(array, index, value),
            )
        })
        .collect();
    if base.as_var() == Some(array) {
        if !entries.iter().any(|(k, _)| k == index) {
            entries.push((index.clone(), value.clone()));
        }
        (Box::new(base.clone()), entries)
    } else {
        (Box::new(base.substitute_element(array, index, value)), entries)
    }
}

fn unused_name(var: &str, avoid: &BTreeSet<String>) -> String {
    let base = base_name(var);
    (0..)
        .map(|k| format!("{base}{FRESH_SEP}r{k}"))
        .find(|candidate| !avoid.contains(candidate))
        .unwrap_or_else(|| format!("{base}{FRESH_SEP}r"))
}
