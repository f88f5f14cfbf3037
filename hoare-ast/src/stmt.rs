#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::expr::Expr;
use crate::fresh::FreshNames;

/// Left-hand side of an assignment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Var(String),
    Element { array: String, index: Expr },
}

impl Target {
    /// The variable whose value the assignment changes.
    pub fn name(&self) -> &str {
        match self {
            Target::Var(name) => name,
            Target::Element { array, .. } => array,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stmt {
    Skip,
    Assign {
        target: Target,
        value: Expr,
    },
    Seq(Box<Stmt>, Box<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    Assert(Expr),
    Assume(Expr),
    Havoc(String),
    While {
        invariant: Expr,
        cond: Expr,
        body: Box<Stmt>,
    },
}

impl Stmt {
    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            target: Target::Var(name.into()),
            value,
        }
    }

    pub fn assign_element(array: impl Into<String>, index: Expr, value: Expr) -> Self {
        Stmt::Assign {
            target: Target::Element {
                array: array.into(),
                index,
            },
            value,
        }
    }

    pub fn seq(first: Stmt, second: Stmt) -> Self {
        Stmt::Seq(Box::new(first), Box::new(second))
    }

    /// Right-nested sequence of `stmts`; `Skip` when empty.
    pub fn block(stmts: impl IntoIterator<Item = Stmt>) -> Self {
        let mut stmts: Vec<Stmt> = stmts.into_iter().collect();
        let Some(mut acc) = stmts.pop() else {
            return Stmt::Skip;
        };
        while let Some(prev) = stmts.pop() {
            acc = Stmt::seq(prev, acc);
        }
        acc
    }

    pub fn if_then_else(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Self {
        Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn while_loop(invariant: Expr, cond: Expr, body: Stmt) -> Self {
        Stmt::While {
            invariant,
            cond,
            body: Box::new(body),
        }
    }

    pub fn assigned_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.walk(&mut |s| {
            if let Stmt::Assign { target, .. } = s {
                out.insert(target.name().to_string());
            }
        });
        out
    }

    pub fn havoced_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.walk(&mut |s| {
            if let Stmt::Havoc(name) = s {
                out.insert(name.clone());
            }
        });
        out
    }

    /// Variables whose value may differ after running the statement.
    pub fn modified_variables(&self) -> BTreeSet<String> {
        let mut out = self.assigned_variables();
        out.extend(self.havoced_variables());
        out
    }

    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.walk(&mut |s| match s {
            Stmt::Skip | Stmt::Seq(..) => {}
            Stmt::Assign { target, value } => {
                out.insert(target.name().to_string());
                if let Target::Element { index, .. } = target {
                    out.extend(index.free_variables());
                }
                out.extend(value.free_variables());
            }
            Stmt::If { cond, .. } => out.extend(cond.free_variables()),
            Stmt::Assert(e) | Stmt::Assume(e) => out.extend(e.free_variables()),
            Stmt::Havoc(name) => {
                out.insert(name.clone());
            }
            Stmt::While { invariant, cond, .. } => {
                out.extend(invariant.free_variables());
                out.extend(cond.free_variables());
            }
        });
        out
    }

    pub fn contains_loop(&self) -> bool {
        let mut found = false;
        self.walk(&mut |s| found |= matches!(s, Stmt::While { .. }));
        found
    }

    /// Pre-order traversal over this statement and every nested statement.
    pub fn walk(&self, f: &mut impl FnMut(&Stmt)) {
        f(self);
        match self {
            Stmt::Seq(a, b) => {
                a.walk(f);
                b.walk(f);
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.walk(f);
                else_branch.walk(f);
            }
            Stmt::While { body, .. } => body.walk(f),
            Stmt::Skip | Stmt::Assign { .. } | Stmt::Assert(_) | Stmt::Assume(_) | Stmt::Havoc(_) => {}
        }
    }

    /// Substitute `replacement` for `name` in every expression. Assignment
    /// and havoc targets are renamed only when `replacement` is a variable.
    pub fn substitute(&self, name: &str, replacement: &Expr) -> Stmt {
        let rename = |target: &str| match replacement.as_var() {
            Some(new_name) if target == name => new_name.to_string(),
            _ => target.to_string(),
        };
        match self {
            Stmt::Skip => Stmt::Skip,
            Stmt::Assign { target, value } => {
                let target = match target {
                    Target::Var(v) => Target::Var(rename(v)),
                    Target::Element { array, index } => Target::Element {
                        array: rename(array),
                        index: index.substitute(name, replacement),
                    },
                };
                Stmt::Assign {
                    target,
                    value: value.substitute(name, replacement),
                }
            }
            Stmt::Seq(a, b) => Stmt::seq(a.substitute(name, replacement), b.substitute(name, replacement)),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => Stmt::if_then_else(
                cond.substitute(name, replacement),
                then_branch.substitute(name, replacement),
                else_branch.substitute(name, replacement),
            ),
            Stmt::Assert(e) => Stmt::Assert(e.substitute(name, replacement)),
            Stmt::Assume(e) => Stmt::Assume(e.substitute(name, replacement)),
            Stmt::Havoc(v) => Stmt::Havoc(rename(v)),
            Stmt::While {
                invariant,
                cond,
                body,
            } => Stmt::while_loop(
                invariant.substitute(name, replacement),
                cond.substitute(name, replacement),
                body.substitute(name, replacement),
            ),
        }
    }

    /// Sanitize every quantifier appearing in the statement's expressions.
    pub fn sanitize(&self, fresh: &mut FreshNames) -> Stmt {
        match self {
            Stmt::Skip | Stmt::Havoc(_) => self.clone(),
            Stmt::Assign { target, value } => {
                let target = match target {
                    Target::Var(_) => target.clone(),
                    Target::Element { array, index } => Target::Element {
                        array: array.clone(),
                        index: index.sanitize(fresh),
                    },
                };
                Stmt::Assign {
                    target,
                    value: value.sanitize(fresh),
                }
            }
            Stmt::Seq(a, b) => {
                let a = a.sanitize(fresh);
                Stmt::seq(a, b.sanitize(fresh))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = cond.sanitize(fresh);
                let then_branch = then_branch.sanitize(fresh);
                Stmt::if_then_else(cond, then_branch, else_branch.sanitize(fresh))
            }
            Stmt::Assert(e) => Stmt::Assert(e.sanitize(fresh)),
            Stmt::Assume(e) => Stmt::Assume(e.sanitize(fresh)),
            Stmt::While {
                invariant,
                cond,
                body,
            } => {
                let invariant = invariant.sanitize(fresh);
                let cond = cond.sanitize(fresh);
                Stmt::while_loop(invariant, cond, body.sanitize(fresh))
            }
        }
    }
}
