#![forbid(unsafe_code)]

use hoare_ast::{Expr, Op, OpClass, Stmt, Target, VarType};
use tracing::trace;

use crate::env::TypeEnv;
use crate::error::TypeError;

/// `Some(t)` once known; `None` while pending inference.
pub type Ty = Option<VarType>;

fn show(ty: Ty) -> &'static str {
    ty.map(|t| t.display()).unwrap_or("<unknown>")
}

/// Unify `expr`'s sort `actual` with `expected`.
///
/// An unknown bare variable is bound to `expected` in `env` (reported as a
/// change). Equal sorts are a no-op. Anything else is a mismatch; there is no
/// subtyping.
pub fn check_and_update(expr: &Expr, actual: Ty, expected: VarType, env: &mut TypeEnv) -> Result<bool, TypeError> {
    match (actual, expr) {
        (None, Expr::Var(name)) => {
            env.set(name, Some(expected));
            Ok(true)
        }
        (None, _) => Ok(false),
        (Some(t), _) if t == expected => Ok(false),
        (Some(t), _) => Err(TypeError::new(format!(
            "type mismatch: `{expr}` has type {}, expected {}",
            t.display(),
            expected.display()
        ))),
    }
}

fn expect(env: &mut TypeEnv, expr: &mut Expr, expected: VarType) -> Result<bool, TypeError> {
    let (ty, mut changed) = resolve_expr(env, expr)?;
    changed |= check_and_update(expr, ty, expected, env)?;
    Ok(changed)
}

/// Infer and check the sort of `expr`, returning it along with whether any
/// binding in `env` (or any quantifier annotation in `expr`) changed.
pub fn resolve_expr(env: &mut TypeEnv, expr: &mut Expr) -> Result<(Ty, bool), TypeError> {
    match expr {
        Expr::Var(name) => match env.get_or_base(name) {
            Some(ty) => Ok((ty, false)),
            None => Err(TypeError::new(format!("unbound variable `{name}`"))),
        },
        Expr::Lit(v) => Ok((Some(v.ty()), false)),
        Expr::Unary { op, operand } => {
            if !op.is_unary() {
                return Err(TypeError::new(format!("`{op}` is not a unary operator")));
            }
            let ty = if op.is_arith() { VarType::Int } else { VarType::Bool };
            let changed = expect(env, operand, ty)?;
            Ok((Some(ty), changed))
        }
        Expr::Binary { left, op, right } => resolve_binary(env, left, *op, right),
        Expr::Subscript(sub) => {
            let mut changed = expect(env, &mut sub.base, VarType::Array)?;
            for (k, v) in sub.overrides.iter_mut() {
                changed |= expect(env, k, VarType::Int)?;
                changed |= expect(env, v, VarType::Int)?;
            }
            match sub.index.as_mut() {
                Expr::Slice { lower, upper } => {
                    changed |= expect(env, lower, VarType::Int)?;
                    if let Some(upper) = upper {
                        changed |= expect(env, upper, VarType::Int)?;
                    }
                    Ok((Some(VarType::Array), changed))
                }
                index => {
                    changed |= expect(env, index, VarType::Int)?;
                    Ok((Some(VarType::Int), changed))
                }
            }
        }
        Expr::Store { base, writes } => {
            let mut changed = expect(env, base, VarType::Array)?;
            for (k, v) in writes.iter_mut() {
                changed |= expect(env, k, VarType::Int)?;
                changed |= expect(env, v, VarType::Int)?;
            }
            Ok((Some(VarType::Array), changed))
        }
        Expr::Slice { .. } => Err(TypeError::new(format!(
            "slice bounds `{expr}` may only appear inside a subscript"
        ))),
        Expr::Quantifier(q) => {
            let previous = env.get(&q.var);
            env.set(&q.var, q.ty);
            let outcome = expect(env, &mut q.body, VarType::Bool);
            let inferred = env.get(&q.var).flatten();
            env.restore(&q.var, previous);
            let mut changed = outcome?;
            let Some(ty) = inferred else {
                return Err(TypeError::new(format!(
                    "cannot infer the type of bound variable `{}`",
                    q.var
                )));
            };
            changed |= q.ty != Some(ty);
            q.ty = Some(ty);
            Ok((Some(VarType::Bool), changed))
        }
    }
}

fn resolve_binary(env: &mut TypeEnv, left: &mut Expr, op: Op, right: &mut Expr) -> Result<(Ty, bool), TypeError> {
    let (lt, lc) = resolve_expr(env, left)?;
    let (rt, rc) = resolve_expr(env, right)?;
    let mut changed = lc | rc;

    let (operand, result) = match op.class() {
        OpClass::Arith => (VarType::Int, VarType::Int),
        OpClass::Bool if op.is_binary() => (VarType::Bool, VarType::Bool),
        OpClass::Bool => {
            return Err(TypeError::new(format!("`{op}` is not a binary operator")));
        }
        OpClass::Comp => {
            let arrays = lt == Some(VarType::Array) || rt == Some(VarType::Array);
            if arrays && !matches!(op, Op::Eq | Op::NEq) {
                return Err(TypeError::new(format!(
                    "`{op}` cannot compare arrays: `{left} {op} {right}`"
                )));
            }
            let operand = if arrays { VarType::Array } else { VarType::Int };
            (operand, VarType::Bool)
        }
    };

    changed |= check_and_update(left, lt, operand, env)?;
    changed |= check_and_update(right, rt, operand, env)?;
    Ok((Some(result), changed))
}

/// Check `stmt` and record the sorts of the variables it introduces.
pub fn resolve_stmt(env: &mut TypeEnv, stmt: &mut Stmt) -> Result<bool, TypeError> {
    match stmt {
        Stmt::Skip => Ok(false),
        Stmt::Assign {
            target: Target::Var(name),
            value,
        } => {
            let (ty, mut changed) = resolve_expr(env, value)?;
            match env.get(name) {
                None => {
                    env.set(name, ty);
                    changed = true;
                }
                Some(None) => {
                    if ty.is_some() {
                        env.set(name, ty);
                        changed = true;
                    }
                }
                Some(Some(declared)) => {
                    changed |= check_and_update(value, ty, declared, env).map_err(|_| {
                        TypeError::new(format!(
                            "cannot assign `{value}` of type {} to `{name}` of type {}",
                            show(ty),
                            declared.display()
                        ))
                    })?;
                }
            }
            Ok(changed)
        }
        Stmt::Assign {
            target: Target::Element { array, index },
            value,
        } => {
            let mut changed = match env.get(array) {
                None => {
                    env.set(array, Some(VarType::Array));
                    true
                }
                Some(ty) => check_and_update(&Expr::Var(array.clone()), ty, VarType::Array, env)?,
            };
            changed |= expect(env, index, VarType::Int)?;
            changed |= expect(env, value, VarType::Int)?;
            Ok(changed)
        }
        Stmt::Seq(a, b) => {
            let changed = resolve_stmt(env, a)?;
            Ok(resolve_stmt(env, b)? | changed)
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let mut changed = expect(env, cond, VarType::Bool)?;
            changed |= resolve_stmt(env, then_branch)?;
            changed |= resolve_stmt(env, else_branch)?;
            Ok(changed)
        }
        Stmt::Assert(e) | Stmt::Assume(e) => expect(env, e, VarType::Bool),
        Stmt::Havoc(name) => {
            if env.get_or_base(name).is_none() {
                return Err(TypeError::new(format!("cannot havoc unbound variable `{name}`")));
            }
            Ok(false)
        }
        Stmt::While {
            invariant,
            cond,
            body,
        } => {
            let mut changed = resolve_stmt(env, body)?;
            changed |= expect(env, cond, VarType::Bool)?;
            changed |= expect(env, invariant, VarType::Bool)?;
            Ok(changed)
        }
    }
}

/// Resolve a program together with its boolean assertions until no binding
/// changes, then require every variable to have a known sort.
pub fn resolve_program(env: &mut TypeEnv, stmt: &mut Stmt, assertions: &mut [&mut Expr]) -> Result<(), TypeError> {
    let mut round = 0usize;
    loop {
        round += 1;
        let mut changed = resolve_stmt(env, stmt)?;
        for assertion in assertions.iter_mut() {
            changed |= expect(env, assertion, VarType::Bool)?;
        }
        trace!(round, changed, vars = env.len(), "type resolution round");
        if !changed {
            break;
        }
    }

    let unresolved = env.unresolved();
    if !unresolved.is_empty() {
        return Err(TypeError::new(format!(
            "could not infer the type of {}",
            unresolved
                .iter()
                .map(|name| format!("`{name}`"))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    Ok(())
}
