#![forbid(unsafe_code)]

use hoare_ast::{Expr, Quantifier, QuantKind, Stmt, Target};
use hoare_core::TypeError;

use crate::context::VerificationContext;
use crate::error::VerifyError;
use crate::vc::Vc;

/// Weakest precondition of `stmt` with respect to `post`.
///
/// Returns the precondition and the auxiliary conditions contributed by
/// loops, which must hold in every state independently of the
/// precondition.
pub fn wp(stmt: &Stmt, post: &Expr, cx: &mut VerificationContext) -> Result<(Expr, Vec<Vc>), VerifyError> {
    match stmt {
        Stmt::Skip => Ok((post.clone(), Vec::new())),
        Stmt::Assign {
            target: Target::Var(name),
            value,
        } => Ok((post.substitute(name, value), Vec::new())),
        Stmt::Assign {
            target: Target::Element { array, index },
            value,
        } => Ok((post.substitute_element(array, index, value), Vec::new())),
        Stmt::Seq(first, second) => {
            let (mid, mut second_vcs) = wp(second, post, cx)?;
            let (pre, mut vcs) = wp(first, &mid, cx)?;
            vcs.append(&mut second_vcs);
            Ok((pre, vcs))
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let (wp_then, mut vcs) = wp(then_branch, post, cx)?;
            let (wp_else, mut else_vcs) = wp(else_branch, post, cx)?;
            vcs.append(&mut else_vcs);
            let pre = Expr::and(
                Expr::implies(cond.clone(), wp_then),
                Expr::implies(Expr::negate(cond.clone()), wp_else),
            );
            Ok((pre, vcs))
        }
        Stmt::While {
            invariant,
            cond,
            body,
        } => {
            let (wp_body, mut vcs) = wp(body, invariant, cx)?;
            vcs.push(Vc::general(
                format!("loop body preserves invariant `{invariant}`"),
                Expr::implies(Expr::and(invariant.clone(), cond.clone()), wp_body),
            ));
            vcs.push(Vc::general(
                format!("loop exit `not {cond}` establishes the postcondition"),
                Expr::implies(Expr::and(invariant.clone(), Expr::negate(cond.clone())), post.clone()),
            ));
            Ok((invariant.clone(), vcs))
        }
        Stmt::Havoc(name) => {
            let Some(ty) = cx.env.lookup(name) else {
                return Err(TypeError::new(format!("cannot havoc `{name}` of unknown type")).into());
            };
            let fresh = cx.fresh.fresh(name);
            let body = post.substitute(name, &Expr::Var(fresh.clone()));
            let pre = Expr::Quantifier(Quantifier {
                kind: QuantKind::Forall,
                var: fresh,
                ty: Some(ty),
                body: Box::new(body),
                sanitized: true,
            });
            Ok((pre, Vec::new()))
        }
        Stmt::Assume(e) => Ok((Expr::implies(e.clone(), post.clone()), Vec::new())),
        Stmt::Assert(e) => Ok((Expr::and(e.clone(), post.clone()), Vec::new())),
    }
}
