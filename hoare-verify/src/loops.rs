#![forbid(unsafe_code)]

use hoare_ast::{Expr, Stmt};

/// A loop replaced by its inductive-step encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedLoop {
    pub invariant: Expr,
    pub cond: Expr,
    /// Variables the loop may modify; each one is havoced.
    pub targets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopEncoding {
    pub stmt: Stmt,
    /// Encoded loops in source order, outer loops before the loops they
    /// contain.
    pub loops: Vec<EncodedLoop>,
}

/// Rewrite every `while` of `stmt` into
///
/// ```text
/// assert inv; havoc v...; assume inv;
/// if cond { body; assert inv; assume False } else { skip }
/// ```
///
/// where `v...` are the variables the loop body may modify. Proving
/// `wp(encoded, True)` then establishes that each invariant holds on entry
/// and survives one arbitrary iteration. Assertions already present in the
/// program become assumptions: they are obligations of the ordinary WP
/// pass, not of the invariant check.
pub fn encode_loops(stmt: &Stmt) -> LoopEncoding {
    let mut loops = Vec::new();
    let stmt = encode(stmt, &mut loops);
    LoopEncoding { stmt, loops }
}

fn encode(stmt: &Stmt, loops: &mut Vec<EncodedLoop>) -> Stmt {
    match stmt {
        Stmt::Skip | Stmt::Assign { .. } | Stmt::Assume(_) | Stmt::Havoc(_) => stmt.clone(),
        Stmt::Assert(e) => Stmt::Assume(e.clone()),
        Stmt::Seq(a, b) => {
            let a = encode(a, loops);
            Stmt::seq(a, encode(b, loops))
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let then_branch = encode(then_branch, loops);
            Stmt::if_then_else(cond.clone(), then_branch, encode(else_branch, loops))
        }
        Stmt::While {
            invariant,
            cond,
            body,
        } => {
            let targets: Vec<String> = body.modified_variables().into_iter().collect();
            loops.push(EncodedLoop {
                invariant: invariant.clone(),
                cond: cond.clone(),
                targets: targets.clone(),
            });
            let body = encode(body, loops);

            let step = Stmt::block([
                body,
                Stmt::Assert(invariant.clone()),
                Stmt::Assume(Expr::bool(false)),
            ]);
            let mut parts = vec![Stmt::Assert(invariant.clone())];
            parts.extend(targets.into_iter().map(Stmt::Havoc));
            parts.push(Stmt::Assume(invariant.clone()));
            parts.push(Stmt::if_then_else(cond.clone(), step, Stmt::Skip));
            Stmt::block(parts)
        }
    }
}
