#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use hoare_ast::{Expr, Stmt, VarType};
use hoare_core::{resolve_program, TypeEnv};
use hoare_parse::parse_assertion_with;
use serde::Serialize;
use tracing::{debug, info};

use crate::context::{Registry, VerificationContext};
use crate::error::{Refutation, VerifyError};
use crate::loops::encode_loops;
use crate::solver::{Prover, Verdict};
use crate::vc::{Vc, VcKind};
use crate::wp::wp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Success,
}

/// A discharged verification condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofNote {
    pub kind: VcKind,
    pub label: String,
}

/// Outcome of a successful `verify` call. Failures are reported as
/// [`VerifyError`] instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub scope: String,
    pub status: VerificationStatus,
    /// Obligations in the order they were proved.
    pub proofs: Vec<ProofNote>,
}

impl VerificationReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Front end turning host-language source into statement IR.
///
/// Implementations declare every variable they introduce in `env`, leaving
/// the type unknown where the source does not state it.
pub trait SourceTranslator {
    fn translate(&self, source: &str, env: &mut TypeEnv) -> Result<Stmt, VerifyError>;

    /// Lengths of the arrays the translated program works on.
    fn array_lengths(&self) -> BTreeMap<String, i64> {
        BTreeMap::new()
    }
}

pub struct Verifier<P: Prover> {
    prover: P,
    registry: Registry,
}

impl<P: Prover> Verifier<P> {
    pub fn new(prover: P) -> Self {
        Self::with_registry(prover, Registry::new())
    }

    pub fn with_registry(prover: P, registry: Registry) -> Self {
        Self { prover, registry }
    }

    pub fn register<N: Into<String>>(&mut self, scope: impl Into<String>, vars: impl IntoIterator<Item = (N, VarType)>) {
        self.registry.register(scope, vars);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn prover_mut(&mut self) -> &mut P {
        &mut self.prover
    }

    /// Prove `{pre} ir {post}` for a registered scope.
    ///
    /// With `check_invariants` set and at least one loop in `ir`, the loop
    /// invariants are checked first so that a broken invariant is reported
    /// as such. Stops at the first condition that is refuted or undecided.
    pub fn verify(
        &mut self,
        ir: &Stmt,
        scope: &str,
        pre: &str,
        post: &str,
        check_invariants: bool,
        array_lengths: &BTreeMap<String, i64>,
    ) -> Result<VerificationReport, VerifyError> {
        let env = self
            .registry
            .env_for(scope)
            .ok_or_else(|| VerifyError::UnknownScope(scope.to_string()))?;
        let mut cx = VerificationContext::new(scope, env, array_lengths.clone());

        let mut pre = parse_assertion_with(pre, &mut cx.fresh)?;
        let mut post = parse_assertion_with(post, &mut cx.fresh)?;
        let mut program = ir.sanitize(&mut cx.fresh);
        resolve_program(&mut cx.env, &mut program, &mut [&mut pre, &mut post])?;

        let vcs = conditions(&program, &pre, &post, check_invariants, &mut cx)?;
        let proofs = self.discharge(&vcs, &cx).inspect_err(|err| {
            info!(scope, error = %err, "verification failed");
        })?;
        info!(scope, proved = proofs.len(), "verified");
        Ok(VerificationReport {
            scope: scope.to_string(),
            status: VerificationStatus::Success,
            proofs,
        })
    }

    /// Translate `source` and verify the result. Variables the translator
    /// declares are added to the scope's registration; declared types win
    /// over translated ones.
    pub fn verify_source<T: SourceTranslator + ?Sized>(
        &mut self,
        translator: &T,
        source: &str,
        scope: &str,
        pre: &str,
        post: &str,
        check_invariants: bool,
    ) -> Result<VerificationReport, VerifyError> {
        let declared = self.registry.scope(scope).cloned().unwrap_or_default();
        let mut env = TypeEnv::from_declared(declared.iter().map(|(n, t)| (n.clone(), *t)));
        let ir = translator.translate(source, &mut env)?;

        let mut vars = declared;
        for (name, ty) in env.resolved() {
            vars.entry(name.to_string()).or_insert(ty);
        }
        self.registry.register(scope, vars);
        self.verify(&ir, scope, pre, post, check_invariants, &translator.array_lengths())
    }

    fn discharge(&mut self, vcs: &[Vc], cx: &VerificationContext) -> Result<Vec<ProofNote>, VerifyError> {
        let result = self.prover.begin(cx).and_then(|()| self.check_all(vcs, cx));
        self.prover.end();
        result
    }

    fn check_all(&mut self, vcs: &[Vc], cx: &VerificationContext) -> Result<Vec<ProofNote>, VerifyError> {
        let mut proofs = Vec::with_capacity(vcs.len());
        for vc in vcs {
            debug!(kind = ?vc.kind, label = %vc.label, formula = %vc.expr, "checking verification condition");
            match self.prover.check_valid(vc, cx)? {
                Verdict::Valid => proofs.push(ProofNote {
                    kind: vc.kind,
                    label: vc.label.clone(),
                }),
                Verdict::Refuted(counterexample) => {
                    let refutation = Box::new(Refutation {
                        label: vc.label.clone(),
                        condition: vc.expr.to_string(),
                        counterexample,
                    });
                    return Err(match vc.kind {
                        VcKind::Invariant => VerifyError::InvalidInvariant(refutation),
                        VcKind::General => VerifyError::VerificationFailure(refutation),
                    });
                }
                Verdict::Unknown(reason) => {
                    return Err(VerifyError::SolverUnknown {
                        label: vc.label.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(proofs)
    }
}

/// All verification conditions of `{pre} program {post}`, invariant check
/// first.
fn conditions(
    program: &Stmt,
    pre: &Expr,
    post: &Expr,
    check_invariants: bool,
    cx: &mut VerificationContext,
) -> Result<Vec<Vc>, VerifyError> {
    let mut vcs = Vec::new();
    if check_invariants && program.contains_loop() {
        let encoding = encode_loops(program);
        let (inductive, _) = wp(&encoding.stmt, &Expr::bool(true), cx)?;
        let invariants = encoding
            .loops
            .iter()
            .map(|l| format!("`{}`", l.invariant))
            .collect::<Vec<_>>()
            .join(", ");
        vcs.push(Vc::invariant(
            format!("loop invariants {invariants} hold on entry and are preserved"),
            Expr::implies(pre.clone(), inductive),
        ));
    }

    let (weakest, aux) = wp(program, post, cx)?;
    vcs.push(Vc::general(
        "precondition implies weakest precondition",
        Expr::implies(pre.clone(), weakest),
    ));
    vcs.extend(aux);
    Ok(vcs)
}
