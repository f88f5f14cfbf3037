use std::collections::{BTreeMap, VecDeque};

use hoare_ast::{Expr, Op, Stmt, VarType};
use hoare_core::TypeEnv;
use hoare_verify::{
    Binding, Counterexample, NoZ3Prover, Prover, SourceTranslator, Vc, VcKind, Verdict, VerificationContext, Verifier,
    VerifyError,
};

/// Answers verdicts from a script (then `Valid`) and records what it saw.
#[derive(Default)]
struct ScriptedProver {
    script: VecDeque<Verdict>,
    checked: Vec<(VcKind, String)>,
    begins: usize,
    ends: usize,
}

impl ScriptedProver {
    fn answering(verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        Self {
            script: verdicts.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Prover for ScriptedProver {
    fn begin(&mut self, _cx: &VerificationContext) -> Result<(), VerifyError> {
        self.begins += 1;
        Ok(())
    }

    fn check_valid(&mut self, vc: &Vc, _cx: &VerificationContext) -> Result<Verdict, VerifyError> {
        self.checked.push((vc.kind, vc.label.clone()));
        Ok(self.script.pop_front().unwrap_or(Verdict::Valid))
    }

    fn end(&mut self) {
        self.ends += 1;
    }
}

fn refuted(x: &str) -> Verdict {
    Verdict::Refuted(Counterexample {
        model: Some(format!("x -> {x}")),
        bindings: vec![Binding {
            name: "x".into(),
            ty: VarType::Int,
            value: x.into(),
        }],
    })
}

fn verifier(prover: ScriptedProver) -> Verifier<ScriptedProver> {
    let mut v = Verifier::new(prover);
    v.register("f", [("x", VarType::Int), ("y", VarType::Int)]);
    v
}

fn add() -> Stmt {
    Stmt::assign("result", Expr::binary(Expr::var("x"), Op::Add, Expr::var("y")))
}

fn countdown() -> Stmt {
    Stmt::while_loop(
        Expr::binary(Expr::var("x"), Op::Ge, Expr::int(0)),
        Expr::binary(Expr::var("x"), Op::Gt, Expr::int(0)),
        Stmt::assign("x", Expr::binary(Expr::var("x"), Op::Sub, Expr::int(1))),
    )
}

fn no_lengths() -> BTreeMap<String, i64> {
    BTreeMap::new()
}

#[test]
fn success_reports_every_discharged_condition() {
    let mut v = verifier(ScriptedProver::default());
    let report = v
        .verify(&countdown(), "f", "x >= 0", "x == 0", true, &no_lengths())
        .unwrap();

    let kinds: Vec<_> = report.proofs.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![VcKind::Invariant, VcKind::General, VcKind::General, VcKind::General]);
    assert_eq!(report.scope, "f");

    let prover = v.prover_mut();
    assert_eq!(prover.begins, 1);
    assert_eq!(prover.ends, 1);
    assert_eq!(prover.checked.len(), 4);
    assert_eq!(prover.checked[1].1, "precondition implies weakest precondition");
}

#[test]
fn refuted_invariant_condition_is_an_invalid_invariant() {
    let mut v = verifier(ScriptedProver::answering([refuted("-1")]));
    let err = v
        .verify(&countdown(), "f", "True", "x == 0", true, &no_lengths())
        .unwrap_err();

    let VerifyError::InvalidInvariant(refutation) = &err else {
        panic!("expected invalid invariant, got {err:?}");
    };
    assert_eq!(refutation.counterexample.value_of("x"), Some("-1"));
    assert!(refutation.condition.contains("==>"));

    // Nothing after the first refutation is checked.
    let prover = v.prover_mut();
    assert_eq!(prover.checked.len(), 1);
    assert_eq!(prover.ends, 1);
}

#[test]
fn refuted_general_condition_is_a_verification_failure() {
    let mut v = verifier(ScriptedProver::answering([Verdict::Valid, refuted("0")]));
    let err = v
        .verify(&countdown(), "f", "x >= 0", "x == 0", true, &no_lengths())
        .unwrap_err();

    assert!(matches!(err, VerifyError::VerificationFailure(_)));
    assert_eq!(err.refutation().map(|r| r.label.as_str()), Some("precondition implies weakest precondition"));
    assert_eq!(err.to_string(), "verification failed: precondition implies weakest precondition (failed when x = 0)");
    assert_eq!(v.prover_mut().checked.len(), 2);
}

#[test]
fn without_invariant_checking_a_bad_invariant_is_a_verification_failure() {
    let mut v = verifier(ScriptedProver::answering([refuted("-5")]));
    let err = v
        .verify(&countdown(), "f", "True", "x == 0", false, &no_lengths())
        .unwrap_err();
    assert!(matches!(err, VerifyError::VerificationFailure(_)));
    assert_eq!(v.prover_mut().checked[0].0, VcKind::General);
}

#[test]
fn unknown_answer_is_never_a_proof() {
    let mut v = verifier(ScriptedProver::answering([Verdict::Unknown("timeout".into())]));
    let err = v.verify(&add(), "f", "True", "result >= 0", false, &no_lengths()).unwrap_err();
    let VerifyError::SolverUnknown { reason, .. } = err else {
        panic!("expected solver unknown");
    };
    assert_eq!(reason, "timeout");
}

#[test]
fn unregistered_scope_is_rejected_before_solving() {
    let mut v = verifier(ScriptedProver::default());
    let err = v.verify(&add(), "g", "True", "True", false, &no_lengths()).unwrap_err();
    assert!(matches!(err, VerifyError::UnknownScope(ref s) if s == "g"));
    assert_eq!(v.prover_mut().begins, 0);
}

#[test]
fn syntax_and_type_errors_abort_before_solving() {
    let mut v = verifier(ScriptedProver::default());

    let err = v.verify(&add(), "f", "x >", "True", false, &no_lengths()).unwrap_err();
    assert!(matches!(err, VerifyError::Parse(_)));

    let err = v.verify(&add(), "f", "x and y", "True", false, &no_lengths()).unwrap_err();
    assert!(matches!(err, VerifyError::Type(_)));

    let err = v.verify(&add(), "f", "True", "z > 0", false, &no_lengths()).unwrap_err();
    assert!(matches!(err, VerifyError::Type(_)));

    let prover = v.prover_mut();
    assert_eq!(prover.begins, 0);
    assert!(prover.checked.is_empty());
}

#[test]
fn fallback_prover_reports_missing_backend() {
    let mut v = Verifier::new(NoZ3Prover);
    v.register("f", [("x", VarType::Int), ("y", VarType::Int)]);
    let err = v.verify(&add(), "f", "True", "True", false, &no_lengths()).unwrap_err();
    assert!(matches!(err, VerifyError::Backend(ref msg) if msg.contains("--features hoare-verify/z3")));
}

/// Understands `name := literal` lines.
struct AssignmentsOnly;

impl SourceTranslator for AssignmentsOnly {
    fn translate(&self, source: &str, env: &mut TypeEnv) -> Result<Stmt, VerifyError> {
        let mut stmts = Vec::new();
        for line in source.lines().filter(|l| !l.trim().is_empty()) {
            let Some((name, value)) = line.split_once(":=") else {
                return Err(VerifyError::Unsupported(format!("cannot translate `{line}`")));
            };
            let value: i64 = value
                .trim()
                .parse()
                .map_err(|_| VerifyError::Unsupported(format!("not an integer: `{value}`")))?;
            env.declare_unknown(name.trim());
            stmts.push(Stmt::assign(name.trim(), Expr::int(value)));
        }
        Ok(Stmt::block(stmts))
    }
}

#[test]
fn verify_source_translates_then_verifies() {
    let mut v = verifier(ScriptedProver::default());
    let report = v
        .verify_source(&AssignmentsOnly, "z := 3\nx := 4\n", "f", "True", "z + x == 7", false)
        .unwrap();
    assert_eq!(report.proofs.len(), 1);
    assert_eq!(v.registry().scope("f").map(|s| s.len()), Some(2));

    let err = v
        .verify_source(&AssignmentsOnly, "z = 3", "f", "True", "True", false)
        .unwrap_err();
    assert!(matches!(err, VerifyError::Unsupported(_)));
}
