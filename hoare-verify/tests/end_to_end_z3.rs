#![cfg(feature = "z3")]

use std::collections::BTreeMap;

use hoare_ast::{Expr, Op, Stmt, VarType};
use hoare_verify::{SmtProfile, VerifyError, VerifyOptions, Verifier, Z3Prover};

fn verifier(vars: &[(&str, VarType)]) -> Verifier<Z3Prover> {
    let mut v = Verifier::new(Z3Prover::with_options(VerifyOptions::from_profile(SmtProfile::Thorough)));
    v.register("f", vars.iter().map(|(n, t)| (n.to_string(), *t)));
    v
}

fn ints(names: &[&'static str]) -> Vec<(&'static str, VarType)> {
    names.iter().map(|n| (*n, VarType::Int)).collect()
}

fn var(n: &str) -> Expr {
    Expr::var(n)
}

fn bin(l: Expr, op: Op, r: Expr) -> Expr {
    Expr::binary(l, op, r)
}

fn no_lengths() -> BTreeMap<String, i64> {
    BTreeMap::new()
}

fn add() -> Stmt {
    Stmt::assign("result", bin(var("x"), Op::Add, var("y")))
}

/// `r := 0; i := 1; while i <= n { r := r + i; i := i + 1 }`
fn sum_to_n(invariant: Expr) -> Stmt {
    Stmt::block([
        Stmt::assign("r", Expr::int(0)),
        Stmt::assign("i", Expr::int(1)),
        Stmt::while_loop(
            invariant,
            bin(var("i"), Op::Le, var("n")),
            Stmt::block([
                Stmt::assign("r", bin(var("r"), Op::Add, var("i"))),
                Stmt::assign("i", bin(var("i"), Op::Add, Expr::int(1))),
            ]),
        ),
    ])
}

fn sum_invariant(offset: i64) -> Expr {
    let triangle = bin(
        bin(bin(var("i"), Op::Sub, Expr::int(1)), Op::Mul, var("i")),
        Op::Div,
        Expr::int(2),
    );
    let triangle = if offset == 0 {
        triangle
    } else {
        bin(triangle, Op::Add, Expr::int(offset))
    };
    Expr::and(
        Expr::equals(var("r"), triangle),
        bin(var("i"), Op::Le, bin(var("n"), Op::Add, Expr::int(1))),
    )
}

#[test]
fn addition_of_naturals_is_natural() {
    let mut v = verifier(&ints(&["x", "y"]));
    let report = v
        .verify(&add(), "f", "x >= 0 and y >= 0", "result >= 0", false, &no_lengths())
        .unwrap();
    assert_eq!(report.proofs.len(), 1);
}

#[test]
fn wrong_postcondition_yields_counterexample() {
    let mut v = verifier(&ints(&["x", "y"]));
    let err = v
        .verify(&add(), "f", "x >= 0 and y >= 0", "result < 0", false, &no_lengths())
        .unwrap_err();
    let VerifyError::VerificationFailure(refutation) = &err else {
        panic!("expected verification failure, got {err:?}");
    };
    let cex = &refutation.counterexample;
    assert!(cex.model.is_some());
    let x: i64 = cex.value_of("x").unwrap().parse().unwrap();
    let y: i64 = cex.value_of("y").unwrap().parse().unwrap();
    assert!(x >= 0 && y >= 0);
}

#[test]
fn summation_loop_verifies() {
    let mut v = verifier(&ints(&["n"]));
    let report = v
        .verify(&sum_to_n(sum_invariant(0)), "f", "n >= 0", "r == n * (n + 1) / 2", true, &no_lengths())
        .unwrap();
    assert_eq!(report.proofs.len(), 4);
}

#[test]
fn broken_summation_invariant_is_reported_as_such() {
    let mut v = verifier(&ints(&["n"]));
    let err = v
        .verify(&sum_to_n(sum_invariant(1)), "f", "n >= 0", "r == n * (n + 1) / 2", true, &no_lengths())
        .unwrap_err();
    assert!(matches!(err, VerifyError::InvalidInvariant(_)), "got {err:?}");
}

#[test]
fn unestablished_invariant_without_invariant_check_fails_verification() {
    let mut v = verifier(&ints(&["n"]));
    let err = v
        .verify(&sum_to_n(sum_invariant(1)), "f", "n >= 0", "r == n * (n + 1) / 2", false, &no_lengths())
        .unwrap_err();
    assert!(matches!(err, VerifyError::VerificationFailure(_)), "got {err:?}");
}

#[test]
fn nested_loops_verify() {
    let inner = Stmt::while_loop(
        Expr::conjunction([
            bin(var("j"), Op::Le, var("i")),
            bin(Expr::int(0), Op::Le, var("i")),
            bin(var("i"), Op::Lt, var("n")),
        ]),
        bin(var("j"), Op::Lt, var("i")),
        Stmt::assign("j", bin(var("j"), Op::Add, Expr::int(1))),
    );
    let outer = Stmt::while_loop(
        Expr::and(bin(Expr::int(0), Op::Le, var("i")), bin(var("i"), Op::Le, var("n"))),
        bin(var("i"), Op::Lt, var("n")),
        Stmt::block([
            Stmt::assign("j", Expr::int(0)),
            inner,
            Stmt::assign("i", bin(var("i"), Op::Add, Expr::int(1))),
        ]),
    );
    let program = Stmt::seq(Stmt::assign("i", Expr::int(0)), outer);

    let mut v = verifier(&ints(&["n"]));
    v.verify(&program, "f", "n >= 0", "i == n", true, &no_lengths())
        .unwrap();
}

fn two_writes() -> Stmt {
    Stmt::block([
        Stmt::assign_element("a", var("i"), var("v1")),
        Stmt::assign_element("a", var("j"), var("v2")),
    ])
}

fn array_vars() -> Vec<(&'static str, VarType)> {
    let mut vars = ints(&["i", "j", "v1", "v2"]);
    vars.push(("a", VarType::Array));
    vars
}

#[test]
fn element_writes_respect_aliasing() {
    let mut v = verifier(&array_vars());
    v.verify(&two_writes(), "f", "i != j", "a[i] == v1", false, &no_lengths())
        .unwrap();
    v.verify(&two_writes(), "f", "True", "a[j] == v2", false, &no_lengths())
        .unwrap();
    v.verify(&two_writes(), "f", "i == j", "a[i] == v2", false, &no_lengths())
        .unwrap();

    let err = v
        .verify(&two_writes(), "f", "True", "a[i] == v1", false, &no_lengths())
        .unwrap_err();
    let cex = &err.refutation().unwrap().counterexample;
    assert_eq!(cex.value_of("i"), cex.value_of("j"));
}

#[test]
fn slices_compare_pointwise() {
    let mut vars = ints(&["n"]);
    vars.push(("a", VarType::Array));
    vars.push(("b", VarType::Array));
    let mut v = verifier(&vars);

    v.verify(&Stmt::Skip, "f", "n >= 1 and a[0:n] == b[0:n]", "a[1:n] == b[1:n]", false, &no_lengths())
        .unwrap();

    let lengths = BTreeMap::from([("a".to_string(), 5), ("b".to_string(), 5)]);
    v.verify(&Stmt::Skip, "f", "a == b", "a[2:] == b[2:]", false, &lengths)
        .unwrap();

    let err = v
        .verify(&Stmt::Skip, "f", "a == b", "a[2:] == b[2:]", false, &no_lengths())
        .unwrap_err();
    assert!(matches!(err, VerifyError::Unsupported(_)), "got {err:?}");
}

#[test]
fn whole_array_equality_survives_element_writes() {
    let mut vars = ints(&["i"]);
    vars.push(("a", VarType::Array));
    vars.push(("b", VarType::Array));
    let mut v = verifier(&vars);
    let copy_one = Stmt::assign_element("a", var("i"), Expr::subscript("b", var("i")));
    let lengths = BTreeMap::from([("a".to_string(), 5), ("b".to_string(), 5)]);

    // Agreement on the first five elements says nothing about `a[7]`,
    // with or without a write in between.
    let err = v
        .verify(&copy_one, "f", "a[0:] == b[0:]", "a == b", false, &lengths)
        .unwrap_err();
    assert!(matches!(err, VerifyError::VerificationFailure(_)), "got {err:?}");
    let err = v
        .verify(&Stmt::Skip, "f", "a[0:] == b[0:]", "a == b", false, &lengths)
        .unwrap_err();
    assert!(matches!(err, VerifyError::VerificationFailure(_)), "got {err:?}");

    // Whole-array equality needs no lengths.
    v.verify(&copy_one, "f", "a == b", "a == b", false, &no_lengths())
        .unwrap();
    let err = v
        .verify(&Stmt::assign_element("a", var("i"), Expr::int(1)), "f", "a == b", "a == b", false, &no_lengths())
        .unwrap_err();
    assert!(matches!(err, VerifyError::VerificationFailure(_)), "got {err:?}");

    // A written array compared with a slice is bounded by its length.
    v.verify(&copy_one, "f", "a[0:] == b[0:]", "a[0:] == b[0:]", false, &lengths)
        .unwrap();
}

#[test]
fn assumptions_and_assertions() {
    let mut v = verifier(&ints(&["x"]));
    let program = |bound: i64| {
        Stmt::block([
            Stmt::Assume(bin(var("x"), Op::Gt, Expr::int(0))),
            Stmt::assign("y", var("x")),
            Stmt::Assert(bin(var("y"), Op::Gt, Expr::int(bound))),
        ])
    };
    v.verify(&program(0), "f", "True", "True", false, &no_lengths())
        .unwrap();
    let err = v
        .verify(&program(1), "f", "True", "True", false, &no_lengths())
        .unwrap_err();
    let cex = &err.refutation().unwrap().counterexample;
    assert_eq!(cex.value_of("x"), Some("1"));
}

#[test]
fn havoc_forgets_previous_value() {
    let mut v = verifier(&ints(&["x"]));
    let reset = Stmt::seq(Stmt::assign("x", Expr::int(7)), Stmt::Havoc("x".into()));
    v.verify(
        &Stmt::seq(reset.clone(), Stmt::Assume(bin(var("x"), Op::Gt, Expr::int(5)))),
        "f",
        "True",
        "x > 0",
        false,
        &no_lengths(),
    )
    .unwrap();
    let err = v
        .verify(&reset, "f", "True", "x == 7", false, &no_lengths())
        .unwrap_err();
    assert!(matches!(err, VerifyError::VerificationFailure(_)));
}

#[test]
fn boolean_branches_and_quantifiers() {
    let mut vars = ints(&["x"]);
    vars.push(("flag", VarType::Bool));
    let mut v = verifier(&vars);
    let program = Stmt::if_then_else(
        var("flag"),
        Stmt::assign("x", Expr::int(1)),
        Stmt::assign("x", Expr::unary(Op::Sub, Expr::int(1))),
    );
    v.verify(&program, "f", "True", "(flag ==> x > 0) and (not flag ==> x < 0)", false, &no_lengths())
        .unwrap();
    v.verify(&program, "f", "True", "forall k :: k * x * x == k", false, &no_lengths())
        .unwrap();
    v.verify(&program, "f", "True", "exists k: int :: k + x == 0", false, &no_lengths())
        .unwrap();

    let err = v
        .verify(&program, "f", "True", "x > 0", false, &no_lengths())
        .unwrap_err();
    let cex = &err.refutation().unwrap().counterexample;
    assert_eq!(cex.value_of("flag"), Some("False"));
}
