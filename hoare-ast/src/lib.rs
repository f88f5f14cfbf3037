#![forbid(unsafe_code)]

mod expr;
mod fmt;
mod fresh;
mod op;
mod stmt;
mod types;
mod value;

use miette::SourceSpan;

pub use expr::{Expr, QuantKind, Quantifier, Subscript};
pub use fresh::{base_name, is_generated, FreshNames, FORK_SEP, FRESH_SEP};
pub use op::{Op, OpClass};
pub use stmt::{Stmt, Target};
pub use types::VarType;
pub use value::Value;

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_plus_one() -> Expr {
        Expr::binary(Expr::var("x"), Op::Add, Expr::int(1))
    }

    #[test]
    fn substitute_replaces_only_free_occurrences() {
        // (x > 0) and (forall x :: x == x)
        let e = Expr::and(
            Expr::binary(Expr::var("x"), Op::Gt, Expr::int(0)),
            Expr::quantifier(
                QuantKind::Forall,
                "x",
                Some(VarType::Int),
                Expr::equals(Expr::var("x"), Expr::var("x")),
            ),
        );
        let out = e.substitute("x", &Expr::var("y"));
        let Expr::Binary { left, right, .. } = &out else {
            panic!("expected conjunction, got {out}");
        };
        assert_eq!(left.to_string(), "y > 0");
        assert_eq!(right.to_string(), "forall x: int :: x == x");
    }

    #[test]
    fn substitute_renames_bound_variable_to_avoid_capture() {
        // forall y :: x < y, substituting x := y must not capture the new y.
        let q = Expr::quantifier(
            QuantKind::Forall,
            "y",
            Some(VarType::Int),
            Expr::binary(Expr::var("x"), Op::Lt, Expr::var("y")),
        );
        let out = q.substitute("x", &Expr::var("y"));
        let Expr::Quantifier(q) = &out else {
            panic!("expected quantifier, got {out}");
        };
        assert_ne!(q.var, "y");
        assert!(q.var.starts_with("y$"));
        assert_eq!(out.free_variables().into_iter().collect::<Vec<_>>(), vec!["y".to_string()]);
    }

    #[test]
    fn exists_sanitizes_to_negated_forall() {
        let mut fresh = FreshNames::new();
        let e = Expr::quantifier(
            QuantKind::Exists,
            "i",
            Some(VarType::Int),
            Expr::binary(Expr::var("i"), Op::Gt, Expr::var("n")),
        );
        let out = e.sanitize(&mut fresh);
        assert_eq!(out.to_string(), "not (forall i$0: int :: not i$0 > n)");
        assert!(out.is_sanitized());
    }

    #[test]
    fn sanitize_is_idempotent() {
        let mut fresh = FreshNames::new();
        let e = Expr::quantifier(
            QuantKind::Forall,
            "k",
            None,
            Expr::quantifier(QuantKind::Exists, "j", None, Expr::equals(Expr::var("k"), Expr::var("j"))),
        );
        let once = e.sanitize(&mut fresh);
        let twice = once.sanitize(&mut fresh);
        assert_eq!(once, twice);
    }

    #[test]
    fn element_write_accumulates_override_entries() {
        // a[k] after `a[i] := 1` then (going backwards) `a[j] := 2`.
        let read = Expr::subscript("a", Expr::var("k"));
        let after_second = read.substitute_element("a", &Expr::var("j"), &Expr::int(2));
        let after_first = after_second.substitute_element("a", &Expr::var("i"), &Expr::int(1));
        let Expr::Subscript(sub) = &after_first else {
            panic!("expected subscript, got {after_first}");
        };
        assert_eq!(
            sub.overrides,
            vec![(Expr::var("j"), Expr::int(2)), (Expr::var("i"), Expr::int(1))]
        );
        assert_eq!(after_first.to_string(), "a{j -> 2, i -> 1}[k]");
    }

    #[test]
    fn element_write_to_same_index_is_shadowed() {
        let read = Expr::subscript("a", Expr::var("k"));
        let once = read.substitute_element("a", &Expr::var("i"), &Expr::int(2));
        let twice = once.substitute_element("a", &Expr::var("i"), &Expr::int(1));
        let Expr::Subscript(sub) = &twice else {
            panic!("expected subscript, got {twice}");
        };
        assert_eq!(sub.overrides, vec![(Expr::var("i"), Expr::int(2))]);
    }

    #[test]
    fn element_write_rewrites_reads_inside_index_and_values() {
        // a[a[0]] with a[0] := 5: the inner read sees the write too.
        let read = Expr::subscript("a", Expr::subscript("a", Expr::int(0)));
        let out = read.substitute_element("a", &Expr::int(0), &Expr::int(5));
        assert_eq!(out.to_string(), "a{0 -> 5}[a{0 -> 5}[0]]");
    }

    #[test]
    fn element_write_turns_bare_array_into_store() {
        let e = Expr::equals(Expr::var("a"), Expr::var("b"));
        let out = e.substitute_element("a", &Expr::var("i"), &Expr::int(0));
        assert_eq!(out.to_string(), "a{i -> 0} == b");
        let Expr::Binary { left, .. } = &out else {
            panic!("expected comparison, got {out}");
        };
        assert!(matches!(**left, Expr::Store { .. }));

        // A second write goes behind the first and never widens into a view.
        let out = out.substitute_element("a", &Expr::var("j"), &Expr::int(1));
        assert_eq!(out.to_string(), "a{i -> 0, j -> 1} == b");
        let out = out.substitute_element("a", &Expr::var("i"), &Expr::int(7));
        assert_eq!(out.to_string(), "a{i -> 0, j -> 1} == b");
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let e = Expr::binary(
            Expr::binary(Expr::var("a"), Op::Add, Expr::var("b")),
            Op::Mul,
            Expr::binary(Expr::var("c"), Op::Sub, Expr::var("d")),
        );
        assert_eq!(e.to_string(), "(a + b) * (c - d)");
        let e = Expr::binary(Expr::var("a"), Op::Sub, Expr::binary(Expr::var("b"), Op::Sub, Expr::var("c")));
        assert_eq!(e.to_string(), "a - (b - c)");
        let e = Expr::and(Expr::negate(Expr::var("p")), Expr::var("q"));
        assert_eq!(e.to_string(), "not p and q");
    }

    #[test]
    fn base_name_strips_generated_and_forked_suffixes() {
        assert_eq!(base_name("x"), "x");
        assert_eq!(base_name("x$3"), "x");
        assert_eq!(base_name("x#1"), "x");
        let mut fresh = FreshNames::new();
        assert_eq!(fresh.fresh("x"), "x$0");
        assert_eq!(fresh.fresh("x$0"), "x$1");
        assert_eq!(fresh.fresh("y"), "y$0");
    }

    #[test]
    fn block_nests_to_the_right() {
        let s = Stmt::block([
            Stmt::assign("x", Expr::int(1)),
            Stmt::assign("y", x_plus_one()),
            Stmt::Havoc("z".into()),
        ]);
        assert_eq!(s.to_string(), "x := 1; y := x + 1; havoc z");
        let Stmt::Seq(_, rest) = &s else {
            panic!("expected sequence");
        };
        assert!(matches!(**rest, Stmt::Seq(..)));
        assert_eq!(Stmt::block([]), Stmt::Skip);
    }

    #[test]
    fn statement_variable_collections() {
        let s = Stmt::block([
            Stmt::assign("x", x_plus_one()),
            Stmt::while_loop(
                Expr::bool(true),
                Expr::var("c"),
                Stmt::block([Stmt::assign_element("a", Expr::var("i"), Expr::int(0)), Stmt::Havoc("h".into())]),
            ),
        ]);
        let assigned: Vec<_> = s.assigned_variables().into_iter().collect();
        assert_eq!(assigned, vec!["a", "x"]);
        let havoced: Vec<_> = s.havoced_variables().into_iter().collect();
        assert_eq!(havoced, vec!["h"]);
        assert!(s.contains_loop());
        assert!(s.free_variables().contains("i"));
    }

    #[test]
    fn statement_substitute_renames_targets_for_variables_only() {
        let s = Stmt::assign("x", x_plus_one());
        assert_eq!(s.substitute("x", &Expr::var("x#1")).to_string(), "x#1 := x#1 + 1");
        assert_eq!(s.substitute("x", &Expr::int(3)).to_string(), "x := 3 + 1");
    }

    #[test]
    fn var_type_parses_both_spellings() {
        assert_eq!("int".parse::<VarType>(), Ok(VarType::Int));
        assert_eq!("Array".parse::<VarType>(), Ok(VarType::Array));
        assert!("float".parse::<VarType>().is_err());
    }
}
