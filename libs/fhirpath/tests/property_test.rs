//! Property-style tests over the collection and operator laws.

use quickcheck::QuickCheck;

mod test_support;

use test_support::{boolean, eval};

fn render(expr: &str) -> Vec<String> {
    eval(expr).iter().map(|v| v.render()).collect()
}

/// Property: distinct is idempotent.
#[test]
fn prop_distinct_idempotent() {
    let inputs = [
        "{}",
        "{1}",
        "{1, 1, 1}",
        "{1, 2, 3}",
        "{3, 1, 2, 1, 3}",
        "{'a', 'b', 'a'}",
        "{1, 1.0, 2}",
    ];
    for input in inputs {
        assert!(
            boolean(&format!("({input}).distinct().distinct() ~ ({input}).distinct()")),
            "distinct not idempotent for {input}"
        );
    }
}

/// Property: C.union(C) = C.distinct().
#[test]
fn prop_union_self_is_distinct() {
    for input in ["{}", "{1}", "{1, 1, 2}", "{3, 2, 3, 1}"] {
        assert!(
            boolean(&format!("({input}).union({input}) ~ ({input}).distinct()")),
            "union/distinct law failed for {input}"
        );
    }
}

/// Property: combining the empty collection is the identity.
#[test]
fn prop_combine_empty_identity() {
    for input in ["{}", "{1}", "{1, 1, 2}"] {
        assert!(
            boolean(&format!("({input}).combine({{}}) ~ ({input})")),
            "combine identity failed for {input}"
        );
    }
}

/// Property: tail() = skip(1).
#[test]
fn prop_tail_is_skip_one() {
    for input in ["{}", "{1}", "{1, 2}", "{1, 2, 3, 4}"] {
        assert!(
            boolean(&format!("({input}).tail() ~ ({input}).skip(1)")),
            "tail/skip law failed for {input}"
        );
    }
}

/// Property: equivalence is reflexive, including for the empty collection.
#[test]
fn prop_equivalence_reflexive() {
    for input in ["{}", "1", "1.50", "'text'", "@2024-06", "5 'mg'", "true"] {
        assert!(
            boolean(&format!("({input}) ~ ({input})")),
            "equivalence not reflexive for {input}"
        );
    }
}

/// Property: split/join round-trips for comma-free parts.
#[test]
fn prop_split_join_roundtrip() {
    for input in ["a,b,c", "x", "", "one,two"] {
        assert!(
            boolean(&format!("'{input}'.split(',').join(',') = '{input}'")),
            "split/join failed for {input:?}"
        );
    }
}

/// Property: integer addition is commutative under evaluation.
#[test]
fn prop_addition_commutative() {
    fn property(a: i32, b: i32) -> bool {
        boolean(&format!("{a} + {b} = {b} + {a}"))
    }
    QuickCheck::new()
        .tests(50)
        .quickcheck(property as fn(i32, i32) -> bool);
}

/// Property: comparison trichotomy for integers.
#[test]
fn prop_integer_trichotomy() {
    fn property(a: i16, b: i16) -> bool {
        let lt = boolean(&format!("{a} < {b}"));
        let eq = boolean(&format!("{a} = {b}"));
        let gt = boolean(&format!("{a} > {b}"));
        u8::from(lt) + u8::from(eq) + u8::from(gt) == 1
    }
    QuickCheck::new()
        .tests(50)
        .quickcheck(property as fn(i16, i16) -> bool);
}

/// Property: UCUM factor equivalence for a known-compatible pair table.
#[test]
fn prop_ucum_factor_equivalence() {
    let pairs = [
        ("mg", "g", "1000", "1"),
        ("g", "kg", "1000", "1"),
        ("mL", "L", "1000", "1"),
        ("cm", "m", "100", "1"),
        ("min", "h", "60", "1"),
        ("d", "wk", "7", "1"),
    ];
    for (small, big, n_small, n_big) in pairs {
        assert!(
            boolean(&format!("{n_small} '{small}' ~ {n_big} '{big}'")),
            "{n_small} {small} should equal {n_big} {big}"
        );
    }
}

#[test]
fn test_rendered_outputs_are_stable() {
    assert_eq!(render("1 | 2"), vec!["1", "2"]);
    assert_eq!(render("'a' & 'b'"), vec!["ab"]);
}
