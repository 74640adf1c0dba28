//! Operator semantics: arithmetic, comparison, equality, equivalence,
//! boolean logic, membership, and the documented boundary behaviors.

mod test_support;

use calyx_fhirpath::Error;
use test_support::{boolean, eval, integer, is_empty, rendered, string};

// ============================================
// Arithmetic
// ============================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(integer("2 + 3"), 5);
    assert_eq!(integer("2 - 5"), -3);
    assert_eq!(integer("4 * 3"), 12);
    assert_eq!(integer("7 div 2"), 3);
    assert_eq!(integer("7 mod 2"), 1);
}

#[test]
fn test_division_always_promotes_to_decimal() {
    assert_eq!(rendered(&eval("7 / 2")), vec!["3.5"]);
    assert_eq!(rendered(&eval("6 / 2")), vec!["3"]);
    assert!(boolean("6 / 2 = 3.0"));
}

#[test]
fn test_division_by_zero_is_empty() {
    assert!(is_empty("5 / 0"));
    assert!(is_empty("5 div 0"));
    assert!(is_empty("5 mod 0"));
}

#[test]
fn test_decimal_arithmetic() {
    assert!(boolean("0.1 + 0.2 = 0.3"));
    assert!(boolean("1 + 2.5 = 3.5"));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(string("'abc' + 'def'"), "abcdef");
    assert!(is_empty("'abc' + {}"));

    // `&` is null-safe.
    assert_eq!(string("'abc' & {}"), "abc");
    assert_eq!(string("{} & {}"), "");
}

#[test]
fn test_unary_polarity() {
    assert_eq!(integer("-(3 + 2)"), -5);
    assert_eq!(integer("+7"), 7);
    assert_eq!(integer("-5.abs()"), 5);
}

#[test]
fn test_arithmetic_on_multi_element_operand_is_empty() {
    assert!(is_empty("(1 | 2) + 1"));
    assert!(is_empty("(1 | 2) < 3"));
}

#[test]
fn test_empty_operand_propagates() {
    assert!(is_empty("{} + 1"));
    assert!(is_empty("1 < {}"));
}

// ============================================
// Quantities
// ============================================

#[test]
fn test_quantity_comparison() {
    assert!(boolean("2 'g' > 100 'mg'"));
    assert!(boolean("1 'h' = 60 'min'"));
    assert!(boolean("4 'm' >= 4.0 'm'"));
    assert!(boolean("7 days = 1 week"));
    assert!(boolean("1 week = 1 'wk'"));
}

#[test]
fn test_quantity_arithmetic_converts_to_left_unit() {
    assert!(boolean("(1 'g' + 500 'mg') = 1.5 'g'"));
    assert!(boolean("(1 'g' - 500 'mg') = 500 'mg'"));
}

#[test]
fn test_incompatible_quantity_arithmetic_errors() {
    let err = test_support::engine()
        .evaluate("1 'g' + 1 'm'", test_support::BASIC.as_bytes())
        .unwrap_err();
    assert!(matches!(err, Error::UnitIncompatible { .. }));
}

#[test]
fn test_incompatible_quantity_equality_is_empty() {
    assert!(is_empty("1 'g' = 1 'm'"));
}

// ============================================
// Equality & equivalence
// ============================================

#[test]
fn test_equality() {
    assert!(boolean("1 = 1"));
    assert!(!boolean("1 = 2"));
    assert!(boolean("1 = 1.0"));
    assert!(boolean("'abc' = 'abc'"));
    assert!(!boolean("'abc' = 'ABC'"));
    assert!(boolean("1 != 2"));
    assert!(is_empty("{} = {}"));
    assert!(is_empty("1 = {}"));
    assert!(is_empty("{} != 1"));
}

#[test]
fn test_collection_equality_is_ordered() {
    assert!(boolean("(1 | 2 | 3) = (1 | 2 | 3)"));
    assert!(!boolean("(1 | 2) = (2 | 1)"));
    assert!(!boolean("(1 | 2) = (1 | 2 | 3)"));
}

#[test]
fn test_equivalence() {
    assert!(boolean("{} ~ {}"));
    assert!(!boolean("{} ~ 1"));
    assert!(boolean("'Hello   World' ~ '  hello world '"));
    assert!(boolean("(1 | 2) ~ (2 | 1)"));
    assert!(!boolean("'a' !~ 'A'"));
}

// ============================================
// Comparison
// ============================================

#[test]
fn test_string_comparison_is_codepoint() {
    assert!(boolean("'abc' < 'abd'"));
    assert!(boolean("'Z' < 'a'"));
}

#[test]
fn test_mixed_type_comparison_errors() {
    let err = test_support::engine()
        .evaluate("'a' < 1", test_support::BASIC.as_bytes())
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

// ============================================
// Boolean operators
// ============================================

#[test]
fn test_three_valued_logic() {
    assert!(!boolean("false and true"));
    assert!(boolean("true and true"));
    assert!(is_empty("true and {}"));
    assert!(!boolean("{} and false"));

    assert!(boolean("true or {}"));
    assert!(is_empty("false or {}"));

    assert!(boolean("true xor false"));
    assert!(is_empty("true xor {}"));

    assert!(boolean("false implies {}"));
    assert!(is_empty("true implies {}"));
    assert!(boolean("{} implies true"));
    assert!(is_empty("{} implies false"));
}

#[test]
fn test_not() {
    assert!(!boolean("true.not()"));
    assert!(boolean("false.not()"));
    assert!(is_empty("{}.not()"));
}

// ============================================
// Membership & union
// ============================================

#[test]
fn test_in_and_contains() {
    assert!(boolean("2 in (1 | 2 | 3)"));
    assert!(!boolean("5 in (1 | 2 | 3)"));
    assert!(boolean("(1 | 2 | 3) contains 2"));
    assert!(is_empty("{} in (1 | 2)"));
    assert!(is_empty("1 in {}"));
}

#[test]
fn test_union_deduplicates() {
    assert_eq!(rendered(&eval("1 | 2 | 1 | 3")), vec!["1", "2", "3"]);
    assert_eq!(integer("(1 | 1 | 1).count()"), 1);
}

#[test]
fn test_type_operators() {
    assert!(boolean("1 is Integer"));
    assert!(boolean("1.5 is Decimal"));
    assert!(boolean("'x' is String"));
    assert!(boolean("@2024 is Date"));
    assert!(boolean("1 is System.Integer"));
    assert!(!boolean("1 is Decimal"));
    assert!(is_empty("{} is Integer"));

    assert!(boolean("(1 | 'a' | 2) as Integer = (1 | 2)"));
    assert!(boolean("(1 as Integer) = 1"));
    assert!(is_empty("1 as String"));
}

// ============================================
// Boundary behaviors from the contract
// ============================================

#[test]
fn test_skip_take_boundaries() {
    assert!(boolean("(1 | 2 | 3).skip(0) = (1 | 2 | 3)"));
    assert!(boolean("(1 | 2 | 3).skip(-1) = (1 | 2 | 3)"));
    assert!(is_empty("(1 | 2 | 3).take(0)"));
    assert!(boolean("(1 | 2 | 3).take(100) = (1 | 2 | 3)"));
}

#[test]
fn test_substring_boundaries() {
    assert!(is_empty("'abc'.substring(-1)"));
    assert!(is_empty("'abc'.substring(3)"));
    assert_eq!(string("'abc'.substring(1, 100)"), "bc");
}
