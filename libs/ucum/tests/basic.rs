use std::cmp::Ordering;
use std::str::FromStr;

use calyx_ucum::{compare_decimal_quantities, convert_decimal, convertible, equivalent, normalize};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn test_mass_conversion() {
    assert_eq!(convert_decimal(dec("1000"), "mg", "g").unwrap(), dec("1.000"));
    assert_eq!(convert_decimal(dec("2.5"), "kg", "g").unwrap(), dec("2500.0"));
}

#[test]
fn test_equivalence() {
    assert!(equivalent(dec("1000"), "mg", dec("1"), "g").unwrap());
    assert!(equivalent(dec("1"), "L", dec("10"), "dL").unwrap());
    assert!(!equivalent(dec("1"), "g", dec("1"), "mg").unwrap());
}

#[test]
fn test_comparison() {
    assert_eq!(
        compare_decimal_quantities(dec("4"), "m", dec("4.0"), "m").unwrap(),
        Ordering::Equal
    );
    assert_eq!(
        compare_decimal_quantities(dec("1"), "h", dec("59"), "min").unwrap(),
        Ordering::Greater
    );
}

#[test]
fn test_unknown_units_compare_when_identical() {
    // Unknown codes still order among themselves by string identity.
    assert_eq!(
        compare_decimal_quantities(dec("2"), "{tablets}", dec("3"), "{tablets}").unwrap(),
        Ordering::Less
    );
}

#[test]
fn test_incompatible_dimensions() {
    assert!(!convertible("g", "m"));
    assert!(convert_decimal(dec("1"), "g", "s").is_err());
    assert!(compare_decimal_quantities(dec("1"), "mg", dec("1"), "mL").is_err());
}

#[test]
fn test_time_atoms() {
    assert_eq!(convert_decimal(dec("1"), "wk", "d").unwrap(), dec("7"));
    assert_eq!(convert_decimal(dec("1"), "a", "mo").unwrap(), dec("12"));
}

#[test]
fn test_celsius() {
    assert_eq!(convert_decimal(dec("37"), "Cel", "K").unwrap(), dec("310.15"));
    assert_eq!(convert_decimal(dec("273.15"), "K", "Cel").unwrap(), dec("0.00"));
}

#[test]
fn test_normalize_renders_base_units() {
    let n = normalize(dec("1"), "N").unwrap();
    assert_eq!(n.unit, "g.m.s-2");
    assert_eq!(n.value, dec("1000"));
}
