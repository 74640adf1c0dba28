//! Temporal semantics: partial precision, calendar arithmetic, string
//! promotion during navigation, component extractors, and the clock
//! functions.

mod test_support;

use test_support::{boolean, eval_doc, integer, is_empty, rendered};

// ============================================
// Partial precision
// ============================================

#[test]
fn test_partial_precision_comparison_is_ambiguous() {
    assert!(is_empty("@2024 < @2024-06-15"));
    assert!(is_empty("@2024-06 = @2024-06-15"));
    assert!(boolean("@2023 < @2024-06-15"));
    assert!(boolean("@2024-06-15 > @2023"));
}

#[test]
fn test_same_precision_comparison() {
    assert!(boolean("@2024-06-14 < @2024-06-15"));
    assert!(boolean("@2024-06-15 = @2024-06-15"));
    assert!(boolean("@T10:30 < @T11:00"));
}

#[test]
fn test_equivalence_requires_same_precision() {
    assert!(boolean("@2024 ~ @2024"));
    assert!(!boolean("@2024 ~ @2024-06"));
}

#[test]
fn test_timezone_aware_comparison() {
    assert!(boolean("@2024-06-15T10:00:00+02:00 = @2024-06-15T08:00:00Z"));
    assert!(boolean("@2024-06-15T10:00:00Z < @2024-06-15T11:00:00Z"));
}

// ============================================
// Calendar arithmetic
// ============================================

#[test]
fn test_date_plus_calendar_durations() {
    assert!(boolean("@2024-01-15 + 1 month = @2024-02-15"));
    assert!(boolean("@2024-01-31 + 1 month = @2024-02-29"));
    assert!(boolean("@2024-01-01 + 2 weeks = @2024-01-15"));
    assert!(boolean("@2024-01-01 - 1 day = @2023-12-31"));
    assert!(boolean("@2024 + 18 months = @2025"));
}

#[test]
fn test_datetime_and_time_arithmetic() {
    assert!(boolean("@2024-06-15T10:00:00Z + 90 minutes = @2024-06-15T11:30:00Z"));
    assert!(boolean("@T23:30 + 45 minutes = @T00:15"));
}

#[test]
fn test_ucum_duration_units_work_too() {
    assert!(boolean("@2024-01-01 + 7 'd' = @2024-01-08"));
}

// ============================================
// String promotion during navigation
// ============================================

#[test]
fn test_json_date_strings_compare_against_date_literals() {
    let doc = r#"{"resourceType":"Patient","birthDate":"1974-12-25"}"#;
    assert!(eval_doc("Patient.birthDate = @1974-12-25", doc)
        .as_boolean()
        .unwrap());
    assert!(eval_doc("Patient.birthDate < @2000-01-01", doc)
        .as_boolean()
        .unwrap());
}

#[test]
fn test_json_datetime_strings_promote() {
    let doc = r#"{"resourceType":"Observation","effectiveDateTime":"2024-06-15T08:00:00Z"}"#;
    assert!(
        eval_doc("Observation.effectiveDateTime = @2024-06-15T08:00:00Z", doc)
            .as_boolean()
            .unwrap()
    );
}

// ============================================
// Component extractors
// ============================================

#[test]
fn test_date_components() {
    assert_eq!(integer("@2024-06-15.year()"), 2024);
    assert_eq!(integer("@2024-06-15.month()"), 6);
    assert_eq!(integer("@2024-06-15.day()"), 15);
}

#[test]
fn test_components_respect_precision() {
    assert_eq!(integer("@2024.year()"), 2024);
    assert!(is_empty("@2024.month()"));
    assert!(is_empty("@2024-06.day()"));
    assert!(is_empty("@T14.minute()"));
}

#[test]
fn test_datetime_and_time_components() {
    assert_eq!(integer("@2024-06-15T14:34:28Z.hour()"), 14);
    assert_eq!(integer("@2024-06-15T14:34:28Z.second()"), 28);
    assert_eq!(integer("@T14:34:28.123.millisecond()"), 123);
    assert!(is_empty("@2024-06-15.hour()"));
}

// ============================================
// Clock functions
// ============================================

#[test]
fn test_now_today_time_of_day() {
    assert!(boolean("now().exists()"));
    assert!(boolean("today().exists()"));
    assert!(boolean("timeOfDay().exists()"));
    assert!(boolean("now() is DateTime"));
    assert!(boolean("today() is Date"));
    assert!(boolean("timeOfDay() is Time"));
    assert!(boolean("today() >= @2024-01-01"));
}

#[test]
fn test_date_to_datetime_alignment() {
    // A Date lifts to a DateTime at date precision, so equality against a
    // second-precision instant stays ambiguous even when the day matches.
    assert!(is_empty("@2024-06-15 = @2024-06-15T10:00:00Z"));
    assert!(boolean("@2024-06-15 < @2024-06-16T10:00:00Z"));
}

#[test]
fn test_rendering_preserves_precision() {
    assert_eq!(rendered(&test_support::eval("@2024-06")), vec!["2024-06"]);
    assert_eq!(
        rendered(&test_support::eval("@2024-06-15T10:30+01:00")),
        vec!["2024-06-15T10:30+01:00"]
    );
}
