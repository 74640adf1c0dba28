//! Operator semantics: equality, equivalence, ordered comparison,
//! arithmetic, and the three-valued boolean tables.
//!
//! Value-level helpers return `Option` where the language's empty/unknown
//! result is possible; collection-level wrappers live in the evaluator.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::temporal::{self, CalendarUnit};
use crate::value::{
    calendar_unit_to_ucum, DatePrecision, DateTimePrecision, TimePrecision, Value,
};

// ---------------------------------------------------------------------------
// Equality (`=`)
// ---------------------------------------------------------------------------

/// Exact equality between two values. `None` is the unknown result (partial
/// precision, incomparable quantities).
pub(crate) fn values_equal(left: &Value, right: &Value) -> Option<bool> {
    use Value::*;

    match (left, right) {
        (Boolean(a), Boolean(b)) => Some(a == b),
        (Integer(a), Integer(b)) => Some(a == b),
        (Decimal(a), Decimal(b)) => Some(a == b),
        (Integer(a), Decimal(b)) => Some(&rust_decimal::Decimal::from(*a) == b),
        (Decimal(a), Integer(b)) => Some(a == &rust_decimal::Decimal::from(*b)),
        (String(a), String(b)) => Some(a == b),
        (Quantity { .. }, Quantity { .. }) => quantities_equal(left, right),
        (Date { .. } | DateTime { .. } | Time { .. }, String(_))
        | (String(_), Date { .. } | DateTime { .. } | Time { .. }) => {
            let (l, r) = promote_temporal_pair(left, right)?;
            values_equal(&l, &r)
        }
        (
            Date {
                value: a,
                precision: ap,
            },
            Date {
                value: b,
                precision: bp,
            },
        ) => match compare_dates(*a, *ap, *b, *bp) {
            Some(Ordering::Equal) => Some(true),
            Some(_) => Some(false),
            None => None,
        },
        (
            DateTime {
                value: a,
                precision: ap,
                ..
            },
            DateTime {
                value: b,
                precision: bp,
                ..
            },
        ) => match compare_datetimes(*a, *ap, *b, *bp) {
            Some(Ordering::Equal) => Some(true),
            Some(_) => Some(false),
            None => None,
        },
        (
            Time {
                value: a,
                precision: ap,
            },
            Time {
                value: b,
                precision: bp,
            },
        ) => match compare_times(*a, *ap, *b, *bp) {
            Some(Ordering::Equal) => Some(true),
            Some(_) => Some(false),
            None => None,
        },
        (Date { .. }, DateTime { .. }) | (DateTime { .. }, Date { .. }) => {
            let (l, r) = promote_temporal_pair(left, right)?;
            values_equal(&l, &r)
        }
        (Object(a), Object(b)) => Some(a == b),
        _ => Some(false),
    }
}

fn quantities_equal(left: &Value, right: &Value) -> Option<bool> {
    let (Value::Quantity { value: lv, unit: lu }, Value::Quantity { value: rv, unit: ru }) =
        (left, right)
    else {
        return Some(false);
    };
    if lu == ru {
        return Some(lv == rv);
    }
    let lu = canonical_unit(lu);
    let ru = canonical_unit(ru);
    match calyx_ucum::equivalent(*lv, &lu, *rv, &ru) {
        Ok(b) => Some(b),
        // Unknown or dimensionally incompatible units: no decision.
        Err(_) => None,
    }
}

pub(crate) fn canonical_unit(unit: &str) -> std::borrow::Cow<'_, str> {
    match calendar_unit_to_ucum(unit) {
        Some(code) => std::borrow::Cow::Borrowed(code),
        None => std::borrow::Cow::Borrowed(unit),
    }
}

/// Promote String operands (and Date vs DateTime mixes) so both sides share a
/// temporal variant.
fn promote_temporal_pair(left: &Value, right: &Value) -> Option<(Value, Value)> {
    let promote = |template: &Value, s: &str| -> Option<Value> {
        let parsed = temporal::parse_temporal_value(s)?;
        match (template, &parsed) {
            (Value::Date { .. }, Value::Date { .. })
            | (Value::DateTime { .. }, Value::DateTime { .. })
            | (Value::Time { .. }, Value::Time { .. }) => Some(parsed),
            // A date-shaped string meeting a DateTime still promotes.
            (Value::DateTime { .. }, Value::Date { .. }) => date_to_datetime(&parsed),
            (Value::Date { .. }, Value::DateTime { .. }) => Some(parsed),
            _ => None,
        }
    };

    match (left, right) {
        (Value::String(s), other) => {
            let promoted = promote(other, s)?;
            let (l, r) = align_date_and_datetime(&promoted, other)?;
            Some((l, r))
        }
        (other, Value::String(s)) => {
            let promoted = promote(other, s)?;
            let (l, r) = align_date_and_datetime(other, &promoted)?;
            Some((l, r))
        }
        _ => align_date_and_datetime(left, right),
    }
}

/// Lift a Date to a DateTime when compared against one.
fn align_date_and_datetime(left: &Value, right: &Value) -> Option<(Value, Value)> {
    match (left, right) {
        (Value::Date { .. }, Value::DateTime { .. }) => {
            Some((date_to_datetime(left)?, right.clone()))
        }
        (Value::DateTime { .. }, Value::Date { .. }) => {
            Some((left.clone(), date_to_datetime(right)?))
        }
        _ => Some((left.clone(), right.clone())),
    }
}

fn date_to_datetime(value: &Value) -> Option<Value> {
    let Value::Date { value, precision } = value else {
        return None;
    };
    let dt_precision = match precision {
        DatePrecision::Year => DateTimePrecision::Year,
        DatePrecision::Month => DateTimePrecision::Month,
        DatePrecision::Day => DateTimePrecision::Day,
    };
    let dt = FixedOffset::east_opt(0)?
        .from_local_datetime(&value.and_time(NaiveTime::MIN))
        .single()?;
    Some(Value::datetime(dt, dt_precision, None))
}

// ---------------------------------------------------------------------------
// Equivalence (`~`)
// ---------------------------------------------------------------------------

/// Equivalence is total: it never yields the unknown result.
pub(crate) fn values_equivalent(left: &Value, right: &Value) -> bool {
    use Value::*;

    match (left, right) {
        (String(a), String(b)) => normalize_for_equivalence(a) == normalize_for_equivalence(b),
        (Quantity { .. }, Quantity { .. }) => quantities_equal(left, right).unwrap_or(false),
        (
            Date {
                value: a,
                precision: ap,
            },
            Date {
                value: b,
                precision: bp,
            },
        ) => ap == bp && compare_dates(*a, *ap, *b, *bp) == Some(Ordering::Equal),
        (
            DateTime {
                value: a,
                precision: ap,
                ..
            },
            DateTime {
                value: b,
                precision: bp,
                ..
            },
        ) => ap == bp && compare_datetimes(*a, *ap, *b, *bp) == Some(Ordering::Equal),
        (
            Time {
                value: a,
                precision: ap,
            },
            Time {
                value: b,
                precision: bp,
            },
        ) => ap == bp && compare_times(*a, *ap, *b, *bp) == Some(Ordering::Equal),
        _ => values_equal(left, right).unwrap_or(false),
    }
}

/// Case-insensitive, whitespace-normalized form: trimmed, internal runs
/// collapsed to a single space.
fn normalize_for_equivalence(s: &str) -> std::string::String {
    let mut out = std::string::String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(c.to_lowercase());
    }
    out
}

// ---------------------------------------------------------------------------
// Ordered comparison (`<`, `<=`, `>`, `>=`)
// ---------------------------------------------------------------------------

/// Ordered comparison. `Ok(None)` is the ambiguous partial-precision result;
/// incompatible operand types are a hard error.
pub(crate) fn compare_values(
    op: &'static str,
    left: &Value,
    right: &Value,
) -> Result<Option<Ordering>> {
    use Value::*;

    match (left, right) {
        (Integer(a), Integer(b)) => Ok(Some(a.cmp(b))),
        (Decimal(a), Decimal(b)) => Ok(Some(a.cmp(b))),
        (Integer(a), Decimal(b)) => Ok(Some(rust_decimal::Decimal::from(*a).cmp(b))),
        (Decimal(a), Integer(b)) => Ok(Some(a.cmp(&rust_decimal::Decimal::from(*b)))),
        (String(a), String(b)) => Ok(Some(a.as_ref().cmp(b.as_ref()))),
        (Quantity { value: lv, unit: lu }, Quantity { value: rv, unit: ru }) => {
            let lu_c = canonical_unit(lu);
            let ru_c = canonical_unit(ru);
            calyx_ucum::compare_decimal_quantities(*lv, &lu_c, *rv, &ru_c)
                .map(Some)
                .map_err(|_| Error::UnitIncompatible {
                    left: lu.to_string(),
                    right: ru.to_string(),
                })
        }
        (Date { .. } | DateTime { .. } | Time { .. }, String(_))
        | (String(_), Date { .. } | DateTime { .. } | Time { .. })
        | (Date { .. }, DateTime { .. })
        | (DateTime { .. }, Date { .. }) => {
            let Some((l, r)) = promote_temporal_pair(left, right) else {
                return Err(Error::type_mismatch(
                    op,
                    left.type_name(),
                    right.type_name(),
                ));
            };
            compare_values(op, &l, &r)
        }
        (
            Date {
                value: a,
                precision: ap,
            },
            Date {
                value: b,
                precision: bp,
            },
        ) => Ok(compare_dates(*a, *ap, *b, *bp)),
        (
            DateTime {
                value: a,
                precision: ap,
                ..
            },
            DateTime {
                value: b,
                precision: bp,
                ..
            },
        ) => Ok(compare_datetimes(*a, *ap, *b, *bp)),
        (
            Time {
                value: a,
                precision: ap,
            },
            Time {
                value: b,
                precision: bp,
            },
        ) => Ok(compare_times(*a, *ap, *b, *bp)),
        _ => Err(Error::type_mismatch(
            op,
            left.type_name(),
            right.type_name(),
        )),
    }
}

/// Compare two dates component-wise down to the shared precision. Equality at
/// the shared precision with differing tags is ambiguous.
fn compare_dates(
    a: chrono::NaiveDate,
    ap: DatePrecision,
    b: chrono::NaiveDate,
    bp: DatePrecision,
) -> Option<Ordering> {
    let shared = ap.min(bp);

    let year = a.year().cmp(&b.year());
    if year != Ordering::Equal {
        return Some(year);
    }
    if shared >= DatePrecision::Month {
        let month = a.month().cmp(&b.month());
        if month != Ordering::Equal {
            return Some(month);
        }
    }
    if shared >= DatePrecision::Day {
        let day = a.day().cmp(&b.day());
        if day != Ordering::Equal {
            return Some(day);
        }
    }

    if ap == bp {
        Some(Ordering::Equal)
    } else {
        None
    }
}

fn compare_datetimes(
    a: DateTime<FixedOffset>,
    ap: DateTimePrecision,
    b: DateTime<FixedOffset>,
    bp: DateTimePrecision,
) -> Option<Ordering> {
    // Normalize to UTC so offsets cancel out of component comparison.
    let a = a.with_timezone(&Utc);
    let b = b.with_timezone(&Utc);
    let shared = ap.min(bp);

    let components = [
        (
            DateTimePrecision::Year,
            a.year() as i64,
            b.year() as i64,
        ),
        (DateTimePrecision::Month, a.month() as i64, b.month() as i64),
        (DateTimePrecision::Day, a.day() as i64, b.day() as i64),
        (DateTimePrecision::Hour, a.hour() as i64, b.hour() as i64),
        (
            DateTimePrecision::Minute,
            a.minute() as i64,
            b.minute() as i64,
        ),
        (
            DateTimePrecision::Second,
            a.second() as i64,
            b.second() as i64,
        ),
        (
            DateTimePrecision::Millisecond,
            a.timestamp_subsec_millis() as i64,
            b.timestamp_subsec_millis() as i64,
        ),
    ];

    for (precision, left, right) in components {
        if precision > shared {
            break;
        }
        let ord = left.cmp(&right);
        if ord != Ordering::Equal {
            return Some(ord);
        }
    }

    if ap == bp {
        Some(Ordering::Equal)
    } else {
        None
    }
}

fn compare_times(
    a: NaiveTime,
    ap: TimePrecision,
    b: NaiveTime,
    bp: TimePrecision,
) -> Option<Ordering> {
    let shared = ap.min(bp);

    let components = [
        (TimePrecision::Hour, a.hour(), b.hour()),
        (TimePrecision::Minute, a.minute(), b.minute()),
        (TimePrecision::Second, a.second(), b.second()),
        (
            TimePrecision::Millisecond,
            a.nanosecond() / 1_000_000,
            b.nanosecond() / 1_000_000,
        ),
    ];

    for (precision, left, right) in components {
        if precision > shared {
            break;
        }
        let ord = left.cmp(&right);
        if ord != Ordering::Equal {
            return Some(ord);
        }
    }

    if ap == bp {
        Some(Ordering::Equal)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

pub(crate) fn add_values(left: &Value, right: &Value) -> Result<Option<Value>> {
    use Value::*;
    match (left, right) {
        (Integer(a), Integer(b)) => a
            .checked_add(*b)
            .map(Value::integer)
            .map(Some)
            .ok_or(Error::ArithmeticOverflow),
        (String(a), String(b)) => {
            let mut out = a.to_string();
            out.push_str(b);
            Ok(Some(Value::string(out)))
        }
        (Quantity { .. }, Quantity { .. }) => quantity_add(left, right, false),
        (Date { .. } | DateTime { .. } | Time { .. }, Quantity { .. }) => {
            temporal_shift(left, right, false)
        }
        _ => numeric_decimal_op("+", left, right, |a, b| {
            a.checked_add(b).ok_or(Error::ArithmeticOverflow)
        }),
    }
}

pub(crate) fn sub_values(left: &Value, right: &Value) -> Result<Option<Value>> {
    use Value::*;
    match (left, right) {
        (Integer(a), Integer(b)) => a
            .checked_sub(*b)
            .map(Value::integer)
            .map(Some)
            .ok_or(Error::ArithmeticOverflow),
        (Quantity { .. }, Quantity { .. }) => quantity_add(left, right, true),
        (Date { .. } | DateTime { .. } | Time { .. }, Quantity { .. }) => {
            temporal_shift(left, right, true)
        }
        _ => numeric_decimal_op("-", left, right, |a, b| {
            a.checked_sub(b).ok_or(Error::ArithmeticOverflow)
        }),
    }
}

pub(crate) fn mul_values(left: &Value, right: &Value) -> Result<Option<Value>> {
    use Value::*;
    match (left, right) {
        (Integer(a), Integer(b)) => a
            .checked_mul(*b)
            .map(Value::integer)
            .map(Some)
            .ok_or(Error::ArithmeticOverflow),
        _ => numeric_decimal_op("*", left, right, |a, b| {
            a.checked_mul(b).ok_or(Error::ArithmeticOverflow)
        }),
    }
}

/// `/` always yields Decimal; a zero divisor yields empty.
pub(crate) fn div_values(left: &Value, right: &Value) -> Result<Option<Value>> {
    let (a, b) = match (as_decimal(left), as_decimal(right)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(Error::type_mismatch(
                "/",
                "Integer or Decimal",
                format!("{} and {}", left.type_name(), right.type_name()),
            ));
        }
    };
    if b.is_zero() {
        return Ok(None);
    }
    match a.checked_div(b) {
        Some(q) => Ok(Some(Value::decimal(q))),
        None => Err(Error::ArithmeticOverflow),
    }
}

/// `div` and `mod` are integer-only; a zero divisor yields empty.
pub(crate) fn intdiv_values(
    op: &'static str,
    left: &Value,
    right: &Value,
) -> Result<Option<Value>> {
    let (Value::Integer(a), Value::Integer(b)) = (left, right) else {
        return Err(Error::type_mismatch(
            op,
            "Integer",
            format!("{} and {}", left.type_name(), right.type_name()),
        ));
    };
    if *b == 0 {
        return Ok(None);
    }
    let result = if op == "div" {
        a.checked_div(*b)
    } else {
        a.checked_rem(*b)
    };
    result
        .map(Value::integer)
        .map(Some)
        .ok_or(Error::ArithmeticOverflow)
}

pub(crate) fn negate_value(value: &Value) -> Result<Option<Value>> {
    match value {
        Value::Integer(i) => i
            .checked_neg()
            .map(Value::integer)
            .map(Some)
            .ok_or(Error::ArithmeticOverflow),
        Value::Decimal(d) => Ok(Some(Value::decimal(-*d))),
        Value::Quantity { value, unit } => Ok(Some(Value::quantity(-*value, unit.clone()))),
        other => Err(Error::type_mismatch(
            "unary -",
            "Integer, Decimal, or Quantity",
            other.type_name(),
        )),
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn numeric_decimal_op(
    op: &'static str,
    left: &Value,
    right: &Value,
    apply: impl Fn(Decimal, Decimal) -> Result<Decimal>,
) -> Result<Option<Value>> {
    match (as_decimal(left), as_decimal(right)) {
        (Some(a), Some(b)) => Ok(Some(Value::decimal(apply(a, b)?))),
        _ => Err(Error::type_mismatch(
            op,
            "Integer or Decimal",
            format!("{} and {}", left.type_name(), right.type_name()),
        )),
    }
}

/// Quantity addition/subtraction in the left operand's unit.
fn quantity_add(left: &Value, right: &Value, negate: bool) -> Result<Option<Value>> {
    let (Value::Quantity { value: lv, unit: lu }, Value::Quantity { value: rv, unit: ru }) =
        (left, right)
    else {
        unreachable!("quantity_add called with non-quantity operands");
    };

    let rv_in_lu = if lu == ru {
        *rv
    } else {
        let lu_c = canonical_unit(lu);
        let ru_c = canonical_unit(ru);
        calyx_ucum::convert_decimal(*rv, &ru_c, &lu_c).map_err(|_| Error::UnitIncompatible {
            left: lu.to_string(),
            right: ru.to_string(),
        })?
    };

    let result = if negate {
        lv.checked_sub(rv_in_lu)
    } else {
        lv.checked_add(rv_in_lu)
    };
    result
        .map(|v| Value::quantity(v, lu.clone()))
        .map(Some)
        .ok_or(Error::ArithmeticOverflow)
}

/// Date/DateTime/Time plus or minus a calendar-duration quantity.
fn temporal_shift(left: &Value, right: &Value, negate: bool) -> Result<Option<Value>> {
    let Value::Quantity { value, unit } = right else {
        unreachable!("temporal_shift called with non-quantity right operand");
    };
    let Some(unit) = CalendarUnit::parse(unit) else {
        return Err(Error::type_mismatch(
            if negate { "-" } else { "+" },
            "calendar duration",
            format!("Quantity '{unit}'"),
        ));
    };

    let shifted = match left {
        Value::Date {
            value: date,
            precision,
        } => temporal::date_add(*date, *precision, *value, unit, negate),
        Value::DateTime {
            value: dt,
            precision,
            tz_offset,
        } => temporal::datetime_add(*dt, *precision, *tz_offset, *value, unit, negate),
        Value::Time {
            value: time,
            precision,
        } => temporal::time_add(*time, *precision, *value, unit, negate),
        _ => unreachable!("temporal_shift called with non-temporal left operand"),
    };
    Ok(shifted)
}

// ---------------------------------------------------------------------------
// Collection-level equality and membership
// ---------------------------------------------------------------------------

/// `=` over collections: element-wise in order; differing lengths are false;
/// any unknown element comparison makes the whole result unknown.
pub(crate) fn collections_equal(left: &Collection, right: &Collection) -> Option<bool> {
    if left.is_empty() || right.is_empty() {
        return None;
    }
    if left.len() != right.len() {
        return Some(false);
    }
    let mut all_true = true;
    for (l, r) in left.iter().zip(right.iter()) {
        match values_equal(l, r) {
            Some(true) => {}
            Some(false) => all_true = false,
            None => return None,
        }
    }
    Some(all_true)
}

/// `~` over collections: order-insensitive, total.
pub(crate) fn collections_equivalent(left: &Collection, right: &Collection) -> bool {
    if left.is_empty() && right.is_empty() {
        return true;
    }
    if left.len() != right.len() {
        return false;
    }
    let mut matched = vec![false; right.len()];
    for l in left.iter() {
        let mut found = false;
        for (idx, r) in right.iter().enumerate() {
            if !matched[idx] && values_equivalent(l, r) {
                matched[idx] = true;
                found = true;
                break;
            }
        }
        if !found {
            return false;
        }
    }
    true
}

/// Membership by `=` semantics; an unknown element comparison does not match.
pub(crate) fn collection_contains(collection: &Collection, value: &Value) -> bool {
    collection
        .iter()
        .any(|item| values_equal(item, value) == Some(true))
}

/// Order-preserving deduplication by `=`.
pub(crate) fn distinct_values(collection: &Collection) -> Collection {
    let mut out = Collection::with_capacity(collection.len());
    for item in collection.iter() {
        if !collection_contains(&out, item) {
            out.push(item.clone());
        }
    }
    out
}

/// Set union: left then right, deduplicated by `=`.
pub(crate) fn union_collections(left: &Collection, right: &Collection) -> Collection {
    let mut out = Collection::with_capacity(left.len() + right.len());
    for item in left.iter().chain(right.iter()) {
        if !collection_contains(&out, item) {
            out.push(item.clone());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Three-valued boolean logic
// ---------------------------------------------------------------------------

pub(crate) fn three_valued_and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

pub(crate) fn three_valued_or(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

pub(crate) fn three_valued_xor(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(a), Some(b)) => Some(a != b),
        _ => None,
    }
}

pub(crate) fn three_valued_implies(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) => Some(true),
        (Some(true), r) => r,
        (None, Some(true)) => Some(true),
        (None, _) => None,
    }
}

/// Extract a boolean operand from a collection: empty and multi-element
/// collections are unknown; a singleton non-Boolean is a type error.
pub(crate) fn boolean_operand(collection: &Collection, op: &'static str) -> Result<Option<bool>> {
    if collection.len() != 1 {
        return Ok(None);
    }
    match collection.first() {
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(other) => Err(Error::type_mismatch(op, "Boolean", other.type_name())),
        None => Ok(None),
    }
}

/// Render a collection for trace output.
pub(crate) fn render_collection(collection: &Collection) -> std::string::String {
    let items: Vec<std::string::String> = collection.iter().map(Value::render).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32, p: DatePrecision) -> Value {
        Value::date(NaiveDate::from_ymd_opt(y, m, d).unwrap(), p)
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(
            values_equal(&Value::integer(1), &Value::decimal(Decimal::new(10, 1))),
            Some(true)
        );
    }

    #[test]
    fn test_quantity_ucum_equality() {
        let mg = Value::quantity(Decimal::from(1000), "mg");
        let g = Value::quantity(Decimal::from(1), "g");
        assert_eq!(values_equal(&mg, &g), Some(true));

        let m = Value::quantity(Decimal::from(1), "m");
        assert_eq!(values_equal(&g, &m), None);
    }

    #[test]
    fn test_calendar_words_normalize_to_ucum() {
        let days = Value::quantity(Decimal::from(7), "days");
        let wk = Value::quantity(Decimal::from(1), "wk");
        assert_eq!(values_equal(&days, &wk), Some(true));
    }

    #[test]
    fn test_partial_precision_date_equality_is_unknown() {
        let year = date(2024, 1, 1, DatePrecision::Year);
        let day = date(2024, 6, 15, DatePrecision::Day);
        assert_eq!(values_equal(&year, &day), None);
        assert_eq!(compare_values("<", &year, &day).unwrap(), None);

        let other_year = date(2023, 1, 1, DatePrecision::Year);
        assert_eq!(
            compare_values("<", &other_year, &day).unwrap(),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_string_whitespace_equivalence() {
        let a = Value::string("Hello   World");
        let b = Value::string("  hello world ");
        assert!(values_equivalent(&a, &b));
        assert_eq!(values_equal(&a, &b), Some(false));
    }

    #[test]
    fn test_string_comparison_is_codepoint() {
        assert_eq!(
            compare_values("<", &Value::string("abc"), &Value::string("abd")).unwrap(),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_mixed_type_comparison_errors() {
        assert!(compare_values("<", &Value::string("a"), &Value::integer(1)).is_err());
    }

    #[test]
    fn test_division_by_zero_is_empty() {
        assert_eq!(
            div_values(&Value::integer(5), &Value::integer(0)).unwrap(),
            None
        );
        assert_eq!(
            intdiv_values("div", &Value::integer(5), &Value::integer(0)).unwrap(),
            None
        );
        assert_eq!(
            intdiv_values("mod", &Value::integer(5), &Value::integer(0)).unwrap(),
            None
        );
    }

    #[test]
    fn test_division_always_decimal() {
        let result = div_values(&Value::integer(7), &Value::integer(2))
            .unwrap()
            .unwrap();
        assert_eq!(result, Value::decimal(Decimal::new(35, 1)));
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        assert!(matches!(
            add_values(&Value::integer(i64::MAX), &Value::integer(1)),
            Err(Error::ArithmeticOverflow)
        ));
    }

    #[test]
    fn test_quantity_addition_converts_to_left_unit() {
        let g = Value::quantity(Decimal::from(1), "g");
        let mg = Value::quantity(Decimal::from(500), "mg");
        let sum = add_values(&g, &mg).unwrap().unwrap();
        assert_eq!(sum, Value::quantity(Decimal::new(1500, 3), "g"));

        let m = Value::quantity(Decimal::from(1), "m");
        assert!(matches!(
            add_values(&g, &m),
            Err(Error::UnitIncompatible { .. })
        ));
    }

    #[test]
    fn test_date_plus_calendar_quantity() {
        let d = date(2024, 1, 31, DatePrecision::Day);
        let month = Value::quantity(Decimal::from(1), "month");
        let shifted = add_values(&d, &month).unwrap().unwrap();
        assert_eq!(shifted, date(2024, 2, 29, DatePrecision::Day));
    }

    #[test]
    fn test_three_valued_tables() {
        assert_eq!(three_valued_and(Some(false), None), Some(false));
        assert_eq!(three_valued_and(None, Some(true)), None);
        assert_eq!(three_valued_or(Some(true), None), Some(true));
        assert_eq!(three_valued_or(None, Some(false)), None);
        assert_eq!(three_valued_implies(Some(false), None), Some(true));
        assert_eq!(three_valued_implies(None, Some(true)), Some(true));
        assert_eq!(three_valued_implies(None, Some(false)), None);
        assert_eq!(three_valued_xor(Some(true), None), None);
    }

    #[test]
    fn test_collection_equality() {
        let a: Collection = vec![Value::integer(1), Value::integer(2)].into();
        let b: Collection = vec![Value::integer(1), Value::integer(2)].into();
        let c: Collection = vec![Value::integer(2), Value::integer(1)].into();
        assert_eq!(collections_equal(&a, &b), Some(true));
        assert_eq!(collections_equal(&a, &c), Some(false));
        assert!(collections_equivalent(&a, &c));
        assert_eq!(collections_equal(&a, &Collection::empty()), None);
    }
}
