//! `iif` and the `toX()` / `convertsToX()` conversion pairs.
//!
//! Conversions are graceful (unsuitable input is empty) except for the
//! singleton discipline: a multi-element focus is always an error.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::ast::Expression;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions::criterion_truth;
use crate::temporal;
use crate::value::{DatePrecision, DateTimePrecision, Value};

/// `iif(condition, then[, else])` — the condition is evaluated against the
/// current focus; an empty or non-Boolean condition selects the else branch,
/// and a missing else branch is empty. Only the selected branch is evaluated.
pub(crate) fn iif(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let condition = ev.eval(&args[0], focus)?;
    let truth = criterion_truth(&condition, "iif").unwrap_or(Some(false));
    if truth == Some(true) {
        ev.eval(&args[1], focus)
    } else if let Some(otherwise) = args.get(2) {
        ev.eval(otherwise, focus)
    } else {
        Ok(Collection::empty())
    }
}

fn conversion_focus<'a>(focus: &'a Collection, func: &'static str) -> Result<Option<&'a Value>> {
    match focus.len() {
        0 => Ok(None),
        1 => Ok(focus.first()),
        _ => Err(Error::SingletonExpected(func)),
    }
}

fn maybe(value: Option<Value>) -> Collection {
    value.map(Collection::singleton).unwrap_or_else(Collection::empty)
}

fn converts(result: Option<Value>) -> Collection {
    Collection::singleton(Value::boolean(result.is_some()))
}

// --- Boolean ---------------------------------------------------------------

const TRUE_WORDS: &[&str] = &["true", "t", "yes", "y", "1", "1.0"];
const FALSE_WORDS: &[&str] = &["false", "f", "no", "n", "0", "0.0"];

fn boolean_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::Boolean(b) => Some(Value::boolean(*b)),
        Value::Integer(1) => Some(Value::boolean(true)),
        Value::Integer(0) => Some(Value::boolean(false)),
        Value::Decimal(d) if *d == Decimal::ONE => Some(Value::boolean(true)),
        Value::Decimal(d) if d.is_zero() => Some(Value::boolean(false)),
        Value::String(s) => {
            let lowered = s.to_lowercase();
            if TRUE_WORDS.contains(&lowered.as_str()) {
                Some(Value::boolean(true))
            } else if FALSE_WORDS.contains(&lowered.as_str()) {
                Some(Value::boolean(false))
            } else {
                None
            }
        }
        _ => None,
    }
}

pub(crate) fn to_boolean(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toBoolean")? {
        Some(value) => maybe(boolean_conversion(value)),
        None => Collection::empty(),
    })
}

pub(crate) fn converts_to_boolean(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToBoolean")? {
        Some(value) => converts(boolean_conversion(value)),
        None => Collection::empty(),
    })
}

// --- Integer ---------------------------------------------------------------

fn integer_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(i) => Some(Value::integer(*i)),
        Value::Boolean(b) => Some(Value::integer(i64::from(*b))),
        Value::String(s) => i64::from_str(s.trim()).ok().map(Value::integer),
        _ => None,
    }
}

pub(crate) fn to_integer(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toInteger")? {
        Some(value) => maybe(integer_conversion(value)),
        None => Collection::empty(),
    })
}

pub(crate) fn converts_to_integer(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToInteger")? {
        Some(value) => converts(integer_conversion(value)),
        None => Collection::empty(),
    })
}

// --- Decimal ---------------------------------------------------------------

fn decimal_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::Decimal(d) => Some(Value::decimal(*d)),
        Value::Integer(i) => Some(Value::decimal(Decimal::from(*i))),
        Value::Boolean(b) => Some(Value::decimal(Decimal::from(i64::from(*b)))),
        Value::String(s) => Decimal::from_str(s.trim()).ok().map(Value::decimal),
        _ => None,
    }
}

pub(crate) fn to_decimal(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toDecimal")? {
        Some(value) => maybe(decimal_conversion(value)),
        None => Collection::empty(),
    })
}

pub(crate) fn converts_to_decimal(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToDecimal")? {
        Some(value) => converts(decimal_conversion(value)),
        None => Collection::empty(),
    })
}

// --- String ----------------------------------------------------------------

fn string_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) => None,
        other => Some(Value::string(other.render())),
    }
}

pub(crate) fn to_string(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toString")? {
        Some(value) => maybe(string_conversion(value)),
        None => Collection::empty(),
    })
}

pub(crate) fn converts_to_string(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToString")? {
        Some(value) => converts(string_conversion(value)),
        None => Collection::empty(),
    })
}

// --- Temporal --------------------------------------------------------------

fn date_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::Date { .. } => Some(value.clone()),
        Value::DateTime {
            value: dt,
            precision,
            ..
        } => {
            let date_precision = match precision {
                DateTimePrecision::Year => DatePrecision::Year,
                DateTimePrecision::Month => DatePrecision::Month,
                _ => DatePrecision::Day,
            };
            Some(Value::date(dt.date_naive(), date_precision))
        }
        Value::String(s) => {
            let date_part = s.split('T').next().unwrap_or(s);
            temporal::parse_date_parts(date_part)
                .map(|(date, precision)| Value::date(date, precision))
        }
        _ => None,
    }
}

pub(crate) fn to_date(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toDate")? {
        Some(value) => maybe(date_conversion(value)),
        None => Collection::empty(),
    })
}

fn datetime_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::DateTime { .. } => Some(value.clone()),
        Value::Date { .. } | Value::String(_) => {
            let text = match value {
                Value::Date { .. } => value.render(),
                Value::String(s) => s.to_string(),
                _ => unreachable!(),
            };
            temporal::parse_datetime_parts(&text)
                .map(|(dt, precision, tz)| Value::datetime(dt, precision, tz))
        }
        _ => None,
    }
}

pub(crate) fn to_datetime(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toDateTime")? {
        Some(value) => maybe(datetime_conversion(value)),
        None => Collection::empty(),
    })
}

fn time_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::Time { .. } => Some(value.clone()),
        Value::String(s) => {
            let text = s.strip_prefix('T').unwrap_or(s);
            temporal::parse_time_parts(text).map(|(t, precision)| Value::time(t, precision))
        }
        _ => None,
    }
}

pub(crate) fn to_time(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toTime")? {
        Some(value) => maybe(time_conversion(value)),
        None => Collection::empty(),
    })
}

// The convertsTo* checks for temporals follow the permissive lineage
// behavior: any string claims convertibility without a full parse.
fn permissive_temporal_check(value: &Value, same: fn(&Value) -> bool) -> Option<Value> {
    if same(value) || matches!(value, Value::String(_)) {
        Some(Value::boolean(true))
    } else {
        None
    }
}

pub(crate) fn converts_to_date(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToDate")? {
        Some(value) => converts(permissive_temporal_check(value, |v| {
            matches!(v, Value::Date { .. } | Value::DateTime { .. })
        })),
        None => Collection::empty(),
    })
}

pub(crate) fn converts_to_datetime(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToDateTime")? {
        Some(value) => converts(permissive_temporal_check(value, |v| {
            matches!(v, Value::Date { .. } | Value::DateTime { .. })
        })),
        None => Collection::empty(),
    })
}

pub(crate) fn converts_to_time(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToTime")? {
        Some(value) => converts(permissive_temporal_check(value, |v| {
            matches!(v, Value::Time { .. })
        })),
        None => Collection::empty(),
    })
}

// --- Quantity --------------------------------------------------------------

fn quantity_conversion(value: &Value) -> Option<Value> {
    match value {
        Value::Quantity { .. } => Some(value.clone()),
        Value::Integer(i) => Some(Value::quantity(Decimal::from(*i), "1")),
        Value::Decimal(d) => Some(Value::quantity(*d, "1")),
        Value::Boolean(b) => Some(Value::quantity(Decimal::from(i64::from(*b)), "1")),
        Value::String(s) => parse_quantity_string(s),
        Value::Object(obj) => obj
            .quantity_parts()
            .map(|(value, unit)| Value::quantity(value, unit)),
        _ => None,
    }
}

/// Parse `"5 'mg'"`, `"5 mg"`, `"2 days"`, or a bare number.
fn parse_quantity_string(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    let (number_part, unit_part) = match trimmed.split_once(char::is_whitespace) {
        Some((n, u)) => (n, u.trim()),
        None => (trimmed, ""),
    };
    let value = Decimal::from_str(number_part).ok()?;
    let unit: Arc<str> = if unit_part.is_empty() {
        "1".into()
    } else {
        unit_part.trim_matches('\'').into()
    };
    if unit.is_empty() {
        return None;
    }
    Some(Value::quantity(value, unit))
}

pub(crate) fn to_quantity(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "toQuantity")? {
        Some(value) => maybe(quantity_conversion(value)),
        None => Collection::empty(),
    })
}

pub(crate) fn converts_to_quantity(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(match conversion_focus(focus, "convertsToQuantity")? {
        Some(value) => converts(quantity_conversion(value)),
        None => Collection::empty(),
    })
}
