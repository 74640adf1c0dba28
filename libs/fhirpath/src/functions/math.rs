//! Math functions over Integer and Decimal (and `abs` over Quantity).
//!
//! Non-numeric input is gracefully empty; a multi-element focus is a
//! singleton violation. The transcendental functions route through `f64`
//! like the rest of the ecosystem and come back to `Decimal`.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions::integer_arg;
use crate::value::Value;

fn numeric_focus(focus: &Collection, func: &'static str) -> Result<Option<Value>> {
    match focus.len() {
        0 => Ok(None),
        1 => match focus.first() {
            Some(v @ (Value::Integer(_) | Value::Decimal(_))) => Ok(Some(v.clone())),
            _ => Ok(None),
        },
        _ => Err(Error::SingletonExpected(func)),
    }
}

fn decimal_focus(focus: &Collection, func: &'static str) -> Result<Option<Decimal>> {
    Ok(numeric_focus(focus, func)?.map(|v| match v {
        Value::Integer(i) => Decimal::from(i),
        Value::Decimal(d) => d,
        _ => unreachable!(),
    }))
}

fn float_focus(focus: &Collection, func: &'static str) -> Result<Option<f64>> {
    Ok(decimal_focus(focus, func)?.and_then(|d| d.to_f64()))
}

fn decimal_from_f64(value: f64) -> Option<Value> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&format!("{value}")).ok().map(Value::decimal)
}

fn maybe(value: Option<Value>) -> Collection {
    value.map(Collection::singleton).unwrap_or_else(Collection::empty)
}

/// Preserves the input kind.
pub(crate) fn abs(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match focus.len() {
        0 => Ok(Collection::empty()),
        1 => match focus.first() {
            Some(Value::Integer(i)) => i
                .checked_abs()
                .map(|v| Collection::singleton(Value::integer(v)))
                .ok_or(Error::ArithmeticOverflow),
            Some(Value::Decimal(d)) => Ok(Collection::singleton(Value::decimal(d.abs()))),
            Some(Value::Quantity { value, unit }) => {
                Ok(Collection::singleton(Value::quantity(value.abs(), unit.clone())))
            }
            _ => Ok(Collection::empty()),
        },
        _ => Err(Error::SingletonExpected("abs")),
    }
}

fn to_integer_value(d: Decimal, func: &'static str) -> Result<Collection> {
    match d.to_i64() {
        Some(i) => Ok(Collection::singleton(Value::integer(i))),
        None => Err(Error::type_mismatch(func, "Integer-range value", "Decimal")),
    }
}

pub(crate) fn ceiling(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match decimal_focus(focus, "ceiling")? {
        Some(d) => to_integer_value(d.ceil(), "ceiling"),
        None => Ok(Collection::empty()),
    }
}

pub(crate) fn floor(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match decimal_focus(focus, "floor")? {
        Some(d) => to_integer_value(d.floor(), "floor"),
        None => Ok(Collection::empty()),
    }
}

pub(crate) fn truncate(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match decimal_focus(focus, "truncate")? {
        Some(d) => to_integer_value(d.trunc(), "truncate"),
        None => Ok(Collection::empty()),
    }
}

/// Banker's rounding at the requested precision (default 0).
pub(crate) fn round(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(d) = decimal_focus(focus, "round")? else {
        return Ok(Collection::empty());
    };
    let precision = match args.first() {
        Some(_) => match integer_arg(args, 0, "round")? {
            Some(p) if p >= 0 => p as u32,
            Some(_) => {
                return Err(Error::type_mismatch(
                    "round",
                    "non-negative precision",
                    "negative Integer",
                ));
            }
            None => return Ok(Collection::empty()),
        },
        None => 0,
    };
    Ok(Collection::singleton(Value::decimal(d.round_dp(precision))))
}

pub(crate) fn exp(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match float_focus(focus, "exp")? {
        Some(f) => Ok(maybe(decimal_from_f64(f.exp()))),
        None => Ok(Collection::empty()),
    }
}

/// Empty on non-positive input.
pub(crate) fn ln(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match float_focus(focus, "ln")? {
        Some(f) if f > 0.0 => Ok(maybe(decimal_from_f64(f.ln()))),
        _ => Ok(Collection::empty()),
    }
}

pub(crate) fn log(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(f) = float_focus(focus, "log")? else {
        return Ok(Collection::empty());
    };
    let base = match args[0].as_decimal() {
        Ok(b) => b.to_f64(),
        Err(_) => None,
    };
    match base {
        Some(b) if f > 0.0 && b > 0.0 && b != 1.0 => Ok(maybe(decimal_from_f64(f.log(b)))),
        _ => Ok(Collection::empty()),
    }
}

/// Integer base and non-negative integer exponent stay Integer; everything
/// else goes through `f64`. An undefined result (negative base, fractional
/// exponent) is empty.
pub(crate) fn power(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(base) = numeric_focus(focus, "power")? else {
        return Ok(Collection::empty());
    };
    let Some(exponent) = args[0].singleton_value().cloned() else {
        return Ok(Collection::empty());
    };

    if let (Value::Integer(b), Value::Integer(e)) = (&base, &exponent) {
        if *e >= 0 {
            let exp = u32::try_from(*e).map_err(|_| Error::ArithmeticOverflow)?;
            return b
                .checked_pow(exp)
                .map(|v| Collection::singleton(Value::integer(v)))
                .ok_or(Error::ArithmeticOverflow);
        }
    }

    let to_f64 = |v: &Value| match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    };
    match (to_f64(&base), to_f64(&exponent)) {
        (Some(b), Some(e)) => Ok(maybe(decimal_from_f64(b.powf(e)))),
        _ => Ok(Collection::empty()),
    }
}

/// Empty on negative input.
pub(crate) fn sqrt(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match float_focus(focus, "sqrt")? {
        Some(f) if f >= 0.0 => Ok(maybe(decimal_from_f64(f.sqrt()))),
        _ => Ok(Collection::empty()),
    }
}
