//! Aggregation: the general `aggregate()` fold and the numeric shortcuts.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::ast::Expression;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::operators;
use crate::value::Value;

/// `aggregate(aggregator[, init])` — `$total` starts at the init expression
/// (or empty) and is replaced by the aggregator result after each element.
pub(crate) fn aggregate(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let aggregator = &args[0];
    let mut total = match args.get(1) {
        Some(init) => ev.eval(init, focus)?,
        None => Collection::empty(),
    };

    for (index, item) in focus.iter().enumerate() {
        ev.tick()?;
        total = ev.eval_lambda(
            aggregator,
            item.clone(),
            Some(index as i64),
            Some(total),
        )?;
    }
    Ok(total)
}

/// Integer when every element is an Integer, Decimal otherwise; 0 on empty.
pub(crate) fn sum(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    if focus.is_empty() {
        return Ok(Collection::singleton(Value::integer(0)));
    }

    let mut integer_sum: Option<i64> = Some(0);
    let mut decimal_sum = Decimal::ZERO;
    for item in focus.iter() {
        match item {
            Value::Integer(i) => {
                integer_sum = integer_sum.and_then(|acc| acc.checked_add(*i));
                decimal_sum = decimal_sum
                    .checked_add(Decimal::from(*i))
                    .ok_or(Error::ArithmeticOverflow)?;
            }
            Value::Decimal(d) => {
                integer_sum = None;
                decimal_sum = decimal_sum
                    .checked_add(*d)
                    .ok_or(Error::ArithmeticOverflow)?;
            }
            other => {
                return Err(Error::type_mismatch(
                    "sum",
                    "Integer or Decimal",
                    other.type_name(),
                ));
            }
        }
    }

    let all_integer = focus.iter().all(|v| matches!(v, Value::Integer(_)));
    if all_integer {
        match integer_sum {
            Some(total) => Ok(Collection::singleton(Value::integer(total))),
            None => Err(Error::ArithmeticOverflow),
        }
    } else {
        Ok(Collection::singleton(Value::decimal(decimal_sum)))
    }
}

/// Decimal mean; empty on empty.
pub(crate) fn avg(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    if focus.is_empty() {
        return Ok(Collection::empty());
    }

    let mut total = Decimal::ZERO;
    for item in focus.iter() {
        let value = match item {
            Value::Integer(i) => Decimal::from(*i),
            Value::Decimal(d) => *d,
            other => {
                return Err(Error::type_mismatch(
                    "avg",
                    "Integer or Decimal",
                    other.type_name(),
                ));
            }
        };
        total = total.checked_add(value).ok_or(Error::ArithmeticOverflow)?;
    }

    let mean = total
        .checked_div(Decimal::from(focus.len() as i64))
        .ok_or(Error::ArithmeticOverflow)?;
    Ok(Collection::singleton(Value::decimal(mean)))
}

fn extreme(focus: &Collection, func: &'static str, keep: Ordering) -> Result<Collection> {
    let mut best: Option<&Value> = None;
    for item in focus.iter() {
        match best {
            None => best = Some(item),
            Some(current) => {
                // An ambiguous ordering (partial precision) has no extreme.
                let Some(ordering) = operators::compare_values(func, item, current)? else {
                    return Ok(Collection::empty());
                };
                if ordering == keep {
                    best = Some(item);
                }
            }
        }
    }
    Ok(best
        .cloned()
        .map(Collection::singleton)
        .unwrap_or_else(Collection::empty))
}

/// Minimum over Integer, Decimal, String, Date, DateTime, Time, or Quantity
/// (UCUM-aware).
pub(crate) fn min(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extreme(focus, "min", Ordering::Less)
}

pub(crate) fn max(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extreme(focus, "max", Ordering::Greater)
}
