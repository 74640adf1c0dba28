//! Existence and collection-property functions.

use crate::ast::Expression;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions::criterion_truth;
use crate::operators;
use crate::value::Value;

pub(crate) fn empty(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(Collection::singleton(Value::boolean(focus.is_empty())))
}

/// `exists()` tests non-emptiness; `exists(criteria)` is `where(criteria).exists()`.
pub(crate) fn exists(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let Some(criteria) = args.first() else {
        return Ok(Collection::singleton(Value::boolean(!focus.is_empty())));
    };

    for (index, item) in focus.iter().enumerate() {
        ev.tick()?;
        let result = ev.eval_lambda(criteria, item.clone(), Some(index as i64), None)?;
        if criterion_truth(&result, "exists")? == Some(true) {
            return Ok(Collection::singleton(Value::boolean(true)));
        }
    }
    Ok(Collection::singleton(Value::boolean(false)))
}

/// Vacuously true on an empty focus.
pub(crate) fn all(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let criteria = &args[0];
    for (index, item) in focus.iter().enumerate() {
        ev.tick()?;
        let result = ev.eval_lambda(criteria, item.clone(), Some(index as i64), None)?;
        if criterion_truth(&result, "all")? != Some(true) {
            return Ok(Collection::singleton(Value::boolean(false)));
        }
    }
    Ok(Collection::singleton(Value::boolean(true)))
}

fn boolean_fold(
    focus: &Collection,
    func: &'static str,
    on_empty: bool,
    decide: impl Fn(bool) -> Option<bool>,
    otherwise: bool,
) -> Result<Collection> {
    if focus.is_empty() {
        return Ok(Collection::singleton(Value::boolean(on_empty)));
    }
    for item in focus.iter() {
        let Value::Boolean(b) = item else {
            return Err(Error::type_mismatch(func, "Boolean", item.type_name()));
        };
        if let Some(result) = decide(*b) {
            return Ok(Collection::singleton(Value::boolean(result)));
        }
    }
    Ok(Collection::singleton(Value::boolean(otherwise)))
}

pub(crate) fn all_true(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    boolean_fold(focus, "allTrue", true, |b| (!b).then_some(false), true)
}

pub(crate) fn any_true(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    boolean_fold(focus, "anyTrue", false, |b| b.then_some(true), false)
}

pub(crate) fn all_false(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    boolean_fold(focus, "allFalse", true, |b| b.then_some(false), true)
}

pub(crate) fn any_false(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    boolean_fold(focus, "anyFalse", false, |b| (!b).then_some(true), false)
}

pub(crate) fn count(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(Collection::singleton(Value::integer(focus.len() as i64)))
}

pub(crate) fn distinct(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(operators::distinct_values(focus))
}

pub(crate) fn is_distinct(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    let distinct = operators::distinct_values(focus);
    Ok(Collection::singleton(Value::boolean(
        distinct.len() == focus.len(),
    )))
}

pub(crate) fn subset_of(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let other = &args[0];
    let is_subset = focus
        .iter()
        .all(|item| operators::collection_contains(other, item));
    Ok(Collection::singleton(Value::boolean(is_subset)))
}

pub(crate) fn superset_of(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let other = &args[0];
    let is_superset = other
        .iter()
        .all(|item| operators::collection_contains(focus, item));
    Ok(Collection::singleton(Value::boolean(is_superset)))
}
