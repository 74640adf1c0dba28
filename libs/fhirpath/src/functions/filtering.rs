//! Filtering and projection: the lambda-bearing core of the catalog.

use std::collections::VecDeque;

use crate::ast::Expression;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::{matches_type, Evaluator};
use crate::functions::{criterion_truth, type_specifier_arg};
use crate::operators;

/// Keep the elements for which the criteria evaluates to true.
pub(crate) fn where_fn(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let criteria = &args[0];
    let mut out = Collection::empty();
    for (index, item) in focus.iter().enumerate() {
        ev.tick()?;
        let result = ev.eval_lambda(criteria, item.clone(), Some(index as i64), None)?;
        if criterion_truth(&result, "where")? == Some(true) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

/// Project each element and flatten the results.
pub(crate) fn select_fn(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let projection = &args[0];
    let mut out = Collection::empty();
    for (index, item) in focus.iter().enumerate() {
        ev.tick()?;
        out.extend(ev.eval_lambda(projection, item.clone(), Some(index as i64), None)?);
        ev.check_size(&out)?;
    }
    Ok(out)
}

/// Duplicate-free transitive closure of the projection. Deduplication by `=`
/// doubles as cycle detection, so the fixed point exists for any finite
/// value graph.
pub(crate) fn repeat_fn(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let projection = &args[0];
    let mut out = Collection::empty();
    let mut queue: VecDeque<crate::value::Value> = focus.iter().cloned().collect();

    while let Some(item) = queue.pop_front() {
        ev.tick()?;
        let projected = ev.eval_lambda(projection, item, None, None)?;
        for value in projected {
            if !operators::collection_contains(&out, &value) {
                out.push(value.clone());
                ev.check_size(&out)?;
                queue.push_back(value);
            }
        }
    }
    Ok(out)
}

/// Keep the elements whose inferred type matches the specifier.
pub(crate) fn of_type(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let specifier = type_specifier_arg(&args[0]).ok_or_else(|| {
        Error::type_mismatch("ofType", "type specifier", "expression")
    })?;
    Ok(focus
        .iter()
        .filter(|item| matches_type(item, &specifier))
        .cloned()
        .collect())
}
