//! Subsetting functions.

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions::integer_arg;
use crate::operators;

/// Errors on more than one element; empty stays empty.
pub(crate) fn single(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match focus.len() {
        0 => Ok(Collection::empty()),
        1 => Ok(focus.clone()),
        _ => Err(Error::SingletonExpected("single")),
    }
}

pub(crate) fn first(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(focus
        .first()
        .cloned()
        .map(Collection::singleton)
        .unwrap_or_else(Collection::empty))
}

pub(crate) fn last(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(focus
        .last()
        .cloned()
        .map(Collection::singleton)
        .unwrap_or_else(Collection::empty))
}

pub(crate) fn tail(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(focus.iter().skip(1).cloned().collect())
}

/// A non-positive count skips nothing.
pub(crate) fn skip(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(count) = integer_arg(args, 0, "skip")? else {
        return Ok(Collection::empty());
    };
    let count = count.max(0) as usize;
    Ok(focus.iter().skip(count).cloned().collect())
}

/// A non-positive count takes nothing.
pub(crate) fn take(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(count) = integer_arg(args, 0, "take")? else {
        return Ok(Collection::empty());
    };
    if count <= 0 {
        return Ok(Collection::empty());
    }
    Ok(focus.iter().take(count as usize).cloned().collect())
}

/// Elements present in both operands, deduplicated, in focus order.
pub(crate) fn intersect(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let other = &args[0];
    let mut out = Collection::empty();
    for item in focus.iter() {
        if operators::collection_contains(other, item)
            && !operators::collection_contains(&out, item)
        {
            out.push(item.clone());
        }
    }
    Ok(out)
}

/// Elements not present in the other operand; duplicates and order preserved.
pub(crate) fn exclude(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let other = &args[0];
    Ok(focus
        .iter()
        .filter(|item| !operators::collection_contains(other, item))
        .cloned()
        .collect())
}
