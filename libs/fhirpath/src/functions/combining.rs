//! Combining functions: set union and order-preserving concatenation.

use crate::collection::Collection;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::operators;

pub(crate) fn union(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    Ok(operators::union_collections(focus, &args[0]))
}

pub(crate) fn combine(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let mut out = focus.clone();
    out.extend(args[0].clone());
    Ok(out)
}
