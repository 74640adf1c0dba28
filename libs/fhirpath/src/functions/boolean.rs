//! Boolean negation and the function forms of the type operators.

use crate::ast::Expression;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::{matches_type, Evaluator};
use crate::functions::type_specifier_arg;
use crate::value::Value;

/// Logical negation; non-boolean input is gracefully empty.
pub(crate) fn not(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match focus.singleton_value() {
        Some(Value::Boolean(b)) => Ok(Collection::singleton(Value::boolean(!b))),
        _ => Ok(Collection::empty()),
    }
}

/// `is(Type)` — singleton type test; empty in, empty out.
pub(crate) fn is_fn(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let specifier = type_specifier_arg(&args[0])
        .ok_or_else(|| Error::type_mismatch("is", "type specifier", "expression"))?;
    match focus.singleton_value() {
        Some(value) => Ok(Collection::singleton(Value::boolean(matches_type(
            value, &specifier,
        )))),
        None => Ok(Collection::empty()),
    }
}

/// `as(Type)` — filters the collection down to matching elements.
pub(crate) fn as_fn(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let specifier = type_specifier_arg(&args[0])
        .ok_or_else(|| Error::type_mismatch("as", "type specifier", "expression"))?;
    Ok(focus
        .iter()
        .filter(|value| matches_type(value, &specifier))
        .cloned()
        .collect())
}

/// The inferred type name of a singleton focus, as a String.
pub(crate) fn type_fn(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match focus.len() {
        0 => Ok(Collection::empty()),
        1 => {
            let value = focus.first().unwrap();
            Ok(Collection::singleton(Value::String(value.type_name())))
        }
        _ => Err(Error::SingletonExpected("type")),
    }
}
