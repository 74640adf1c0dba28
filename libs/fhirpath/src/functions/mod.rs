//! The built-in function catalog.
//!
//! Functions are dispatched by name through a process-wide compile-time map.
//! Each descriptor declares its arity bounds and one of two implementation
//! shapes: **eager** functions receive their arguments already evaluated to
//! collections; **lambda** functions receive the argument ASTs and re-enter
//! the evaluator with `$this`/`$index`/`$total` rebound per element.

mod aggregate;
mod boolean;
mod combining;
mod conversion;
mod existence;
mod fhir;
mod filtering;
mod math;
mod string;
mod subsetting;
mod temporal;

use std::sync::Arc;

use phf::phf_map;

use crate::ast::{Expression, TypeSpecifier};
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::value::Value;

pub(crate) type EagerFn = fn(&mut Evaluator, &Collection, &[Collection]) -> Result<Collection>;
pub(crate) type LambdaFn = fn(&mut Evaluator, &Collection, &[Expression]) -> Result<Collection>;

#[derive(Clone, Copy)]
pub(crate) enum FunctionImpl {
    Eager(EagerFn),
    Lambda(LambdaFn),
}

pub(crate) struct FunctionDescriptor {
    pub min_args: usize,
    pub max_args: usize,
    pub imp: FunctionImpl,
}

const fn eager(min_args: usize, max_args: usize, f: EagerFn) -> FunctionDescriptor {
    FunctionDescriptor {
        min_args,
        max_args,
        imp: FunctionImpl::Eager(f),
    }
}

const fn lambda(min_args: usize, max_args: usize, f: LambdaFn) -> FunctionDescriptor {
    FunctionDescriptor {
        min_args,
        max_args,
        imp: FunctionImpl::Lambda(f),
    }
}

static REGISTRY: phf::Map<&'static str, FunctionDescriptor> = phf_map! {
    // Existence
    "empty" => eager(0, 0, existence::empty),
    "exists" => lambda(0, 1, existence::exists),
    "all" => lambda(1, 1, existence::all),
    "allTrue" => eager(0, 0, existence::all_true),
    "anyTrue" => eager(0, 0, existence::any_true),
    "allFalse" => eager(0, 0, existence::all_false),
    "anyFalse" => eager(0, 0, existence::any_false),
    "count" => eager(0, 0, existence::count),
    "distinct" => eager(0, 0, existence::distinct),
    "isDistinct" => eager(0, 0, existence::is_distinct),
    "subsetOf" => eager(1, 1, existence::subset_of),
    "supersetOf" => eager(1, 1, existence::superset_of),

    // Filtering & projection
    "where" => lambda(1, 1, filtering::where_fn),
    "select" => lambda(1, 1, filtering::select_fn),
    "repeat" => lambda(1, 1, filtering::repeat_fn),
    "ofType" => lambda(1, 1, filtering::of_type),

    // Boolean & type tests
    "not" => eager(0, 0, boolean::not),
    "is" => lambda(1, 1, boolean::is_fn),
    "as" => lambda(1, 1, boolean::as_fn),

    // Subsetting
    "single" => eager(0, 0, subsetting::single),
    "first" => eager(0, 0, subsetting::first),
    "last" => eager(0, 0, subsetting::last),
    "tail" => eager(0, 0, subsetting::tail),
    "skip" => eager(1, 1, subsetting::skip),
    "take" => eager(1, 1, subsetting::take),
    "intersect" => eager(1, 1, subsetting::intersect),
    "exclude" => eager(1, 1, subsetting::exclude),

    // Combining
    "union" => eager(1, 1, combining::union),
    "combine" => eager(1, 1, combining::combine),

    // Strings
    "indexOf" => eager(1, 1, string::index_of),
    "lastIndexOf" => eager(1, 1, string::last_index_of),
    "substring" => eager(1, 2, string::substring),
    "startsWith" => eager(1, 1, string::starts_with),
    "endsWith" => eager(1, 1, string::ends_with),
    "contains" => eager(1, 1, string::contains),
    "upper" => eager(0, 0, string::upper),
    "lower" => eager(0, 0, string::lower),
    "replace" => eager(2, 2, string::replace),
    "matches" => eager(1, 1, string::matches),
    "replaceMatches" => eager(2, 2, string::replace_matches),
    "length" => eager(0, 0, string::length),
    "toChars" => eager(0, 0, string::to_chars),
    "trim" => eager(0, 0, string::trim),
    "split" => eager(1, 1, string::split),
    "join" => eager(0, 1, string::join),
    "encode" => eager(1, 1, string::encode),
    "decode" => eager(1, 1, string::decode),
    "escape" => eager(1, 1, string::escape),
    "unescape" => eager(1, 1, string::unescape),

    // Math
    "abs" => eager(0, 0, math::abs),
    "ceiling" => eager(0, 0, math::ceiling),
    "floor" => eager(0, 0, math::floor),
    "truncate" => eager(0, 0, math::truncate),
    "round" => eager(0, 1, math::round),
    "exp" => eager(0, 0, math::exp),
    "ln" => eager(0, 0, math::ln),
    "log" => eager(1, 1, math::log),
    "power" => eager(1, 1, math::power),
    "sqrt" => eager(0, 0, math::sqrt),

    // Conditional & conversion
    "iif" => lambda(2, 3, conversion::iif),
    "toBoolean" => eager(0, 0, conversion::to_boolean),
    "convertsToBoolean" => eager(0, 0, conversion::converts_to_boolean),
    "toInteger" => eager(0, 0, conversion::to_integer),
    "convertsToInteger" => eager(0, 0, conversion::converts_to_integer),
    "toDecimal" => eager(0, 0, conversion::to_decimal),
    "convertsToDecimal" => eager(0, 0, conversion::converts_to_decimal),
    "toString" => eager(0, 0, conversion::to_string),
    "convertsToString" => eager(0, 0, conversion::converts_to_string),
    "toDate" => eager(0, 0, conversion::to_date),
    "convertsToDate" => eager(0, 0, conversion::converts_to_date),
    "toDateTime" => eager(0, 0, conversion::to_datetime),
    "convertsToDateTime" => eager(0, 0, conversion::converts_to_datetime),
    "toTime" => eager(0, 0, conversion::to_time),
    "convertsToTime" => eager(0, 0, conversion::converts_to_time),
    "toQuantity" => eager(0, 0, conversion::to_quantity),
    "convertsToQuantity" => eager(0, 0, conversion::converts_to_quantity),

    // Temporal
    "now" => eager(0, 0, temporal::now),
    "today" => eager(0, 0, temporal::today),
    "timeOfDay" => eager(0, 0, temporal::time_of_day),
    "year" => eager(0, 0, temporal::year),
    "month" => eager(0, 0, temporal::month),
    "day" => eager(0, 0, temporal::day),
    "hour" => eager(0, 0, temporal::hour),
    "minute" => eager(0, 0, temporal::minute),
    "second" => eager(0, 0, temporal::second),
    "millisecond" => eager(0, 0, temporal::millisecond),

    // Aggregation
    "aggregate" => lambda(1, 2, aggregate::aggregate),
    "sum" => eager(0, 0, aggregate::sum),
    "avg" => eager(0, 0, aggregate::avg),
    "min" => eager(0, 0, aggregate::min),
    "max" => eager(0, 0, aggregate::max),

    // Navigation
    "children" => eager(0, 0, fhir::children),
    "descendants" => eager(0, 0, fhir::descendants),

    // Utility & FHIR-specific
    "trace" => lambda(1, 2, fhir::trace),
    "type" => eager(0, 0, boolean::type_fn),
    "comparable" => eager(1, 1, fhir::comparable),
    "extension" => eager(1, 1, fhir::extension),
    "hasExtension" => eager(1, 1, fhir::has_extension),
    "getExtensionValue" => eager(1, 1, fhir::get_extension_value),
    "resolve" => eager(0, 0, fhir::resolve),
    "getReferenceKey" => eager(0, 1, fhir::get_reference_key),
    "memberOf" => eager(1, 1, fhir::member_of),
    "conformsTo" => eager(1, 1, fhir::conforms_to),
    "hasValue" => eager(0, 0, fhir::has_value),
    "getValue" => eager(0, 0, fhir::get_value),
};

/// Dispatch a function invocation against the current focus.
pub(crate) fn invoke(
    evaluator: &mut Evaluator,
    name: &str,
    args: &[Expression],
    focus: &Collection,
) -> Result<Collection> {
    let Some(descriptor) = REGISTRY.get(name) else {
        return Err(Error::UnknownFunction(name.to_string()));
    };
    if args.len() < descriptor.min_args || args.len() > descriptor.max_args {
        return Err(Error::Arity {
            function: name.to_string(),
            min: descriptor.min_args,
            max: descriptor.max_args,
            got: args.len(),
        });
    }

    match descriptor.imp {
        FunctionImpl::Lambda(f) => f(evaluator, focus, args),
        FunctionImpl::Eager(f) => {
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(evaluator.eval(arg, focus)?);
            }
            f(evaluator, focus, &evaluated)
        }
    }
}

/// True when `name` is a registered function.
pub fn is_registered(name: &str) -> bool {
    REGISTRY.contains_key(name)
}

/// All registered function names.
pub fn registered_names() -> Vec<&'static str> {
    REGISTRY.keys().copied().collect()
}

// ---------------------------------------------------------------------------
// Shared argument helpers
// ---------------------------------------------------------------------------

/// Interpret a lambda argument as a type specifier: a bare identifier, a
/// qualified name, or a string literal. Never evaluated as a path.
pub(crate) fn type_specifier_arg(expr: &Expression) -> Option<TypeSpecifier> {
    fn walk(expr: &Expression, parts: &mut Vec<Arc<str>>) -> bool {
        match expr {
            Expression::Identifier(name) => {
                parts.push(name.clone());
                true
            }
            Expression::Member { target, member } => {
                walk(target, parts) && walk(member, parts)
            }
            _ => false,
        }
    }

    match expr {
        Expression::Literal(crate::ast::Literal::String(s)) => {
            let parts = s.split('.').map(Arc::from).collect::<Vec<Arc<str>>>();
            Some(TypeSpecifier::new(parts))
        }
        _ => {
            let mut parts = Vec::new();
            if walk(expr, &mut parts) {
                Some(TypeSpecifier::new(parts))
            } else {
                None
            }
        }
    }
}

/// Singleton-string focus: empty propagates, non-string is gracefully empty,
/// multi-element is a singleton violation.
pub(crate) fn string_focus(
    focus: &Collection,
    func: &'static str,
) -> Result<Option<Arc<str>>> {
    match focus.len() {
        0 => Ok(None),
        1 => Ok(match focus.first() {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }),
        _ => Err(Error::SingletonExpected(func)),
    }
}

/// Singleton-string argument: empty propagates, any other shape is an error.
pub(crate) fn string_arg(
    args: &[Collection],
    index: usize,
    func: &'static str,
) -> Result<Option<Arc<str>>> {
    let Some(arg) = args.get(index) else {
        return Ok(None);
    };
    if arg.is_empty() {
        return Ok(None);
    }
    match arg.singleton_value() {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::type_mismatch(func, "String", other.type_name())),
        None => Err(Error::SingletonExpected(func)),
    }
}

/// Singleton-integer argument: empty propagates, any other shape is an error.
pub(crate) fn integer_arg(
    args: &[Collection],
    index: usize,
    func: &'static str,
) -> Result<Option<i64>> {
    let Some(arg) = args.get(index) else {
        return Ok(None);
    };
    if arg.is_empty() {
        return Ok(None);
    }
    match arg.singleton_value() {
        Some(Value::Integer(i)) => Ok(Some(*i)),
        Some(other) => Err(Error::type_mismatch(func, "Integer", other.type_name())),
        None => Err(Error::SingletonExpected(func)),
    }
}

/// Truth of a lambda criterion result: empty is no-decision, a singleton
/// Boolean decides, anything else is a type error.
pub(crate) fn criterion_truth(
    result: &Collection,
    func: &'static str,
) -> Result<Option<bool>> {
    if result.is_empty() {
        return Ok(None);
    }
    match result.singleton_value() {
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(other) => Err(Error::type_mismatch(func, "Boolean", other.type_name())),
        None => Err(Error::SingletonExpected(func)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_complete() {
        let expected = [
            "empty", "exists", "all", "allTrue", "anyTrue", "allFalse", "anyFalse", "count",
            "distinct", "isDistinct", "subsetOf", "supersetOf", "where", "select", "repeat",
            "ofType", "not", "is", "as", "single", "first", "last", "tail", "skip", "take",
            "intersect", "exclude", "union", "combine", "indexOf", "lastIndexOf", "substring",
            "startsWith", "endsWith", "contains", "upper", "lower", "replace", "matches",
            "replaceMatches", "length", "toChars", "trim", "split", "join", "encode", "decode",
            "escape", "unescape", "abs", "ceiling", "floor", "truncate", "round", "exp", "ln",
            "log", "power", "sqrt", "iif", "toBoolean", "convertsToBoolean", "toInteger",
            "convertsToInteger", "toDecimal", "convertsToDecimal", "toString", "convertsToString",
            "toDate", "convertsToDate", "toDateTime", "convertsToDateTime", "toTime",
            "convertsToTime", "toQuantity", "convertsToQuantity", "now", "today", "timeOfDay",
            "year", "month", "day", "hour", "minute", "second", "millisecond", "aggregate", "sum",
            "avg", "min", "max", "children", "descendants", "trace", "type", "comparable",
            "extension", "hasExtension", "getExtensionValue", "resolve", "getReferenceKey",
            "memberOf", "conformsTo", "hasValue", "getValue",
        ];
        for name in expected {
            assert!(is_registered(name), "function '{name}' is not registered");
        }
    }

    #[test]
    fn test_type_specifier_arg_shapes() {
        let bare = Expression::Identifier("Patient".into());
        assert_eq!(type_specifier_arg(&bare).unwrap().name(), "Patient");

        let qualified = Expression::Member {
            target: Box::new(Expression::Identifier("System".into())),
            member: Box::new(Expression::Identifier("Integer".into())),
        };
        let specifier = type_specifier_arg(&qualified).unwrap();
        assert_eq!(specifier.qualifier(), Some("System"));
        assert_eq!(specifier.name(), "Integer");

        let string = Expression::Literal(crate::ast::Literal::String("Quantity".into()));
        assert_eq!(type_specifier_arg(&string).unwrap().name(), "Quantity");

        let bogus = Expression::Literal(crate::ast::Literal::Integer(1));
        assert!(type_specifier_arg(&bogus).is_none());
    }
}
