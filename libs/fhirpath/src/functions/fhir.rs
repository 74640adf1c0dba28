//! Navigation, tracing, and the FHIR-specific function family:
//! extensions, reference resolution, terminology membership, and profile
//! conformance. The service-dependent functions degrade to empty when no
//! adapter is injected or an adapter fails.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde_json::json;

use crate::ast::Expression;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions::string_arg;
use crate::operators::canonical_unit;
use crate::value::{ObjectValue, PathToken, Value};

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Direct children of every object in the focus.
pub(crate) fn children(
    ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    let mut out = Collection::empty();
    for item in focus.iter() {
        ev.tick()?;
        if let Value::Object(obj) = item {
            out.extend(obj.children());
            ev.check_size(&out)?;
        }
    }
    Ok(out)
}

fn node_key(obj: &ObjectValue) -> (usize, Vec<PathToken>) {
    (
        Arc::as_ptr(obj.root()) as *const () as usize,
        obj.path().to_vec(),
    )
}

/// Transitive closure of `children` with per-node cycle detection.
pub(crate) fn descendants(
    ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    let mut out = Collection::empty();
    let mut visited: HashSet<(usize, Vec<PathToken>)> = HashSet::new();
    let mut queue: VecDeque<Value> = focus.iter().cloned().collect();

    while let Some(item) = queue.pop_front() {
        ev.tick()?;
        let Value::Object(obj) = &item else {
            continue;
        };
        if !visited.insert(node_key(obj)) {
            continue;
        }
        for child in obj.children() {
            out.push(child.clone());
            ev.check_size(&out)?;
            if matches!(child, Value::Object(_)) {
                queue.push_back(child);
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Emit a record to the injected sink and return the input unchanged. The
/// optional projection is applied per element, like `select`, for the
/// emitted collection only.
pub(crate) fn trace(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Expression],
) -> Result<Collection> {
    let label = ev.eval(&args[0], focus)?;
    let Some(Value::String(label)) = label.singleton_value().cloned() else {
        return Err(Error::type_mismatch("trace", "String label", "other"));
    };

    if let Some(sink) = ev.ctx().trace.clone() {
        let emitted = match args.get(1) {
            Some(projection) => {
                let mut projected = Collection::empty();
                for (index, item) in focus.iter().enumerate() {
                    ev.tick()?;
                    projected.extend(ev.eval_lambda(
                        projection,
                        item.clone(),
                        Some(index as i64),
                        None,
                    )?);
                }
                projected
            }
            None => focus.clone(),
        };
        sink.emit(&label, &emitted);
    }

    Ok(focus.clone())
}

// ---------------------------------------------------------------------------
// Quantity comparability
// ---------------------------------------------------------------------------

/// True when both operands are Quantities over the same UCUM dimension.
pub(crate) fn comparable(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    if focus.is_empty() || args[0].is_empty() {
        return Ok(Collection::empty());
    }
    let (Some(left), Some(right)) = (focus.singleton_value(), args[0].singleton_value()) else {
        return Ok(Collection::empty());
    };
    let (Value::Quantity { unit: lu, .. }, Value::Quantity { unit: ru, .. }) = (left, right)
    else {
        return Ok(Collection::singleton(Value::boolean(false)));
    };
    let result = lu == ru
        || calyx_ucum::convertible(&canonical_unit(lu), &canonical_unit(ru));
    Ok(Collection::singleton(Value::boolean(result)))
}

// ---------------------------------------------------------------------------
// Extensions
// ---------------------------------------------------------------------------

fn extensions_with_url(obj: &ObjectValue, url: &str) -> Collection {
    let mut out = Collection::empty();
    for ext in obj.get("extension") {
        let Value::Object(ext_obj) = &ext else {
            continue;
        };
        let matches = matches!(
            ext_obj.get("url").singleton_value(),
            Some(Value::String(u)) if u.as_ref() == url
        );
        if matches {
            out.push(ext);
        }
    }
    out
}

/// Shortcut for `extension.where(url = ...)`.
pub(crate) fn extension(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(url) = string_arg(args, 0, "extension")? else {
        return Ok(Collection::empty());
    };
    let mut out = Collection::empty();
    for item in focus.iter() {
        ev.tick()?;
        if let Value::Object(obj) = item {
            out.extend(extensions_with_url(obj, &url));
            ev.check_size(&out)?;
        }
    }
    Ok(out)
}

pub(crate) fn has_extension(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let matching = extension(ev, focus, args)?;
    if args[0].is_empty() {
        return Ok(Collection::empty());
    }
    Ok(Collection::singleton(Value::boolean(!matching.is_empty())))
}

/// The `value[x]` names probed by `getExtensionValue`, in preference order.
const VALUE_FIELD_ORDER: &[&str] = &[
    "valueString",
    "valueCode",
    "valueBoolean",
    "valueInteger",
    "valueDecimal",
    "valueDate",
    "valueDateTime",
    "valueTime",
    "valueInstant",
    "valueUri",
    "valueUrl",
    "valueCanonical",
    "valueMarkdown",
    "valuePositiveInt",
    "valueUnsignedInt",
    "valueBase64Binary",
    "valueOid",
    "valueUuid",
    "valueQuantity",
    "valueCoding",
    "valueCodeableConcept",
    "valueReference",
    "valueIdentifier",
    "valuePeriod",
    "valueRange",
    "valueRatio",
    "valueAttachment",
    "valueAnnotation",
];

/// First present `value[x]` of the first matching extension.
pub(crate) fn get_extension_value(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let matching = extension(ev, focus, args)?;
    let Some(Value::Object(ext)) = matching.first() else {
        return Ok(Collection::empty());
    };
    for field in VALUE_FIELD_ORDER {
        let value = ext.get(field);
        if !value.is_empty() {
            return Ok(value);
        }
    }
    Ok(Collection::empty())
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// The reference string carried by a focus item: either the item itself (a
/// String) or the `reference` field of a Reference-shaped object.
fn reference_string(item: &Value) -> Option<Arc<str>> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => match obj.get("reference").singleton_value() {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Resolve each reference through the injected resolver; failures skip the
/// individual item. Without a resolver the result is empty.
pub(crate) fn resolve(
    ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    let Some(resolver) = ev.ctx().resolver.clone() else {
        return Ok(Collection::empty());
    };

    let mut out = Collection::empty();
    for item in focus.iter() {
        ev.tick()?;
        let Some(reference) = reference_string(item) else {
            continue;
        };
        let Ok(Some(bytes)) = resolver.resolve(&reference) else {
            continue;
        };
        let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            continue;
        };
        if let Some(value) = Value::from_json_root(Arc::new(json)) {
            out.push(value);
            ev.check_size(&out)?;
        }
    }
    Ok(out)
}

/// `(type, id)` from relative, absolute-URL, or fragment references.
/// Version suffixes (`/_history/v`) are dropped.
fn parse_reference_key(reference: &str) -> Option<(Option<&str>, &str)> {
    if let Some(fragment) = reference.strip_prefix('#') {
        if fragment.is_empty() {
            return None;
        }
        return Some((None, fragment));
    }

    let mut segments: Vec<&str> = reference.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 2 && segments[segments.len() - 2] == "_history" {
        segments.truncate(segments.len() - 2);
    }
    if segments.len() < 2 {
        return None;
    }
    let id = segments[segments.len() - 1];
    let resource_type = segments[segments.len() - 2];
    if !resource_type
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
    {
        return None;
    }
    Some((Some(resource_type), id))
}

/// `getReferenceKey([part])` — the `"Type/id"` key, or just the `type` or
/// `id` component when requested.
pub(crate) fn get_reference_key(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let part = match args.first() {
        Some(_) => match string_arg(args, 0, "getReferenceKey")? {
            Some(part) => match part.as_ref() {
                "type" | "id" => Some(part),
                other => {
                    return Err(Error::type_mismatch(
                        "getReferenceKey",
                        "'type' or 'id'",
                        other,
                    ));
                }
            },
            None => return Ok(Collection::empty()),
        },
        None => None,
    };

    let mut out = Collection::empty();
    for item in focus.iter() {
        ev.tick()?;
        let Some(reference) = reference_string(item) else {
            continue;
        };
        let Some((resource_type, id)) = parse_reference_key(&reference) else {
            continue;
        };
        let value = match part.as_deref() {
            Some("type") => match resource_type {
                Some(t) => Value::string(t.to_string()),
                None => continue,
            },
            Some("id") => Value::string(id.to_string()),
            _ => match resource_type {
                Some(t) => Value::string(format!("{t}/{id}")),
                None => continue,
            },
        };
        out.push(value);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Terminology & profiles
// ---------------------------------------------------------------------------

/// Code shape handed to the terminology service: a bare code, a Coding, or a
/// CodeableConcept.
fn code_shape(item: &Value) -> Option<serde_json::Value> {
    match item {
        Value::String(s) => Some(json!({ "code": s.as_ref() })),
        Value::Object(obj) => obj.node().cloned(),
        _ => None,
    }
}

/// ValueSet membership through the injected terminology service; absence or
/// failure degrades to empty.
pub(crate) fn member_of(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(url) = string_arg(args, 0, "memberOf")? else {
        return Ok(Collection::empty());
    };
    let Some(service) = ev.ctx().terminology.clone() else {
        return Ok(Collection::empty());
    };

    let mut out = Collection::empty();
    for item in focus.iter() {
        ev.tick()?;
        let Some(code) = code_shape(item) else {
            continue;
        };
        match service.member_of(&code, &url) {
            Ok(member) => out.push(Value::boolean(member)),
            Err(_) => continue,
        }
    }
    Ok(out)
}

/// Profile conformance through the injected validator; absence or failure
/// degrades to empty.
pub(crate) fn conforms_to(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(url) = string_arg(args, 0, "conformsTo")? else {
        return Ok(Collection::empty());
    };
    let Some(validator) = ev.ctx().profiles.clone() else {
        return Ok(Collection::empty());
    };

    let mut out = Collection::empty();
    for item in focus.iter() {
        ev.tick()?;
        let Value::Object(obj) = item else {
            continue;
        };
        match validator.conforms_to(&obj.raw_bytes(), &url) {
            Ok(conforms) => out.push(Value::boolean(conforms)),
            Err(_) => continue,
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Primitive access
// ---------------------------------------------------------------------------

/// True when the focus is a single primitive value.
pub(crate) fn has_value(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    let result = matches!(focus.singleton_value(), Some(v) if v.is_primitive());
    Ok(Collection::singleton(Value::boolean(result)))
}

/// The single primitive value, or empty.
pub(crate) fn get_value(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match focus.singleton_value() {
        Some(value) if value.is_primitive() => Ok(Collection::singleton(value.clone())),
        _ => Ok(Collection::empty()),
    }
}
