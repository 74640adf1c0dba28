//! String functions.
//!
//! All operate on a singleton String focus: empty propagates, a non-string
//! singleton is gracefully empty, more than one element is a singleton
//! violation. Indexing is by Unicode code point throughout.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use regex::RegexBuilder;

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions::{string_arg, string_focus};
use crate::value::Value;

/// Compiled-pattern size bound for `matches`/`replaceMatches`.
///
/// The `regex` crate never backtracks and guarantees worst-case linear-time
/// matching in the input, so catastrophic backtracking cannot occur; that
/// engine property is the time-bounding mechanism here, not a per-call
/// timer. This limit caps the compiled program (and with it the per-byte
/// matching constant), and the evaluation deadline is polled before every
/// compile.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

fn singleton_string(s: impl Into<String>) -> Collection {
    Collection::singleton(Value::string(s.into()))
}

pub(crate) fn index_of(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(search)) = (string_focus(focus, "indexOf")?, string_arg(args, 0, "indexOf")?)
    else {
        return Ok(Collection::empty());
    };
    let index = match s.find(search.as_ref()) {
        Some(byte_idx) => s[..byte_idx].chars().count() as i64,
        None => -1,
    };
    Ok(Collection::singleton(Value::integer(index)))
}

pub(crate) fn last_index_of(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(search)) = (
        string_focus(focus, "lastIndexOf")?,
        string_arg(args, 0, "lastIndexOf")?,
    ) else {
        return Ok(Collection::empty());
    };
    let index = match s.rfind(search.as_ref()) {
        Some(byte_idx) => s[..byte_idx].chars().count() as i64,
        None => -1,
    };
    Ok(Collection::singleton(Value::integer(index)))
}

/// Out-of-range starts are empty; an overlong length clamps to the end.
pub(crate) fn substring(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let Some(s) = string_focus(focus, "substring")? else {
        return Ok(Collection::empty());
    };
    let Some(start) = crate::functions::integer_arg(args, 0, "substring")? else {
        return Ok(Collection::empty());
    };
    ev.tick()?;

    let char_count = s.chars().count() as i64;
    if start < 0 || start >= char_count {
        return Ok(Collection::empty());
    }

    let length = match args.get(1) {
        Some(_) => match crate::functions::integer_arg(args, 1, "substring")? {
            Some(len) if len <= 0 => return Ok(Collection::empty()),
            Some(len) => len,
            None => return Ok(Collection::empty()),
        },
        None => char_count - start,
    };

    let out: String = s
        .chars()
        .skip(start as usize)
        .take(length.min(char_count - start) as usize)
        .collect();
    Ok(singleton_string(out))
}

pub(crate) fn starts_with(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(prefix)) = (
        string_focus(focus, "startsWith")?,
        string_arg(args, 0, "startsWith")?,
    ) else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::boolean(
        s.starts_with(prefix.as_ref()),
    )))
}

pub(crate) fn ends_with(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(suffix)) = (
        string_focus(focus, "endsWith")?,
        string_arg(args, 0, "endsWith")?,
    ) else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::boolean(
        s.ends_with(suffix.as_ref()),
    )))
}

/// The function form of `contains` is substring containment on a String
/// focus and collection membership otherwise.
pub(crate) fn contains(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    if let Some(Value::String(s)) = focus.singleton_value() {
        let Some(sub) = string_arg(args, 0, "contains")? else {
            return Ok(Collection::empty());
        };
        return Ok(Collection::singleton(Value::boolean(
            s.contains(sub.as_ref()),
        )));
    }

    // Collection membership: focus contains the argument value.
    let Some(needle) = args[0].singleton_value() else {
        return Ok(Collection::empty());
    };
    if focus.is_empty() {
        return Ok(Collection::empty());
    }
    Ok(Collection::singleton(Value::boolean(
        crate::operators::collection_contains(focus, needle),
    )))
}

pub(crate) fn upper(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match string_focus(focus, "upper")? {
        Some(s) => Ok(singleton_string(s.to_uppercase())),
        None => Ok(Collection::empty()),
    }
}

pub(crate) fn lower(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match string_focus(focus, "lower")? {
        Some(s) => Ok(singleton_string(s.to_lowercase())),
        None => Ok(Collection::empty()),
    }
}

pub(crate) fn replace(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(pattern), Some(substitution)) = (
        string_focus(focus, "replace")?,
        string_arg(args, 0, "replace")?,
        string_arg(args, 1, "replace")?,
    ) else {
        return Ok(Collection::empty());
    };
    Ok(singleton_string(
        s.replace(pattern.as_ref(), substitution.as_ref()),
    ))
}

/// Anchor the pattern over the full string and compile it under
/// [`REGEX_SIZE_LIMIT`]. Callers poll the evaluation deadline first, so a
/// hostile pattern is bounded by compiled size and a hostile input by the
/// engine's linear-time guarantee.
fn compile_anchored(pattern: &str) -> Result<regex::Regex> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| Error::InvalidRegex(e.to_string()))
}

/// Anchored match over the full string.
pub(crate) fn matches(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(pattern)) = (
        string_focus(focus, "matches")?,
        string_arg(args, 0, "matches")?,
    ) else {
        return Ok(Collection::empty());
    };
    ev.tick()?;
    let regex = compile_anchored(&pattern)?;
    Ok(Collection::singleton(Value::boolean(regex.is_match(&s))))
}

/// Anchored substitution with `$1..$9` back-references; a non-matching
/// subject is returned unchanged.
pub(crate) fn replace_matches(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(pattern), Some(substitution)) = (
        string_focus(focus, "replaceMatches")?,
        string_arg(args, 0, "replaceMatches")?,
        string_arg(args, 1, "replaceMatches")?,
    ) else {
        return Ok(Collection::empty());
    };
    ev.tick()?;
    let regex = compile_anchored(&pattern)?;
    let out = regex.replace(&s, substitution.as_ref());
    Ok(singleton_string(out.into_owned()))
}

/// Unicode code-point count.
pub(crate) fn length(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match string_focus(focus, "length")? {
        Some(s) => Ok(Collection::singleton(Value::integer(
            s.chars().count() as i64
        ))),
        None => Ok(Collection::empty()),
    }
}

pub(crate) fn to_chars(
    ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match string_focus(focus, "toChars")? {
        Some(s) => {
            let out: Collection = s.chars().map(|c| Value::string(c.to_string())).collect();
            ev.check_size(&out)?;
            Ok(out)
        }
        None => Ok(Collection::empty()),
    }
}

pub(crate) fn trim(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    match string_focus(focus, "trim")? {
        Some(s) => Ok(singleton_string(s.trim())),
        None => Ok(Collection::empty()),
    }
}

/// An empty separator splits into single code points.
pub(crate) fn split(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(separator)) =
        (string_focus(focus, "split")?, string_arg(args, 0, "split")?)
    else {
        return Ok(Collection::empty());
    };
    ev.tick()?;

    let out: Collection = if separator.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(separator.as_ref())
            .map(|part| Value::string(part.to_string()))
            .collect()
    };
    ev.check_size(&out)?;
    Ok(out)
}

/// Joins a collection of strings; the separator defaults to empty.
pub(crate) fn join(
    ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let separator = match args.first() {
        Some(_) => match string_arg(args, 0, "join")? {
            Some(sep) => sep,
            None => return Ok(Collection::empty()),
        },
        None => "".into(),
    };

    let mut parts = Vec::with_capacity(focus.len());
    for item in focus.iter() {
        ev.tick()?;
        let Value::String(s) = item else {
            return Err(Error::type_mismatch("join", "String", item.type_name()));
        };
        parts.push(s.to_string());
    }
    Ok(singleton_string(parts.join(separator.as_ref())))
}

/// `encode(format)` for `base64`, `urlbase64`, `hex`, and `url`.
pub(crate) fn encode(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(format)) =
        (string_focus(focus, "encode")?, string_arg(args, 0, "encode")?)
    else {
        return Ok(Collection::empty());
    };
    let out = match format.as_ref() {
        "base64" => STANDARD.encode(s.as_bytes()),
        "urlbase64" => URL_SAFE_NO_PAD.encode(s.as_bytes()),
        "hex" => hex::encode(s.as_bytes()),
        "url" => urlencoding::encode(&s).into_owned(),
        _ => return Ok(Collection::empty()),
    };
    Ok(singleton_string(out))
}

/// Inverse of [`encode`]; undecodable input is gracefully empty.
pub(crate) fn decode(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(format)) =
        (string_focus(focus, "decode")?, string_arg(args, 0, "decode")?)
    else {
        return Ok(Collection::empty());
    };
    let bytes = match format.as_ref() {
        "base64" => STANDARD.decode(s.as_bytes()).ok(),
        "urlbase64" => URL_SAFE_NO_PAD.decode(s.as_bytes()).ok(),
        "hex" => hex::decode(s.as_bytes()).ok(),
        "url" => urlencoding::decode(&s).ok().map(|c| c.into_owned().into_bytes()),
        _ => None,
    };
    match bytes.and_then(|b| String::from_utf8(b).ok()) {
        Some(out) => Ok(singleton_string(out)),
        None => Ok(Collection::empty()),
    }
}

/// `escape(target)` for `html` and `json`.
pub(crate) fn escape(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(target)) =
        (string_focus(focus, "escape")?, string_arg(args, 0, "escape")?)
    else {
        return Ok(Collection::empty());
    };
    let out = match target.as_ref() {
        "html" => html_escape::encode_safe(s.as_ref()).into_owned(),
        "json" => {
            let quoted = serde_json::to_string(s.as_ref()).unwrap_or_default();
            quoted[1..quoted.len() - 1].to_string()
        }
        _ => return Ok(Collection::empty()),
    };
    Ok(singleton_string(out))
}

pub(crate) fn unescape(
    _ev: &mut Evaluator,
    focus: &Collection,
    args: &[Collection],
) -> Result<Collection> {
    let (Some(s), Some(target)) = (
        string_focus(focus, "unescape")?,
        string_arg(args, 0, "unescape")?,
    ) else {
        return Ok(Collection::empty());
    };
    let out = match target.as_ref() {
        "html" => Some(html_escape::decode_html_entities(s.as_ref()).into_owned()),
        "json" => serde_json::from_str::<String>(&format!("\"{s}\"")).ok(),
        _ => None,
    };
    match out {
        Some(out) => Ok(singleton_string(out)),
        None => Ok(Collection::empty()),
    }
}
