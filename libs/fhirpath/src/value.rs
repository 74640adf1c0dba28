//! The typed value system: eight primitive variants plus an opaque JSON
//! object value produced by path traversal.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::collection::Collection;

/// Precision tag for Date values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

/// Precision tag for DateTime values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// Precision tag for Time values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimePrecision {
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// One step of a JSON path from a document root to a nested node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    Key(Arc<str>),
    Index(usize),
}

/// An opaque JSON object (or array element) reached by path traversal.
///
/// Holds the shared document root plus the path to this node, resolving
/// lazily; the inferred type name is computed once on first use.
#[derive(Debug, Clone)]
pub struct ObjectValue {
    root: Arc<JsonValue>,
    path: Vec<PathToken>,
    inferred: OnceCell<Arc<str>>,
}

/// FHIR complex types recognized by the shape heuristic, in match order.
const SHAPE_TYPES: &[(&str, fn(&serde_json::Map<String, JsonValue>) -> bool)] = &[
    ("Quantity", |map| {
        map.get("value").is_some_and(JsonValue::is_number)
            && (map.contains_key("unit")
                || map.contains_key("code")
                || map.contains_key("system")
                || map.contains_key("comparator"))
    }),
    ("Coding", |map| {
        map.contains_key("system")
            && (map.contains_key("code") || map.contains_key("display"))
            && !map.contains_key("coding")
            && !map.contains_key("value")
    }),
    ("CodeableConcept", |map| {
        map.get("coding").is_some_and(JsonValue::is_array)
    }),
    ("Reference", |map| {
        map.get("reference").is_some_and(JsonValue::is_string)
            || (map.contains_key("type") && map.contains_key("identifier"))
    }),
    ("Period", |map| {
        (map.contains_key("start") || map.contains_key("end"))
            && map
                .keys()
                .all(|k| matches!(k.as_str(), "start" | "end" | "id" | "extension"))
    }),
    ("Identifier", |map| {
        map.get("system")
            .and_then(JsonValue::as_str)
            .is_some_and(|s| s.contains(':') || s.contains('/'))
            && map.get("value").is_some_and(JsonValue::is_string)
    }),
    ("Range", |map| {
        map.get("low").is_some_and(JsonValue::is_object)
            || map.get("high").is_some_and(JsonValue::is_object)
    }),
    ("Ratio", |map| {
        map.contains_key("numerator") || map.contains_key("denominator")
    }),
    ("Attachment", |map| {
        map.contains_key("contentType") || map.contains_key("data")
    }),
    ("HumanName", |map| {
        map.contains_key("family") || map.contains_key("given")
    }),
    ("Address", |map| {
        map.contains_key("city") || map.contains_key("postalCode") || map.contains_key("line")
    }),
    ("ContactPoint", |map| {
        map.get("system").and_then(JsonValue::as_str).is_some_and(|s| {
            matches!(s, "phone" | "fax" | "email" | "pager" | "url" | "sms" | "other")
        }) && map.contains_key("value")
    }),
    ("Annotation", |map| {
        map.contains_key("text")
            && (map.contains_key("time")
                || map.contains_key("authorString")
                || map.contains_key("authorReference"))
    }),
];

impl ObjectValue {
    pub fn new(root: Arc<JsonValue>) -> Self {
        Self {
            root,
            path: Vec::new(),
            inferred: OnceCell::new(),
        }
    }

    pub fn at(root: Arc<JsonValue>, path: Vec<PathToken>) -> Self {
        Self {
            root,
            path,
            inferred: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Arc<JsonValue> {
        &self.root
    }

    pub fn path(&self) -> &[PathToken] {
        &self.path
    }

    /// Resolve this value's JSON node by walking the path from the root.
    pub fn node(&self) -> Option<&JsonValue> {
        let mut current: &JsonValue = &self.root;
        for token in &self.path {
            current = match token {
                PathToken::Key(key) => current.get(key.as_ref())?,
                PathToken::Index(idx) => current.get(*idx)?,
            };
        }
        Some(current)
    }

    /// The raw JSON bytes of this node, for profile validation and resolve()
    /// sub-documents.
    pub fn raw_bytes(&self) -> Vec<u8> {
        self.node()
            .map(|node| serde_json::to_vec(node).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Inferred type name: `resourceType` verbatim, else the shape heuristic
    /// over the recognized FHIR complex types, else `"Object"`.
    pub fn type_name(&self) -> Arc<str> {
        self.inferred
            .get_or_init(|| {
                let Some(JsonValue::Object(map)) = self.node() else {
                    return Arc::from("Object");
                };
                if let Some(rt) = map.get("resourceType").and_then(JsonValue::as_str) {
                    return Arc::from(rt);
                }
                for (name, matches_shape) in SHAPE_TYPES {
                    if matches_shape(map) {
                        return Arc::from(*name);
                    }
                }
                Arc::from("Object")
            })
            .clone()
    }

    /// Read a field, splicing arrays and coercing primitives (§4.2.1).
    /// An absent or null field contributes nothing.
    pub fn get(&self, field: &str) -> Collection {
        let Some(JsonValue::Object(map)) = self.node() else {
            return Collection::empty();
        };
        let Some(value) = map.get(field) else {
            return Collection::empty();
        };

        let mut base = self.path.clone();
        base.push(PathToken::Key(Arc::from(field)));
        self.collect_node(value, base)
    }

    /// Direct children: every field value, with arrays spliced.
    pub fn children(&self) -> Collection {
        let Some(JsonValue::Object(map)) = self.node() else {
            return Collection::empty();
        };
        let mut out = Collection::empty();
        for (key, value) in map {
            let mut base = self.path.clone();
            base.push(PathToken::Key(Arc::from(key.as_str())));
            out.extend(self.collect_node(value, base));
        }
        out
    }

    fn collect_node(&self, value: &JsonValue, path: Vec<PathToken>) -> Collection {
        match value {
            JsonValue::Array(items) => {
                let mut out = Collection::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let mut item_path = path.clone();
                    item_path.push(PathToken::Index(idx));
                    if let Some(v) = Value::from_json_node(self.root.clone(), item_path, item) {
                        out.push(v);
                    }
                }
                out
            }
            other => match Value::from_json_node(self.root.clone(), path, other) {
                Some(v) => Collection::singleton(v),
                None => Collection::empty(),
            },
        }
    }

    /// Extract Quantity parts when this node is Quantity-shaped.
    pub fn quantity_parts(&self) -> Option<(Decimal, Arc<str>)> {
        let JsonValue::Object(map) = self.node()? else {
            return None;
        };
        let value = map.get("value")?;
        let value = Decimal::from_str(&value.to_string()).ok()?;
        let unit = map
            .get("code")
            .or_else(|| map.get("unit"))
            .and_then(JsonValue::as_str)
            .unwrap_or("1");
        Some((value, Arc::from(unit)))
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        match (self.node(), other.node()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

/// A single FHIRPath value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(Arc<str>),
    Date {
        value: NaiveDate,
        precision: DatePrecision,
    },
    DateTime {
        value: DateTime<FixedOffset>,
        precision: DateTimePrecision,
        /// Offset seconds east of UTC as written; `None` when unzoned.
        tz_offset: Option<i32>,
    },
    Time {
        value: NaiveTime,
        precision: TimePrecision,
    },
    Quantity {
        value: Decimal,
        unit: Arc<str>,
    },
    Object(ObjectValue),
}

impl Value {
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    pub fn decimal(value: Decimal) -> Self {
        Value::Decimal(value)
    }

    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Value::String(value.into())
    }

    pub fn quantity(value: Decimal, unit: impl Into<Arc<str>>) -> Self {
        Value::Quantity {
            value,
            unit: unit.into(),
        }
    }

    pub fn date(value: NaiveDate, precision: DatePrecision) -> Self {
        Value::Date { value, precision }
    }

    pub fn datetime(
        value: DateTime<FixedOffset>,
        precision: DateTimePrecision,
        tz_offset: Option<i32>,
    ) -> Self {
        Value::DateTime {
            value,
            precision,
            tz_offset,
        }
    }

    pub fn time(value: NaiveTime, precision: TimePrecision) -> Self {
        Value::Time { value, precision }
    }

    /// Wrap a parsed document root.
    pub fn from_json_root(root: Arc<JsonValue>) -> Option<Self> {
        let node = root.clone();
        Self::from_json_node(root, Vec::new(), &node)
    }

    /// Coerce a JSON node into a value per the path-primitive rules:
    /// booleans, integral numbers, fractional numbers, and strings map to
    /// their primitive variants; objects (and array elements) stay opaque;
    /// null contributes nothing.
    pub fn from_json_node(
        root: Arc<JsonValue>,
        path: Vec<PathToken>,
        node: &JsonValue,
    ) -> Option<Self> {
        match node {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(Value::Boolean(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Integer(i))
                } else {
                    Decimal::from_str(&n.to_string()).ok().map(Value::Decimal)
                }
            }
            JsonValue::String(s) => Some(Value::String(Arc::from(s.as_str()))),
            JsonValue::Object(_) | JsonValue::Array(_) => {
                Some(Value::Object(ObjectValue::at(root, path)))
            }
        }
    }

    /// The value's type name as used by `is`/`as`/`ofType` and `type()`.
    pub fn type_name(&self) -> Arc<str> {
        match self {
            Value::Boolean(_) => Arc::from("Boolean"),
            Value::Integer(_) => Arc::from("Integer"),
            Value::Decimal(_) => Arc::from("Decimal"),
            Value::String(_) => Arc::from("String"),
            Value::Date { .. } => Arc::from("Date"),
            Value::DateTime { .. } => Arc::from("DateTime"),
            Value::Time { .. } => Arc::from("Time"),
            Value::Quantity { .. } => Arc::from("Quantity"),
            Value::Object(obj) => obj.type_name(),
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Object(_))
    }

    /// The canonical string rendering used by `toString()` and trace output.
    pub fn render(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.to_string(),
            Value::Date { value, precision } => render_date(*value, *precision),
            Value::DateTime {
                value,
                precision,
                tz_offset,
            } => render_datetime(*value, *precision, *tz_offset),
            Value::Time { value, precision } => render_time(*value, *precision),
            Value::Quantity { value, unit } => {
                if is_calendar_unit(unit) {
                    format!("{value} {unit}")
                } else {
                    format!("{value} '{unit}'")
                }
            }
            Value::Object(obj) => obj
                .node()
                .map(|node| node.to_string())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Calendar duration keywords accepted in quantity literals.
pub fn is_calendar_unit(unit: &str) -> bool {
    matches!(
        unit,
        "year"
            | "years"
            | "month"
            | "months"
            | "week"
            | "weeks"
            | "day"
            | "days"
            | "hour"
            | "hours"
            | "minute"
            | "minutes"
            | "second"
            | "seconds"
            | "millisecond"
            | "milliseconds"
    )
}

/// Map a calendar duration keyword (or `ms`) to its UCUM code.
pub fn calendar_unit_to_ucum(unit: &str) -> Option<&'static str> {
    Some(match unit {
        "year" | "years" => "a",
        "month" | "months" => "mo",
        "week" | "weeks" => "wk",
        "day" | "days" => "d",
        "hour" | "hours" => "h",
        "minute" | "minutes" => "min",
        "second" | "seconds" => "s",
        "millisecond" | "milliseconds" => "ms",
        _ => return None,
    })
}

fn render_date(value: NaiveDate, precision: DatePrecision) -> String {
    match precision {
        DatePrecision::Year => value.format("%Y").to_string(),
        DatePrecision::Month => value.format("%Y-%m").to_string(),
        DatePrecision::Day => value.format("%Y-%m-%d").to_string(),
    }
}

fn render_time(value: NaiveTime, precision: TimePrecision) -> String {
    match precision {
        TimePrecision::Hour => value.format("%H").to_string(),
        TimePrecision::Minute => value.format("%H:%M").to_string(),
        TimePrecision::Second => value.format("%H:%M:%S").to_string(),
        TimePrecision::Millisecond => {
            let ms = value.nanosecond() / 1_000_000;
            format!("{}.{:03}", value.format("%H:%M:%S"), ms)
        }
    }
}

fn render_datetime(
    value: DateTime<FixedOffset>,
    precision: DateTimePrecision,
    tz_offset: Option<i32>,
) -> String {
    // Render in the offset the value was written with.
    let local = match tz_offset {
        Some(secs) => value.with_timezone(
            &FixedOffset::east_opt(secs).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap()),
        ),
        None => value,
    };

    let core = match precision {
        DateTimePrecision::Year => return local.format("%Y").to_string(),
        DateTimePrecision::Month => return local.format("%Y-%m").to_string(),
        DateTimePrecision::Day => return local.format("%Y-%m-%d").to_string(),
        DateTimePrecision::Hour => local.format("%Y-%m-%dT%H").to_string(),
        DateTimePrecision::Minute => local.format("%Y-%m-%dT%H:%M").to_string(),
        DateTimePrecision::Second => local.format("%Y-%m-%dT%H:%M:%S").to_string(),
        DateTimePrecision::Millisecond => {
            let ms = local.timestamp_subsec_millis();
            format!("{}.{:03}", local.format("%Y-%m-%dT%H:%M:%S"), ms)
        }
    };

    match tz_offset {
        Some(0) => format!("{core}Z"),
        Some(secs) => {
            let sign = if secs < 0 { '-' } else { '+' };
            let abs = secs.abs();
            format!("{core}{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
        }
        None => core,
    }
}

/// Inferred type name for a raw JSON document root without wrapping it.
pub fn infer_root_type(root: &JsonValue) -> Arc<str> {
    match root {
        JsonValue::Object(map) => {
            if let Some(rt) = map.get("resourceType").and_then(JsonValue::as_str) {
                return Arc::from(rt);
            }
            for (name, matches_shape) in SHAPE_TYPES {
                if matches_shape(map) {
                    return Arc::from(*name);
                }
            }
            Arc::from("Object")
        }
        _ => Arc::from("Object"),
    }
}
