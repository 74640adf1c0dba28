//! Clock functions and temporal component extractors.
//!
//! Each extractor returns empty when the requested component lies below the
//! value's precision tag.

use chrono::{Datelike, FixedOffset, Local, Timelike};

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::value::{DatePrecision, DateTimePrecision, TimePrecision, Value};

/// Current instant in the system timezone, millisecond precision.
pub(crate) fn now(
    _ev: &mut Evaluator,
    _focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    let local = Local::now();
    let offset = local.offset().local_minus_utc();
    Ok(Collection::singleton(Value::datetime(
        local.fixed_offset(),
        DateTimePrecision::Millisecond,
        Some(offset),
    )))
}

pub(crate) fn today(
    _ev: &mut Evaluator,
    _focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(Collection::singleton(Value::date(
        Local::now().date_naive(),
        DatePrecision::Day,
    )))
}

pub(crate) fn time_of_day(
    _ev: &mut Evaluator,
    _focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    Ok(Collection::singleton(Value::time(
        Local::now().time(),
        TimePrecision::Millisecond,
    )))
}

fn temporal_focus<'a>(focus: &'a Collection, func: &'static str) -> Result<Option<&'a Value>> {
    match focus.len() {
        0 => Ok(None),
        1 => Ok(focus.first()),
        _ => Err(Error::SingletonExpected(func)),
    }
}

/// A datetime's components are read in the offset it was written with.
fn local_datetime(value: &Value) -> Option<chrono::DateTime<FixedOffset>> {
    let Value::DateTime {
        value, tz_offset, ..
    } = value
    else {
        return None;
    };
    let offset = FixedOffset::east_opt(tz_offset.unwrap_or(0))?;
    Some(value.with_timezone(&offset))
}

fn extract(
    focus: &Collection,
    func: &'static str,
    component: impl Fn(&Value) -> Option<i64>,
) -> Result<Collection> {
    Ok(match temporal_focus(focus, func)? {
        Some(value) => component(value)
            .map(|i| Collection::singleton(Value::integer(i)))
            .unwrap_or_else(Collection::empty),
        None => Collection::empty(),
    })
}

pub(crate) fn year(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extract(focus, "year", |value| match value {
        Value::Date { value: d, .. } => Some(d.year() as i64),
        Value::DateTime { .. } => local_datetime(value).map(|dt| dt.year() as i64),
        _ => None,
    })
}

pub(crate) fn month(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extract(focus, "month", |value| match value {
        Value::Date {
            value: d,
            precision,
        } if *precision >= DatePrecision::Month => Some(d.month() as i64),
        Value::DateTime { precision, .. } if *precision >= DateTimePrecision::Month => {
            local_datetime(value).map(|dt| dt.month() as i64)
        }
        _ => None,
    })
}

pub(crate) fn day(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extract(focus, "day", |value| match value {
        Value::Date {
            value: d,
            precision,
        } if *precision >= DatePrecision::Day => Some(d.day() as i64),
        Value::DateTime { precision, .. } if *precision >= DateTimePrecision::Day => {
            local_datetime(value).map(|dt| dt.day() as i64)
        }
        _ => None,
    })
}

pub(crate) fn hour(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extract(focus, "hour", |value| match value {
        Value::DateTime { precision, .. } if *precision >= DateTimePrecision::Hour => {
            local_datetime(value).map(|dt| dt.hour() as i64)
        }
        Value::Time { value: t, .. } => Some(t.hour() as i64),
        _ => None,
    })
}

pub(crate) fn minute(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extract(focus, "minute", |value| match value {
        Value::DateTime { precision, .. } if *precision >= DateTimePrecision::Minute => {
            local_datetime(value).map(|dt| dt.minute() as i64)
        }
        Value::Time {
            value: t,
            precision,
        } if *precision >= TimePrecision::Minute => Some(t.minute() as i64),
        _ => None,
    })
}

pub(crate) fn second(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extract(focus, "second", |value| match value {
        Value::DateTime { precision, .. } if *precision >= DateTimePrecision::Second => {
            local_datetime(value).map(|dt| dt.second() as i64)
        }
        Value::Time {
            value: t,
            precision,
        } if *precision >= TimePrecision::Second => Some(t.second() as i64),
        _ => None,
    })
}

pub(crate) fn millisecond(
    _ev: &mut Evaluator,
    focus: &Collection,
    _args: &[Collection],
) -> Result<Collection> {
    extract(focus, "millisecond", |value| match value {
        Value::DateTime { precision, .. } if *precision >= DateTimePrecision::Millisecond => {
            local_datetime(value).map(|dt| dt.timestamp_subsec_millis() as i64)
        }
        Value::Time {
            value: t,
            precision,
        } if *precision >= TimePrecision::Millisecond => Some((t.nanosecond() / 1_000_000) as i64),
        _ => None,
    })
}
