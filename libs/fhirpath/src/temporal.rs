//! Temporal parsing and calendar arithmetic.
//!
//! Path navigation leaves date-like JSON strings as `String` values; the
//! helpers here promote them when they meet a temporal operand, and implement
//! Date/DateTime/Time plus/minus calendar-duration quantities at the
//! operand's precision.

use chrono::{
    DateTime, Days, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::value::{DatePrecision, DateTimePrecision, TimePrecision, Value};

pub(crate) fn parse_date_parts(input: &str) -> Option<(NaiveDate, DatePrecision)> {
    let s = input.trim();
    match s.len() {
        4 => {
            let date = NaiveDate::parse_from_str(&format!("{s}-01-01"), "%Y-%m-%d").ok()?;
            Some((date, DatePrecision::Year))
        }
        7 => {
            let date = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()?;
            Some((date, DatePrecision::Month))
        }
        10 => {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some((date, DatePrecision::Day))
        }
        _ => None,
    }
}

pub(crate) fn parse_time_parts(input: &str) -> Option<(NaiveTime, TimePrecision)> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let precision = if s.contains('.') {
        TimePrecision::Millisecond
    } else if s.matches(':').count() >= 2 {
        TimePrecision::Second
    } else if s.contains(':') {
        TimePrecision::Minute
    } else {
        TimePrecision::Hour
    };

    let value = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(s, "%H"))
        .ok()?;

    Some((value, precision))
}

type DateTimeParts = (DateTime<FixedOffset>, DateTimePrecision, Option<i32>);

/// Parse a datetime string; date-only inputs yield date-level precision.
pub(crate) fn parse_datetime_parts(input: &str) -> Option<DateTimeParts> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }

    let Some((date_part, rest)) = raw.split_once('T') else {
        let (date, date_precision) = parse_date_parts(raw)?;
        let precision = match date_precision {
            DatePrecision::Year => DateTimePrecision::Year,
            DatePrecision::Month => DateTimePrecision::Month,
            DatePrecision::Day => DateTimePrecision::Day,
        };
        let value = utc_datetime(date, NaiveTime::MIN)?;
        return Some((value, precision, None));
    };

    let (date, date_precision) = parse_date_parts(date_part)?;

    if rest.is_empty() {
        let precision = match date_precision {
            DatePrecision::Year => DateTimePrecision::Year,
            DatePrecision::Month => DateTimePrecision::Month,
            DatePrecision::Day => DateTimePrecision::Day,
        };
        let value = utc_datetime(date, NaiveTime::MIN)?;
        return Some((value, precision, None));
    }

    let (time_part, tz_offset) = split_timezone(rest)?;
    let (time, precision) = parse_datetime_time(time_part)?;

    let offset = FixedOffset::east_opt(tz_offset.unwrap_or(0))?;
    let value = offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()?;
    Some((value, precision, tz_offset))
}

fn utc_datetime(date: NaiveDate, time: NaiveTime) -> Option<DateTime<FixedOffset>> {
    FixedOffset::east_opt(0)?
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
}

fn split_timezone(rest: &str) -> Option<(&str, Option<i32>)> {
    if let Some(stripped) = rest.strip_suffix('Z') {
        return Some((stripped, Some(0)));
    }
    if let Some(pos) = rest.rfind(['+', '-']) {
        let (time, tz) = rest.split_at(pos);
        let sign = if tz.starts_with('-') { -1 } else { 1 };
        let digits = &tz[1..];
        let (hh, mm) = if let Some((h, m)) = digits.split_once(':') {
            (h, m)
        } else if digits.len() == 4 {
            (&digits[0..2], &digits[2..4])
        } else {
            return None;
        };
        let hours: i32 = hh.parse().ok()?;
        let minutes: i32 = mm.parse().ok()?;
        return Some((time, Some(sign * (hours * 3600 + minutes * 60))));
    }
    Some((rest, None))
}

fn parse_datetime_time(time_part: &str) -> Option<(NaiveTime, DateTimePrecision)> {
    let (main, frac) = time_part
        .split_once('.')
        .map(|(a, b)| (a, Some(b)))
        .unwrap_or((time_part, None));

    let parts: Vec<&str> = main.split(':').collect();
    let (hour_str, minute_str, second_str, precision) = match parts.as_slice() {
        [hh] => (*hh, "0", "0", DateTimePrecision::Hour),
        [hh, mm] => (*hh, *mm, "0", DateTimePrecision::Minute),
        [hh, mm, ss] => (
            *hh,
            *mm,
            *ss,
            if frac.is_some() {
                DateTimePrecision::Millisecond
            } else {
                DateTimePrecision::Second
            },
        ),
        _ => return None,
    };

    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;
    let second: u32 = second_str.parse().ok()?;
    let nanos: u32 = match frac {
        Some(frac) => {
            let digits: String = frac.chars().take(3).collect();
            let padded = format!("{digits:0<3}");
            padded.parse::<u32>().ok()? * 1_000_000
        }
        None => 0,
    };

    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    Some((time, precision))
}

/// Promote a string to the temporal variant its shape suggests.
pub(crate) fn parse_temporal_value(input: &str) -> Option<Value> {
    let s = input.trim();
    if s.contains('T') {
        let (value, precision, tz_offset) = parse_datetime_parts(s)?;
        return Some(Value::datetime(value, precision, tz_offset));
    }
    if s.contains(':') {
        let (value, precision) = parse_time_parts(s)?;
        return Some(Value::time(value, precision));
    }
    let looks_like_date =
        (s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())) || s.contains('-');
    if looks_like_date {
        let (value, precision) = parse_date_parts(s)?;
        return Some(Value::date(value, precision));
    }
    None
}

/// Calendar duration units for temporal arithmetic, accepting both keyword
/// (`2 days`) and UCUM (`2 'd'`) spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CalendarUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl CalendarUnit {
    pub(crate) fn parse(unit: &str) -> Option<CalendarUnit> {
        Some(match unit {
            "year" | "years" | "a" => CalendarUnit::Year,
            "month" | "months" | "mo" => CalendarUnit::Month,
            "week" | "weeks" | "wk" => CalendarUnit::Week,
            "day" | "days" | "d" => CalendarUnit::Day,
            "hour" | "hours" | "h" => CalendarUnit::Hour,
            "minute" | "minutes" | "min" => CalendarUnit::Minute,
            "second" | "seconds" | "s" => CalendarUnit::Second,
            "millisecond" | "milliseconds" | "ms" => CalendarUnit::Millisecond,
            _ => return None,
        })
    }
}

/// `date + amount unit` at the date's precision. `None` when the shift is
/// unrepresentable.
pub(crate) fn date_add(
    date: NaiveDate,
    precision: DatePrecision,
    amount: Decimal,
    unit: CalendarUnit,
    negate: bool,
) -> Option<Value> {
    // Calendar durations ignore fractional parts; sub-day amounts are
    // truncated toward zero in whole days.
    let amount = if negate { -amount } else { amount };
    let whole = amount.trunc().to_i64()?;

    let shifted = match unit {
        CalendarUnit::Year => shift_months(date, whole.checked_mul(12)?)?,
        CalendarUnit::Month => shift_months(date, whole)?,
        CalendarUnit::Week => shift_days(date, whole.checked_mul(7)?)?,
        CalendarUnit::Day => shift_days(date, whole)?,
        CalendarUnit::Hour => shift_days(date, whole / 24)?,
        CalendarUnit::Minute => shift_days(date, whole / 1440)?,
        CalendarUnit::Second => shift_days(date, whole / 86_400)?,
        CalendarUnit::Millisecond => shift_days(date, whole / 86_400_000)?,
    };
    Some(Value::date(shifted, precision))
}

pub(crate) fn datetime_add(
    value: DateTime<FixedOffset>,
    precision: DateTimePrecision,
    tz_offset: Option<i32>,
    amount: Decimal,
    unit: CalendarUnit,
    negate: bool,
) -> Option<Value> {
    let amount = if negate { -amount } else { amount };
    let shifted = match unit {
        CalendarUnit::Year => shift_datetime_months(value, amount.trunc().to_i64()?.checked_mul(12)?)?,
        CalendarUnit::Month => shift_datetime_months(value, amount.trunc().to_i64()?)?,
        CalendarUnit::Week => value.checked_add_signed(Duration::try_days(
            amount.trunc().to_i64()?.checked_mul(7)?,
        )?)?,
        CalendarUnit::Day => {
            value.checked_add_signed(Duration::try_days(amount.trunc().to_i64()?)?)?
        }
        CalendarUnit::Hour => {
            value.checked_add_signed(Duration::try_hours(amount.trunc().to_i64()?)?)?
        }
        CalendarUnit::Minute => {
            value.checked_add_signed(Duration::try_minutes(amount.trunc().to_i64()?)?)?
        }
        CalendarUnit::Second => {
            let millis = (amount * Decimal::from(1000)).trunc().to_i64()?;
            value.checked_add_signed(Duration::try_milliseconds(millis)?)?
        }
        CalendarUnit::Millisecond => {
            value.checked_add_signed(Duration::try_milliseconds(amount.trunc().to_i64()?)?)?
        }
    };
    Some(Value::datetime(shifted, precision, tz_offset))
}

pub(crate) fn time_add(
    value: NaiveTime,
    precision: TimePrecision,
    amount: Decimal,
    unit: CalendarUnit,
    negate: bool,
) -> Option<Value> {
    let amount = if negate { -amount } else { amount };
    let millis = match unit {
        CalendarUnit::Hour => (amount * Decimal::from(3_600_000)).trunc().to_i64()?,
        CalendarUnit::Minute => (amount * Decimal::from(60_000)).trunc().to_i64()?,
        CalendarUnit::Second => (amount * Decimal::from(1000)).trunc().to_i64()?,
        CalendarUnit::Millisecond => amount.trunc().to_i64()?,
        // Times have no date component to carry day-or-larger shifts.
        _ => return None,
    };
    // NaiveTime arithmetic wraps around midnight, which is what a clock time
    // needs.
    let shifted = value.overflowing_add_signed(Duration::try_milliseconds(millis)?).0;
    Some(Value::time(shifted, precision))
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let months_u = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        date.checked_add_months(Months::new(months_u))
    } else {
        date.checked_sub_months(Months::new(months_u))
    }
}

fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let days_u = days.unsigned_abs();
    if days >= 0 {
        date.checked_add_days(Days::new(days_u))
    } else {
        date.checked_sub_days(Days::new(days_u))
    }
}

fn shift_datetime_months(
    value: DateTime<FixedOffset>,
    months: i64,
) -> Option<DateTime<FixedOffset>> {
    let months_u = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        value.checked_add_months(Months::new(months_u))
    } else {
        value.checked_sub_months(Months::new(months_u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_dates() {
        let (date, precision) = parse_date_parts("2015").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(precision, DatePrecision::Year);

        let (_, precision) = parse_date_parts("2015-02").unwrap();
        assert_eq!(precision, DatePrecision::Month);

        assert!(parse_date_parts("2015-2-1").is_none());
    }

    #[test]
    fn test_parse_datetime_with_offset() {
        let (value, precision, tz) = parse_datetime_parts("2015-02-04T14:34:28+01:00").unwrap();
        assert_eq!(precision, DateTimePrecision::Second);
        assert_eq!(tz, Some(3600));
        assert_eq!(value.timestamp(), 1423056868);
    }

    #[test]
    fn test_date_only_string_is_datetime_at_date_precision() {
        let (_, precision, tz) = parse_datetime_parts("2015-02-04").unwrap();
        assert_eq!(precision, DateTimePrecision::Day);
        assert_eq!(tz, None);
    }

    #[test]
    fn test_month_arithmetic_clamps_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let shifted = date_add(
            date,
            DatePrecision::Day,
            Decimal::from(1),
            CalendarUnit::Month,
            false,
        )
        .unwrap();
        match shifted {
            Value::Date { value, .. } => {
                assert_eq!(value, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
            }
            other => panic!("expected date, got {other:?}"),
        }
    }

    #[test]
    fn test_subday_amounts_truncate() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let shifted = date_add(
            date,
            DatePrecision::Day,
            Decimal::from(36),
            CalendarUnit::Hour,
            false,
        )
        .unwrap();
        match shifted {
            Value::Date { value, .. } => {
                assert_eq!(value, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
            }
            other => panic!("expected date, got {other:?}"),
        }
    }

    #[test]
    fn test_time_wraps_midnight() {
        let time = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        let shifted = time_add(
            time,
            TimePrecision::Minute,
            Decimal::from(45),
            CalendarUnit::Minute,
            false,
        )
        .unwrap();
        match shifted {
            Value::Time { value, .. } => {
                assert_eq!(value, NaiveTime::from_hms_opt(0, 15, 0).unwrap());
            }
            other => panic!("expected time, got {other:?}"),
        }
    }
}
