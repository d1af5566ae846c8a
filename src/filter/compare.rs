//! Value comparison and coercion rules
//!
//! Criteria compare a record value against a criterion value under a fixed
//! coercion table:
//!
//! - integer and decimal compare numerically with each other
//! - a string compared to a number, boolean, date or datetime is parsed as
//!   that kind first (`"42"`, `"true"`, `"2024-01-31"`, RFC 3339)
//! - a date compared to a datetime is taken as midnight UTC
//! - strings compare bytewise, booleans as `false < true`, bytes bytewise
//! - every other pairing, and every failed parse, is unordered
//!
//! Unordered means "not equal" for equality operators and a `TypeMismatch`
//! for ordering operators. Null never reaches these functions; callers apply
//! null semantics first.
//!
//! Sorting uses `sort_order`, which never parses strings and falls back to a
//! fixed type rank, so it is a total order over all non-null values.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::core::Value;

/// Compare a record value to a criterion value.
///
/// Returns `None` when the pair is unordered under the coercion table.
pub fn compare(record: &Value, criterion: &Value) -> Option<Ordering> {
    match (record, criterion) {
        (Value::Null, _) | (_, Value::Null) => None,

        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.as_slice().cmp(b.as_slice())),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),

        (a, b) if a.is_numeric() && b.is_numeric() => {
            Some(a.as_decimal()?.cmp(&b.as_decimal()?))
        }
        (a, Value::String(s)) if a.is_numeric() => Some(a.as_decimal()?.cmp(&parse_number(s)?)),
        (Value::String(s), b) if b.is_numeric() => Some(parse_number(s)?.cmp(&b.as_decimal()?)),

        (Value::Boolean(a), Value::String(s)) => Some(a.cmp(&parse_bool(s)?)),
        (Value::String(s), Value::Boolean(b)) => Some(parse_bool(s)?.cmp(b)),

        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::String(s)) => Some(a.cmp(&parse_date(s)?)),
        (Value::String(s), Value::Date(b)) => Some(parse_date(s)?.cmp(b)),

        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::Date(b)) => Some(a.cmp(&midnight_utc(*b)?)),
        (Value::Date(a), Value::DateTime(b)) => Some(midnight_utc(*a)?.cmp(b)),
        (Value::DateTime(a), Value::String(s)) => Some(a.cmp(&parse_datetime(s)?)),
        (Value::String(s), Value::DateTime(b)) => Some(parse_datetime(s)?.cmp(b)),

        _ => None,
    }
}

/// Equality under the coercion table; unordered pairs are not equal
pub fn values_equal(record: &Value, criterion: &Value) -> bool {
    compare(record, criterion) == Some(Ordering::Equal)
}

/// Total order over non-null values for sorting.
///
/// Values of the same family compare naturally; values of different
/// families order by type rank (boolean, number, string, temporal, bytes).
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (x, y) if x.is_numeric() && y.is_numeric() => match (x.as_decimal(), y.as_decimal()) {
            (Some(dx), Some(dy)) => dx.cmp(&dy),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Date(x), Value::DateTime(y)) => midnight_utc(*x)
            .map(|dx| dx.cmp(y))
            .unwrap_or(Ordering::Less),
        (Value::DateTime(x), Value::Date(y)) => midnight_utc(*y)
            .map(|dy| x.cmp(&dy))
            .unwrap_or(Ordering::Greater),
        _ => Ordering::Equal,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Decimal(_) => 2,
        Value::String(_) => 3,
        Value::Date(_) | Value::DateTime(_) => 4,
        Value::Bytes(_) => 5,
    }
}

fn parse_number(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => parse_date(trimmed).and_then(midnight_utc),
    }
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}
