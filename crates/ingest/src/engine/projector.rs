//! 결과 투영 -- DuckDB 값을 엔진 독립적인 [`Cell`]로 변환합니다.

use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use logsift_core::types::Cell;

/// 1970-01-01의 CE 기준 일수
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// DuckDB 값을 셀로 변환합니다.
///
/// NULL은 항상 [`Cell::Null`]이며, 범위를 넘는 정수와 날짜/시간 값은 텍스트로 표현합니다.
pub fn project(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Boolean(v) => Cell::Bool(v),
        Value::TinyInt(v) => Cell::Int(i64::from(v)),
        Value::SmallInt(v) => Cell::Int(i64::from(v)),
        Value::Int(v) => Cell::Int(i64::from(v)),
        Value::BigInt(v) => Cell::Int(v),
        Value::HugeInt(v) => i64::try_from(v).map_or_else(|_| Cell::Text(v.to_string()), Cell::Int),
        Value::UTinyInt(v) => Cell::Int(i64::from(v)),
        Value::USmallInt(v) => Cell::Int(i64::from(v)),
        Value::UInt(v) => Cell::Int(i64::from(v)),
        Value::UBigInt(v) => i64::try_from(v).map_or_else(|_| Cell::Text(v.to_string()), Cell::Int),
        Value::Float(v) => Cell::Float(f64::from(v)),
        Value::Double(v) => Cell::Float(v),
        Value::Decimal(v) => Cell::Text(v.to_string()),
        Value::Text(v) => Cell::Text(v),
        Value::Enum(v) => Cell::Text(v),
        Value::Blob(bytes) => Cell::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Date32(days) => format_date(days),
        Value::Timestamp(unit, v) => format_timestamp(unit, v),
        Value::Time64(unit, v) => format_time(unit, v),
        other => Cell::Text(format!("{other:?}")),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn format_date(days: i32) -> Cell {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map_or_else(
            || Cell::Text(days.to_string()),
            |date| Cell::Text(date.format("%Y-%m-%d").to_string()),
        )
}

fn format_timestamp(unit: TimeUnit, value: i64) -> Cell {
    DateTime::from_timestamp_micros(to_micros(unit, value)).map_or_else(
        || Cell::Text(value.to_string()),
        |ts| Cell::Text(ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string()),
    )
}

fn format_time(unit: TimeUnit, value: i64) -> Cell {
    let micros = to_micros(unit, value);
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok();
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok();
    secs.zip(nanos)
        .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
        .map_or_else(
            || Cell::Text(value.to_string()),
            |time| Cell::Text(time.format("%H:%M:%S%.f").to_string()),
        )
}
