//! Cell conversion and time helpers shared by the pipeline stages.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp cell. Strings without an offset are read as UTC.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp_str(text),
        Value::Number(n) => {
            let raw = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            if raw.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}

pub fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Non-negative integral count. Floats are accepted when they have no fraction.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

/// Display form of a cell: strings bare, everything else as JSON.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Map a local wall-clock time into `tz`.
///
/// Ambiguous times take the earliest instant; times inside a DST gap
/// move forward in 15 minute steps until they exist.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    let mut candidate = naive;
    for _ in 0..=12 {
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return Some(dt);
        }
        candidate = candidate.checked_add_signed(Duration::minutes(15))?;
    }
    None
}

/// Parse a `YYYY-MM-DD` date picker value into an inclusive UTC bound.
///
/// Empty text means "no bound". End bounds cover the whole day.
pub fn parse_date_bound(
    text: &str,
    tz: &Tz,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", text))?;
    let naive = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| format!("'{}' is out of range", text))?;
    localize(tz, naive)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .ok_or_else(|| format!("'{}' does not exist in {}", text, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike, Utc};
    use serde_json::json;

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2023, 1, 1, 0, 10, 0).unwrap();
        assert_eq!(parse_timestamp(&json!("2023-01-01T00:10")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2023-01-01T00:10:00Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2023-01-01T01:10:00+01:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2023-01-01 00:10:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!(expected.timestamp())), Some(expected));
        assert_eq!(parse_timestamp(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
    }

    #[test]
    fn extreme_epoch_numbers_are_rejected() {
        assert_eq!(parse_timestamp(&json!(i64::MIN)), None);
        assert_eq!(parse_timestamp(&json!(-1e19)), None);
        assert_eq!(parse_timestamp(&json!(1e300)), None);
        assert_eq!(
            parse_timestamp(&json!(-200_000_000_000i64)),
            DateTime::from_timestamp(-200_000_000, 0)
        );
    }

    #[test]
    fn counts_must_be_non_negative_integers() {
        assert_eq!(as_count(&json!(7)), Some(7));
        assert_eq!(as_count(&json!(7.0)), Some(7));
        assert_eq!(as_count(&json!("12")), Some(12));
        assert_eq!(as_count(&json!(-1)), None);
        assert_eq!(as_count(&json!(2.5)), None);
        assert_eq!(as_count(&json!(true)), None);
    }

    #[test]
    fn end_bound_covers_the_whole_local_day() {
        let tz: chrono_tz::Tz = "Europe/Brussels".parse().unwrap();
        let start = parse_date_bound("2023-06-01", &tz, false).unwrap().unwrap();
        let end = parse_date_bound("2023-06-01", &tz, true).unwrap().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 5, 31, 22, 0, 0).unwrap());
        assert_eq!(end.hour(), 21);
        assert_eq!(end.minute(), 59);
        assert_eq!(parse_date_bound("  ", &tz, true), Ok(None));
        assert!(parse_date_bound("01/06/2023", &tz, false).is_err());
    }

    #[test]
    fn localize_skips_dst_gap() {
        let tz: chrono_tz::Tz = "Europe/Brussels".parse().unwrap();
        let gap = chrono::NaiveDate::from_ymd_opt(2023, 3, 26)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let dt = localize(&tz, gap).unwrap();
        assert_eq!(dt.hour(), 3);
    }
}
