use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use tracing::warn;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    fn name(self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }

    /// Unit keyword plus the multiplier it implies (quarters are 3 months).
    fn lookup(raw: &str) -> Option<(TimeUnit, u32)> {
        // Upper-case `M` is months; lower-case is minutes.
        if raw == "M" {
            return Some((TimeUnit::Month, 1));
        }
        let unit = match raw.to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => (TimeUnit::Second, 1),
            "m" | "t" | "min" | "mins" | "minute" | "minutes" => (TimeUnit::Minute, 1),
            "h" | "hr" | "hrs" | "hour" | "hours" => (TimeUnit::Hour, 1),
            "d" | "day" | "days" => (TimeUnit::Day, 1),
            "w" | "wk" | "week" | "weeks" => (TimeUnit::Week, 1),
            "mo" | "mon" | "month" | "months" => (TimeUnit::Month, 1),
            "q" | "quarter" | "quarters" => (TimeUnit::Month, 3),
            "y" | "yr" | "year" | "years" => (TimeUnit::Year, 1),
            _ => return None,
        };
        Some(unit)
    }
}

/// Bucket width: `amount` whole units, aligned to calendar boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Granularity {
    amount: u32,
    unit: TimeUnit,
}

impl Granularity {
    pub const DAY: Granularity = Granularity {
        amount: 1,
        unit: TimeUnit::Day,
    };

    /// Used when an expression cannot be parsed.
    pub const DEFAULT_FALLBACK: Granularity = Granularity {
        amount: 3,
        unit: TimeUnit::Month,
    };

    pub fn new(amount: u32, unit: TimeUnit) -> Option<Self> {
        (amount > 0).then_some(Self { amount, unit })
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Parse expressions such as `1 day`, `3 hours`, `15min`, `2w`, `1 month`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let split = input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len());
        let (digits, unit) = input.split_at(split);
        let unit = unit.trim();
        if unit.is_empty() {
            return None;
        }
        let amount = if digits.is_empty() {
            1
        } else {
            digits.parse::<u32>().ok()?
        };
        let (unit, multiplier) = TimeUnit::lookup(unit)?;
        Self::new(amount.checked_mul(multiplier)?, unit)
    }

    /// Nominal width in seconds (months as 30 days, years as 365).
    pub fn approx_seconds(&self) -> f64 {
        let unit = match self.unit {
            TimeUnit::Second => 1.0,
            TimeUnit::Minute => 60.0,
            TimeUnit::Hour => 3_600.0,
            TimeUnit::Day => 86_400.0,
            TimeUnit::Week => 7.0 * 86_400.0,
            TimeUnit::Month => 30.0 * 86_400.0,
            TimeUnit::Year => 365.0 * 86_400.0,
        };
        unit * f64::from(self.amount)
    }

    /// Start of the bucket containing `t`.
    ///
    /// Sub-day units align within the day, days and weeks count from the
    /// Unix epoch (weeks start on Monday), months and years align to the
    /// calendar so `3 months` yields quarters.
    pub fn truncate(&self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        let n = i64::from(self.amount);
        let date = t.date();
        let midnight = date.and_hms_opt(0, 0, 0)?;
        match self.unit {
            TimeUnit::Second | TimeUnit::Minute | TimeUnit::Hour => {
                let step = n * self.unit_seconds();
                if step >= 86_400 {
                    let secs = (t - epoch_midnight()?).num_seconds();
                    return epoch_midnight()?
                        .checked_add_signed(Duration::seconds(secs - secs.rem_euclid(step)));
                }
                let secs = i64::from(t.num_seconds_from_midnight());
                Some(midnight + Duration::seconds(secs - secs % step))
            }
            TimeUnit::Day => {
                let days = (date - epoch()).num_days();
                epoch_midnight()?.checked_add_signed(Duration::days(days - days.rem_euclid(n)))
            }
            TimeUnit::Week => {
                let weeks = (date - first_monday()).num_days().div_euclid(7);
                let weeks = weeks - weeks.rem_euclid(n);
                first_monday()
                    .checked_add_signed(Duration::weeks(weeks))?
                    .and_hms_opt(0, 0, 0)
            }
            TimeUnit::Month => {
                let index = month_index(&date);
                month_start(index - index.rem_euclid(n))
            }
            TimeUnit::Year => {
                let year = i64::from(date.year());
                month_start((year - year.rem_euclid(n)) * 12)
            }
        }
    }

    /// Start of the bucket following the one that starts at `start`.
    pub fn advance(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        let n = i64::from(self.amount);
        let next = match self.unit {
            TimeUnit::Second | TimeUnit::Minute | TimeUnit::Hour => {
                start.checked_add_signed(Duration::seconds(n * self.unit_seconds()))?
            }
            TimeUnit::Day => start.checked_add_signed(Duration::days(n))?,
            TimeUnit::Week => start.checked_add_signed(Duration::weeks(n))?,
            TimeUnit::Month => month_start(month_index(&start.date()) + n)?,
            TimeUnit::Year => month_start((i64::from(start.year()) + n) * 12)?,
        };
        self.truncate(next)
    }

    fn unit_seconds(&self) -> i64 {
        match self.unit {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3_600,
            _ => 86_400,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.amount == 1 { "" } else { "s" };
        write!(f, "{} {}{}", self.amount, self.unit.name(), plural)
    }
}

impl FromStr for Granularity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PipelineError::InvalidGranularity {
            input: s.to_string(),
        })
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn epoch_midnight() -> Option<NaiveDateTime> {
    epoch().and_hms_opt(0, 0, 0)
}

fn first_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 5).unwrap_or_default()
}

fn month_index(date: &NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_start(index: i64) -> Option<NaiveDateTime> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

/// What to do with a granularity expression that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranularityPolicy {
    /// Substitute the given granularity and report it.
    Fallback(Granularity),
    /// Reject the expression.
    Strict,
}

impl Default for GranularityPolicy {
    fn default() -> Self {
        GranularityPolicy::Fallback(Granularity::DEFAULT_FALLBACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedGranularity {
    pub granularity: Granularity,
    pub used_fallback: bool,
}

/// Validate a granularity expression, applying the policy when it is invalid.
pub fn resolve_granularity(
    input: &str,
    policy: GranularityPolicy,
) -> Result<ResolvedGranularity, PipelineError> {
    if let Some(granularity) = Granularity::parse(input) {
        return Ok(ResolvedGranularity {
            granularity,
            used_fallback: false,
        });
    }
    match policy {
        GranularityPolicy::Fallback(granularity) => {
            warn!(input, fallback = %granularity, "Unsupported granularity, using fallback");
            Ok(ResolvedGranularity {
                granularity,
                used_fallback: true,
            })
        }
        GranularityPolicy::Strict => Err(PipelineError::InvalidGranularity {
            input: input.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_interval_expressions() {
        let cases = [
            ("1 day", 1, TimeUnit::Day),
            ("3 hours", 3, TimeUnit::Hour),
            ("1 month", 1, TimeUnit::Month),
            ("15min", 15, TimeUnit::Minute),
            ("2w", 2, TimeUnit::Week),
            ("1M", 1, TimeUnit::Month),
            ("5T", 5, TimeUnit::Minute),
            ("day", 1, TimeUnit::Day),
            ("1 quarter", 3, TimeUnit::Month),
            ("  10 Years ", 10, TimeUnit::Year),
        ];
        for (input, amount, unit) in cases {
            assert_eq!(Granularity::parse(input), Granularity::new(amount, unit), "{}", input);
        }
        for bad in ["xyz", "", "0 days", "3", "-1 day", "1.5 hours", "99999999999 days"] {
            assert_eq!(Granularity::parse(bad), None, "{}", bad);
        }
    }

    #[test]
    fn display_round_trips() {
        let g = Granularity::DEFAULT_FALLBACK;
        assert_eq!(g.to_string(), "3 months");
        assert_eq!(g.to_string().parse::<Granularity>().unwrap(), g);
        assert_eq!(Granularity::DAY.to_string(), "1 day");
    }

    #[test]
    fn truncation_aligns_to_calendar() {
        let t = at(2023, 8, 17, 14, 47);
        let cases = [
            ("1 day", at(2023, 8, 17, 0, 0)),
            ("3 hours", at(2023, 8, 17, 12, 0)),
            ("15 minutes", at(2023, 8, 17, 14, 45)),
            ("1 week", at(2023, 8, 14, 0, 0)),
            ("1 month", at(2023, 8, 1, 0, 0)),
            ("3 months", at(2023, 7, 1, 0, 0)),
            ("1 year", at(2023, 1, 1, 0, 0)),
            ("10 years", at(2020, 1, 1, 0, 0)),
        ];
        for (expr, expected) in cases {
            let g = Granularity::parse(expr).unwrap();
            assert_eq!(g.truncate(t), Some(expected), "{}", expr);
        }
    }

    #[test]
    fn advance_moves_to_next_bucket() {
        let hours = Granularity::parse("5 hours").unwrap();
        assert_eq!(hours.advance(at(2023, 1, 1, 20, 0)), Some(at(2023, 1, 2, 0, 0)));
        let quarter = Granularity::DEFAULT_FALLBACK;
        assert_eq!(quarter.advance(at(2023, 10, 1, 0, 0)), Some(at(2024, 1, 1, 0, 0)));
        let days = Granularity::parse("2 days").unwrap();
        let start = days.truncate(at(2023, 1, 1, 5, 0)).unwrap();
        assert_eq!(days.advance(start), start.checked_add_signed(Duration::days(2)));
        let long_hours = Granularity::parse("48 hours").unwrap();
        let start = long_hours.truncate(at(2023, 1, 1, 5, 0)).unwrap();
        assert_eq!(long_hours.truncate(start), Some(start));
        assert_eq!(long_hours.advance(start), start.checked_add_signed(Duration::hours(48)));
    }

    #[test]
    fn out_of_range_buckets_are_none() {
        let huge = Granularity::parse("1000000000 days").unwrap();
        assert_eq!(huge.truncate(at(1969, 12, 31, 0, 0)), None);
        assert_eq!(huge.truncate(at(1970, 1, 2, 0, 0)), Some(at(1970, 1, 1, 0, 0)));

        let weeks = Granularity::parse("1000000000 weeks").unwrap();
        assert_eq!(weeks.truncate(at(1969, 12, 31, 0, 0)), None);
    }

    #[test]
    fn fallback_is_reported() {
        let resolved = resolve_granularity("xyz", GranularityPolicy::default()).unwrap();
        assert!(resolved.used_fallback);
        assert_eq!(resolved.granularity, Granularity::DEFAULT_FALLBACK);

        let resolved = resolve_granularity("1 day", GranularityPolicy::default()).unwrap();
        assert!(!resolved.used_fallback);
    }

    #[test]
    fn strict_policy_rejects() {
        let err = resolve_granularity("xyz", GranularityPolicy::Strict).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidGranularity { .. }));
    }
}
