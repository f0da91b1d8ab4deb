use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use super::granularity::Granularity;
use super::record::Schema;
use super::table::{cell, Table};
use crate::common::helpers::{as_count, localize, parse_timestamp};

/// Upper bound on buckets produced by gap filling.
const MAX_FILLED_BUCKETS: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    /// Bucket start in the aggregation timezone.
    pub start: DateTime<Tz>,
    /// Number of rows in the bucket.
    pub count: u64,
    /// Sum of the count column over those rows.
    pub sum: u64,
}

/// Per-bucket aggregates, ordered by bucket start.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    granularity: Granularity,
    timezone: Tz,
    buckets: Vec<TimeBucket>,
    skipped_rows: usize,
}

impl Summary {
    pub fn empty(granularity: Granularity, timezone: Tz) -> Self {
        Self {
            granularity,
            timezone,
            buckets: Vec::new(),
            skipped_rows: 0,
        }
    }

    pub fn buckets(&self) -> &[TimeBucket] {
        &self.buckets
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Rows left out because their timestamp or count did not parse.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum over all buckets, saturating at `u64::MAX`.
    pub fn total_sum(&self) -> u64 {
        self.buckets
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.sum))
    }

    pub fn total_count(&self) -> u64 {
        self.buckets
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.count))
    }
}

/// Running totals for one bucket key.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: u64,
    sum: u64,
    /// Earliest row instant seen in the bucket.
    first: Option<DateTime<Utc>>,
}

impl Accumulator {
    /// Returns false, leaving the totals untouched, when the sum would overflow.
    fn add(&mut self, instant: DateTime<Utc>, value: u64) -> bool {
        let Some(sum) = self.sum.checked_add(value) else {
            return false;
        };
        self.sum = sum;
        self.count += 1;
        self.first = Some(self.first.map_or(instant, |first| first.min(instant)));
        true
    }
}

/// Groups rows into time buckets and computes `{count, sum}` per bucket.
#[derive(Debug, Clone)]
pub struct TimeAggregator {
    timestamp_column: String,
    count_column: Option<String>,
    timezone: Tz,
    granularity: Granularity,
    fill_gaps: bool,
}

impl TimeAggregator {
    /// Daily buckets in UTC. Without a count column each row adds one.
    pub fn new(timestamp_column: impl Into<String>, count_column: Option<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
            count_column,
            timezone: Tz::UTC,
            granularity: Granularity::DAY,
            fill_gaps: false,
        }
    }

    pub fn for_schema(schema: &Schema) -> Self {
        Self::new(schema.start.clone(), schema.count.clone())
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Emit zero buckets between the first and last populated bucket.
    pub fn with_gap_filling(mut self, fill_gaps: bool) -> Self {
        self.fill_gaps = fill_gaps;
        self
    }

    pub fn aggregate(&self, table: &Table) -> Summary {
        let mut groups: BTreeMap<NaiveDateTime, Accumulator> = BTreeMap::new();
        let mut skipped_rows = 0;

        for row in table.rows() {
            let Some((instant, key)) = cell(row, &self.timestamp_column)
                .and_then(parse_timestamp)
                .and_then(|utc| {
                    let local = utc.with_timezone(&self.timezone).naive_local();
                    Some((utc, self.granularity.truncate(local)?))
                })
            else {
                skipped_rows += 1;
                continue;
            };
            let value = match &self.count_column {
                Some(column) => match cell(row, column).and_then(as_count) {
                    Some(value) => value,
                    None => {
                        skipped_rows += 1;
                        continue;
                    }
                },
                None => 1,
            };
            let entry = groups.entry(key).or_default();
            if !entry.add(instant, value) {
                warn!(bucket = %key, value, "Bucket sum overflows, skipping row");
                skipped_rows += 1;
            }
        }

        if skipped_rows > 0 {
            debug!(skipped_rows, "Rows without a usable timestamp or count");
        }
        if self.fill_gaps {
            self.fill(&mut groups);
        }

        let mut buckets: Vec<TimeBucket> = groups
            .into_iter()
            .filter_map(|(key, acc)| {
                let start = match self.timezone.from_local_datetime(&key).earliest() {
                    Some(start) => start,
                    // Start skipped by a clock change.
                    None if acc.count == 0 => return None,
                    None => localize(&self.timezone, key)
                        .or_else(|| acc.first.map(|t| t.with_timezone(&self.timezone)))?,
                };
                Some(TimeBucket {
                    start,
                    count: acc.count,
                    sum: acc.sum,
                })
            })
            .collect();
        buckets.sort_by_key(|bucket| bucket.start);
        buckets.dedup_by(|later, kept| {
            if later.start != kept.start {
                return false;
            }
            kept.count += later.count;
            kept.sum = kept.sum.saturating_add(later.sum);
            true
        });

        Summary {
            granularity: self.granularity,
            timezone: self.timezone,
            buckets,
            skipped_rows,
        }
    }

    fn fill(&self, groups: &mut BTreeMap<NaiveDateTime, Accumulator>) {
        let (Some(first), Some(last)) = (
            groups.keys().next().copied(),
            groups.keys().next_back().copied(),
        ) else {
            return;
        };

        let mut missing = Vec::new();
        let mut cursor = first;
        while cursor < last {
            let Some(next) = self.granularity.advance(cursor).filter(|n| *n > cursor) else {
                break;
            };
            if next < last && !groups.contains_key(&next) {
                missing.push(next);
                if groups.len() + missing.len() > MAX_FILLED_BUCKETS {
                    warn!(
                        granularity = %self.granularity,
                        "Too many empty buckets to fill, leaving gaps"
                    );
                    return;
                }
            }
            cursor = next;
        }
        for key in missing {
            groups.insert(key, Accumulator::default());
        }
    }
}
