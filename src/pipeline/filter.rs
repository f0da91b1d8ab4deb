use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::record::{Record, Schema};
use super::table::{cell, Row, Table};
use crate::common::helpers::{as_text, parse_timestamp};

/// The active selection driving one view. Absent criteria pass every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Only rows whose subtype equals this marker (e.g. `counting`).
    pub subtype: Option<String>,
    pub source: Option<String>,
    /// Allowed categories; `None` means all.
    pub categories: Option<BTreeSet<String>>,
    /// Inclusive lower bound on the start timestamp.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the start timestamp.
    pub end: Option<DateTime<Utc>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subtype(mut self, subtype: Option<String>) -> Self {
        self.subtype = subtype;
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    fn has_time_range(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Applies a [`FilterSpec`] and projects the survivors onto a [`Schema`].
#[derive(Debug, Clone)]
pub struct RowFilter {
    schema: Schema,
}

impl RowFilter {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Filter, project and drop malformed rows.
    ///
    /// Predicates run in order: subtype, source, category, time range. A
    /// predicate whose column the schema does not define is skipped. The
    /// result may be empty; it is never an error.
    pub fn apply(&self, table: &Table, spec: &FilterSpec) -> Table {
        let schema = &self.schema;
        let mut dropped = 0usize;

        let rows: Vec<Row> = table
            .rows()
            .iter()
            .filter(|row| equals(row, schema.subtype.as_deref(), spec.subtype.as_deref()))
            .filter(|row| equals(row, schema.source.as_deref(), spec.source.as_deref()))
            .filter(|row| self.in_categories(row, spec))
            .filter(|row| self.in_time_range(row, spec))
            .map(|row| schema.project(row))
            .filter(|row| match Record::from_row(row, schema) {
                Ok(_) => true,
                Err(reason) => {
                    debug!(%reason, "Dropping malformed row");
                    dropped += 1;
                    false
                }
            })
            .collect();

        debug!(
            input = table.len(),
            kept = rows.len(),
            dropped,
            "Applied row filter"
        );
        Table::with_columns(schema.columns(), rows)
    }

    /// Typed records of an already filtered table.
    pub fn records(&self, table: &Table) -> Vec<Record> {
        table
            .rows()
            .iter()
            .filter_map(|row| Record::from_row(row, &self.schema).ok())
            .collect()
    }

    fn in_categories(&self, row: &Row, spec: &FilterSpec) -> bool {
        match (self.schema.category.as_deref(), &spec.categories) {
            (Some(column), Some(allowed)) => cell(row, column)
                .map(as_text)
                .is_some_and(|category| allowed.contains(&category)),
            _ => true,
        }
    }

    fn in_time_range(&self, row: &Row, spec: &FilterSpec) -> bool {
        if !spec.has_time_range() {
            return true;
        }
        let Some(start) = cell(row, &self.schema.start).and_then(parse_timestamp) else {
            return false;
        };
        spec.start.map_or(true, |lower| start >= lower)
            && spec.end.map_or(true, |upper| start <= upper)
    }
}

fn equals(row: &Row, column: Option<&str>, expected: Option<&str>) -> bool {
    match (column, expected) {
        (Some(column), Some(expected)) => cell(row, column).is_some_and(|v| as_text(v) == expected),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn row(subtype: &str, source: &str, ts: &str, count: Value, cause: Option<&str>) -> Row {
        let mut row = Row::new();
        row.insert("_aggregation_id".into(), json!(format!("{}-{}", source, ts)));
        row.insert("_start_timestamp".into(), json!(ts));
        row.insert("_end_timestamp".into(), json!(ts));
        row.insert("count".into(), count);
        row.insert("lat".into(), json!(4.35));
        row.insert("lang".into(), json!(50.84));
        row.insert("source.id".into(), json!(source));
        row.insert("subtype".into(), json!(subtype));
        row.insert("vehicle.class".into(), json!("car"));
        if let Some(cause) = cause {
            row.insert("cause".into(), json!(cause));
        }
        row
    }

    fn sample() -> Table {
        Table::from_rows(vec![
            row("counting", "A", "2023-01-01T00:00:00Z", json!(1), Some("rush")),
            row("vehicle", "A", "2023-01-02T00:00:00Z", json!(2), None),
            row("counting", "B", "2023-01-03T00:00:00Z", json!(3), Some("event")),
            row("counting", "A", "2023-01-04T00:00:00Z", json!(4), Some("event")),
            row("counting", "A", "2023-01-05T00:00:00Z", Value::Null, None),
        ])
    }

    fn counts(table: &Table) -> Vec<Value> {
        table.rows().iter().map(|r| r["count"].clone()).collect()
    }

    #[test]
    fn subtype_and_source_predicates() {
        let spec = FilterSpec::new()
            .with_subtype(Some("counting".into()))
            .with_source(Some("A".into()));
        let out = RowFilter::new(Schema::traffic()).apply(&sample(), &spec);

        assert_eq!(counts(&out), vec![json!(1), json!(4)]);
        assert_eq!(out.columns(), Schema::traffic().columns());
        assert!(out.rows().iter().all(|r| !r.contains_key("vehicle.class")));
    }

    #[test]
    fn category_membership_drops_uncategorised_rows() {
        let spec = FilterSpec::new().with_categories(["event"]);
        let out = RowFilter::new(Schema::traffic()).apply(&sample(), &spec);
        assert_eq!(counts(&out), vec![json!(3), json!(4)]);
    }

    #[test]
    fn time_range_is_inclusive() {
        let spec = FilterSpec::new().with_time_range(
            Some(Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2023, 1, 3, 0, 0, 0).unwrap()),
        );
        let out = RowFilter::new(Schema::traffic()).apply(&sample(), &spec);
        assert_eq!(counts(&out), vec![json!(2), json!(3)]);
    }

    #[test]
    fn rows_missing_required_values_are_dropped() {
        let out = RowFilter::new(Schema::traffic()).apply(&sample(), &FilterSpec::new());
        assert_eq!(out.len(), 4);
        assert_eq!(RowFilter::new(Schema::traffic()).records(&out).len(), 4);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let filter = RowFilter::new(Schema::traffic());
        let spec = FilterSpec::new()
            .with_subtype(Some("counting".into()))
            .with_categories(["rush", "event"])
            .with_time_range(Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()), None);
        let once = filter.apply(&sample(), &spec);
        let twice = filter.apply(&once, &spec);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn nothing_survives_gives_empty_table() {
        let spec = FilterSpec::new().with_source(Some("nope".into()));
        let filter = RowFilter::new(Schema::traffic());
        assert!(filter.apply(&sample(), &spec).is_empty());
        assert!(filter.apply(&Table::new(), &spec).is_empty());
    }

    #[test]
    fn undefined_columns_skip_their_predicate() {
        let mut incident = Row::new();
        incident.insert("dtg".into(), json!("2023-05-01 08:00"));
        incident.insert("lat".into(), json!(52.1));
        incident.insert("lon".into(), json!(10.2));
        let table = Table::from_rows(vec![incident]);
        let spec = FilterSpec::new()
            .with_subtype(Some("counting".into()))
            .with_source(Some("A".into()));
        assert_eq!(RowFilter::new(Schema::incidents()).apply(&table, &spec).len(), 1);
    }
}
