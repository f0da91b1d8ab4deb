use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::table::{cell, Row};
use crate::common::helpers::{as_count, as_f64, as_text, parse_timestamp};
use crate::error::MalformedRecord;

/// Source layout of the record files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// Nested JSON count records from roadside sensors.
    #[default]
    Traffic,
    /// Flat `dtg, lat, lon, cause` CSV demo data.
    Incidents,
}

/// Output projection applied by the row filter.
///
/// Names the columns that carry each record attribute. Start time and
/// coordinates are always required; count is required when the schema has
/// a count column, otherwise every row counts as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: Option<String>,
    pub start: String,
    pub end: Option<String>,
    pub count: Option<String>,
    pub lat: String,
    pub lon: String,
    pub source: Option<String>,
    pub subtype: Option<String>,
    pub category: Option<String>,
}

impl Schema {
    pub fn traffic() -> Self {
        Self {
            id: Some("_aggregation_id".into()),
            start: "_start_timestamp".into(),
            end: Some("_end_timestamp".into()),
            count: Some("count".into()),
            lat: "lat".into(),
            lon: "lang".into(),
            source: Some("source.id".into()),
            subtype: Some("subtype".into()),
            category: Some("cause".into()),
        }
    }

    pub fn incidents() -> Self {
        Self {
            id: None,
            start: "dtg".into(),
            end: None,
            count: None,
            lat: "lat".into(),
            lon: "lon".into(),
            source: None,
            subtype: None,
            category: Some("cause".into()),
        }
    }

    pub fn for_format(format: RecordFormat) -> Self {
        match format {
            RecordFormat::Traffic => Self::traffic(),
            RecordFormat::Incidents => Self::incidents(),
        }
    }

    /// Projected columns, in output order.
    pub fn columns(&self) -> Vec<String> {
        [
            self.id.as_ref(),
            Some(&self.start),
            self.end.as_ref(),
            self.count.as_ref(),
            Some(&self.lat),
            Some(&self.lon),
            self.source.as_ref(),
            self.subtype.as_ref(),
            self.category.as_ref(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }

    /// Keep only the projected columns of a row.
    pub fn project(&self, row: &Row) -> Row {
        self.columns()
            .into_iter()
            .filter_map(|column| {
                let value = cell(row, &column)?.clone();
                Some((column, value))
            })
            .collect()
    }
}

/// Typed view of one projected row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub count: u64,
    /// Coordinate pair as stored in the source: index 0, then index 1.
    pub coordinates: [f64; 2],
    pub source: Option<String>,
    pub subtype: Option<String>,
    pub category: Option<String>,
}

impl Record {
    pub fn from_row(row: &Row, schema: &Schema) -> Result<Self, MalformedRecord> {
        let start = required(row, &schema.start, parse_timestamp)?;
        let count = match &schema.count {
            Some(column) => required(row, column, as_count)?,
            None => 1,
        };
        let lat = required(row, &schema.lat, as_f64)?;
        let lon = required(row, &schema.lon, as_f64)?;

        let text = |column: &Option<String>| {
            column
                .as_deref()
                .and_then(|c| cell(row, c))
                .map(as_text)
        };

        Ok(Self {
            id: text(&schema.id),
            start,
            end: schema
                .end
                .as_deref()
                .and_then(|c| cell(row, c))
                .and_then(parse_timestamp),
            count,
            coordinates: [lat, lon],
            source: text(&schema.source),
            subtype: text(&schema.subtype),
            category: text(&schema.category),
        })
    }
}

fn required<T>(
    row: &Row,
    column: &str,
    parse: impl Fn(&serde_json::Value) -> Option<T>,
) -> Result<T, MalformedRecord> {
    let value = cell(row, column).ok_or_else(|| MalformedRecord::missing(column))?;
    parse(value).ok_or_else(|| MalformedRecord::invalid(column, value))
}
