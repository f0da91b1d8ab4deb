use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::helpers::as_text;

/// One flattened row: column name to cell. Missing keys are absent cells.
pub type Row = BTreeMap<String, Value>;

/// Look up a cell, treating JSON `null` as absent.
pub fn cell<'a>(row: &'a Row, column: &str) -> Option<&'a Value> {
    row.get(column).filter(|v| !v.is_null())
}

/// Column-aligned rows. The column list is the union of every row's keys
/// in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Build a table with a fixed column list.
    pub fn with_columns(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Concatenate tables in order; the column set becomes their union.
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Table>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        for table in tables {
            for column in table.columns {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
            rows.extend(table.rows);
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Sorted distinct display values of a column, skipping absent cells.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| cell(row, column))
            .map(as_text)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// The table assembled for one load request, with the files it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    table: Table,
    sources: Vec<PathBuf>,
}

impl Dataset {
    pub fn new(table: Table, sources: Vec<PathBuf>) -> Self {
        Self { table, sources }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
