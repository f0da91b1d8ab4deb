//! Ingestion and aggregation pipeline feeding the dashboard views.
//!
//! `DatasetAssembler` → `RowFilter` → `TimeAggregator`; every stage takes
//! a table by reference and returns a new one.

mod aggregate;
mod assembler;
mod filter;
mod granularity;
mod loader;
mod record;
mod table;

pub use aggregate::{Summary, TimeAggregator, TimeBucket};
pub use assembler::{append, apply_window, load_snapshot, save_snapshot, DatasetAssembler};
pub use filter::{FilterSpec, RowFilter};
pub use granularity::{
    resolve_granularity, Granularity, GranularityPolicy, ResolvedGranularity, TimeUnit,
};
pub use loader::{load_file, normalize, CsvLoader, RecordLoader};
pub use record::{Record, RecordFormat, Schema};
pub use table::{cell, Dataset, Row, Table};
