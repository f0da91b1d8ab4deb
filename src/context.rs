//! Application context: the read-only settings every handler works from,
//! and the assemble → filter → aggregate pass.

use chrono_tz::Tz;
use tracing::{info, warn};

use crate::chart::{self, BarChart, LineChart, MapChart};
use crate::config::{ConfigError, DashboardConfig};
use crate::error::PipelineError;
use crate::pipeline::{
    load_snapshot, resolve_granularity, save_snapshot, Dataset, DatasetAssembler, FilterSpec,
    GranularityPolicy, Record, ResolvedGranularity, RowFilter, Schema, Summary, Table,
    TimeAggregator,
};

/// Everything derived from one filter selection.
#[derive(Debug, Clone)]
pub struct View {
    pub filtered: Table,
    pub records: Vec<Record>,
    pub summary: Summary,
    pub granularity: ResolvedGranularity,
    pub line: LineChart,
    pub bar: BarChart,
    pub map: Option<MapChart>,
}

/// Built once at startup and passed to each component.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: DashboardConfig,
    timezone: Tz,
    policy: GranularityPolicy,
    schema: Schema,
    map_token: Option<String>,
}

impl AppContext {
    pub fn new(config: DashboardConfig, map_token: Option<String>) -> Result<Self, ConfigError> {
        let timezone = config.timezone()?;
        let policy = config.granularity_policy()?;
        let schema = Schema::for_format(config.record_format);
        if map_token.is_none() {
            info!("No map access token configured; map view disabled");
        }
        Ok(Self {
            config,
            timezone,
            policy,
            schema,
            map_token,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn map_token(&self) -> Option<&str> {
        self.map_token.as_deref()
    }

    pub fn assembler(&self, pattern: Option<&str>) -> DatasetAssembler {
        DatasetAssembler::new(pattern.unwrap_or(&self.config.raw_data_files))
            .with_window(self.config.window())
    }

    /// Initial load: the configured snapshot when present, else discovery.
    pub fn load_dataset(&self) -> Result<Dataset, PipelineError> {
        if let Some(path) = self.config.snapshot_path.as_deref() {
            if path.is_file() {
                match load_snapshot(path) {
                    Ok(dataset) => return Ok(dataset),
                    Err(e) => warn!(error = %e, "Ignoring unreadable snapshot"),
                }
            }
        }
        self.reload_dataset(None)
    }

    /// Rediscover and reload the record files, refreshing the snapshot.
    pub fn reload_dataset(&self, pattern: Option<&str>) -> Result<Dataset, PipelineError> {
        let dataset = self.assembler(pattern).assemble()?;
        if let Some(path) = self.config.snapshot_path.as_deref() {
            if let Err(e) = save_snapshot(&dataset, path) {
                warn!(error = %e, "Failed to write snapshot");
            }
        }
        Ok(dataset)
    }

    /// Subtype marker and default source from the config, nothing else.
    pub fn default_filter(&self) -> FilterSpec {
        FilterSpec::new()
            .with_subtype(self.config.subtype_marker.clone())
            .with_source(self.config.default_source.clone())
    }

    pub fn row_filter(&self) -> RowFilter {
        RowFilter::new(self.schema.clone())
    }

    /// Filter and aggregate an assembled dataset.
    pub fn build_view(
        &self,
        dataset: &Dataset,
        spec: &FilterSpec,
        granularity: &str,
    ) -> Result<View, PipelineError> {
        let resolved = resolve_granularity(granularity, self.policy)?;
        let filter = self.row_filter();
        let filtered = filter.apply(dataset.table(), spec);
        let records = filter.records(&filtered);

        let summary = TimeAggregator::for_schema(&self.schema)
            .with_timezone(self.timezone)
            .with_granularity(resolved.granularity)
            .with_gap_filling(self.config.fill_gaps)
            .aggregate(&filtered);

        info!(
            rows = filtered.len(),
            buckets = summary.len(),
            granularity = %resolved.granularity,
            "Computed view"
        );
        Ok(View {
            line: chart::line_chart(&summary, filtered.len()),
            bar: chart::bar_chart(&summary),
            map: chart::map_chart(&records, self.map_token()),
            filtered,
            records,
            summary,
            granularity: resolved,
        })
    }

    /// One full pass from the configured files.
    pub fn run_pass(
        &self,
        spec: &FilterSpec,
        granularity: &str,
    ) -> Result<(Dataset, View), PipelineError> {
        let dataset = self.load_dataset()?;
        let view = self.build_view(&dataset, spec, granularity)?;
        Ok((dataset, view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_day(dir: &std::path::Path, name: &str, day: u32, count: u64) {
        let body = format!(
            r#"[{{"_aggregation_id": "{name}", "_start_timestamp": "2023-01-{day:02}T08:00:00Z",
                "_end_timestamp": "2023-01-{day:02}T08:15:00Z", "count": {count},
                "subtype": "counting", "source": {{"id": "S1"}},
                "location": {{"coordinates": [4.35, 50.84]}}}}]"#
        );
        fs::write(dir.join(name), body).unwrap();
    }

    fn context(dir: &std::path::Path) -> AppContext {
        let config = DashboardConfig {
            raw_data_files: dir.to_string_lossy().into_owned(),
            default_source: Some("S1".into()),
            ..DashboardConfig::default()
        };
        AppContext::new(config, None).unwrap()
    }

    #[test]
    fn full_pass_produces_charts() {
        let dir = tempfile::tempdir().unwrap();
        write_day(dir.path(), "a.txt", 1, 5);
        write_day(dir.path(), "b.txt", 2, 7);

        let ctx = context(dir.path());
        let (dataset, view) = ctx.run_pass(&ctx.default_filter(), "1 day").unwrap();

        assert_eq!(dataset.sources().len(), 2);
        assert_eq!(view.summary.total_sum(), 12);
        assert_eq!(view.line.points.len(), 2);
        assert!(view.map.is_none());
        assert!(!view.granularity.used_fallback);
    }

    #[test]
    fn bad_granularity_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        write_day(dir.path(), "a.txt", 1, 5);

        let ctx = context(dir.path());
        let (_, view) = ctx.run_pass(&ctx.default_filter(), "xyz").unwrap();
        assert!(view.granularity.used_fallback);
        assert_eq!(view.summary.len(), 1);
    }

    #[test]
    fn snapshot_is_written_and_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("raw");
        fs::create_dir(&data).unwrap();
        write_day(&data, "a.txt", 1, 5);

        let snapshot = dir.path().join("snapshot.json");
        let config = DashboardConfig {
            raw_data_files: data.to_string_lossy().into_owned(),
            snapshot_path: Some(snapshot.clone()),
            ..DashboardConfig::default()
        };
        let ctx = AppContext::new(config, Some("token".into())).unwrap();
        let first = ctx.load_dataset().unwrap();
        assert!(snapshot.is_file());

        fs::remove_file(data.join("a.txt")).unwrap();
        assert_eq!(ctx.load_dataset().unwrap(), first);
        assert!(matches!(
            ctx.reload_dataset(None),
            Err(PipelineError::EmptyDataset { .. })
        ));
    }
}
