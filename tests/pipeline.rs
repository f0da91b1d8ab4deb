use std::fs;
use std::path::Path;

use chrono_tz::Tz;
use serde_json::json;
use traffic_dashboard::config::DashboardConfig;
use traffic_dashboard::context::AppContext;
use traffic_dashboard::error::PipelineError;
use traffic_dashboard::pipeline::{
    resolve_granularity, DatasetAssembler, FilterSpec, Granularity, GranularityPolicy, Row,
    RowFilter, Schema, Table, TimeAggregator,
};

/// Write `rows` counting records for one day, one record per hour.
fn write_day(dir: &Path, name: &str, day: u32, rows: u32, source: &str) {
    let records: Vec<_> = (0..rows)
        .map(|hour| {
            json!({
                "_aggregation_id": format!("{name}-{hour}"),
                "_start_timestamp": format!("2023-01-{day:02}T{hour:02}:00:00Z"),
                "_end_timestamp": format!("2023-01-{day:02}T{hour:02}:15:00Z"),
                "count": hour + 1,
                "subtype": "counting",
                "source": { "id": source },
                "location": { "type": "Point", "coordinates": [4.35, 50.84] }
            })
        })
        .collect();
    fs::write(dir.join(name), serde_json::to_string(&records).unwrap()).unwrap();
}

fn pattern(dir: &Path) -> String {
    dir.to_string_lossy().into_owned()
}

#[test]
fn window_keeps_last_files_in_path_order() {
    let dir = tempfile::tempdir().unwrap();
    write_day(dir.path(), "2023-01-01.txt", 1, 10, "S1");
    write_day(dir.path(), "2023-01-02.txt", 2, 10, "S1");
    write_day(dir.path(), "2023-01-03.txt", 3, 10, "S1");

    let dataset = DatasetAssembler::new(pattern(dir.path()))
        .with_window(Some(2))
        .assemble()
        .unwrap();
    assert_eq!(dataset.len(), 20);
    let names: Vec<_> = dataset
        .sources()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["2023-01-02.txt", "2023-01-03.txt"]);

    let everything = DatasetAssembler::new(pattern(dir.path()))
        .with_window(Some(10))
        .assemble()
        .unwrap();
    assert_eq!(everything.sources().len(), 3);
    assert_eq!(everything.len(), 30);
}

#[test]
fn missing_directory_is_an_empty_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let result = DatasetAssembler::new(pattern(&dir.path().join("absent"))).assemble();
    assert!(matches!(result, Err(PipelineError::EmptyDataset { .. })));
}

#[test]
fn filter_is_idempotent_and_aggregation_conserves_counts() {
    let dir = tempfile::tempdir().unwrap();
    write_day(dir.path(), "a.txt", 1, 6, "S1");
    write_day(dir.path(), "b.txt", 2, 4, "S2");
    let dataset = DatasetAssembler::new(pattern(dir.path())).assemble().unwrap();

    let filter = RowFilter::new(Schema::traffic());
    let spec = FilterSpec::new()
        .with_subtype(Some("counting".into()))
        .with_source(Some("S1".into()));
    let once = filter.apply(dataset.table(), &spec);
    let twice = filter.apply(&once, &spec);
    assert_eq!(once, twice);
    assert_eq!(once.len(), 6);

    let expected: u64 = filter.records(&once).iter().map(|r| r.count).sum();
    for granularity in ["1h", "1 day", "1 week", "3 months"] {
        let summary = TimeAggregator::for_schema(&Schema::traffic())
            .with_granularity(Granularity::parse(granularity).unwrap())
            .aggregate(&once);
        assert_eq!(summary.total_sum(), expected, "granularity {granularity}");
        assert_eq!(summary.total_count(), 6);
        let starts: Vec<_> = summary.buckets().iter().map(|b| b.start).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }
}

fn traffic_rows(rows: &[(&str, u64)]) -> Table {
    Table::from_rows(
        rows.iter()
            .map(|(ts, count)| {
                let mut row = Row::new();
                row.insert("_start_timestamp".into(), json!(ts));
                row.insert("count".into(), json!(count));
                row
            })
            .collect(),
    )
}

#[test]
fn aggregation_conserves_counts_across_dst_changes() {
    // Every quarter hour from 2023-03-25 to 2023-03-27 and around 2023-10-29.
    let mut rows = Vec::new();
    for day in [25, 26, 27] {
        for quarter in 0..96 {
            rows.push((format!("2023-03-{day:02}T{:02}:{:02}:00Z", quarter / 4, quarter % 4 * 15), 1 + quarter % 5));
        }
    }
    for day in [28, 29, 30] {
        for quarter in 0..96 {
            rows.push((format!("2023-10-{day:02}T{:02}:{:02}:00Z", quarter / 4, quarter % 4 * 15), 2));
        }
    }
    let borrowed: Vec<(&str, u64)> = rows.iter().map(|(ts, c)| (ts.as_str(), *c)).collect();
    let table = traffic_rows(&borrowed);
    let expected: u64 = borrowed.iter().map(|(_, c)| c).sum();

    let tz: Tz = "Europe/Brussels".parse().unwrap();
    for granularity in ["15min", "1h", "3h", "1 day", "1 week", "1 month"] {
        let summary = TimeAggregator::for_schema(&Schema::traffic())
            .with_timezone(tz)
            .with_granularity(Granularity::parse(granularity).unwrap())
            .with_gap_filling(true)
            .aggregate(&table);
        assert_eq!(summary.total_sum(), expected, "granularity {granularity}");
        assert_eq!(summary.total_count(), borrowed.len() as u64, "granularity {granularity}");
        assert_eq!(summary.skipped_rows(), 0);
        let starts: Vec<_> = summary.buckets().iter().map(|b| b.start).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]), "granularity {granularity}");
    }
}

#[test]
fn aggregation_conserves_counts_over_a_skipped_local_day() {
    // Samoa moved across the date line and never had a 2011-12-30.
    let table = traffic_rows(&[
        ("2011-12-29T23:00:00-10:00", 2),
        ("2011-12-31T00:00:00+14:00", 5),
        ("2012-01-01T12:00:00+14:00", 3),
    ]);
    let tz: Tz = "Pacific/Apia".parse().unwrap();
    for granularity in ["1h", "1 day", "2 days", "3 days", "1 week", "1 month"] {
        for fill_gaps in [false, true] {
            let summary = TimeAggregator::for_schema(&Schema::traffic())
                .with_timezone(tz)
                .with_granularity(Granularity::parse(granularity).unwrap())
                .with_gap_filling(fill_gaps)
                .aggregate(&table);
            assert_eq!(summary.total_sum(), 10, "granularity {granularity}");
            assert_eq!(summary.total_count(), 3, "granularity {granularity}");
            let starts: Vec<_> = summary.buckets().iter().map(|b| b.start).collect();
            assert!(starts.windows(2).all(|w| w[0] < w[1]), "granularity {granularity}");
        }
    }
}

#[test]
fn empty_table_aggregates_to_nothing() {
    let summary = TimeAggregator::for_schema(&Schema::traffic()).aggregate(&Table::new());
    assert!(summary.is_empty());
    assert_eq!(summary.total_sum(), 0);

    let filtered = RowFilter::new(Schema::traffic()).apply(&Table::new(), &FilterSpec::new());
    assert!(filtered.is_empty());
}

#[test]
fn unparseable_granularity_falls_back_to_quarters() {
    let resolved =
        resolve_granularity("xyz", GranularityPolicy::Fallback(Granularity::DEFAULT_FALLBACK))
            .unwrap();
    assert!(resolved.used_fallback);
    assert_eq!(resolved.granularity.to_string(), "3 months");

    let mut rows = Vec::new();
    for (ts, count) in [("2023-01-15T00:00:00Z", 2), ("2023-03-31T00:00:00Z", 3), ("2023-04-01T00:00:00Z", 4)] {
        let mut row = Row::new();
        row.insert("_start_timestamp".into(), json!(ts));
        row.insert("count".into(), json!(count));
        rows.push(row);
    }
    let summary = TimeAggregator::for_schema(&Schema::traffic())
        .with_granularity(resolved.granularity)
        .aggregate(&Table::from_rows(rows));
    let sums: Vec<_> = summary.buckets().iter().map(|b| b.sum).collect();
    assert_eq!(sums, vec![5, 4]);
}

#[test]
fn context_runs_the_default_view() {
    let dir = tempfile::tempdir().unwrap();
    write_day(dir.path(), "a.txt", 1, 3, "BXLBXL034165F1");
    write_day(dir.path(), "b.txt", 2, 3, "OTHER");

    let config = DashboardConfig {
        raw_data_files: pattern(dir.path()),
        tz: "Europe/Brussels".into(),
        ..DashboardConfig::default()
    };
    let context = AppContext::new(config, Some("token".into())).unwrap();
    let (dataset, view) = context
        .run_pass(&context.default_filter(), "1 day")
        .unwrap();

    assert_eq!(dataset.len(), 6);
    assert_eq!(view.filtered.len(), 3);
    assert_eq!(view.summary.total_sum(), 6);
    assert_eq!(view.line.title, "Aggregated Traffic Count, Sum=6, Len=3");
    assert_eq!(view.map.as_ref().map(|m| m.points.len()), Some(3));
    assert_eq!(
        view.summary.buckets()[0].start.to_rfc3339(),
        "2023-01-01T00:00:00+01:00"
    );
}
