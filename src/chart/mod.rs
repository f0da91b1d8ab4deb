//! Chart descriptions built from pipeline output.
//!
//! Everything here is a pure function of its input and accepts empty input;
//! the egui renderer only draws what these describe.

mod palette;

pub use palette::ice_fire;

use chrono::{DateTime, Duration, Months};
use chrono_tz::Tz;

use crate::config::MAP_STYLE;
use crate::pipeline::{Granularity, Record, Summary, TimeUnit};

/// Bars take this share of their bucket width.
const BAR_FILL: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub series: String,
    /// `[bucket start as Unix seconds, sum]`.
    pub points: Vec<[f64; 2]>,
    pub timezone: Tz,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSpec {
    pub x: f64,
    pub height: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub bars: Vec<BarSpec>,
    pub bar_width: f64,
    pub timezone: Tz,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    /// Coordinate pair as stored (index 0 on x, index 1 on y).
    pub position: [f64; 2],
    pub count: u64,
    pub color: [u8; 3],
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapChart {
    pub points: Vec<MapPoint>,
    pub center: Option<[f64; 2]>,
    pub style: String,
}

/// Summed counts over time, titled with the totals.
pub fn line_chart(summary: &Summary, row_count: usize) -> LineChart {
    LineChart {
        title: format!(
            "Aggregated Traffic Count, Sum={}, Len={}",
            summary.total_sum(),
            row_count
        ),
        series: "sum".to_string(),
        points: summary
            .buckets()
            .iter()
            .map(|bucket| [bucket.start.timestamp() as f64, bucket.sum as f64])
            .collect(),
        timezone: summary.timezone(),
    }
}

/// Preset x-ranges for the line chart, counted back from the last bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeWindow {
    Day,
    Month,
    HalfYear,
    #[default]
    All,
}

impl RangeWindow {
    pub const PRESETS: [RangeWindow; 4] = [
        RangeWindow::Day,
        RangeWindow::Month,
        RangeWindow::HalfYear,
        RangeWindow::All,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RangeWindow::Day => "1d",
            RangeWindow::Month => "1m",
            RangeWindow::HalfYear => "6m",
            RangeWindow::All => "all",
        }
    }

    /// Plot bounds `[[x_min, y_min], [x_max, y_max]]` for this window.
    ///
    /// Month steps are calendar months in the chart's timezone. The y range
    /// covers the points inside the window.
    pub fn bounds(self, chart: &LineChart) -> Option<[[f64; 2]; 2]> {
        let first = chart.points.first()?[0];
        let last = chart.points.last()?[0];
        let end = DateTime::from_timestamp(last as i64, 0)?.with_timezone(&chart.timezone);
        let start = match self {
            RangeWindow::Day => end.checked_sub_signed(Duration::days(1))?.timestamp() as f64,
            RangeWindow::Month => end.checked_sub_months(Months::new(1))?.timestamp() as f64,
            RangeWindow::HalfYear => end.checked_sub_months(Months::new(6))?.timestamp() as f64,
            RangeWindow::All => first,
        };
        let y_max = chart
            .points
            .iter()
            .filter(|[x, _]| *x >= start && *x <= last)
            .map(|[_, y]| *y)
            .fold(0.0, f64::max);
        let y_max = if y_max > 0.0 { y_max + y_max / 20.0 } else { 1.0 };
        Some([[start, 0.0], [last, y_max]])
    }
}

/// Number of records per bucket.
pub fn bar_chart(summary: &Summary) -> BarChart {
    let granularity = summary.granularity();
    BarChart {
        title: format!("Records per {}", granularity),
        bars: summary
            .buckets()
            .iter()
            .map(|bucket| BarSpec {
                x: bucket.start.timestamp() as f64 + granularity.approx_seconds() / 2.0,
                height: bucket.count as f64,
                label: bucket_label(&bucket.start, granularity),
            })
            .collect(),
        bar_width: granularity.approx_seconds() * BAR_FILL,
        timezone: summary.timezone(),
    }
}

/// Point map of records coloured by count. `None` when no tile token is
/// configured, which disables the map view.
pub fn map_chart(records: &[Record], access_token: Option<&str>) -> Option<MapChart> {
    if access_token.is_none() {
        return None;
    }

    let (min, max) = records.iter().fold((f64::MAX, f64::MIN), |(lo, hi), r| {
        let c = r.count as f64;
        (lo.min(c), hi.max(c))
    });
    let points = records
        .iter()
        .map(|record| MapPoint {
            position: record.coordinates,
            count: record.count,
            color: ice_fire(record.count as f64, min, max),
            label: format!(
                "{} ({})",
                record.source.as_deref().unwrap_or("unknown source"),
                record.count
            ),
        })
        .collect();

    Some(MapChart {
        points,
        center: mean_position(records),
        style: MAP_STYLE.to_string(),
    })
}

fn mean_position(records: &[Record]) -> Option<[f64; 2]> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;
    let (x, y) = records.iter().fold((0.0, 0.0), |(x, y), r| {
        (x + r.coordinates[0], y + r.coordinates[1])
    });
    Some([x / n, y / n])
}

/// Human label for a bucket, as precise as the granularity.
pub fn bucket_label(start: &DateTime<Tz>, granularity: Granularity) -> String {
    let format = match granularity.unit() {
        TimeUnit::Second => "%Y-%m-%d %H:%M:%S",
        TimeUnit::Minute | TimeUnit::Hour => "%Y-%m-%d %H:%M",
        TimeUnit::Day | TimeUnit::Week => "%Y-%m-%d",
        TimeUnit::Month => "%Y-%m",
        TimeUnit::Year => "%Y",
    };
    start.format(format).to_string()
}
