use std::fmt::Write;

use crate::chart::bucket_label;
use crate::context::View;

/// Terminal rendering of one view (Single Responsibility Principle)
pub struct SummaryDisplay {
    width: usize,
    /// Most recent buckets shown; `0` shows all
    max_rows: usize,
}

impl SummaryDisplay {
    pub fn new(width: usize, max_rows: usize) -> Self {
        Self { width, max_rows }
    }

    /// Print the view to stdout
    pub fn display(&self, view: &View) {
        print!("{}", self.render(view));
    }

    /// Print the banner shown when no input files were found
    pub fn display_no_data(&self, pattern: &str) {
        print!("{}", self.render_no_data(pattern));
    }

    pub fn render_no_data(&self, pattern: &str) -> String {
        let width = self.width;
        let mut out = String::new();
        let _ = writeln!(out, "{}", "=".repeat(width));
        let _ = writeln!(out, "{:^width$}", "No data");
        let _ = writeln!(out, "{}", "=".repeat(width));
        let _ = writeln!(out, "No input files match '{}'", pattern);
        out
    }

    /// Build the table printed by [`SummaryDisplay::display`]
    pub fn render(&self, view: &View) -> String {
        let width = self.width;
        let summary = &view.summary;
        let mut out = String::new();

        let _ = writeln!(out, "{}", "=".repeat(width));
        let _ = writeln!(out, "{:^width$}", view.line.title);
        let _ = writeln!(out, "{}", "=".repeat(width));
        let _ = writeln!(
            out,
            "Granularity: {}  Timezone: {}",
            summary.granularity(),
            summary.timezone()
        );
        if view.granularity.used_fallback {
            let _ = writeln!(out, "⚠ Unrecognised granularity, fell back to {}", summary.granularity());
        }
        let _ = writeln!(out, "{}", "-".repeat(width));

        if summary.is_empty() {
            let _ = writeln!(out, "{:^width$}", "No rows match the current filter");
        } else {
            let column = (width.saturating_sub(2)) / 3;
            let _ = writeln!(out, "{:<column$} {:>column$} {:>column$}", "BUCKET", "COUNT", "SUM");
            let _ = writeln!(out, "{}", "-".repeat(width));

            let buckets = summary.buckets();
            let skip = match self.max_rows {
                0 => 0,
                n => buckets.len().saturating_sub(n),
            };
            if skip > 0 {
                let _ = writeln!(out, "... {} earlier buckets", skip);
            }
            for bucket in &buckets[skip..] {
                let _ = writeln!(
                    out,
                    "{:<column$} {:>column$} {:>column$}",
                    bucket_label(&bucket.start, summary.granularity()),
                    bucket.count,
                    bucket.sum
                );
            }
        }

        let _ = writeln!(out, "{}", "=".repeat(width));
        let _ = writeln!(
            out,
            "Total: {} rows, {} buckets, sum {}",
            view.filtered.len(),
            summary.len(),
            summary.total_sum()
        );
        if summary.skipped_rows() > 0 {
            let _ = writeln!(out, "Skipped {} rows without a usable timestamp or count", summary.skipped_rows());
        }
        match &view.map {
            Some(map) => {
                let _ = writeln!(out, "Map: {} points", map.points.len());
            }
            None => {
                let _ = writeln!(out, "Map: disabled (no access token)");
            }
        }
        out
    }
}
