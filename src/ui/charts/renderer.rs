use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;
use eframe::egui;
use egui_plot::{
    AxisHints, Bar, BarChart as PlotBarChart, Corner, Legend, Line, Plot, PlotBounds, PlotPoints,
    Points,
};

use crate::chart::{BarChart, LineChart, MapChart, RangeWindow};

const CHART_HEIGHT: f32 = 220.0;
const MAP_HEIGHT: f32 = 360.0;

pub struct ChartRenderer;

impl ChartRenderer {
    /// Format Unix seconds as a local date for the x-axis
    fn format_time_axis(seconds: f64, tz: Tz) -> String {
        DateTime::from_timestamp(seconds.round() as i64, 0)
            .map(|t| t.with_timezone(&tz).format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    fn time_axis(tz: Tz) -> AxisHints<'static> {
        AxisHints::new_x()
            .label(format!("Time ({})", tz))
            .formatter(move |mark, _range| Self::format_time_axis(mark.value, tz))
    }

    /// Line chart with range buttons; `range` persists the selection.
    pub fn render_line_chart(
        ui: &mut egui::Ui,
        id: &str,
        chart: &LineChart,
        range: &mut RangeWindow,
        width: f32,
    ) {
        ui.label(egui::RichText::new(&chart.title).strong().size(14.0));

        if chart.points.is_empty() {
            ui.add_sized([width, CHART_HEIGHT], egui::Label::new("No data available"));
            return;
        }

        let mut reframe = false;
        ui.horizontal(|ui| {
            for preset in RangeWindow::PRESETS {
                if ui.selectable_value(range, preset, preset.label()).clicked() {
                    reframe = true;
                }
            }
        });
        let bounds = if reframe { range.bounds(chart) } else { None };

        let points: PlotPoints = chart.points.iter().copied().collect();

        Plot::new(id)
            .legend(Legend::default().position(Corner::LeftTop))
            .height(CHART_HEIGHT)
            .width(width)
            .show_axes([true, true])
            .custom_x_axes(vec![Self::time_axis(chart.timezone)])
            .show(ui, |plot_ui| {
                if let Some([min, max]) = bounds {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
                }
                plot_ui.line(
                    Line::new(points)
                        .color(egui::Color32::from_rgb(0, 150, 255))
                        .name(&chart.series)
                        .width(2.0),
                );
            });
    }

    pub fn render_bar_chart(ui: &mut egui::Ui, id: &str, chart: &BarChart, width: f32) {
        ui.label(egui::RichText::new(&chart.title).strong().size(14.0));

        if chart.bars.is_empty() {
            ui.add_sized([width, CHART_HEIGHT], egui::Label::new("No data available"));
            return;
        }

        let bars: Vec<Bar> = chart
            .bars
            .iter()
            .map(|bar| {
                Bar::new(bar.x, bar.height)
                    .width(chart.bar_width)
                    .name(&bar.label)
            })
            .collect();

        Plot::new(id)
            .height(CHART_HEIGHT)
            .width(width)
            .show_axes([true, true])
            .custom_x_axes(vec![Self::time_axis(chart.timezone)])
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    PlotBarChart::new(bars)
                        .color(egui::Color32::from_rgb(255, 150, 0))
                        .name("records"),
                );
            });
    }

    /// Scatter of record coordinates, coloured by count
    pub fn render_map(ui: &mut egui::Ui, id: &str, map: Option<&MapChart>, width: f32) {
        ui.label(egui::RichText::new("🗺 Counts by Location").strong().size(14.0));

        let Some(map) = map else {
            ui.add_sized(
                [width, CHART_HEIGHT],
                egui::Label::new("Map disabled: set MAPBOX_ACCESS_TOKEN to enable it"),
            );
            return;
        };
        if map.points.is_empty() {
            ui.add_sized([width, CHART_HEIGHT], egui::Label::new("No data available"));
            return;
        }

        // One series per colour.
        let mut by_color: BTreeMap<[u8; 3], Vec<[f64; 2]>> = BTreeMap::new();
        for point in &map.points {
            by_color.entry(point.color).or_default().push(point.position);
        }

        ui.label(
            egui::RichText::new(format!("Style: {}", map.style))
                .small()
                .weak(),
        );
        Plot::new(id)
            .height(MAP_HEIGHT)
            .width(width)
            .data_aspect(1.0)
            .show_axes([true, true])
            .show(ui, |plot_ui| {
                for (color, positions) in by_color {
                    let [r, g, b] = color;
                    plot_ui.points(
                        Points::new(PlotPoints::from(positions))
                            .radius(4.0)
                            .color(egui::Color32::from_rgb(r, g, b)),
                    );
                }
                if let Some(center) = map.center {
                    plot_ui.points(
                        Points::new(PlotPoints::from(vec![center]))
                            .radius(6.0)
                            .shape(egui_plot::MarkerShape::Cross)
                            .color(egui::Color32::GRAY)
                            .name("center"),
                    );
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_axis_uses_local_date() {
        // 2023-01-01T23:30:00Z is already Jan 2 in Brussels.
        let secs = 1_672_615_800.0;
        assert_eq!(ChartRenderer::format_time_axis(secs, Tz::UTC), "2023-01-01");
        assert_eq!(
            ChartRenderer::format_time_axis(secs, chrono_tz::Europe::Brussels),
            "2023-01-02"
        );
    }
}
