use eframe::egui;

use crate::controller::DashboardController;

pub struct StatsPanel;

impl StatsPanel {
    pub fn render(ui: &mut egui::Ui, controller: &DashboardController) {
        ui.group(|ui| {
            ui.heading("📊 Summary");
            ui.separator();

            if let Some(message) = controller.last_error() {
                ui.label(
                    egui::RichText::new(format!("⚠ {}", message))
                        .color(egui::Color32::RED),
                );
                ui.separator();
            }

            let Some(view) = controller.view() else {
                ui.label("Waiting for data...");
                return;
            };
            let summary = &view.summary;

            ui.horizontal(|ui| {
                ui.label("Σ Total count:");
                ui.label(
                    egui::RichText::new(format!("{}", summary.total_sum()))
                        .size(18.0)
                        .strong(),
                );
            });

            if view.granularity.used_fallback {
                ui.label(
                    egui::RichText::new(format!(
                        "Unrecognised granularity, using {}",
                        summary.granularity()
                    ))
                    .small()
                    .color(egui::Color32::GOLD),
                );
            }

            ui.separator();

            egui::Grid::new("stats_grid")
                .spacing([10.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Rows:");
                    ui.label(format!("{}", view.filtered.len()));
                    ui.end_row();

                    ui.label("Buckets:");
                    ui.label(format!("{}", summary.len()));
                    ui.end_row();

                    ui.label("Granularity:");
                    ui.label(format!("{}", summary.granularity()));
                    ui.end_row();

                    ui.label("Timezone:");
                    ui.label(format!("{}", summary.timezone()));
                    ui.end_row();

                    ui.label("Source:");
                    ui.label(controller.spec().source.as_deref().unwrap_or("All"));
                    ui.end_row();

                    if summary.skipped_rows() > 0 {
                        ui.label("Skipped:");
                        ui.label(
                            egui::RichText::new(format!("{}", summary.skipped_rows()))
                                .color(egui::Color32::GOLD),
                        );
                        ui.end_row();
                    }

                    ui.label("Map:");
                    match &view.map {
                        Some(map) => ui.label(format!("{} points", map.points.len())),
                        None => ui.label(egui::RichText::new("disabled").weak()),
                    };
                    ui.end_row();
                });
        });
    }
}
