mod app;
mod charts;
mod control_panel;
mod graph_panel;
mod stats_panel;
mod table_view;

pub use app::Dashboard;

use crate::context::AppContext;

pub fn launch_dashboard(context: AppContext) -> anyhow::Result<()> {
    let title = format!("Traffic Dashboard - {}", context.config().raw_data_files);

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        "Traffic Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(Dashboard::new(context)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run GUI: {}", e))
}
