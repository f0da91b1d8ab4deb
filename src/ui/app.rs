use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use eframe::egui;

use super::charts::ChartRenderer;
use super::control_panel::ControlPanel;
use super::graph_panel::GraphPanel;
use super::stats_panel::StatsPanel;
use super::table_view::TableView;
use crate::chart::RangeWindow;
use crate::context::AppContext;
use crate::controller::{DashboardCommand, DashboardController};

pub struct Dashboard {
    controller: DashboardController,
    command_rx: Receiver<DashboardCommand>,
    control_panel: ControlPanel,
    graph_panel: GraphPanel,
    table_view: TableView,
    line_range: RangeWindow,
    show_panel: bool,
}

impl Dashboard {
    pub fn new(context: AppContext) -> Self {
        let (command_tx, command_rx) = unbounded();
        let page_size = context.config().page_size;
        let mut controller = DashboardController::new(Arc::new(context));
        controller.start_initial_load();

        Self {
            control_panel: ControlPanel::new(command_tx.clone(), controller.current_form()),
            graph_panel: GraphPanel::new(command_tx),
            table_view: TableView::new(page_size),
            line_range: RangeWindow::default(),
            controller,
            command_rx,
            show_panel: true,
        }
    }

    /// Apply queued commands and finished loads. Returns true when the view changed.
    fn update_data(&mut self) -> bool {
        let mut updated = false;

        while let Ok(command) = self.command_rx.try_recv() {
            self.controller.handle(command);
            updated = true;
        }
        if self.controller.poll() {
            updated = true;
        }

        if updated {
            self.table_view.reset();
            self.control_panel.sync(self.controller.current_form());
        }
        updated
    }

    fn render_charts(&mut self, ui: &mut egui::Ui, chart_width: f32, content_width: f32) {
        let Some(view) = self.controller.view() else {
            ui.label("No view yet");
            return;
        };

        ui.heading("📈 Traffic Counts");
        ui.add_space(10.0);

        ui.columns(2, |columns| {
            columns[0].vertical(|ui| {
                ChartRenderer::render_line_chart(
                    ui,
                    "sum_plot",
                    &view.line,
                    &mut self.line_range,
                    chart_width,
                );
            });
            columns[1].vertical(|ui| {
                ChartRenderer::render_bar_chart(ui, "count_plot", &view.bar, chart_width);
            });
        });

        ui.add_space(15.0);

        ChartRenderer::render_map(ui, "map_plot", view.map.as_ref(), content_width);
    }
}

impl eframe::App for Dashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.update_data() {
            ctx.request_repaint();
        }
        if self.controller.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("🚦 Traffic Dashboard");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let btn_text = if self.show_panel { "❌ Close Panel" } else { "⚙️ Control Panel" };
                    if ui.button(btn_text).clicked() {
                        self.show_panel = !self.show_panel;
                    }
                });
            });
        });

        if self.show_panel {
            egui::SidePanel::right("control_side_panel")
                .default_width(340.0)
                .min_width(300.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        StatsPanel::render(ui, &self.controller);
                        ui.add_space(10.0);
                        self.control_panel.render(ui, &self.controller);
                    });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                let available_width = ui.available_width();
                let margin = 20.0;
                let content_width = available_width - margin * 2.0;
                let chart_width = (content_width - 15.0) / 2.0;

                ui.add_space(10.0);

                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(margin, 0.0))
                    .show(ui, |ui| {
                        self.render_charts(ui, chart_width, content_width);
                        ui.add_space(15.0);
                        ui.separator();
                        ui.add_space(15.0);
                        self.graph_panel.render(ui, self.controller.graph(), content_width);
                        ui.add_space(15.0);
                        ui.separator();
                        ui.add_space(15.0);
                        if let Some(view) = self.controller.view() {
                            self.table_view.render(ui, &view.filtered);
                        }
                        ui.add_space(20.0);
                    });
            });
        });
    }
}
