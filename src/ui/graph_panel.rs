use std::collections::BTreeSet;

use crossbeam_channel::Sender;
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Points, Text};

use crate::controller::DashboardCommand;
use crate::network::NetworkGraph;

/// Sensor network view with node selection and editing
pub struct GraphPanel {
    command_tx: Sender<DashboardCommand>,
    selected: BTreeSet<String>,
}

impl GraphPanel {
    pub fn new(command_tx: Sender<DashboardCommand>) -> Self {
        Self {
            command_tx,
            selected: BTreeSet::new(),
        }
    }

    fn send(&mut self, command: DashboardCommand) {
        let _ = self.command_tx.send(command);
        self.selected.clear();
    }

    pub fn render(&mut self, ui: &mut egui::Ui, graph: &NetworkGraph, width: f32) {
        ui.heading("🕸 Sensor Network");

        if graph.is_empty() {
            ui.label(egui::RichText::new("No sensors in the current data").italics().weak());
            if ui.button("↺ Reset").clicked() {
                self.send(DashboardCommand::ResetGraph);
            }
            return;
        }

        self.selected.retain(|id| graph.node(id).is_some());

        ui.columns(2, |columns| {
            columns[0].vertical(|ui| {
                egui::ScrollArea::vertical()
                    .id_salt("graph_nodes")
                    .max_height(220.0)
                    .show(ui, |ui| {
                        for node in graph.nodes() {
                            let mut checked = self.selected.contains(&node.id);
                            let label = format!(
                                "{}  ({} rows, Σ {})",
                                node.id, node.records, node.total_count
                            );
                            if ui.checkbox(&mut checked, label).changed() {
                                if checked {
                                    self.selected.insert(node.id.clone());
                                } else {
                                    self.selected.remove(&node.id);
                                }
                            }
                        }
                    });

                ui.separator();
                let has_selection = !self.selected.is_empty();
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(has_selection, egui::Button::new("✂ Remove"))
                        .clicked()
                    {
                        let ids = self.selected.iter().cloned().collect();
                        self.send(DashboardCommand::RemoveNodes(ids));
                    }
                    if ui
                        .add_enabled(has_selection, egui::Button::new("📌 Keep"))
                        .clicked()
                    {
                        let ids = self.selected.iter().cloned().collect();
                        self.send(DashboardCommand::KeepNodes(ids));
                    }
                    if ui.button("↺ Reset").clicked() {
                        self.send(DashboardCommand::ResetGraph);
                    }
                });
                if ui
                    .add_enabled(
                        self.selected.len() == 1,
                        egui::Button::new("🔍 Filter to sensor"),
                    )
                    .clicked()
                {
                    let source = self.selected.iter().next().cloned();
                    self.send(DashboardCommand::SelectSource(source));
                }
            });

            columns[1].vertical(|ui| {
                Self::render_plot(ui, graph, &self.selected, width / 2.0);
            });
        });
    }

    fn render_plot(ui: &mut egui::Ui, graph: &NetworkGraph, selected: &BTreeSet<String>, width: f32) {
        Plot::new("network_plot")
            .height(240.0)
            .width(width)
            .data_aspect(1.0)
            .show(ui, |plot_ui| {
                for edge in graph.edges() {
                    let (Some(a), Some(b)) = (graph.node(&edge.a), graph.node(&edge.b)) else {
                        continue;
                    };
                    plot_ui.line(
                        Line::new(PlotPoints::from(vec![a.position, b.position]))
                            .color(egui::Color32::GRAY)
                            .width(1.0),
                    );
                }
                for node in graph.nodes() {
                    let color = if selected.contains(&node.id) {
                        egui::Color32::GOLD
                    } else {
                        egui::Color32::from_rgb(0, 150, 255)
                    };
                    plot_ui.points(
                        Points::new(PlotPoints::from(vec![node.position]))
                            .radius(5.0)
                            .color(color),
                    );
                    plot_ui.text(Text::new(
                        egui_plot::PlotPoint::new(node.position[0], node.position[1]),
                        egui::RichText::new(&node.id).small(),
                    ));
                }
            });
    }
}
