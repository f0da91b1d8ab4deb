use eframe::egui;

use crate::common::helpers::as_text;
use crate::pipeline::{cell, Table};

/// Paged grid over the filtered rows
pub struct TableView {
    page: usize,
    page_size: usize,
}

impl TableView {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }

    fn page_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.page_size).max(1)
    }

    pub fn render(&mut self, ui: &mut egui::Ui, table: &Table) {
        ui.heading("📋 Records");

        if table.is_empty() {
            ui.label(egui::RichText::new("No rows match the current filter").italics().weak());
            return;
        }

        let pages = self.page_count(table.len());
        self.page = self.page.min(pages - 1);
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(table.len());

        egui::ScrollArea::horizontal().show(ui, |ui| {
            egui::Grid::new("records_grid")
                .striped(true)
                .spacing([12.0, 3.0])
                .show(ui, |ui| {
                    for column in table.columns() {
                        ui.label(egui::RichText::new(column).strong().size(11.0));
                    }
                    ui.end_row();

                    for row in &table.rows()[start..end] {
                        for column in table.columns() {
                            let text = cell(row, column).map(as_text).unwrap_or_default();
                            ui.label(egui::RichText::new(text).monospace().size(10.0));
                        }
                        ui.end_row();
                    }
                });
        });

        ui.horizontal(|ui| {
            if ui.add_enabled(self.page > 0, egui::Button::new("◀ Prev")).clicked() {
                self.page -= 1;
            }
            ui.label(format!("Page {} / {}", self.page + 1, pages));
            if ui.add_enabled(self.page + 1 < pages, egui::Button::new("Next ▶")).clicked() {
                self.page += 1;
            }
            ui.label(
                egui::RichText::new(format!("{}-{} of {}", start + 1, end, table.len()))
                    .small()
                    .weak(),
            );
        });
    }
}
