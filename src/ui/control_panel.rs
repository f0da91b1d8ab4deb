use std::collections::BTreeSet;

use crossbeam_channel::Sender;
use eframe::egui;

use crate::controller::{DashboardCommand, DashboardController, FilterForm, LoadState};

/// Filter form and data source controls
pub struct ControlPanel {
    command_tx: Sender<DashboardCommand>,
    form: FilterForm,
    /// Form has edits not yet applied
    dirty: bool,
}

impl ControlPanel {
    pub fn new(command_tx: Sender<DashboardCommand>, form: FilterForm) -> Self {
        Self {
            command_tx,
            form,
            dirty: false,
        }
    }

    /// Replace the form with the controller's selection unless the user is editing it.
    pub fn sync(&mut self, form: FilterForm) {
        if !self.dirty {
            self.form = form;
        }
    }

    fn send(&self, command: DashboardCommand) {
        let _ = self.command_tx.send(command);
    }

    fn select_data_folder(&self) {
        if let Some(folder) = rfd::FileDialog::new()
            .set_title("Select Data Folder")
            .pick_folder()
        {
            self.send(DashboardCommand::OpenDataRoot(folder));
        }
    }

    fn append_file(&self) {
        if let Some(file) = rfd::FileDialog::new()
            .add_filter("Record Files", &["txt", "json"])
            .add_filter("CSV Files", &["csv"])
            .add_filter("All Files", &["*"])
            .set_title("Append Record File")
            .pick_file()
        {
            self.send(DashboardCommand::AppendFile(file));
        }
    }

    pub fn render(&mut self, ui: &mut egui::Ui, controller: &DashboardController) {
        let state = controller.state();
        let idle = state != LoadState::Loading;

        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.heading("🎛 Filters");

                let (color, emoji) = match state {
                    LoadState::Idle => (egui::Color32::GRAY, "○"),
                    LoadState::Loading => (egui::Color32::YELLOW, "⏳"),
                    LoadState::Ready => (egui::Color32::GREEN, "✓"),
                    LoadState::Failed => (egui::Color32::RED, "✗"),
                };
                ui.label(
                    egui::RichText::new(format!("{} {}", emoji, state))
                        .color(color)
                        .strong(),
                );
            });

            ui.separator();

            egui::Grid::new("filter_grid")
                .num_columns(2)
                .spacing([10.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Source:");
                    self.render_source_combo(ui, controller);
                    ui.end_row();

                    ui.label("Start date:");
                    if ui
                        .add(egui::TextEdit::singleline(&mut self.form.start_date).hint_text("YYYY-MM-DD"))
                        .changed()
                    {
                        self.dirty = true;
                    }
                    ui.end_row();

                    ui.label("End date:");
                    if ui
                        .add(egui::TextEdit::singleline(&mut self.form.end_date).hint_text("YYYY-MM-DD"))
                        .changed()
                    {
                        self.dirty = true;
                    }
                    ui.end_row();

                    ui.label("Granularity:");
                    if ui
                        .add(egui::TextEdit::singleline(&mut self.form.granularity).hint_text("1 day, 15min, 3 months"))
                        .changed()
                    {
                        self.dirty = true;
                    }
                    ui.end_row();
                });

            self.render_categories(ui, controller);

            ui.separator();

            ui.horizontal(|ui| {
                if ui.add_enabled(idle, egui::Button::new("🔍 Filter")).clicked() {
                    self.send(DashboardCommand::ApplyFilter(self.form.clone()));
                    self.dirty = false;
                }
                if ui.add_enabled(idle, egui::Button::new("🔄 Refresh")).clicked() {
                    self.send(DashboardCommand::Refresh);
                }
            });

            ui.separator();

            ui.horizontal(|ui| {
                ui.label("📁 Data:");
                if ui.add_enabled(idle, egui::Button::new("📂 Select data folder...")).clicked() {
                    self.select_data_folder();
                }
                if ui.add_enabled(idle, egui::Button::new("➕ Append file...")).clicked() {
                    self.append_file();
                }
            });

            if let Some(dataset) = controller.dataset() {
                ui.label(
                    egui::RichText::new(format!("Loaded {} file(s)", dataset.sources().len()))
                        .small()
                        .weak(),
                );
            }

            if self.dirty {
                ui.label(
                    egui::RichText::new("⚠ Click 'Filter' to apply changes")
                        .small()
                        .color(egui::Color32::GOLD),
                );
            }
        });
    }

    fn render_source_combo(&mut self, ui: &mut egui::Ui, controller: &DashboardController) {
        let selected = self
            .form
            .source
            .clone()
            .unwrap_or_else(|| "All sources".to_string());

        egui::ComboBox::from_id_salt("source_combo")
            .selected_text(selected)
            .width(200.0)
            .show_ui(ui, |ui| {
                if ui.selectable_value(&mut self.form.source, None, "All sources").changed() {
                    self.dirty = true;
                }
                for source in controller.source_options() {
                    let label = source.clone();
                    if ui
                        .selectable_value(&mut self.form.source, Some(source), label)
                        .changed()
                    {
                        self.dirty = true;
                    }
                }
            });
    }

    fn render_categories(&mut self, ui: &mut egui::Ui, controller: &DashboardController) {
        let options = controller.category_options();
        if options.is_empty() {
            return;
        }

        ui.separator();
        ui.label("Categories:");

        let mut all = self.form.categories.is_none();
        if ui.checkbox(&mut all, "All").changed() {
            self.form.categories = if all {
                None
            } else {
                Some(options.iter().cloned().collect())
            };
            self.dirty = true;
        }

        if let Some(selected) = self.form.categories.as_mut() {
            egui::ScrollArea::vertical()
                .max_height(120.0)
                .show(ui, |ui| {
                    for category in &options {
                        let mut checked = selected.contains(category);
                        if ui.checkbox(&mut checked, category).changed() {
                            toggle(selected, category, checked);
                            self.dirty = true;
                        }
                    }
                });
        }
    }
}

fn toggle(selected: &mut BTreeSet<String>, category: &str, checked: bool) {
    if checked {
        selected.insert(category.to_string());
    } else {
        selected.remove(category);
    }
}
