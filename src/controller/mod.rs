pub mod commands;
pub mod dashboard_controller;

pub use commands::{DashboardCommand, FilterForm, LoadResponse, LoadState};
pub use dashboard_controller::DashboardController;
