//! Spatio-temporal traffic count dashboard.
//!
//! Record files are discovered and assembled into a [`pipeline::Dataset`],
//! filtered, bucketed over time and handed to the chart builders. The egui
//! front end in [`ui`] and the terminal printer in [`display`] both drive
//! the same [`context::AppContext`].

pub mod chart;
pub mod common;
pub mod config;
pub mod context;
pub mod controller;
pub mod display;
pub mod error;
pub mod logging;
pub mod network;
pub mod pipeline;
pub mod ui;
