mod summary_display;

pub use summary_display::SummaryDisplay;
