/// Rows per page in the data table.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sensors closer than this (in coordinate degrees) are linked in the graph.
pub const DEFAULT_LINK_DISTANCE: f64 = 0.05;

pub const MAP_STYLE: &str = "carto-positron";
