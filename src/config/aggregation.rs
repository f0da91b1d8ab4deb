pub const DEFAULT_TZ: &str = "UTC";
pub const DEFAULT_GRANULARITY: &str = "1 day";
pub const DEFAULT_GRANULARITY_FALLBACK: &str = "3 months";
