use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "conf/production.toml";
pub const DEFAULT_RAW_DATA_FILES: &str = "data/raw";
pub const DEFAULT_SOURCE: &str = "BXLBXL034165F1";
pub const DEFAULT_SUBTYPE_MARKER: &str = "counting";

const CONFIG_PATH_VAR: &str = "DASHBOARD_CONFIG";
const MAP_TOKEN_VARS: [&str; 2] = ["MAPBOX_ACCESS_TOKEN", "mapbox_access_token"];

pub fn get_config_path() -> PathBuf {
    env::var(CONFIG_PATH_VAR)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Map tile credential. Absent disables the map view.
pub fn map_access_token() -> Option<String> {
    MAP_TOKEN_VARS
        .iter()
        .find_map(|name| env::var(name).ok().filter(|s| !s.trim().is_empty()))
}
