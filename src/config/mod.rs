mod aggregation;
mod data;
mod display;

pub use aggregation::*;
pub use data::*;
pub use display::*;

use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::pipeline::{Granularity, GranularityPolicy, RecordFormat};

/// Errors that may occur while loading the dashboard configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Unknown timezone '{0}'")]
    InvalidTimezone(String),
    #[error("Invalid fallback granularity '{0}'")]
    InvalidFallback(String),
}

/// Dashboard settings, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Root directory or glob pattern of the record files.
    pub raw_data_files: String,
    /// Number of most recent files to load; unset or `<= 0` loads all.
    pub init_window: Option<i64>,
    /// IANA timezone used for bucketing and display.
    #[serde(rename = "TZ")]
    pub tz: String,
    pub record_format: RecordFormat,
    pub default_source: Option<String>,
    pub subtype_marker: Option<String>,
    pub granularity: String,
    pub granularity_fallback: String,
    /// Reject unparseable granularities instead of falling back.
    pub strict_granularity: bool,
    pub fill_gaps: bool,
    pub snapshot_path: Option<PathBuf>,
    pub page_size: usize,
    pub graph_link_distance: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            raw_data_files: DEFAULT_RAW_DATA_FILES.to_string(),
            init_window: None,
            tz: DEFAULT_TZ.to_string(),
            record_format: RecordFormat::default(),
            default_source: Some(DEFAULT_SOURCE.to_string()),
            subtype_marker: Some(DEFAULT_SUBTYPE_MARKER.to_string()),
            granularity: DEFAULT_GRANULARITY.to_string(),
            granularity_fallback: DEFAULT_GRANULARITY_FALLBACK.to_string(),
            strict_granularity: false,
            fill_gaps: false,
            snapshot_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            graph_link_distance: DEFAULT_LINK_DISTANCE,
        }
    }
}

impl DashboardConfig {
    /// Load from `DASHBOARD_CONFIG` or the default path; a missing file
    /// yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = get_config_path();
        if !path.exists() {
            info!(path = %path.display(), "No config file found; using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        self.granularity_policy()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.tz
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.tz.clone()))
    }

    pub fn granularity_policy(&self) -> Result<GranularityPolicy, ConfigError> {
        if self.strict_granularity {
            return Ok(GranularityPolicy::Strict);
        }
        Granularity::parse(&self.granularity_fallback)
            .map(GranularityPolicy::Fallback)
            .ok_or_else(|| ConfigError::InvalidFallback(self.granularity_fallback.clone()))
    }

    /// Window with the "non-positive means all" rule applied.
    pub fn window(&self) -> Option<i64> {
        self.init_window.filter(|n| *n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("production.toml");
        fs::write(
            &path,
            "raw_data_files = \"/srv/counts\"\ninit_window = 2\nTZ = \"Europe/Brussels\"\n",
        )
        .unwrap();

        let config = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(config.raw_data_files, "/srv/counts");
        assert_eq!(config.window(), Some(2));
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Brussels);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.default_source.as_deref(), Some(DEFAULT_SOURCE));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "TZ = \"Mars/Olympus\"\n").unwrap();
        assert!(matches!(
            DashboardConfig::load_from(&path),
            Err(ConfigError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn non_positive_window_loads_everything() {
        let config = DashboardConfig {
            init_window: Some(0),
            ..DashboardConfig::default()
        };
        assert_eq!(config.window(), None);
    }

    #[test]
    fn strict_flag_selects_strict_policy() {
        let config = DashboardConfig {
            strict_granularity: true,
            ..DashboardConfig::default()
        };
        assert_eq!(config.granularity_policy().unwrap(), GranularityPolicy::Strict);
        assert_eq!(
            DashboardConfig::default().granularity_policy().unwrap(),
            GranularityPolicy::Fallback(Granularity::DEFAULT_FALLBACK)
        );
    }
}
