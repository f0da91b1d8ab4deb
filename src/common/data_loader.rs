use glob::glob;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::PipelineError;

/// Extensions picked up when a bare directory is given instead of a pattern.
const RECORD_EXTENSIONS: [&str; 2] = ["txt", "json"];

/// Record file discovery (Single Responsibility Principle)
pub struct DataLoader;

impl DataLoader {
    /// Expand a configured location into concrete glob patterns.
    ///
    /// A pattern containing glob metacharacters, or naming an existing file,
    /// is used as-is. Anything else is a root directory searched recursively.
    pub fn expand_pattern(pattern: &str) -> Vec<String> {
        if pattern.contains(['*', '?', '[']) || Path::new(pattern).is_file() {
            return vec![pattern.to_string()];
        }

        let root = pattern.trim_end_matches(['/', '\\']);
        let root = if root.is_empty() { "." } else { root };
        RECORD_EXTENSIONS
            .iter()
            .map(|ext| format!("{}/**/*.{}", root, ext))
            .collect()
    }

    /// List files matching the pattern, sorted by path.
    pub fn load_files(pattern: &str) -> Result<Vec<PathBuf>, PipelineError> {
        let mut data_files = Vec::new();

        for expanded in Self::expand_pattern(pattern) {
            let entries = glob(&expanded).map_err(|source| PipelineError::Pattern {
                pattern: expanded.clone(),
                source,
            })?;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        if path.is_file() {
                            data_files.push(path);
                        }
                    }
                    Err(e) => warn!(error = %e, "Error reading path"),
                }
            }
        }

        if data_files.is_empty() {
            return Err(PipelineError::EmptyDataset {
                pattern: pattern.to_string(),
            });
        }

        // Lexicographic order stands in for chronological order.
        data_files.sort();
        data_files.dedup();

        info!(count = data_files.len(), pattern, "Found record files");
        for (i, file) in data_files.iter().enumerate() {
            debug!("  [{}] {}", i + 1, file.display());
        }

        Ok(data_files)
    }
}
