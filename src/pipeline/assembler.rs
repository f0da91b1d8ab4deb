use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::loader::load_file;
use super::table::{Dataset, Table};
use crate::common::DataLoader;
use crate::error::PipelineError;

/// Keep the last `window` entries. `None` or a non-positive window keeps all.
pub fn apply_window<T>(mut files: Vec<T>, window: Option<i64>) -> Vec<T> {
    if let Some(n) = window.filter(|n| *n > 0) {
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        if files.len() > n {
            files.drain(..files.len() - n);
        }
    }
    files
}

/// Discovers a window of record files and concatenates their rows.
///
/// Files are ordered by path. Callers must name files so that this order is
/// chronological (e.g. `2023/11/30/counts-0800.txt`); the window keeps the
/// lexicographically last files.
#[derive(Debug, Clone)]
pub struct DatasetAssembler {
    pattern: String,
    window: Option<i64>,
}

impl DatasetAssembler {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            window: None,
        }
    }

    pub fn with_window(mut self, window: Option<i64>) -> Self {
        self.window = window;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Matched files after windowing, in load order.
    pub fn discover(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let files = DataLoader::load_files(&self.pattern)?;
        let total = files.len();
        let files = apply_window(files, self.window);
        if files.len() < total {
            info!(kept = files.len(), total, "Applied file window");
        }
        Ok(files)
    }

    pub fn assemble(&self) -> Result<Dataset, PipelineError> {
        let files = self.discover()?;
        let tables = files
            .iter()
            .map(|path| load_file(path))
            .collect::<Result<Vec<Table>, _>>()?;
        let table = Table::concat(tables);

        if table.is_empty() {
            return Err(PipelineError::EmptyDataset {
                pattern: self.pattern.clone(),
            });
        }
        info!(
            files = files.len(),
            rows = table.len(),
            columns = table.columns().len(),
            "Assembled dataset"
        );
        Ok(Dataset::new(table, files))
    }
}

/// A new dataset with the rows of `path` appended after the existing ones.
pub fn append(dataset: &Dataset, path: &Path) -> Result<Dataset, PipelineError> {
    let extra = load_file(path)?;
    let table = Table::concat([dataset.table().clone(), extra]);
    let mut sources = dataset.sources().to_vec();
    sources.push(path.to_path_buf());
    Ok(Dataset::new(table, sources))
}

/// Write an assembled dataset so later loads can skip discovery.
pub fn save_snapshot(dataset: &Dataset, path: &Path) -> Result<(), PipelineError> {
    let io_error = |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let bytes = serde_json::to_vec(dataset).map_err(|source| PipelineError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(io_error)?;
    info!(path = %path.display(), rows = dataset.len(), "Saved dataset snapshot");
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<Dataset, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset: Dataset =
        serde_json::from_slice(&bytes).map_err(|source| PipelineError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if dataset.is_empty() {
        warn!(path = %path.display(), "Snapshot holds no rows");
        return Err(PipelineError::EmptyDataset {
            pattern: path.display().to_string(),
        });
    }
    info!(path = %path.display(), rows = dataset.len(), "Loaded dataset snapshot");
    Ok(dataset)
}
