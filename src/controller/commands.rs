use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::network::NodeId;
use crate::pipeline::Dataset;

/// Filter form as entered in the control panel, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterForm {
    pub source: Option<String>,
    /// `None` means every category.
    pub categories: Option<BTreeSet<String>>,
    /// `YYYY-MM-DD`, empty for no bound.
    pub start_date: String,
    pub end_date: String,
    pub granularity: String,
}

/// Dashboard commands using Command Pattern
#[derive(Debug, Clone)]
pub enum DashboardCommand {
    /// Validate the form and recompute the view
    ApplyFilter(FilterForm),
    /// Rediscover the record files and reload
    Refresh,
    /// Filter to one source, e.g. after clicking a graph node
    SelectSource(Option<String>),
    SetGranularity(String),
    RemoveNodes(Vec<NodeId>),
    KeepNodes(Vec<NodeId>),
    ResetGraph,
    /// Load every record file under a new root
    OpenDataRoot(PathBuf),
    /// Add one record file to the current dataset
    AppendFile(PathBuf),
}

/// Results sent back from the loader thread
#[derive(Debug)]
pub enum LoadResponse {
    Loaded(Dataset),
    Failed(String),
}

/// Current load state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Idle => write!(f, "Idle"),
            LoadState::Loading => write!(f, "Loading"),
            LoadState::Ready => write!(f, "Ready"),
            LoadState::Failed => write!(f, "Failed"),
        }
    }
}
