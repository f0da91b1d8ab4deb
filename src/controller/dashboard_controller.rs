use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{error, info, warn};

use super::commands::{DashboardCommand, FilterForm, LoadResponse, LoadState};
use crate::common::helpers::parse_date_bound;
use crate::context::{AppContext, View};
use crate::error::PipelineError;
use crate::network::NetworkGraph;
use crate::pipeline::{append, Dataset, FilterSpec};

/// Dashboard controller that owns the loaded dataset and the current view
/// Follows Single Responsibility Principle - the UI only renders what it exposes
pub struct DashboardController {
    context: Arc<AppContext>,
    /// Loader thread results
    response_tx: Sender<LoadResponse>,
    response_rx: Receiver<LoadResponse>,
    worker: Option<JoinHandle<()>>,
    state: LoadState,
    /// Overrides the configured root after "Select data folder"
    data_root: Option<String>,
    dataset: Option<Dataset>,
    spec: FilterSpec,
    granularity: String,
    view: Option<View>,
    graph: NetworkGraph,
    last_error: Option<String>,
}

impl DashboardController {
    pub fn new(context: Arc<AppContext>) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            spec: context.default_filter(),
            granularity: context.config().granularity.clone(),
            context,
            response_tx,
            response_rx,
            worker: None,
            state: LoadState::Idle,
            data_root: None,
            dataset: None,
            view: None,
            graph: NetworkGraph::default(),
            last_error: None,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn graph(&self) -> &NetworkGraph {
        &self.graph
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn granularity(&self) -> &str {
        &self.granularity
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The form matching the active selection.
    pub fn current_form(&self) -> FilterForm {
        let tz = self.context.timezone();
        let date = |bound: Option<chrono::DateTime<chrono::Utc>>| {
            bound
                .map(|t| t.with_timezone(&tz).format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        FilterForm {
            source: self.spec.source.clone(),
            categories: self.spec.categories.clone(),
            start_date: date(self.spec.start),
            end_date: date(self.spec.end),
            granularity: self.granularity.clone(),
        }
    }

    /// Distinct sources in the loaded dataset, for the source dropdown.
    pub fn source_options(&self) -> Vec<String> {
        self.distinct(self.context.schema().source.as_deref())
    }

    pub fn category_options(&self) -> Vec<String> {
        self.distinct(self.context.schema().category.as_deref())
    }

    fn distinct(&self, column: Option<&str>) -> Vec<String> {
        match (column, self.dataset.as_ref()) {
            (Some(column), Some(dataset)) => dataset.table().distinct_values(column),
            _ => Vec::new(),
        }
    }

    /// First load: snapshot when configured, else discovery.
    pub fn start_initial_load(&mut self) {
        self.spawn_load(|context| context.load_dataset());
    }

    pub fn handle(&mut self, command: DashboardCommand) {
        match command {
            DashboardCommand::ApplyFilter(form) => match self.spec_from_form(&form) {
                Ok(spec) => {
                    self.spec = spec;
                    self.granularity = form.granularity;
                    self.recompute();
                }
                Err(message) => {
                    warn!(%message, "Rejected filter");
                    self.last_error = Some(message);
                }
            },
            DashboardCommand::Refresh => {
                let root = self.data_root.clone();
                self.spawn_load(move |context| context.reload_dataset(root.as_deref()));
            }
            DashboardCommand::SelectSource(source) => {
                self.spec.source = source;
                self.recompute();
            }
            DashboardCommand::SetGranularity(granularity) => {
                self.granularity = granularity;
                self.recompute();
            }
            DashboardCommand::RemoveNodes(ids) => self.graph = self.graph.remove_nodes(&ids),
            DashboardCommand::KeepNodes(ids) => self.graph = self.graph.keep_nodes(&ids),
            DashboardCommand::ResetGraph => self.graph = self.graph.reset(),
            DashboardCommand::OpenDataRoot(path) => {
                let root = path.to_string_lossy().into_owned();
                info!(root = %root, "Switching data root");
                self.data_root = Some(root.clone());
                self.spawn_load(move |context| context.reload_dataset(Some(&root)));
            }
            DashboardCommand::AppendFile(path) => {
                let current = self.dataset.clone().unwrap_or_default();
                self.spawn_load(move |_| append(&current, &path));
            }
        }
    }

    /// Drain finished loads. Returns true when the view changed.
    pub fn poll(&mut self) -> bool {
        let mut updated = false;
        while let Ok(response) = self.response_rx.try_recv() {
            self.apply_response(response);
            updated = true;
        }
        self.check_worker();
        updated
    }

    /// Block until the running load finishes or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        if !self.is_loading() {
            return false;
        }
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => {
                self.apply_response(response);
                self.check_worker();
                true
            }
            Err(_) => false,
        }
    }

    fn spawn_load<F>(&mut self, job: F)
    where
        F: FnOnce(&AppContext) -> Result<Dataset, PipelineError> + Send + 'static,
    {
        if self.is_loading() {
            warn!("Load already in progress; ignoring request");
            return;
        }
        let context = Arc::clone(&self.context);
        let response_tx = self.response_tx.clone();
        self.state = LoadState::Loading;
        self.worker = Some(thread::spawn(move || {
            let response = match job(&context) {
                Ok(dataset) => LoadResponse::Loaded(dataset),
                Err(e) => LoadResponse::Failed(e.to_string()),
            };
            let _ = response_tx.send(response);
        }));
    }

    fn check_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.is_finished() {
                if handle.join().is_err() {
                    error!("Loader thread panicked");
                    self.state = LoadState::Failed;
                }
            } else {
                self.worker = Some(handle);
            }
        }
    }

    fn apply_response(&mut self, response: LoadResponse) {
        match response {
            LoadResponse::Loaded(dataset) => {
                info!(rows = dataset.len(), files = dataset.sources().len(), "Dataset ready");
                self.state = LoadState::Ready;
                self.last_error = None;
                self.set_dataset(dataset);
            }
            LoadResponse::Failed(message) => {
                error!(%message, "Load failed");
                self.state = LoadState::Failed;
                self.last_error = Some(message);
            }
        }
    }

    fn set_dataset(&mut self, dataset: Dataset) {
        let filter = self.context.row_filter();
        let counting =
            FilterSpec::new().with_subtype(self.context.config().subtype_marker.clone());
        let records = filter.records(&filter.apply(dataset.table(), &counting));
        self.graph =
            NetworkGraph::from_records(&records, self.context.config().graph_link_distance);
        self.dataset = Some(dataset);
        self.recompute();
    }

    fn recompute(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            return;
        };
        match self
            .context
            .build_view(dataset, &self.spec, &self.granularity)
        {
            Ok(view) => {
                self.view = Some(view);
                self.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Keeping previous view");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn spec_from_form(&self, form: &FilterForm) -> Result<FilterSpec, String> {
        let tz = self.context.timezone();
        let start = parse_date_bound(&form.start_date, &tz, false)?;
        let end = parse_date_bound(&form.end_date, &tz, true)?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(format!(
                    "Start date {} is after end date {}",
                    form.start_date.trim(),
                    form.end_date.trim()
                ));
            }
        }
        let mut spec = self
            .context
            .default_filter()
            .with_source(form.source.clone())
            .with_time_range(start, end);
        spec.categories = form.categories.clone();
        Ok(spec)
    }
}
