use crate::Result;
use crate::aggregate::StreamAggregator;
use crate::config::AnalyzerConfig;
use crate::discovery::LogFileHandle;
use crate::render::TemplateRenderer;
use crate::report::ReportBuilder;
use crate::source::LogLines;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::Dispatch;

/// Stage of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    Parsing,
    Reporting,
    Rendering,
    Done,
    Failed,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub log_file: LogFileHandle,
    pub report_path: PathBuf,
    pub rows: usize,
    pub total_lines: u64,
    pub matched_lines: u64,
    pub mismatched_lines: u64,
    pub elapsed: Duration,
    /// Unix time of completion, in seconds
    pub finished_at: i64,
}

/// Runs discovery, aggregation, reporting and rendering for one log file.
///
/// Every failure is terminal: the run stops in [`RunState::Failed`] and the
/// error is returned to the caller.
pub struct Runner {
    config: AnalyzerConfig,
    dispatch: Option<Dispatch>,
    state: RunState,
}

impl Runner {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            dispatch: None,
            state: RunState::Idle,
        }
    }

    /// Send this runner's log events to `dispatch` instead of the global subscriber
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        match self.dispatch.clone() {
            Some(dispatch) => tracing::dispatcher::with_default(&dispatch, || self.execute()),
            None => self.execute(),
        }
    }

    fn execute(&mut self) -> Result<RunSummary> {
        self.state = RunState::Idle;
        let result = self.pipeline();
        if result.is_err() {
            self.transition(RunState::Failed);
        }
        result
    }

    fn pipeline(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!(
            "Analyzer begin to work. Unix time: {}",
            chrono::Utc::now().timestamp()
        );

        self.transition(RunState::Discovering);
        let log_file = self.config.discovery.find_latest(&self.config.log_dir)?;

        self.transition(RunState::Parsing);
        let lines = LogLines::open(&log_file.path)?;
        let state = StreamAggregator::new(&self.config.parser, self.config.mismatch)
            .aggregate(lines)?;
        let (total_lines, matched_lines, mismatched_lines) =
            (state.total, state.matched, state.mismatched);

        self.transition(RunState::Reporting);
        let rows = ReportBuilder::new(self.config.report_size).build(state);

        self.transition(RunState::Rendering);
        let report_path = self.config.report_path(log_file.date)?;
        let content =
            TemplateRenderer::render(&self.config.template_path, &rows, &self.config.template_tag)?;
        TemplateRenderer::save(&report_path, &content)?;

        self.transition(RunState::Done);
        let finished_at = chrono::Utc::now().timestamp();
        let elapsed = started.elapsed();
        tracing::info!(
            "Analyzer completed successfully in {:.3}s. Unix time: {}",
            elapsed.as_secs_f64(),
            finished_at
        );

        Ok(RunSummary {
            log_file,
            report_path,
            rows: rows.len(),
            total_lines,
            matched_lines,
            mismatched_lines,
            elapsed,
            finished_at,
        })
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!("Analyzer state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
