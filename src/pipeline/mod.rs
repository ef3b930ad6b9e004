//! Pipeline orchestrator.
//!
//! ```text
//! source ──▶ articles ──▶ filter-1..N ──▶ filtered ──▶ summarize-1..M ──▶ summarized ──▶ sink
//! ```
//!
//! Every stage runs on its own named OS thread. Channels close when their last
//! producer finishes, so exhaustion of the source propagates stage by stage
//! until the sink flushes and every thread has terminated.

pub mod gate;
pub mod metrics;
pub mod pool;
pub mod sink;
pub mod source;
pub mod state;
pub mod threads;

use crate::channel::StageChannel;
use crate::collector::Acquire;
use crate::domain::{PipelineError, WorkItem};
use crate::stages::{Classify, FilterTransform, Summarize, SummarizeTransform};
use crate::store::Persist;
use gate::{GateWaiter, StartGate};
use metrics::{PipelineMetrics, PoolSnapshot};
use parking_lot::RwLock;
use pool::WorkerPool;
use serde::Serialize;
use state::StageMonitor;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use threads::StageThreads;
use tracing::{error, info, info_span};
use uuid::Uuid;

pub use state::{PipelineState, StageState};

/// Sizing of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Items requested from the acquisition collaborator (per feed).
    pub fetch_limit: usize,
    pub filter_workers: usize,
    pub summarize_workers: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 25,
            filter_workers: 5,
            summarize_workers: 2,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.filter_workers == 0 {
            return Err(PipelineError::InvalidSettings(
                "filter pool needs at least one worker".to_string(),
            ));
        }
        if self.summarize_workers == 0 {
            return Err(PipelineError::InvalidSettings(
                "summarize pool needs at least one worker".to_string(),
            ));
        }
        Ok(())
    }
}

/// External collaborators a run delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub acquire: Arc<dyn Acquire>,
    pub classify: Arc<dyn Classify>,
    pub summarize: Arc<dyn Summarize>,
    pub persist: Arc<dyn Persist>,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    /// Items that entered the first channel.
    pub fetched: u64,
    /// Rejected by the filter (no text or no category above threshold).
    pub filtered_out: u64,
    /// Dropped because classification failed.
    pub classify_failures: u64,
    /// Forwarded with an empty summary because summarization failed.
    pub summarize_fallbacks: u64,
    /// Dropped because the summarize stage crashed on the item.
    pub summarize_failures: u64,
    pub reached_sink: u64,
    pub persisted: u64,
    pub persist_error: Option<String>,
    pub elapsed_ms: u64,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {}: fetched={} filtered_out={} classify_failures={} summarize_fallbacks={} \
             summarize_failures={} reached_sink={} persisted={} elapsed={}ms",
            self.run_id,
            self.fetched,
            self.filtered_out,
            self.classify_failures,
            self.summarize_fallbacks,
            self.summarize_failures,
            self.reached_sink,
            self.persisted,
            self.elapsed_ms
        )?;
        if let Some(e) = &self.persist_error {
            write!(f, " persist_error=\"{e}\"")?;
        }
        Ok(())
    }
}

/// A configured pipeline. `run` may be called repeatedly, also from several
/// threads at once; every run gets its own channels, threads and monitor.
pub struct Pipeline {
    settings: PipelineSettings,
    collaborators: Collaborators,
    /// Monitor of the most recently started run.
    latest: RwLock<Arc<StageMonitor>>,
}

struct StartedPools {
    filter: WorkerPool,
    summarize: WorkerPool,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        collaborators: Collaborators,
    ) -> Result<Self, PipelineError> {
        settings.validate()?;
        Ok(Self {
            settings,
            collaborators,
            latest: RwLock::new(Arc::new(StageMonitor::new())),
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Stage states of the most recently started run.
    pub fn monitor(&self) -> Arc<StageMonitor> {
        self.latest.read().clone()
    }

    /// Run the pipeline to completion and report what happened.
    ///
    /// Returns an error only for startup failures or a stage thread that
    /// panicked outside item processing; item-level failures are counted.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("pipeline_run", run_id = %run_id);
        let _entered = span.enter();
        let started_at = Instant::now();

        info!(
            fetch_limit = self.settings.fetch_limit,
            filter_workers = self.settings.filter_workers,
            summarize_workers = self.settings.summarize_workers,
            "starting pipeline run"
        );

        let monitor = Arc::new(StageMonitor::new());
        *self.latest.write() = monitor.clone();
        let metrics = Arc::new(PipelineMetrics::new());
        let summarize = Arc::new(SummarizeTransform::new(
            self.collaborators.summarize.clone(),
        ));
        let mut threads = StageThreads::new(span.clone());
        let (opener, gate) = StartGate::new();

        let pools = match self.start(&mut threads, &gate, &monitor, &metrics, summarize.clone()) {
            Ok(pools) => {
                opener.open();
                pools
            }
            Err(e) => {
                error!(error = %e, "startup failed, aborting run");
                opener.abort();
                if let Err(join_err) = threads.join_all() {
                    error!(error = %join_err, "stage thread failed during abort");
                }
                return Err(e);
            }
        };

        threads.join_all()?;

        let report = Self::report(
            run_id,
            &metrics,
            pools.filter.stats(),
            pools.summarize.stats(),
            summarize.fallbacks(),
            started_at.elapsed(),
        );
        info!(
            fetched = report.fetched,
            filtered_out = report.filtered_out,
            classify_failures = report.classify_failures,
            persisted = report.persisted,
            elapsed_ms = report.elapsed_ms,
            "pipeline run complete"
        );
        Ok(report)
    }

    /// Wire the channels and spawn source, filter pool, summarize pool and
    /// sink, in that order. Threads hold at the gate until all are spawned.
    fn start(
        &self,
        threads: &mut StageThreads,
        gate: &GateWaiter,
        monitor: &StageMonitor,
        metrics: &Arc<PipelineMetrics>,
        summarize: Arc<SummarizeTransform>,
    ) -> Result<StartedPools, PipelineError> {
        let (articles_tx, articles_rx) = StageChannel::unbounded::<WorkItem>("articles");
        let (filtered_tx, filtered_rx) = StageChannel::unbounded::<WorkItem>("filtered");
        let (summarized_tx, summarized_rx) = StageChannel::unbounded::<WorkItem>("summarized");

        source::spawn_source(
            self.collaborators.acquire.clone(),
            self.settings.fetch_limit,
            articles_tx,
            metrics.clone(),
            gate,
            monitor,
            threads,
        )?;

        let filter = WorkerPool::start(
            FilterTransform::STAGE,
            self.settings.filter_workers,
            articles_rx,
            filtered_tx,
            Arc::new(FilterTransform::new(self.collaborators.classify.clone())),
            gate,
            monitor,
            threads,
        )?;

        let summarize = WorkerPool::start(
            SummarizeTransform::STAGE,
            self.settings.summarize_workers,
            filtered_rx,
            summarized_tx,
            summarize,
            gate,
            monitor,
            threads,
        )?;

        sink::spawn_sink(
            summarized_rx,
            self.collaborators.persist.clone(),
            metrics.clone(),
            gate,
            monitor,
            threads,
        )?;

        Ok(StartedPools { filter, summarize })
    }

    fn report(
        run_id: String,
        metrics: &PipelineMetrics,
        filter: PoolSnapshot,
        summarize: PoolSnapshot,
        summarize_fallbacks: u64,
        elapsed: Duration,
    ) -> RunReport {
        let reached_sink = PipelineMetrics::load(&metrics.reached_sink);
        if reached_sink != summarize.forwarded {
            error!(
                reached_sink,
                forwarded = summarize.forwarded,
                "sink count does not match summarize output"
            );
        }

        RunReport {
            run_id,
            fetched: PipelineMetrics::load(&metrics.fetched),
            filtered_out: filter.dropped,
            classify_failures: filter.failed,
            summarize_fallbacks,
            summarize_failures: summarize.failed,
            reached_sink,
            persisted: PipelineMetrics::load(&metrics.persisted),
            persist_error: metrics.persist_error(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
