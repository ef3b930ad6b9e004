use super::gate::GateWaiter;
use super::metrics::PipelineMetrics;
use super::state::StageMonitor;
use super::threads::StageThreads;
use crate::channel::{Producer, ProducerGroup, StageSender};
use crate::collector::Acquire;
use crate::domain::{PipelineError, WorkItem};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info};

pub const SOURCE_STAGE: &str = "source";

/// Spawn the single producer of the first channel. It calls the acquisition
/// collaborator once, pushes every item, then finishes, which closes the
/// channel for the filter pool.
pub fn spawn_source(
    acquire: Arc<dyn Acquire>,
    limit: usize,
    downstream: StageSender<WorkItem>,
    metrics: Arc<PipelineMetrics>,
    gate: &GateWaiter,
    monitor: &StageMonitor,
    threads: &mut StageThreads,
) -> Result<(), PipelineError> {
    let (_group, producer) = ProducerGroup::single(downstream);
    let stage = monitor.register(SOURCE_STAGE);
    let gate = gate.clone();

    threads.spawn(SOURCE_STAGE, move || {
        if !gate.wait() {
            debug!("run aborted before start");
            return;
        }
        run_source(acquire.as_ref(), limit, &producer, &metrics);
        stage.draining();
        producer.finish();
    })
}

fn run_source(
    acquire: &dyn Acquire,
    limit: usize,
    producer: &Producer<WorkItem>,
    metrics: &PipelineMetrics,
) {
    info!(limit, "source started");
    let items = match panic::catch_unwind(AssertUnwindSafe(|| acquire.fetch(limit))) {
        Ok(items) => items,
        Err(_) => {
            error!("acquisition panicked, treating it as an empty fetch");
            Vec::new()
        }
    };
    let total = items.len();

    for item in items {
        if let Err(e) = producer.push(item) {
            error!(error = %e, "filter stage is gone, stopping source");
            break;
        }
        metrics.fetched.fetch_add(1, Ordering::Relaxed);
    }

    info!(
        fetched = total,
        pushed = metrics.fetched.load(Ordering::Relaxed),
        "source finished"
    );
}
