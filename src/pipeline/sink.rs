use super::gate::GateWaiter;
use super::metrics::PipelineMetrics;
use super::state::StageMonitor;
use super::threads::StageThreads;
use crate::channel::{Pop, StageReceiver};
use crate::domain::{PipelineError, WorkItem};
use crate::store::Persist;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info};

pub const SINK_STAGE: &str = "sink";

/// Spawn the single reader of the last channel. Items are batched in memory
/// and persisted with one call after end-of-stream; an empty batch is never
/// persisted.
pub fn spawn_sink(
    upstream: StageReceiver<WorkItem>,
    persist: Arc<dyn Persist>,
    metrics: Arc<PipelineMetrics>,
    gate: &GateWaiter,
    monitor: &StageMonitor,
    threads: &mut StageThreads,
) -> Result<(), PipelineError> {
    let stage = monitor.register(SINK_STAGE);
    let gate = gate.clone();

    threads.spawn(SINK_STAGE, move || {
        if !gate.wait() {
            debug!("run aborted before start");
            return;
        }

        let batch = collect(&upstream, &metrics);
        stage.draining();
        flush(&batch, persist.as_ref(), &metrics);
    })
}

fn collect(upstream: &StageReceiver<WorkItem>, metrics: &PipelineMetrics) -> Vec<WorkItem> {
    let mut batch = Vec::new();
    loop {
        match upstream.recv() {
            Pop::Item(item) => {
                metrics.reached_sink.fetch_add(1, Ordering::Relaxed);
                batch.push(item);
            }
            Pop::EndOfStream => break,
            Pop::Empty => continue,
        }
    }
    batch
}

fn flush(batch: &[WorkItem], persist: &dyn Persist, metrics: &PipelineMetrics) {
    if batch.is_empty() {
        info!("nothing reached the sink, skipping persist");
        return;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| persist.persist(batch))) {
        Ok(Ok(written)) => {
            metrics.persisted.store(written as u64, Ordering::Relaxed);
            info!(batch = batch.len(), written, "persisted final batch");
        }
        Ok(Err(e)) => {
            error!(batch = batch.len(), error = %e, "failed to persist final batch");
            metrics.record_persist_error(e.to_string());
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(batch = batch.len(), reason, "persistence panicked");
            metrics.record_persist_error(format!("persistence panicked: {reason}"));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}
