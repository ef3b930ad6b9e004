//! Generic worker pool: `N` workers share one upstream channel, apply the
//! same transformation and fan in to one downstream channel.
//!
//! Termination: every worker holds one [`Producer`] of the downstream
//! channel. A worker that sees end-of-stream stops pulling and drops its
//! producer; the downstream channel closes only when the last of the `N`
//! producers is gone. Upstream end-of-stream reaches every worker because the
//! upstream channel closes for all readers at once.

use super::gate::GateWaiter;
use super::metrics::{PoolSnapshot, PoolStats};
use super::state::{StageHandle, StageMonitor};
use super::threads::StageThreads;
use crate::channel::{Pop, Producer, ProducerGroup, StageReceiver, StageSender};
use crate::domain::{PipelineError, WorkItem};
use crate::stages::Transform;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info};

pub struct WorkerPool {
    name: String,
    workers: usize,
    group: ProducerGroup,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Spawn `workers` threads named `{name}-1..={workers}`. They wait on
    /// `gate` before reading anything.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        name: &str,
        workers: usize,
        upstream: StageReceiver<WorkItem>,
        downstream: StageSender<WorkItem>,
        transform: Arc<dyn Transform>,
        gate: &GateWaiter,
        monitor: &StageMonitor,
        threads: &mut StageThreads,
    ) -> Result<Self, PipelineError> {
        let stats = Arc::new(PoolStats::default());
        let (group, producers) = ProducerGroup::split(downstream, workers);

        for producer in producers {
            let worker_name = format!("{name}-{}", producer.index() + 1);
            let worker = Worker {
                stage: monitor.register(&worker_name),
                upstream: upstream.clone(),
                producer,
                transform: transform.clone(),
                stats: stats.clone(),
            };
            let gate = gate.clone();
            threads.spawn(&worker_name, move || {
                if gate.wait() {
                    worker.run();
                } else {
                    debug!("run aborted before start");
                }
            })?;
        }

        info!(pool = name, workers, "worker pool started");
        Ok(Self {
            name: name.to_string(),
            workers,
            group,
            stats,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// True once every worker has released its downstream producer.
    pub fn is_drained(&self) -> bool {
        self.group.is_closed()
    }

    pub fn stats(&self) -> PoolSnapshot {
        self.stats.snapshot()
    }
}

struct Worker {
    stage: StageHandle,
    upstream: StageReceiver<WorkItem>,
    producer: Producer<WorkItem>,
    transform: Arc<dyn Transform>,
    stats: Arc<PoolStats>,
}

impl Worker {
    fn run(self) {
        let Worker {
            stage,
            upstream,
            producer,
            transform,
            stats,
        } = self;
        debug!(worker = stage.name(), "worker started");

        loop {
            let item = match upstream.recv() {
                Pop::Item(item) => item,
                Pop::EndOfStream => break,
                // recv only returns on an item or closure
                Pop::Empty => continue,
            };
            stats.received.fetch_add(1, Ordering::Relaxed);
            let item_id = item.id.clone();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| transform.apply(item)));
            match outcome {
                Ok(Ok(Some(out))) => {
                    if let Err(e) = producer.push(out) {
                        error!(
                            worker = stage.name(),
                            item_id = %item_id,
                            error = %e,
                            "downstream closed, stopping worker"
                        );
                        break;
                    }
                    stats.forwarded.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Ok(None)) => {
                    stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(worker = stage.name(), error = %e, "transformation failed, dropping item");
                }
                Err(_) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        worker = stage.name(),
                        item_id = %item_id,
                        stage = transform.stage(),
                        "transformation panicked, dropping item"
                    );
                }
            }
        }

        stage.draining();
        // Count down on the downstream channel; the last worker closes it
        producer.finish();
        debug!(worker = stage.name(), "worker finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StageChannel;
    use crate::pipeline::gate::StartGate;
    use crate::stages::StageError;
    use crate::model::ModelError;
    use chrono::Utc;
    use tracing::Span;

    struct EvenOnly;

    impl Transform for EvenOnly {
        fn stage(&self) -> &'static str {
            "even"
        }

        fn apply(&self, item: WorkItem) -> Result<Option<WorkItem>, StageError> {
            let n: u32 = item.text.parse().unwrap_or(0);
            match n % 4 {
                0 => Ok(Some(item)),
                1 => Ok(None),
                2 => Err(StageError {
                    stage: "even",
                    item_id: item.id,
                    source: ModelError::Inference("boom".to_string()),
                }),
                _ => panic!("bad item {n}"),
            }
        }
    }

    fn item(n: u32) -> WorkItem {
        WorkItem::new(format!("item {n}"), "link", "test", Utc::now(), n.to_string())
    }

    #[test]
    fn pool_isolates_failures_and_closes_downstream_once() {
        let (up_tx, up_rx) = StageChannel::unbounded("up");
        let (down_tx, down_rx) = StageChannel::unbounded("down");
        let monitor = StageMonitor::new();
        let mut threads = StageThreads::new(Span::none());
        let (opener, gate) = StartGate::new();

        let pool = WorkerPool::start(
            "even",
            4,
            up_rx,
            down_tx,
            Arc::new(EvenOnly),
            &gate,
            &monitor,
            &mut threads,
        )
        .unwrap();
        assert_eq!(threads.len(), 4);
        opener.open();

        for n in 0..40 {
            up_tx.push(item(n)).unwrap();
        }
        drop(up_tx);

        let mut forwarded = 0;
        while let Pop::Item(_) = down_rx.recv() {
            forwarded += 1;
        }
        threads.join_all().unwrap();

        assert_eq!(forwarded, 10);
        assert!(pool.is_drained());
        assert_eq!(
            pool.stats(),
            PoolSnapshot {
                received: 40,
                forwarded: 10,
                dropped: 10,
                failed: 20,
            }
        );
        assert_eq!(pool.workers(), 4);
        assert_eq!(pool.name(), "even");
    }

    #[test]
    fn aborted_gate_processes_nothing() {
        let (up_tx, up_rx) = StageChannel::unbounded("up");
        let (down_tx, down_rx) = StageChannel::unbounded("down");
        let monitor = StageMonitor::new();
        let mut threads = StageThreads::new(Span::none());
        let (opener, gate) = StartGate::new();

        up_tx.push(item(0)).unwrap();
        let pool = WorkerPool::start(
            "even",
            2,
            up_rx,
            down_tx,
            Arc::new(EvenOnly),
            &gate,
            &monitor,
            &mut threads,
        )
        .unwrap();
        opener.abort();
        threads.join_all().unwrap();

        assert_eq!(down_rx.recv(), Pop::EndOfStream);
        assert_eq!(pool.stats().received, 0);
    }
}
