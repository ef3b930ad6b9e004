//! Per-thread lifecycle tracking: `Running -> Draining -> Terminated`.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StageState {
    Running = 0,
    /// Saw end-of-stream; no further pushes.
    Draining = 1,
    Terminated = 2,
}

impl StageState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StageState::Running,
            1 => StageState::Draining,
            _ => StageState::Terminated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// At least one stage thread has not terminated.
    Running,
    Complete,
}

/// Registry of every stage thread's state for one pipeline.
#[derive(Debug, Default)]
pub struct StageMonitor {
    stages: RwLock<Vec<(String, Arc<AtomicU8>)>>,
}

impl StageMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str) -> StageHandle {
        let state = Arc::new(AtomicU8::new(StageState::Running as u8));
        self.stages.write().push((name.to_string(), state.clone()));
        StageHandle {
            name: name.to_string(),
            state,
        }
    }

    pub fn snapshot(&self) -> Vec<(String, StageState)> {
        self.stages
            .read()
            .iter()
            .map(|(name, state)| (name.clone(), StageState::from_u8(state.load(Ordering::Acquire))))
            .collect()
    }

    pub fn state(&self) -> PipelineState {
        let all_terminated = self
            .stages
            .read()
            .iter()
            .all(|(_, state)| state.load(Ordering::Acquire) == StageState::Terminated as u8);
        if all_terminated {
            PipelineState::Complete
        } else {
            PipelineState::Running
        }
    }
}

/// Owned by one stage thread. Dropping it marks the stage terminated, also
/// when the thread unwinds.
#[derive(Debug)]
pub struct StageHandle {
    name: String,
    state: Arc<AtomicU8>,
}

impl StageHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn draining(&self) {
        self.transition(StageState::Draining);
    }

    fn transition(&self, next: StageState) {
        let previous = self.state.swap(next as u8, Ordering::AcqRel);
        trace!(
            stage = %self.name,
            from = ?StageState::from_u8(previous),
            to = ?next,
            "stage state changed"
        );
    }
}

impl Drop for StageHandle {
    fn drop(&mut self) {
        self.transition(StageState::Terminated);
    }
}
