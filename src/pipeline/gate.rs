//! Start gate: stage threads wait here until every thread of the run has
//! been spawned, so a spawn failure aborts the run before any item moves.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct StartGate;

impl StartGate {
    pub fn new() -> (GateOpener, GateWaiter) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let aborted = Arc::new(AtomicBool::new(false));
        (
            GateOpener {
                tx: Some(tx),
                aborted: aborted.clone(),
                opened: false,
            },
            GateWaiter { rx, aborted },
        )
    }
}

/// Held by the orchestrator. Dropping it without `open` aborts the run.
pub struct GateOpener {
    tx: Option<Sender<()>>,
    aborted: Arc<AtomicBool>,
    opened: bool,
}

impl GateOpener {
    pub fn open(mut self) {
        self.opened = true;
        drop(self.tx.take());
    }

    pub fn abort(self) {}
}

impl Drop for GateOpener {
    fn drop(&mut self) {
        if !self.opened {
            self.aborted.store(true, Ordering::Release);
        }
        // Waiters wake on disconnect, after the abort flag is visible
        drop(self.tx.take());
    }
}

#[derive(Clone)]
pub struct GateWaiter {
    rx: Receiver<()>,
    aborted: Arc<AtomicBool>,
}

impl GateWaiter {
    /// Block until the gate opens. Returns `false` if the run was aborted.
    pub fn wait(&self) -> bool {
        // Nothing is ever sent; the only wake-up is the opener going away
        let _ = self.rx.recv();
        !self.aborted.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn waiters_proceed_when_opened() {
        let (opener, waiter) = StartGate::new();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let waiter = waiter.clone();
                thread::spawn(move || waiter.wait())
            })
            .collect();

        opener.open();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn waiters_stop_when_aborted() {
        let (opener, waiter) = StartGate::new();
        let handle = thread::spawn(move || waiter.wait());
        opener.abort();
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn dropping_the_opener_aborts() {
        let (opener, waiter) = StartGate::new();
        drop(opener);
        assert!(!waiter.wait());
    }
}
