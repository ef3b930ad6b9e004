//! Stage channels: thread-safe FIFO conduits between pipeline stages.
//!
//! A channel carries items until every producer handle is gone; after that,
//! each reader observes [`Pop::EndOfStream`] once the remaining items have
//! been drained. End-of-stream is a variant of [`Pop`], never an item value,
//! so no legitimate item can be mistaken for termination.

pub mod termination;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use termination::{Producer, ProducerGroup};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel '{channel}' has no readers left")]
    Closed { channel: String },
}

/// Outcome of reading from a stage channel.
#[derive(Debug, PartialEq, Eq)]
pub enum Pop<T> {
    Item(T),
    /// Every producer has finished and the queue is drained.
    EndOfStream,
    /// The wait timed out. Not an error: callers use it to re-check their own
    /// stop condition.
    Empty,
}

impl<T> Pop<T> {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Pop::EndOfStream)
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            Pop::Item(item) => Some(item),
            Pop::EndOfStream | Pop::Empty => None,
        }
    }
}

/// Constructors for the sender/receiver pair of a named stage channel.
pub struct StageChannel;

impl StageChannel {
    /// Unbounded channel: `push` never blocks while readers exist.
    pub fn unbounded<T>(name: &str) -> (StageSender<T>, StageReceiver<T>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self::wrap(name, tx, rx)
    }

    /// Bounded channel: `push` blocks while `capacity` items are queued.
    pub fn bounded<T>(name: &str, capacity: usize) -> (StageSender<T>, StageReceiver<T>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self::wrap(name, tx, rx)
    }

    fn wrap<T>(name: &str, tx: Sender<T>, rx: Receiver<T>) -> (StageSender<T>, StageReceiver<T>) {
        let name: Arc<str> = Arc::from(name);
        (
            StageSender {
                name: name.clone(),
                inner: tx,
            },
            StageReceiver { name, inner: rx },
        )
    }
}

/// Write side of a stage channel. Clones are independent producers; the
/// channel closes for reading when the last clone is dropped.
#[derive(Debug)]
pub struct StageSender<T> {
    name: Arc<str>,
    inner: Sender<T>,
}

impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T> StageSender<T> {
    pub fn push(&self, item: T) -> Result<(), ChannelError> {
        self.inner.send(item).map_err(|_| ChannelError::Closed {
            channel: self.name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Read side of a stage channel. Clones compete for items (fan-out); every
/// clone observes end-of-stream.
#[derive(Debug)]
pub struct StageReceiver<T> {
    name: Arc<str>,
    inner: Receiver<T>,
}

impl<T> Clone for StageReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T> StageReceiver<T> {
    /// Wait up to `timeout` for the next item.
    pub fn pop(&self, timeout: Duration) -> Pop<T> {
        match self.inner.recv_timeout(timeout) {
            Ok(item) => Pop::Item(item),
            Err(RecvTimeoutError::Timeout) => Pop::Empty,
            Err(RecvTimeoutError::Disconnected) => Pop::EndOfStream,
        }
    }

    /// Block until an item arrives or the channel is closed and drained.
    pub fn recv(&self) -> Pop<T> {
        match self.inner.recv() {
            Ok(item) => Pop::Item(item),
            Err(_) => Pop::EndOfStream,
        }
    }

    pub fn try_pop(&self) -> Pop<T> {
        match self.inner.try_recv() {
            Ok(item) => Pop::Item(item),
            Err(TryRecvError::Empty) => Pop::Empty,
            Err(TryRecvError::Disconnected) => Pop::EndOfStream,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
