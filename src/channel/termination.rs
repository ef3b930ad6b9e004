//! Fan-in termination: many producers, one end-of-stream.
//!
//! A [`ProducerGroup`] splits a channel's sender into `N` [`Producer`]
//! handles sharing a countdown initialized to `N`. Each producer finishes by
//! being dropped. The handle that brings the countdown to zero releases the
//! last sender, which closes the channel for every reader at once. Earlier
//! finishers only decrement. Nobody has to guess which worker is last, and no
//! reader can miss the closure.

use super::{ChannelError, StageSender};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

#[derive(Debug)]
struct Countdown {
    channel: String,
    total: usize,
    remaining: AtomicUsize,
}

impl Countdown {
    fn new(channel: &str, total: usize) -> Arc<Self> {
        Arc::new(Self {
            channel: channel.to_string(),
            total,
            remaining: AtomicUsize::new(total),
        })
    }
}

/// Observer for the producers registered on one channel.
#[derive(Debug, Clone)]
pub struct ProducerGroup {
    countdown: Arc<Countdown>,
}

impl ProducerGroup {
    /// Register `producers` writers on the channel behind `sender`.
    ///
    /// Consumes the sender so no stray handle can keep the channel open.
    /// With zero producers the channel closes immediately.
    pub fn split<T>(sender: StageSender<T>, producers: usize) -> (Self, Vec<Producer<T>>) {
        let countdown = Countdown::new(sender.name(), producers);

        let handles = (0..producers)
            .map(|index| Producer {
                index,
                sender: Some(sender.clone()),
                countdown: countdown.clone(),
            })
            .collect();

        (Self { countdown }, handles)
    }

    /// A channel with exactly one writer.
    pub fn single<T>(sender: StageSender<T>) -> (Self, Producer<T>) {
        let countdown = Countdown::new(sender.name(), 1);
        let producer = Producer {
            index: 0,
            sender: Some(sender),
            countdown: countdown.clone(),
        };
        (Self { countdown }, producer)
    }

    pub fn total(&self) -> usize {
        self.countdown.total
    }

    pub fn remaining(&self) -> usize {
        self.countdown.remaining.load(Ordering::Acquire)
    }

    /// True once every producer has finished and released its sender.
    pub fn is_closed(&self) -> bool {
        self.remaining() == 0
    }
}

/// One registered writer. Dropping it marks this producer done.
#[derive(Debug)]
pub struct Producer<T> {
    index: usize,
    sender: Option<StageSender<T>>,
    countdown: Arc<Countdown>,
}

impl<T> Producer<T> {
    pub fn push(&self, item: T) -> Result<(), ChannelError> {
        match &self.sender {
            Some(sender) => sender.push(item),
            None => Err(ChannelError::Closed {
                channel: self.countdown.channel.clone(),
            }),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Explicitly mark this producer done. Equivalent to dropping it.
    pub fn finish(self) {}
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        // Release the sender before counting down, so a zero count always
        // means the channel is already closed.
        drop(self.sender.take());

        let previous = self.countdown.remaining.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 {
            debug!(
                channel = %self.countdown.channel,
                producer = self.index,
                producers = self.countdown.total,
                "last producer finished, channel closed"
            );
        } else {
            trace!(
                channel = %self.countdown.channel,
                producer = self.index,
                remaining = previous - 1,
                "producer finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Pop, StageChannel};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn channel_stays_open_until_the_last_producer_finishes() {
        let (tx, rx) = StageChannel::unbounded::<u32>("fan-in");
        let (group, mut producers) = ProducerGroup::split(tx, 3);
        assert_eq!(group.total(), 3);

        producers.pop().unwrap().finish();
        producers.pop().unwrap().finish();
        assert_eq!(group.remaining(), 1);
        assert_eq!(rx.pop(Duration::from_millis(10)), Pop::Empty);

        producers.pop().unwrap().finish();
        assert!(group.is_closed());
        assert_eq!(rx.pop(Duration::from_millis(10)), Pop::EndOfStream);
    }

    #[test]
    fn zero_producers_close_the_channel_immediately() {
        let (tx, rx) = StageChannel::unbounded::<u32>("empty");
        let (group, producers) = ProducerGroup::split(tx, 0);
        assert!(producers.is_empty());
        assert!(group.is_closed());
        assert_eq!(rx.recv(), Pop::EndOfStream);
    }

    #[test]
    fn concurrent_producers_deliver_everything_then_close_once() {
        let (tx, rx) = StageChannel::unbounded("fan-in");
        let (group, producers) = ProducerGroup::split(tx, 8);

        let handles: Vec<_> = producers
            .into_iter()
            .map(|producer| {
                thread::spawn(move || {
                    for i in 0..50 {
                        producer.push(producer.index() * 1000 + i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut received = 0;
        loop {
            match rx.recv() {
                Pop::Item(_) => received += 1,
                Pop::EndOfStream => break,
                Pop::Empty => unreachable!(),
            }
        }
        assert_eq!(received, 400);
        assert!(group.is_closed());
        assert_eq!(rx.recv(), Pop::EndOfStream);
    }
}
