use super::command::Command;
use super::entry::TimerEntry;

use std::collections::BinaryHeap;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Sending half used by sleep futures and the runtime to reach the timer thread.
#[derive(Clone)]
pub(crate) struct TimerHandle {
    transmitter: Sender<Command>,
}

impl TimerHandle {
    /// Sends a command to the timer thread.
    ///
    /// Commands sent after the thread has stopped are silently dropped.
    pub(crate) fn send(&self, command: Command) {
        let _ = self.transmitter.send(command);
    }
}

/// Heap size below which cancelled entries are left to expire.
const MIN_COMPACT_LEN: usize = 64;

/// The timer thread's state: pending deadlines and the command inbox.
pub(crate) struct TimerDriver {
    receiver: Receiver<Command>,
    timers: BinaryHeap<TimerEntry>,

    /// Heap length that triggers the next sweep of cancelled entries.
    compact_at: usize,
}

impl TimerDriver {
    /// Spawns the timer thread and returns a handle to it together with the
    /// thread's join handle.
    pub(crate) fn start(thread_name: &str) -> io::Result<(TimerHandle, JoinHandle<()>)> {
        let (transmitter, receiver) = channel();
        let mut driver = TimerDriver::new(receiver);

        let thread = thread::Builder::new()
            .name(format!("{thread_name}-timer"))
            .spawn(move || driver.run())?;

        Ok((TimerHandle { transmitter }, thread))
    }

    fn new(receiver: Receiver<Command>) -> Self {
        Self {
            receiver,
            timers: BinaryHeap::new(),
            compact_at: MIN_COMPACT_LEN,
        }
    }

    /// Runs the timer loop until a shutdown command arrives or every
    /// handle has been dropped.
    fn run(&mut self) {
        tracing::trace!("timer thread started");

        loop {
            self.prune_cancelled_head();

            let command = match self.timers.peek() {
                Some(next) => {
                    let wait = next.deadline.saturating_duration_since(Instant::now());
                    match self.receiver.recv_timeout(wait) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.receiver.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            match command {
                Some(Command::SetTimer {
                    deadline,
                    waker,
                    cancelled,
                }) => self.insert(TimerEntry {
                    deadline,
                    waker,
                    cancelled,
                }),
                Some(Command::Shutdown) => break,
                None => {}
            }

            self.fire_expired();
        }

        tracing::trace!(pending = self.timers.len(), "timer thread stopped");
    }

    /// Adds a timer, sweeping out cancelled entries once the heap has
    /// doubled since the last sweep.
    fn insert(&mut self, entry: TimerEntry) {
        self.timers.push(entry);

        if self.timers.len() < self.compact_at {
            return;
        }

        let before = self.timers.len();
        self.timers.retain(|timer| !timer.cancelled.load(Ordering::Acquire));
        self.compact_at = (self.timers.len() * 2).max(MIN_COMPACT_LEN);

        tracing::trace!(
            removed = before - self.timers.len(),
            pending = self.timers.len(),
            "cancelled timers swept"
        );
    }

    /// Drops cancelled entries sitting at the top of the heap so the loop
    /// never waits on a deadline nobody cares about.
    fn prune_cancelled_head(&mut self) {
        while self
            .timers
            .peek()
            .is_some_and(|timer| timer.cancelled.load(Ordering::Acquire))
        {
            self.timers.pop();
        }
    }

    /// Wakes every non-cancelled timer whose deadline has passed.
    fn fire_expired(&mut self) {
        let now = Instant::now();

        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now {
                break;
            }

            let Some(timer) = self.timers.pop() else {
                break;
            };

            if timer.cancelled.load(Ordering::Acquire) {
                continue;
            }

            timer.waker.wake();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::task::Waker;
    use std::time::Duration;

    fn entry(deadline: Instant) -> (TimerEntry, Arc<AtomicBool>) {
        let cancelled = Arc::new(AtomicBool::new(false));
        let entry = TimerEntry {
            deadline,
            waker: Waker::noop().clone(),
            cancelled: cancelled.clone(),
        };
        (entry, cancelled)
    }

    #[test]
    fn cancelled_timers_do_not_accumulate() {
        let (_transmitter, receiver) = channel();
        let mut driver = TimerDriver::new(receiver);
        let far = Instant::now() + Duration::from_secs(3600);

        let (live, _) = entry(far);
        driver.insert(live);

        for _ in 0..10_000 {
            let (timer, cancelled) = entry(far);
            driver.insert(timer);
            cancelled.store(true, Ordering::Release);
        }

        assert!(driver.timers.len() <= 2 * MIN_COMPACT_LEN);
        assert!(
            driver
                .timers
                .iter()
                .any(|timer| !timer.cancelled.load(Ordering::Acquire))
        );
    }

    #[test]
    fn cancelled_head_is_pruned() {
        let (_transmitter, receiver) = channel();
        let mut driver = TimerDriver::new(receiver);
        let now = Instant::now();

        let (soon, cancelled) = entry(now + Duration::from_millis(1));
        let (later, _) = entry(now + Duration::from_secs(60));
        driver.insert(soon);
        driver.insert(later);

        cancelled.store(true, Ordering::Release);
        driver.prune_cancelled_head();

        assert_eq!(driver.timers.len(), 1);
        assert_eq!(
            driver.timers.peek().map(|timer| timer.deadline),
            Some(now + Duration::from_secs(60))
        );
    }
}
