use crate::runtime::task::Runnable;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Upper bound on how long an idle worker sleeps before re-checking
/// the shutdown flag.
const PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// Shared handle to the ready queue.
pub(crate) type ReadyQueueHandle = Arc<ReadyQueue>;

/// The scheduler's ready queue.
///
/// Every runnable task (freshly spawned or woken) is pushed to the back
/// and workers pop from the front, so ready tasks run in FIFO order with
/// no priorities. With several workers the queue is the single point of
/// hand-off between them.
///
/// It also coordinates worker parking: idle workers wait on a condition
/// variable tied to the queue lock, so a push can never slip between the
/// emptiness check and the wait.
pub(crate) struct ReadyQueue {
    /// Tasks ready to be polled.
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,

    /// Condition variable used to wake parked workers.
    condvar: Condvar,

    /// Indicates whether the executor is shutting down.
    shutdown: AtomicBool,
}

impl ReadyQueue {
    /// Creates a new empty queue.
    pub(crate) fn new() -> Self {
        ReadyQueue {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Signals shutdown, wakes all parked workers and releases every
    /// queued task.
    ///
    /// Tasks hold a handle to this queue, so draining it here breaks the
    /// reference cycle between the queue and the tasks it stores.
    pub(crate) fn shutdown(&self) {
        let drained: Vec<_> = {
            let mut queue = self.queue.lock();
            self.shutdown.store(true, Ordering::Release);
            queue.drain(..).collect()
        };
        self.condvar.notify_all();

        drop(drained);
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Pushes a task at the back of the queue and wakes one parked worker.
    ///
    /// Returns `false` (and drops the task) once the queue is shut down.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) -> bool {
        let mut queue = self.queue.lock();

        if self.is_shutdown() {
            return false;
        }

        queue.push_back(task);
        drop(queue);

        self.condvar.notify_one();
        true
    }

    /// Pops the oldest ready task.
    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        self.queue.lock().pop_front()
    }

    /// Parks the current worker until work becomes available, shutdown is
    /// requested, or the park timeout elapses.
    pub(crate) fn park(&self) {
        let mut queue = self.queue.lock();

        if !queue.is_empty() || self.is_shutdown() {
            return;
        }

        let _ = self.condvar.wait_for(&mut queue, PARK_TIMEOUT);
    }

    /// Number of tasks currently waiting to run.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    struct Probe {
        id: usize,
        log: Arc<PlMutex<Vec<usize>>>,
    }

    impl Runnable for Probe {
        fn run(self: Arc<Self>) {
            self.log.lock().push(self.id);
        }
    }

    #[test]
    fn pops_in_push_order() {
        let queue = ReadyQueue::new();
        let log = Arc::new(PlMutex::new(Vec::new()));

        for id in 0..4 {
            assert!(queue.push(Arc::new(Probe {
                id,
                log: log.clone(),
            })));
        }

        while let Some(task) = queue.pop() {
            task.run();
        }

        assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn shutdown_drops_queued_tasks_and_rejects_new_ones() {
        let queue = ReadyQueue::new();
        let log = Arc::new(PlMutex::new(Vec::new()));

        queue.push(Arc::new(Probe {
            id: 1,
            log: log.clone(),
        }));
        queue.shutdown();

        assert!(!queue.push(Arc::new(Probe { id: 2, log })));

        assert_eq!(queue.len(), 0);
        assert!(queue.is_shutdown());
        queue.park();
    }
}
