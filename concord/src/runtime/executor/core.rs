use crate::runtime::context::{Handle, enter_context};
use crate::runtime::executor::worker::Worker;
use crate::runtime::queue::ReadyQueueHandle;

use std::io;
use std::thread::{self, JoinHandle};

/// Task executor.
///
/// The `Executor` is responsible for:
/// - spawning worker threads,
/// - installing the runtime context on each of them,
/// - managing orderly shutdown and thread joining.
///
/// All workers pull from the same ready queue. With a single worker this
/// is a cooperative, strictly FIFO scheduler; with more, ready tasks still
/// start in FIFO order but run in parallel.
pub(crate) struct Executor {
    /// The ready queue shared by all workers.
    queue: ReadyQueueHandle,

    /// Join handles for worker threads.
    handles: Vec<JoinHandle<()>>,
}

impl Executor {
    /// Creates a new executor with the given number of worker threads.
    ///
    /// Worker `n` is named `{thread_name}-{n}`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be spawned. Workers
    /// started before the failure are shut down and joined.
    pub(crate) fn new(handle: Handle, threads: usize, thread_name: &str) -> io::Result<Self> {
        let queue = handle.queue.clone();
        let mut executor = Self {
            queue,
            handles: Vec::with_capacity(threads),
        };

        for id in 0..threads {
            let worker = Worker::new(id, executor.queue.clone());
            let handle = handle.clone();

            let spawned = thread::Builder::new()
                .name(format!("{thread_name}-{id}"))
                .spawn(move || enter_context(handle, || worker.run()));

            match spawned {
                Ok(join) => executor.handles.push(join),
                Err(err) => {
                    executor.shutdown();
                    executor.join();
                    return Err(err);
                }
            }
        }

        Ok(executor)
    }

    /// Signals all workers to shut down.
    ///
    /// Queued tasks are released without being polled; their handles will
    /// never resolve.
    pub(crate) fn shutdown(&self) {
        self.queue.shutdown();
    }

    /// Waits for all worker threads to terminate.
    ///
    /// This should be called after initiating shutdown.
    pub(crate) fn join(&mut self) {
        for h in self.handles.drain(..) {
            let _ = h.join();
        }
    }

    /// Number of worker threads still attached to the executor.
    pub(crate) fn worker_count(&self) -> usize {
        self.handles.len()
    }
}
