use crate::runtime::context::CURRENT_WORKER_ID;
use crate::runtime::queue::ReadyQueueHandle;

/// A worker thread in the executor.
///
/// A worker repeatedly takes the oldest ready task from the shared queue
/// and polls it once. Tasks are never pinned to a worker: a task woken
/// after suspending goes to the back of the queue and may be resumed by
/// any worker.
pub(crate) struct Worker {
    /// Unique identifier of the worker.
    id: usize,

    /// The ready queue shared by all workers.
    queue: ReadyQueueHandle,
}

impl Worker {
    pub(crate) fn new(id: usize, queue: ReadyQueueHandle) -> Self {
        Self { id, queue }
    }

    /// Runs the worker loop until the queue is shut down.
    ///
    /// # Execution loop
    ///
    /// - Pop the oldest ready task and poll it once
    /// - Otherwise, park until work becomes available
    pub(crate) fn run(&self) {
        CURRENT_WORKER_ID.with(|id| id.set(Some(self.id)));
        tracing::trace!(worker = self.id, "worker started");

        while !self.queue.is_shutdown() {
            match self.queue.pop() {
                Some(task) => task.run(),
                None => self.queue.park(),
            }
        }

        CURRENT_WORKER_ID.with(|id| id.set(None));
        tracing::trace!(worker = self.id, "worker stopped");
    }
}
