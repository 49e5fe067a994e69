use super::id::TaskId;
use super::state::{TaskStatus, is_terminal};
use crate::error::TaskResult;
use crate::runtime::task::Task;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// A handle to a spawned task.
///
/// A `TaskHandle` identifies one unit of work and gives access to its
/// outcome slot. It implements [`Future`] and resolves to the task's
/// [`TaskResult`] once the task has finished.
///
/// Dropping the `TaskHandle` does **not** cancel the task; it only
/// discards the ability to observe its result. A failure that nobody
/// observes is reported through the runtime's
/// [`UnobservedFailure`](crate::UnobservedFailure) policy.
pub struct TaskHandle<T: Send + 'static> {
    /// Shared reference to the underlying task.
    pub(crate) task: Arc<Task<T>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    pub(crate) fn new(task: Arc<Task<T>>) -> Self {
        Self { task }
    }

    /// Returns the id of the task.
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// Returns the current lifecycle status of the task.
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_raw(self.task.state.load(Ordering::Acquire))
    }

    /// Returns `true` once the task has completed, failed or been cancelled.
    pub fn is_finished(&self) -> bool {
        is_terminal(self.task.state.load(Ordering::Acquire))
    }

    /// Returns `true` once cancellation has been requested for the task.
    pub fn is_cancel_requested(&self) -> bool {
        self.task.is_cancel_requested()
    }

    /// Cancels the task.
    ///
    /// A pending or suspended task is cancelled immediately: its future is
    /// dropped and awaiting this handle yields
    /// [`TaskError::Cancelled`](crate::TaskError::Cancelled). A running task
    /// is only flagged; it can observe the flag through
    /// [`is_cancelled`](crate::task::is_cancelled) and is cancelled at its
    /// next suspension point. Cancelling a finished task does nothing, and
    /// cancelling twice is the same as cancelling once.
    pub fn cancel(&self) {
        tracing::debug!(task = %self.task.id, "cancel requested");
        self.task.cancel();
    }

    /// Takes the result out of the slot once the task is terminal.
    fn try_take(&self) -> Option<TaskResult<T>> {
        if !is_terminal(self.task.state.load(Ordering::Acquire)) {
            return None;
        }

        // Safety: the terminal state is published after the slot is written,
        // and only the (unique) handle ever takes the value.
        let value = unsafe { (*self.task.result.get()).take() };
        Some(value.expect("TaskHandle polled after completion"))
    }
}

impl<T: Send + 'static> Future for TaskHandle<T> {
    /// The outcome of the spawned task.
    type Output = TaskResult<T>;

    /// Polls the handle.
    ///
    /// If the task has already finished, its result is returned
    /// immediately. Otherwise, the current waker is registered and
    /// the future returns `Poll::Pending`.
    ///
    /// The waker is registered **before** re-checking the task state
    /// to avoid missed wake-ups.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.try_take() {
            return Poll::Ready(result);
        }

        {
            let mut waiters = self.task.waiters.lock();
            if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                waiters.push(cx.waker().clone());
            }
        }

        match self.try_take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

impl<T: Send + 'static> Drop for TaskHandle<T> {
    fn drop(&mut self) {
        self.task.detach();
    }
}

impl<T: Send + 'static> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.task.id)
            .field("status", &self.status())
            .finish()
    }
}
