use crate::runtime::builder::UnobservedFailure;
use crate::runtime::queue::ReadyQueueHandle;
use crate::runtime::task::TaskId;
use crate::timer::TimerHandle;

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything a task needs to reach the runtime it runs on.
#[derive(Clone)]
pub(crate) struct Handle {
    /// The scheduler's ready queue.
    pub(crate) queue: ReadyQueueHandle,

    /// Handle to the timer thread.
    pub(crate) timer: TimerHandle,

    /// Policy applied to failures nobody awaits.
    pub(crate) unobserved: UnobservedFailure,
}

/// Identity and cancellation flag of the task being polled.
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub(crate) id: TaskId,
    pub(crate) cancel_requested: Arc<AtomicBool>,
}

thread_local! {
    /// Thread-local handle to the current runtime.
    ///
    /// This is set when entering the runtime context and allows
    /// runtime components (spawn, timers, mailboxes) to reach the
    /// scheduler without explicit parameter passing.
    pub(crate) static CURRENT_HANDLE: RefCell<Option<Handle>> =
        const { RefCell::new(None) };

    /// Thread-local identifier of the current worker thread.
    pub(crate) static CURRENT_WORKER_ID: Cell<Option<usize>> =
        const { Cell::new(None) };

    /// The task currently polled on this thread, if any.
    pub(crate) static CURRENT_TASK: RefCell<Option<TaskContext>> =
        const { RefCell::new(None) };
}

/// Enters the runtime execution context for the current thread.
///
/// This function temporarily installs the runtime handle for the duration
/// of the closure `f`. After the closure completes, the previous context is
/// restored.
pub(crate) fn enter_context<R>(handle: Handle, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_HANDLE.with(|h| h.replace(Some(handle)));
    let out = f();
    CURRENT_HANDLE.with(|h| h.replace(prev));

    out
}

/// Marks `task` as the one being polled while `f` runs.
pub(crate) fn enter_task<R>(task: TaskContext, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_TASK.with(|t| t.replace(Some(task)));
    let out = f();
    CURRENT_TASK.with(|t| t.replace(prev));

    out
}

/// Runs `f` with the current runtime handle, or returns `None` outside of
/// a runtime.
pub(crate) fn with_handle<R>(f: impl FnOnce(&Handle) -> R) -> Option<R> {
    CURRENT_HANDLE.with(|h| h.borrow().as_ref().map(f))
}

/// Returns a clone of the current runtime handle.
///
/// # Panics
///
/// Panics if called outside the context of a running runtime.
pub(crate) fn current_handle(what: &str) -> Handle {
    with_handle(Handle::clone)
        .unwrap_or_else(|| panic!("{what} must be called within the context of a runtime"))
}

/// Returns `true` on executor worker threads.
pub(crate) fn on_worker_thread() -> bool {
    CURRENT_WORKER_ID.with(|id| id.get().is_some())
}

/// Returns the context of the task currently being polled.
pub(crate) fn current_task() -> Option<TaskContext> {
    CURRENT_TASK.with(|t| t.borrow().clone())
}

/// Returns `true` if cancellation was requested for the current task.
///
/// Always `false` outside of a task.
pub(crate) fn current_task_cancelled() -> bool {
    CURRENT_TASK.with(|t| {
        t.borrow()
            .as_ref()
            .is_some_and(|task| task.cancel_requested.load(Ordering::Acquire))
    })
}
