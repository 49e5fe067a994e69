use super::TaskHandle;
use super::id::{GroupId, TaskId};
use super::state::{CANCELLED, CANCELLING, COMPLETED, FAILED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::error::{TaskError, TaskResult};
use crate::runtime::builder::UnobservedFailure;
use crate::runtime::context::{self, Handle, TaskContext};
use crate::runtime::queue::ReadyQueueHandle;

use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};

/// A runnable unit of work that can be executed by the scheduler.
///
/// The `Runnable` trait abstracts the specific return type of a task,
/// allowing the ready queue to hold a heterogeneous collection of tasks
/// through `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    /// Polls the task once. Called by a worker thread.
    fn run(self: Arc<Self>);
}

/// Receives the failure of a child task.
///
/// Implemented by task groups so that a failing child can close its group
/// and cancel its siblings without waiting for `join` to be polled.
pub(crate) trait ChildObserver: Send + Sync {
    fn child_failed(&self, id: TaskId);
}

/// A task's reference to the group that registered it.
pub(crate) struct GroupLink {
    pub(crate) id: GroupId,
    pub(crate) observer: Weak<dyn ChildObserver>,
}

/// Boxed work future driven by a task.
type Work<T> = Pin<Box<dyn Future<Output = TaskResult<T>> + Send>>;

/// A spawned asynchronous task managed by the runtime.
///
/// A `Task` owns the work future and coordinates its lifecycle: execution
/// state, cancellation, waker registration and the result slot.
///
/// Whoever claims the task (a worker moving it to `RUNNING`, or `cancel`
/// moving an idle task to `CANCELLING`) has exclusive access to `future`
/// and `result` until it publishes the next state. A `CANCELLING` task is
/// never re-claimed, so the result slot is written at most once.
pub(crate) struct Task<T> {
    pub(crate) id: TaskId,

    /// The work, dropped as soon as the task reaches a terminal state.
    future: UnsafeCell<Option<Work<T>>>,

    /// Written exactly once, before the terminal state is published.
    pub(crate) result: UnsafeCell<Option<TaskResult<T>>>,

    /// The current lifecycle state (see `state.rs`).
    pub(crate) state: AtomicUsize,

    /// Set by `cancel`; observed at the task's next suspension point.
    cancel_requested: Arc<AtomicBool>,

    /// Set when the handle is dropped without taking the result.
    detached: AtomicBool,

    /// Ensures an unobserved failure is reported at most once.
    reported: AtomicBool,

    /// Ready queue the task is pushed to when woken.
    queue: ReadyQueueHandle,

    unobserved: UnobservedFailure,

    /// Wakers of the futures awaiting this task's result.
    pub(crate) waiters: Mutex<Vec<Waker>>,

    /// Parent group, if the task was registered through one.
    group: Option<GroupLink>,
}

// Safety: `future` and `result` are only touched by the party holding the
// RUNNING or CANCELLING claim, or read after the terminal state was published.
unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    /// Creates a new task in the `QUEUED` state.
    pub(crate) fn new<F>(future: F, handle: &Handle, group: Option<GroupLink>) -> Self
    where
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        Self {
            id: TaskId::next(),
            future: UnsafeCell::new(Some(Box::pin(future))),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            detached: AtomicBool::new(false),
            reported: AtomicBool::new(false),
            queue: handle.queue.clone(),
            unobserved: handle.unobserved,
            waiters: Mutex::new(Vec::new()),
            group,
        }
    }

    /// Polls the task once.
    ///
    /// - A cancellation requested before the poll finalizes the task
    ///   without polling it.
    /// - `Poll::Ready` stores the result and wakes every awaiter.
    /// - `Poll::Pending` is a suspension point: a pending cancellation is
    ///   honored here, otherwise the task parks (or is re-queued if it was
    ///   woken while running).
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if self.cancel_requested.load(Ordering::Acquire) {
            self.finish(Err(TaskError::Cancelled));
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);
        let task_cx = TaskContext {
            id: self.id,
            cancel_requested: self.cancel_requested.clone(),
        };

        tracing::trace!(task = %self.id, "poll");

        let poll = context::enter_task(task_cx, || {
            // Safety: the RUNNING claim guarantees exclusive access.
            let Some(future) = (unsafe { &mut *self.future.get() }).as_mut() else {
                return Poll::Pending;
            };

            panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)))
                .unwrap_or_else(|payload| Poll::Ready(Err(TaskError::from_panic(payload))))
        });

        match poll {
            Poll::Ready(result) => self.finish(result),
            Poll::Pending => {
                if self.cancel_requested.load(Ordering::Acquire) {
                    self.finish(Err(TaskError::Cancelled));
                    return;
                }

                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    // Woken while running: go straight back to the queue.
                    self.state.store(QUEUED, Ordering::Release);
                    self.enqueue();
                }
            }
        }
    }

    /// Signals the task to be rescheduled.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and is pushed to the
    /// ready queue. If it is `RUNNING`, it moves to `NOTIFIED` so it is
    /// re-queued once the current poll returns.
    pub(crate) fn schedule(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.enqueue();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Requests cancellation of the task.
    ///
    /// - Pending or suspended tasks are claimed and finalized right away:
    ///   their future is dropped and awaiters receive [`TaskError::Cancelled`].
    /// - Running tasks only get the flag set; they are cancelled at their
    ///   next suspension point, or keep their result if they finish first.
    /// - Finished tasks are left untouched.
    ///
    /// Calling this more than once has the same effect as calling it once.
    pub(crate) fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);

        loop {
            match self.state.load(Ordering::Acquire) {
                state @ (IDLE | QUEUED) => {
                    // A queued task stays in the ready queue; the worker
                    // that pops it skips the CANCELLING state.
                    if self
                        .state
                        .compare_exchange(state, CANCELLING, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.finish(Err(TaskError::Cancelled));
                        return;
                    }
                }
                RUNNING => {
                    // Force a re-queue so the flag is seen even if the
                    // current poll already checked it.
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Returns `true` once cancellation has been requested.
    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Marks the task as detached from its handle.
    ///
    /// A failure that is already stored, or that is stored later, is then
    /// reported as unobserved.
    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);

        if self.state.load(Ordering::SeqCst) == FAILED {
            self.report_unobserved();
        }
    }

    fn enqueue(self: &Arc<Self>) {
        if !self.queue.push(self.clone()) {
            // The runtime is gone; nothing will ever poll this task again.
            self.cancel();
        }
    }

    /// Stores the result and publishes the terminal state.
    ///
    /// Must only be called by the party holding the RUNNING or CANCELLING
    /// claim. The future is dropped before the state is published, so
    /// awaiters never observe the result while its resources are alive.
    fn finish(&self, result: TaskResult<T>) {
        // Safety: the caller holds the claim.
        let future = unsafe { (*self.future.get()).take() };

        // Dropping the work releases everything it owned; a panicking
        // destructor must not take the worker down with it.
        if panic::catch_unwind(AssertUnwindSafe(move || drop(future))).is_err() {
            tracing::error!(task = %self.id, "task future panicked while being dropped");
        }

        let state = match &result {
            Ok(_) => COMPLETED,
            Err(TaskError::Cancelled) => CANCELLED,
            Err(_) => FAILED,
        };

        match &result {
            Ok(_) => tracing::debug!(task = %self.id, "task completed"),
            Err(err) => tracing::debug!(task = %self.id, outcome = err.as_label(), "task finished"),
        }

        // Safety: the slot is written once, before the state is published.
        unsafe {
            *self.result.get() = Some(result);
        }
        self.state.store(state, Ordering::SeqCst);

        let waiters = mem::take(&mut *self.waiters.lock());
        for waker in waiters {
            waker.wake();
        }

        if state != FAILED {
            return;
        }

        if let Some(link) = &self.group {
            if let Some(observer) = link.observer.upgrade() {
                tracing::trace!(task = %self.id, group = %link.id, "reporting failure to group");
                observer.child_failed(self.id);
            }
        }

        if self.detached.load(Ordering::SeqCst) {
            self.report_unobserved();
        }
    }

    /// Reports a failure nobody will ever await, according to the
    /// runtime's [`UnobservedFailure`] policy.
    fn report_unobserved(&self) {
        if self.reported.swap(true, Ordering::AcqRel) {
            return;
        }

        // Safety: the terminal state was observed, so the slot is written,
        // and the handle is gone, so nobody takes it concurrently.
        let Some(Err(err)) = (unsafe { &*self.result.get() }).as_ref() else {
            return;
        };

        tracing::error!(
            task = %self.id,
            error = %err,
            label = err.as_label(),
            "task failed and its result was never awaited"
        );

        if self.unobserved == UnobservedFailure::Abort {
            std::process::abort();
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        Task::run(self)
    }
}

/// Spawns a unit of work as a task onto the current runtime.
///
/// The task starts `Pending` at the back of the ready queue; `spawn`
/// never blocks. The returned [`TaskHandle`] resolves to the work's
/// result, to [`TaskError::OperationFailed`] if the work panics, or to
/// [`TaskError::Cancelled`].
///
/// Dropping the handle does **not** cancel the task. If a detached task
/// fails, the failure is logged and goes nowhere else.
///
/// # Panics
/// Panics if called outside the context of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let handle = task::spawn(async { Ok(21 * 2) });
/// assert_eq!(handle.await?, 42);
/// ```
pub fn spawn<F, T>(work: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: Future<Output = TaskResult<T>> + Send + 'static,
{
    let handle = context::current_handle("spawn");
    spawn_on(&handle, work, None)
}

/// Spawns `work` onto the runtime behind `handle`, optionally registered
/// with a parent group.
pub(crate) fn spawn_on<F, T>(handle: &Handle, work: F, group: Option<GroupLink>) -> TaskHandle<T>
where
    T: Send + 'static,
    F: Future<Output = TaskResult<T>> + Send + 'static,
{
    let task = Arc::new(Task::new(work, handle, group));

    match &task.group {
        Some(link) => tracing::debug!(task = %task.id, group = %link.id, "task spawned"),
        None => tracing::debug!(task = %task.id, "task spawned"),
    }

    task.enqueue();

    TaskHandle::new(task)
}
