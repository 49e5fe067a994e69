/// Task is suspended and not scheduled.
///
/// The task has been polled at least once and is waiting for a wakeup.
pub(crate) const IDLE: usize = 0;

/// Task is queued for execution.
///
/// The task sits in the ready queue, either freshly spawned or woken.
pub(crate) const QUEUED: usize = 1;

/// Task is currently being executed by a worker.
///
/// At most one worker may observe this state at a time.
pub(crate) const RUNNING: usize = 2;

/// Task has completed successfully.
///
/// The future has returned `Poll::Ready(Ok(_))` and will not be polled again.
pub(crate) const COMPLETED: usize = 3;

/// Task has been notified while running.
///
/// This state indicates that the task was woken while already
/// executing and should be re-queued once execution finishes.
pub(crate) const NOTIFIED: usize = 4;

/// Task was cancelled before it could finish.
pub(crate) const CANCELLED: usize = 5;

/// Task terminated with an error or a panic.
pub(crate) const FAILED: usize = 6;

/// Task was claimed by `cancel` and is being torn down.
///
/// Nothing moves a task out of this state except the terminal store
/// published by the canceller. Workers that pop it skip it.
pub(crate) const CANCELLING: usize = 7;

/// Returns `true` once the result slot has been written.
pub(crate) fn is_terminal(state: usize) -> bool {
    matches!(state, COMPLETED | CANCELLED | FAILED)
}

/// Observable lifecycle of a task.
///
/// ```text
/// Pending ──► Running ──► Completed | Failed
///    ▲           │
///    │           ▼
///    └──────  Suspended
///
/// Pending | Suspended ──cancel──► Cancelled
/// Running ──cancel──► (flag) ──next suspension──► Cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Waiting in the ready queue.
    Pending,
    /// Being polled by a worker.
    Running,
    /// Parked until something wakes it.
    Suspended,
    /// Finished with a value.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before finishing.
    Cancelled,
}

impl TaskStatus {
    pub(crate) fn from_raw(state: usize) -> Self {
        match state {
            IDLE => TaskStatus::Suspended,
            QUEUED => TaskStatus::Pending,
            RUNNING | NOTIFIED | CANCELLING => TaskStatus::Running,
            COMPLETED => TaskStatus::Completed,
            FAILED => TaskStatus::Failed,
            _ => TaskStatus::Cancelled,
        }
    }

    /// Returns `true` for `Completed`, `Failed` and `Cancelled`.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}
