use super::id::TaskId;
use crate::error::{TaskError, TaskResult};
use crate::runtime::context;
use crate::runtime::yield_now::yield_now;

/// Returns `true` if cancellation was requested for the calling task.
///
/// Cancelling a running task is advisory: long computations that do not
/// suspend should poll this flag and bail out. Outside of a task this
/// always returns `false`.
pub fn is_cancelled() -> bool {
    context::current_task_cancelled()
}

/// Returns the id of the task currently being polled on this thread.
pub fn current_id() -> Option<TaskId> {
    context::current_task().map(|task| task.id)
}

/// An explicit suspension point with a cancellation check.
///
/// Yields once to the scheduler so other ready tasks can run, then
/// returns [`TaskError::Cancelled`] if the calling task was cancelled,
/// so work can unwind with `?`:
///
/// ```rust,ignore
/// for chunk in chunks {
///     process(chunk);
///     task::checkpoint().await?;
/// }
/// ```
pub async fn checkpoint() -> TaskResult<()> {
    if is_cancelled() {
        return Err(TaskError::Cancelled);
    }

    yield_now().await;

    if is_cancelled() {
        return Err(TaskError::Cancelled);
    }

    Ok(())
}
