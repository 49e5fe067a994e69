//! Error types produced by tasks, groups and mailboxes.
//!
//! Every fallible operation of the runtime resolves to a [`TaskResult`].
//! Errors only surface to the direct awaiter of the failed work: the
//! [`TaskHandle`](crate::task::TaskHandle) of a task, the `join` of a
//! [`TaskGroup`](crate::task::TaskGroup), or the [`Reply`](crate::actor::Reply)
//! of a mailbox operation.

use std::any::Any;
use std::error::Error as StdError;

use thiserror::Error;

/// Boxed, thread-safe error used as the cause of a failed operation.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result of a unit of work run by the runtime.
pub type TaskResult<T> = Result<T, TaskError>;

/// # Errors produced by task execution.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The task (or one of the group's children) was cancelled before or
    /// while running.
    #[error("task cancelled")]
    Cancelled,

    /// The work function returned an error or panicked.
    #[error("operation failed: {cause}")]
    OperationFailed {
        /// The error raised by the work.
        #[source]
        cause: BoxError,
    },

    /// A child was added to a group that no longer accepts children.
    #[error("task group is closed")]
    GroupClosed,

    /// An operation was sent to a mailbox that is closed, or was dropped
    /// before the mailbox could run it.
    #[error("mailbox is closed")]
    MailboxClosed,
}

impl TaskError {
    /// Builds an [`TaskError::OperationFailed`] from any error-like cause.
    ///
    /// # Example
    /// ```
    /// use concord::TaskError;
    ///
    /// let err = TaskError::failed("disk on fire");
    /// assert_eq!(err.to_string(), "operation failed: disk on fire");
    /// ```
    pub fn failed(cause: impl Into<BoxError>) -> Self {
        TaskError::OperationFailed {
            cause: cause.into(),
        }
    }

    /// Returns `true` for [`TaskError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// Returns `true` for [`TaskError::OperationFailed`].
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskError::OperationFailed { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Cancelled => "task_cancelled",
            TaskError::OperationFailed { .. } => "task_failed",
            TaskError::GroupClosed => "group_closed",
            TaskError::MailboxClosed => "mailbox_closed",
        }
    }

    /// Converts a panic payload caught with `catch_unwind` into a failure.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        TaskError::failed(format!("panicked: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn labels_are_stable() {
        assert_eq!(TaskError::Cancelled.as_label(), "task_cancelled");
        assert_eq!(TaskError::failed("x").as_label(), "task_failed");
        assert_eq!(TaskError::GroupClosed.as_label(), "group_closed");
        assert_eq!(TaskError::MailboxClosed.as_label(), "mailbox_closed");
    }

    #[test]
    fn failure_keeps_its_cause() {
        let err = TaskError::failed(std::io::Error::other("boom"));

        assert!(err.is_failure());
        assert!(!err.is_cancelled());
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".into()));
    }

    #[test]
    fn panic_payloads_become_failures() {
        let err = TaskError::from_panic(Box::new("bad state"));
        assert_eq!(err.to_string(), "operation failed: panicked: bad state");

        let err = TaskError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "operation failed: panicked: owned");

        let err = TaskError::from_panic(Box::new(7_u32));
        assert_eq!(err.to_string(), "operation failed: panicked: unknown panic payload");
    }
}
