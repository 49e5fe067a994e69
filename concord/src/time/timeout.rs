use super::sleep::{Sleep, sleep};
use crate::error::TaskError;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Error returned by [`timeout`] when the deadline passes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline has elapsed")]
pub struct Elapsed(());

impl From<Elapsed> for TaskError {
    /// A timed-out operation counts as a failure of the task awaiting it.
    fn from(elapsed: Elapsed) -> Self {
        TaskError::failed(elapsed)
    }
}

/// Requires `future` to complete within `duration`.
///
/// If the deadline passes first, the future is dropped and [`Elapsed`] is
/// returned. The future is always polled before the deadline is checked,
/// so one that is already ready wins even with a zero duration.
///
/// # Panics
///
/// Panics if polled outside of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let reply = time::timeout(Duration::from_secs(1), mailbox.enqueue(|s| Ok(s.len()))).await??;
/// ```
pub fn timeout<F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future,
{
    Timeout {
        future: Box::pin(future),
        sleep: sleep(duration),
    }
}

/// Future returned by [`timeout`].
pub struct Timeout<F: Future> {
    future: Pin<Box<F>>,
    sleep: Sleep,
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output, Elapsed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Poll::Ready(value) = self.future.as_mut().poll(cx) {
            return Poll::Ready(Ok(value));
        }

        if Pin::new(&mut self.sleep).poll(cx).is_ready() {
            return Poll::Ready(Err(Elapsed(())));
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_converts_to_a_failure() {
        let err: TaskError = Elapsed(()).into();

        assert!(err.is_failure());
        assert_eq!(err.as_label(), "task_failed");
        assert!(err.to_string().contains("deadline has elapsed"));
    }
}
