use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Suspends once, waking itself before returning `Pending`.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yields execution back to the scheduler.
///
/// The calling task goes to the back of the ready queue, so every task
/// that was already ready runs before it resumes. This is also a
/// suspension point: a cancellation requested while the task was running
/// takes effect here.
///
/// # Examples
///
/// ```rust,ignore
/// for item in batch {
///     process(item);
///     // Let other tasks make progress between items.
///     task::yield_now().await;
/// }
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
