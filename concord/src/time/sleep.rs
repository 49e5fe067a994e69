use crate::runtime::context;
use crate::timer::Command;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Suspends the calling task for at least `duration`.
///
/// The timer is registered with the runtime's timer thread on first poll.
/// The task is not polled again until the deadline passes, or until it is
/// cancelled, in which case the sleep is dropped and its timer discarded.
///
/// # Panics
///
/// Panics if polled outside of a running runtime.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// time::sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    sleep_until(Instant::now() + duration)
}

/// Suspends the calling task until `deadline`.
///
/// A deadline in the past completes on first poll without suspending.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        registration: None,
    }
}

/// A timer registered with the timer thread.
struct Registration {
    /// Set to discard the timer entry without waking anyone.
    cancelled: Arc<AtomicBool>,

    /// Waker the entry will wake.
    waker: Waker,
}

impl Registration {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Future returned by [`sleep`] and [`sleep_until`].
///
/// Dropping a `Sleep` before it completes cancels its timer.
pub struct Sleep {
    deadline: Instant,
    registration: Option<Registration>,
}

impl Sleep {
    /// Returns the instant at which the sleep completes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns `true` once the deadline has passed.
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn register(&mut self, waker: &Waker) {
        if let Some(old) = self.registration.take() {
            old.cancel();
        }

        let cancelled = Arc::new(AtomicBool::new(false));

        context::current_handle("sleep").timer.send(Command::SetTimer {
            deadline: self.deadline,
            waker: waker.clone(),
            cancelled: cancelled.clone(),
        });

        self.registration = Some(Registration {
            cancelled,
            waker: waker.clone(),
        });
    }
}

impl Future for Sleep {
    type Output = ();

    /// Completes once the deadline has passed.
    ///
    /// If the future is polled again with a different waker (it moved to
    /// another task), the timer is re-registered for the new waker.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.is_elapsed() {
            if let Some(registration) = this.registration.take() {
                registration.cancel();
            }
            return Poll::Ready(());
        }

        let stale = this
            .registration
            .as_ref()
            .is_none_or(|registration| !registration.waker.will_wake(cx.waker()));

        if stale {
            this.register(cx.waker());
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration.cancel();
        }
    }
}
