use crate::error::{TaskError, TaskResult};

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

struct Slot<R> {
    value: Option<TaskResult<R>>,
    waker: Option<Waker>,
    done: bool,
}

/// Creates a connected sender/reply pair.
pub(crate) fn channel<R>() -> (ReplySender<R>, Reply<R>) {
    let slot = Arc::new(Mutex::new(Slot {
        value: None,
        waker: None,
        done: false,
    }));

    (ReplySender { slot: slot.clone() }, Reply { slot })
}

/// Writing half of a [`Reply`], carried by the queued operation.
///
/// Dropping it without sending resolves the reply to
/// [`TaskError::MailboxClosed`]: the operation will never run.
pub(crate) struct ReplySender<R> {
    slot: Arc<Mutex<Slot<R>>>,
}

impl<R> ReplySender<R> {
    pub(crate) fn send(self, outcome: TaskResult<R>) {
        self.complete(outcome);
    }

    fn complete(&self, outcome: TaskResult<R>) {
        let waker = {
            let mut slot = self.slot.lock();

            if slot.done {
                return;
            }

            slot.value = Some(outcome);
            slot.done = true;
            slot.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<R> Drop for ReplySender<R> {
    fn drop(&mut self) {
        self.complete(Err(TaskError::MailboxClosed));
    }
}

/// The pending outcome of one mailbox operation.
///
/// Resolves to the value the operation returned, to
/// [`TaskError::OperationFailed`] if it failed or panicked, or to
/// [`TaskError::MailboxClosed`] if the mailbox never ran it.
///
/// Dropping a `Reply` does not withdraw the operation; it still runs in
/// order, and its outcome is discarded.
#[must_use = "a Reply does nothing unless awaited; the operation runs regardless"]
pub struct Reply<R> {
    slot: Arc<Mutex<Slot<R>>>,
}

impl<R> Reply<R> {
    /// Returns `true` once the operation has run (or been discarded).
    pub fn is_ready(&self) -> bool {
        self.slot.lock().done
    }
}

impl<R> Future for Reply<R> {
    type Output = TaskResult<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();

        if slot.done {
            let value = slot.value.take();
            return Poll::Ready(value.expect("Reply polled after completion"));
        }

        match &slot.waker {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            _ => slot.waker = Some(cx.waker().clone()),
        }

        Poll::Pending
    }
}

impl<R> fmt::Debug for Reply<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Waker;

    fn poll_now<R>(reply: &mut Reply<R>) -> Poll<TaskResult<R>> {
        let mut cx = Context::from_waker(Waker::noop());
        Pin::new(reply).poll(&mut cx)
    }

    #[test]
    fn sent_value_resolves_the_reply() {
        let (sender, mut reply) = channel();

        assert!(poll_now(&mut reply).is_pending());
        sender.send(Ok(7));

        assert!(reply.is_ready());
        assert!(matches!(poll_now(&mut reply), Poll::Ready(Ok(7))));
    }

    #[test]
    fn dropped_sender_resolves_to_mailbox_closed() {
        let (sender, mut reply) = channel::<u32>();
        drop(sender);

        assert!(matches!(
            poll_now(&mut reply),
            Poll::Ready(Err(TaskError::MailboxClosed))
        ));
    }
}
