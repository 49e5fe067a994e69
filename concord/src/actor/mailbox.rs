use super::reply::{self, Reply};
use crate::error::{TaskError, TaskResult};
use crate::runtime::context;
use crate::runtime::task::{TaskHandle, spawn_on, yield_now};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::poll_fn;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

/// Number of operations the drain task runs before yielding to the
/// scheduler.
const OPS_PER_TURN: usize = 32;

/// Unique identifier of a mailbox, displayed as `mailbox-N`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MailboxId(u64);

impl MailboxId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MailboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mailbox-{}", self.0)
    }
}

/// A queued operation, already bound to its reply.
type Op<S> = Box<dyn FnOnce(&mut S) + Send>;

struct Inbox<S> {
    ops: VecDeque<Op<S>>,
    closed: bool,

    /// Waker of the drain task while it waits for work.
    drain: Option<Waker>,
}

struct Shared<S> {
    id: MailboxId,
    inbox: Mutex<Inbox<S>>,

    /// Live `Mailbox` clones; the last one to go closes the mailbox.
    senders: AtomicUsize,
}

impl<S> Shared<S> {
    /// Takes the next operation, or `None` once closed and empty.
    fn poll_next(&self, cx: &mut Context<'_>) -> Poll<Option<Op<S>>> {
        let mut inbox = self.inbox.lock();

        if let Some(op) = inbox.ops.pop_front() {
            return Poll::Ready(Some(op));
        }

        if inbox.closed {
            return Poll::Ready(None);
        }

        inbox.drain = Some(cx.waker().clone());
        Poll::Pending
    }

    fn close(&self) {
        let waker = {
            let mut inbox = self.inbox.lock();

            if inbox.closed {
                return;
            }

            inbox.closed = true;
            inbox.drain.take()
        };

        tracing::debug!(mailbox = %self.id, "mailbox closed");

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Closes the mailbox and drops every queued operation, resolving their
    /// replies to [`TaskError::MailboxClosed`].
    fn discard(&self) {
        let dropped: Vec<Op<S>> = {
            let mut inbox = self.inbox.lock();
            inbox.closed = true;
            inbox.drain = None;
            inbox.ops.drain(..).collect()
        };

        if !dropped.is_empty() {
            tracing::debug!(mailbox = %self.id, discarded = dropped.len(), "mailbox operations discarded");
        }
    }
}

/// Discards whatever is left in the inbox if the drain task stops early
/// (cancelled, or the runtime shut down under it).
struct DrainGuard<S>(Arc<Shared<S>>);

impl<S> Drop for DrainGuard<S> {
    fn drop(&mut self) {
        self.0.discard();
    }
}

/// Runs queued operations one at a time, in FIFO order, until the mailbox
/// is closed and empty. Returns the final state.
async fn drain<S: Send + 'static>(shared: Arc<Shared<S>>, mut state: S) -> TaskResult<S> {
    let guard = DrainGuard(shared);
    let mut budget = OPS_PER_TURN;

    while let Some(op) = poll_fn(|cx| guard.0.poll_next(cx)).await {
        op(&mut state);

        budget -= 1;
        if budget == 0 {
            budget = OPS_PER_TURN;
            yield_now().await;
        }
    }

    tracing::debug!(mailbox = %guard.0.id, "mailbox drained");
    Ok(state)
}

/// A handle to an actor: state owned by a dedicated drain task and
/// mutated only through queued operations.
///
/// Operations run strictly one at a time, in the order they were
/// enqueued, across every clone of the mailbox. An operation enqueued from
/// inside another operation (on the same mailbox) is simply queued behind
/// it, so re-entrant calls never deadlock.
///
/// The mailbox closes when [`close`](Self::close) or [`stop`](Self::stop)
/// is called, or when the last clone is dropped. Operations already queued
/// still run; later ones resolve to [`TaskError::MailboxClosed`].
///
/// # Examples
///
/// ```rust,ignore
/// let counter = Mailbox::new(0u64);
///
/// let reply = counter.enqueue(|n| {
///     *n += 1;
///     Ok(*n)
/// });
///
/// assert_eq!(reply.await?, 1);
/// ```
pub struct Mailbox<S: Send + 'static> {
    shared: Arc<Shared<S>>,

    /// Handle of the drain task, taken by the first `stop`.
    drain: Arc<Mutex<Option<TaskHandle<S>>>>,
}

impl<S: Send + 'static> Mailbox<S> {
    /// Creates a mailbox owning `state` and spawns its drain task.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a running runtime.
    pub fn new(state: S) -> Self {
        let handle = context::current_handle("Mailbox::new");
        let id = MailboxId::next();

        let shared = Arc::new(Shared {
            id,
            inbox: Mutex::new(Inbox {
                ops: VecDeque::new(),
                closed: false,
                drain: None,
            }),
            senders: AtomicUsize::new(1),
        });

        let task = spawn_on(&handle, drain(shared.clone(), state), None);
        tracing::debug!(mailbox = %id, task = %task.id(), "mailbox created");

        Self {
            shared,
            drain: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Returns the id of the mailbox.
    pub fn id(&self) -> MailboxId {
        self.shared.id
    }

    /// Queues `op` to run against the state and returns its reply.
    ///
    /// Never blocks and never runs `op` inline. The operation runs after
    /// every operation enqueued before it; its `Ok` value or error resolves
    /// the returned [`Reply`]. A panic in `op` resolves the reply to
    /// [`TaskError::OperationFailed`] and the mailbox keeps going.
    ///
    /// On a closed mailbox the operation is dropped and the reply resolves
    /// to [`TaskError::MailboxClosed`].
    pub fn enqueue<R, F>(&self, op: F) -> Reply<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> TaskResult<R> + Send + 'static,
    {
        let (sender, reply) = reply::channel();
        let id = self.shared.id;

        let op: Op<S> = Box::new(move |state: &mut S| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| op(state)))
                .unwrap_or_else(|payload| Err(TaskError::from_panic(payload)));

            if let Err(err) = &outcome {
                tracing::debug!(mailbox = %id, outcome = err.as_label(), "mailbox operation failed");
            }

            sender.send(outcome);
        });

        let waker = {
            let mut inbox = self.shared.inbox.lock();

            if inbox.closed {
                tracing::trace!(mailbox = %id, "operation rejected by closed mailbox");
                return reply;
            }

            inbox.ops.push_back(op);
            inbox.drain.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }

        reply
    }

    /// Stops accepting operations. Queued operations still run.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Closes the mailbox and returns the handle of its drain task.
    ///
    /// The handle resolves to the final state once every queued operation
    /// has run. Only the first call (across all clones) gets the handle;
    /// later calls return `None`.
    pub fn stop(&self) -> Option<TaskHandle<S>> {
        self.shared.close();
        self.drain.lock().take()
    }

    /// Returns `true` once the mailbox no longer accepts operations.
    pub fn is_closed(&self) -> bool {
        self.shared.inbox.lock().closed
    }

    /// Number of operations waiting to run.
    pub fn len(&self) -> usize {
        self.shared.inbox.lock().ops.len()
    }

    /// Returns `true` if no operation is waiting to run.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Send + 'static> Clone for Mailbox<S> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);

        Self {
            shared: self.shared.clone(),
            drain: self.drain.clone(),
        }
    }
}

impl<S: Send + 'static> Drop for Mailbox<S> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.close();
        }
    }
}

impl<S: Send + 'static> fmt::Debug for Mailbox<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("id", &self.shared.id)
            .field("pending", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
