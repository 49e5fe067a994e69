use super::core::{ChildObserver, GroupLink, Task, spawn_on};
use super::id::{GroupId, TaskId};
use super::TaskHandle;
use crate::error::{TaskError, TaskResult};
use crate::runtime::context;

use parking_lot::Mutex;
use std::fmt;
use std::future::poll_fn;
use std::mem;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

/// Lifecycle of a [`TaskGroup`].
///
/// ```text
/// Open ──(first failure | close | cancel)──► Closing ──(all children resolved)──► Closed
///   └───────────────────(join resolves every child)────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupState {
    /// Accepting new children.
    Open,
    /// No new children; waiting for the registered ones to resolve.
    Closing,
    /// Every child has resolved and the results were collected.
    Closed,
}

/// One registered child, in registration order.
struct Child<T: Send + 'static> {
    id: TaskId,
    handle: Option<TaskHandle<T>>,
    outcome: Option<TaskResult<T>>,
}

struct GroupInner<T: Send + 'static> {
    state: GroupState,
    children: Vec<Child<T>>,
}

/// State shared by a group, its scopes and (weakly) its children.
struct GroupShared<T: Send + 'static> {
    id: GroupId,
    inner: Mutex<GroupInner<T>>,

    /// Monotonic: once set it is never cleared.
    cancelled: AtomicBool,

    /// Set as soon as any child fails.
    failed: AtomicBool,
}

impl<T: Send + 'static> GroupShared<T> {
    fn add<F>(self: &Arc<Self>, work: F) -> TaskResult<TaskId>
    where
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        let handle = context::current_handle("TaskGroup::add");
        let mut inner = self.inner.lock();

        if inner.state != GroupState::Open {
            tracing::debug!(group = %self.id, state = ?inner.state, "rejected child of a closed group");
            return Err(TaskError::GroupClosed);
        }

        let observer: Weak<dyn ChildObserver> = Arc::downgrade(self) as Weak<dyn ChildObserver>;
        let link = GroupLink {
            id: self.id,
            observer,
        };

        let child = spawn_on(&handle, work, Some(link));
        let id = child.id();

        inner.children.push(Child {
            id,
            handle: Some(child),
            outcome: None,
        });

        Ok(id)
    }

    /// Moves an open group to `Closing`.
    fn close_locked(&self, inner: &mut GroupInner<T>, reason: &'static str) {
        if inner.state == GroupState::Open {
            inner.state = GroupState::Closing;
            tracing::debug!(group = %self.id, reason, "group closing");
        }
    }

    /// Collects the tasks of every child that has not resolved yet.
    fn unresolved_locked(inner: &GroupInner<T>, except: Option<TaskId>) -> Vec<Arc<Task<T>>> {
        inner
            .children
            .iter()
            .filter(|child| child.outcome.is_none() && Some(child.id) != except)
            .filter_map(|child| child.handle.as_ref().map(|h| h.task.clone()))
            .collect()
    }

    /// Closes the group and cancels every unresolved child.
    ///
    /// The tasks are cancelled after the lock is released: cancelling drops
    /// their futures, which may run arbitrary destructors.
    fn fail_fast(&self, failed: Option<TaskId>) {
        let victims = {
            let mut inner = self.inner.lock();
            self.close_locked(&mut inner, "child failed");
            Self::unresolved_locked(&inner, failed)
        };

        if !victims.is_empty() {
            tracing::debug!(group = %self.id, cancelled = victims.len(), "cancelling siblings");
        }

        for task in victims {
            task.cancel();
        }
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!(group = %self.id, "group cancelled");
        }

        let victims = {
            let mut inner = self.inner.lock();
            self.close_locked(&mut inner, "cancelled");
            Self::unresolved_locked(&inner, None)
        };

        for task in victims {
            task.cancel();
        }
    }

    /// Polls every unresolved child once.
    ///
    /// Returns the outcomes in registration order once every child has
    /// resolved. A failure observed here triggers the same fail-fast as one
    /// reported by the child itself.
    fn poll_settle(&self, cx: &mut Context<'_>) -> Poll<Vec<TaskResult<T>>> {
        let victims = {
            let mut inner = self.inner.lock();
            let mut saw_failure = false;

            for child in inner.children.iter_mut() {
                if child.outcome.is_some() {
                    continue;
                }

                let Some(handle) = child.handle.as_mut() else {
                    continue;
                };

                if let Poll::Ready(outcome) = Pin::new(handle).poll(cx) {
                    if outcome.as_ref().is_err_and(|err| !err.is_cancelled()) {
                        saw_failure = true;
                    }

                    child.outcome = Some(outcome);
                    child.handle = None;
                }
            }

            if saw_failure {
                self.failed.store(true, Ordering::Release);
                self.close_locked(&mut inner, "child failed");
            }

            if inner.children.iter().all(|c| c.outcome.is_some()) {
                inner.state = GroupState::Closed;
                tracing::debug!(group = %self.id, children = inner.children.len(), "group closed");

                let outcomes = mem::take(&mut inner.children)
                    .into_iter()
                    .filter_map(|child| child.outcome)
                    .collect();

                return Poll::Ready(outcomes);
            }

            if saw_failure {
                Self::unresolved_locked(&inner, None)
            } else {
                Vec::new()
            }
        };

        // Every unresolved handle was polled above, so the cancelled
        // siblings wake this future when they settle.
        for task in victims {
            task.cancel();
        }

        Poll::Pending
    }
}

impl<T: Send + 'static> ChildObserver for GroupShared<T> {
    fn child_failed(&self, id: TaskId) {
        self.failed.store(true, Ordering::Release);
        self.fail_fast(Some(id));
    }
}

/// A set of sibling tasks with a structured lifetime.
///
/// Children are registered with [`add`](Self::add) and collected with
/// [`join`](Self::join), which reports results in **registration order**,
/// not completion order.
///
/// The group fails fast: as soon as one child fails, the group stops
/// accepting children and cancels every sibling that has not resolved
/// yet. `join` then waits for the cancellations to land and returns the
/// first failure by registration order.
///
/// Dropping a group cancels every child that has not resolved, so a scope
/// that unwinds (error, panic, cancellation of the parent) never leaves
/// children running behind it.
pub struct TaskGroup<T: Send + 'static> {
    shared: Arc<GroupShared<T>>,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// Creates a new, empty and open group.
    pub fn new() -> Self {
        let id = GroupId::next();
        tracing::debug!(group = %id, "group created");

        Self {
            shared: Arc::new(GroupShared {
                id,
                inner: Mutex::new(GroupInner {
                    state: GroupState::Open,
                    children: Vec::new(),
                }),
                cancelled: AtomicBool::new(false),
                failed: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the id of the group.
    pub fn id(&self) -> GroupId {
        self.shared.id
    }

    /// Spawns `work` as a child of the group.
    ///
    /// # Errors
    /// Returns [`TaskError::GroupClosed`] once the group has left the
    /// `Open` state (after a failure, [`close`](Self::close) or
    /// [`cancel`](Self::cancel)).
    ///
    /// # Panics
    /// Panics if called outside the context of a running runtime.
    pub fn add<F>(&self, work: F) -> TaskResult<TaskId>
    where
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        self.shared.add(work)
    }

    /// Stops accepting new children. Registered children keep running.
    pub fn close(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.close_locked(&mut inner, "closed");
    }

    /// Sets the group's cancellation flag and cancels every unresolved child.
    ///
    /// Children that have not started never run; running children are
    /// flagged and cancelled at their next suspension point.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> GroupState {
        self.shared.inner.lock().state
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` once any child has failed.
    pub fn is_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Number of registered children.
    pub fn len(&self) -> usize {
        self.shared.inner.lock().children.len()
    }

    /// Returns `true` if no child was registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a cloneable handle that can register children from other
    /// tasks (including the children themselves).
    pub fn scope(&self) -> GroupScope<T> {
        GroupScope {
            shared: self.shared.clone(),
        }
    }

    /// Waits for every child and returns their values in registration order.
    ///
    /// # Errors
    /// If a child fails, every other unresolved child is cancelled and,
    /// once all of them have resolved, the first failure by registration
    /// order is returned. If no child failed but one was cancelled,
    /// [`TaskError::Cancelled`] is returned.
    pub async fn join(self) -> TaskResult<Vec<T>> {
        let mut cancelled = false;
        let mut values = Vec::new();

        for outcome in self.join_all().await {
            match outcome {
                Ok(value) => values.push(value),
                Err(TaskError::Cancelled) => cancelled = true,
                Err(err) => return Err(err),
            }
        }

        if cancelled {
            return Err(TaskError::Cancelled);
        }

        Ok(values)
    }

    /// Waits for every child and returns each outcome in registration order.
    ///
    /// Fail-fast applies exactly as for [`join`](Self::join); children
    /// cancelled because of a sibling's failure report
    /// [`TaskError::Cancelled`].
    pub async fn join_all(self) -> Vec<TaskResult<T>> {
        poll_fn(|cx| self.shared.poll_settle(cx)).await
    }
}

impl<T: Send + 'static> Default for TaskGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Drop for TaskGroup<T> {
    /// Cancels every child that has not resolved.
    ///
    /// This ensures that children do not keep running in the background
    /// once the group is no longer in scope.
    fn drop(&mut self) {
        let victims = {
            let mut inner = self.shared.inner.lock();

            if inner.state == GroupState::Closed {
                return;
            }

            self.shared.close_locked(&mut inner, "dropped");
            GroupShared::<T>::unresolved_locked(&inner, None)
        };

        if !victims.is_empty() {
            tracing::debug!(group = %self.shared.id, cancelled = victims.len(), "group dropped before join");
        }

        for task in victims {
            task.cancel();
        }
    }
}

impl<T: Send + 'static> fmt::Debug for TaskGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .field("children", &self.len())
            .finish()
    }
}

/// A cloneable, `add`-only view of a [`TaskGroup`].
///
/// Handed to the body of [`scoped`] and usable from any task, so children
/// can register siblings while the group is being joined.
pub struct GroupScope<T: Send + 'static> {
    shared: Arc<GroupShared<T>>,
}

impl<T: Send + 'static> GroupScope<T> {
    /// Spawns `work` as a child of the group. See [`TaskGroup::add`].
    pub fn add<F>(&self, work: F) -> TaskResult<TaskId>
    where
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        self.shared.add(work)
    }

    /// Returns the id of the group.
    pub fn id(&self) -> GroupId {
        self.shared.id
    }

    /// Returns `true` once the group was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Clone for GroupScope<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Runs `body` with a fresh task group and joins or cancels its children
/// on every exit path.
///
/// - If the body returns `Ok(r)`, every child is joined and
///   `Ok((r, values))` is returned (values in registration order), or the
///   first child failure.
/// - If the body returns `Err(e)`, every child is cancelled and awaited,
///   then `e` is returned.
/// - If the enclosing task is cancelled or panics, the group is dropped and
///   its unresolved children are cancelled.
///
/// # Examples
///
/// ```rust,ignore
/// let ((), sizes) = task::scoped(|scope| async move {
///     for path in paths {
///         scope.add(async move { Ok(measure(path)) })?;
///     }
///     Ok(())
/// })
/// .await?;
/// ```
pub async fn scoped<T, R, F, Fut>(body: F) -> TaskResult<(R, Vec<T>)>
where
    T: Send + 'static,
    F: FnOnce(GroupScope<T>) -> Fut,
    Fut: Future<Output = TaskResult<R>>,
{
    let group = TaskGroup::new();

    match body(group.scope()).await {
        Ok(value) => {
            let values = group.join().await?;
            Ok((value, values))
        }
        Err(err) => {
            group.cancel();
            let _ = group.join_all().await;
            Err(err)
        }
    }
}
