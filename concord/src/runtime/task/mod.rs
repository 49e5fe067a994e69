//! Asynchronous task primitives.
//!
//! This module defines the abstractions the runtime uses to represent,
//! schedule, cancel and group units of work.
//!
//! It includes:
//! - task identity and lifecycle states,
//! - the handle used to await, inspect or cancel a task,
//! - task groups with ordered, fail-fast aggregation,
//! - cooperative cancellation checks for the running task.
//!
//! Most users will interact with this module through [`spawn`],
//! [`TaskHandle`] and [`TaskGroup`]; the lower-level components are used
//! internally by the executor.

mod core;
mod current;
mod group;
mod handle;
mod id;
mod state;
mod waker;

pub(crate) use self::core::{ChildObserver, GroupLink, Runnable, Task, spawn_on};
pub(crate) use waker::ThreadWaker;

pub use self::core::spawn;
pub use current::{checkpoint, current_id, is_cancelled};
pub use group::{GroupScope, GroupState, TaskGroup, scoped};
pub use handle::TaskHandle;
pub use id::{GroupId, TaskId};
pub use state::TaskStatus;

pub use crate::runtime::yield_now::yield_now;
