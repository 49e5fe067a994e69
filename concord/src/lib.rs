//! # Concord
//!
//! **Concord** is a small structured-concurrency runtime for Rust. It
//! schedules units of work as tasks on a cooperative scheduler and offers
//! two ways of composing them:
//!
//! - **Task groups**, where sibling tasks share a lifetime: results come
//!   back in registration order, and the first failure cancels every
//!   sibling that has not finished yet.
//! - **Actor mailboxes**, where a piece of state is owned by a single
//!   drain task and mutated only through operations queued in FIFO order.
//!
//! The scheduler runs ready tasks in FIFO order. By default it multiplexes
//! every task on a single worker thread; [`RuntimeBuilder::worker_threads`]
//! lets several workers drain the same ready queue in parallel.
//!
//! Cancellation is cooperative: a task that has not started never runs,
//! and a running task is cancelled at its next suspension point
//! ([`task::yield_now`], [`task::checkpoint`], [`time::sleep`], or
//! awaiting another task, group or reply).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use concord::task::{self, TaskGroup};
//! use concord::actor::Mailbox;
//!
//! #[concord::main]
//! async fn main() -> concord::TaskResult<()> {
//!     let group = TaskGroup::new();
//!     for n in 1..=3u64 {
//!         group.add(async move { Ok(n * n) })?;
//!     }
//!     assert_eq!(group.join().await?, vec![1, 4, 9]);
//!
//!     let counter = Mailbox::new(0u64);
//!     let reply = counter.enqueue(|n| {
//!         *n += 1;
//!         Ok(*n)
//!     });
//!     assert_eq!(reply.await?, 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: spawning, handles, cancellation and task groups
//! - [`actor`]: mailboxes serializing access to owned state
//! - [`time`]: sleep and timeout
//! - [`error`]: the error type shared by all of the above

mod runtime;
mod timer;

pub mod actor;
pub mod error;
pub mod time;

pub use error::{BoxError, TaskError, TaskResult};
pub use runtime::Runtime;
pub use runtime::builder::{RuntimeBuilder, UnobservedFailure};
pub use runtime::task;

pub use concord_macros::*;
