//! Core runtime components.
//!
//! This module contains the building blocks of the runtime: the ready
//! queue, the worker pool that drains it, the per-thread runtime context
//! and the task primitives built on top of them.
//!
//! Most users will interact with the [`Runtime`] through the
//! [`RuntimeBuilder`](builder::RuntimeBuilder) or the `#[concord::main]`
//! attribute, and with tasks through [`task`].

mod core;
mod executor;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod queue;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::Runtime;
