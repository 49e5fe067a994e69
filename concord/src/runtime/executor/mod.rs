//! Task executor implementation.
//!
//! This module contains the components that execute tasks:
//! - [`core`]: the executor itself, owning the worker threads and their
//!   lifecycle,
//! - [`worker`]: the loop each worker thread runs to drain the ready queue.

pub(crate) mod core;
pub(crate) mod worker;
