//! Time utilities.
//!
//! This module provides the runtime's timer-backed futures:
//! - [`sleep`] suspends the calling task until a deadline,
//! - [`timeout`] bounds how long a future may take.
//!
//! Both are suspension points, so a task blocked in them can be
//! cancelled.

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{Sleep, sleep, sleep_until};

#[doc(inline)]
pub use timeout::{Elapsed, Timeout, timeout};
