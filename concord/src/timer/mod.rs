//! Timer driver.
//!
//! The timer driver is a dedicated thread that owns every pending
//! deadline registered by [`sleep`](crate::time::sleep). It is responsible
//! for:
//! - keeping deadlines ordered in a min-heap,
//! - sleeping until the earliest deadline or the next command,
//! - waking the tasks whose deadline has passed.
//!
//! It runs independently from the executor and communicates with it
//! through commands and wakers.

mod command;
mod driver;
mod entry;

pub(crate) use command::Command;
pub(crate) use driver::{TimerDriver, TimerHandle};
