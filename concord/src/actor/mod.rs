//! Actor mailboxes.
//!
//! A [`Mailbox`] owns a piece of state and serializes every operation on
//! it: operations are enqueued in FIFO order and run one at a time by a
//! single drain task, so the state never needs a lock.
//!
//! Each enqueued operation gets its own [`Reply`]. An operation that fails
//! (or panics) resolves only its own reply; the mailbox keeps draining.

mod mailbox;
mod reply;

pub use mailbox::{Mailbox, MailboxId};
pub use reply::Reply;
