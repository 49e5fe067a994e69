use crate::runtime::task::Task;

use std::sync::Arc;
use std::task::Wake;
use std::thread::Thread;

/// Waking a task reschedules it on the ready queue.
///
/// The waker shares ownership of the task, so a task stays alive as long as
/// something (a timer entry, a mailbox, another task's handle) may still
/// wake it.
impl<T: Send + 'static> Wake for Task<T> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.clone().schedule();
    }
}

/// Waker that unparks a thread blocked outside the runtime.
///
/// Used by [`Runtime::block_on`](crate::Runtime::block_on) to sleep the
/// calling thread until the root task finishes.
pub(crate) struct ThreadWaker(pub(crate) Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}
