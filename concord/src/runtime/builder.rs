use super::Runtime;

use std::io;

/// What the runtime does with a task failure that nobody awaits.
///
/// A failure is *unobserved* when the task's [`TaskHandle`](crate::task::TaskHandle)
/// is dropped without its result being taken. Such failures never propagate
/// anywhere else; this policy only decides how loudly they are reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnobservedFailure {
    /// Log the failure at `error` level and carry on.
    #[default]
    Log,

    /// Log the failure, then abort the process.
    Abort,
}

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing runtime parameters before
/// constructing the runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(4)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    /// Number of worker threads in the executor.
    worker_threads: usize,

    /// Prefix used to name the runtime's threads.
    thread_name: String,

    /// Policy for failures of tasks whose handle was dropped.
    unobserved: UnobservedFailure,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    ///
    /// By default the runtime runs a single worker thread: every task is
    /// multiplexed on one logical worker and ready tasks run strictly in
    /// FIFO order.
    pub fn new() -> Self {
        Self {
            worker_threads: 1,
            thread_name: "concord-worker".to_string(),
            unobserved: UnobservedFailure::default(),
        }
    }

    /// Sets the number of worker threads pulling from the shared ready queue.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let builder = RuntimeBuilder::new()
    ///     .worker_threads(2);
    /// ```
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix of the worker and timer thread names.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the policy for task failures nobody awaits.
    pub fn unobserved_failures(mut self, policy: UnobservedFailure) -> Self {
        self.unobserved = policy;
        self
    }

    /// Builds the runtime with the configured options.
    ///
    /// This starts the timer thread and the executor's workers.
    ///
    /// # Errors
    ///
    /// Returns the OS error if one of the runtime threads cannot be spawned.
    pub fn build(self) -> io::Result<Runtime> {
        Runtime::new(self.worker_threads, &self.thread_name, self.unobserved)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
