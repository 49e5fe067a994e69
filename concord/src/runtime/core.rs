use super::builder::UnobservedFailure;
use super::context::{self, Handle};
use super::executor::core::Executor;
use super::queue::ReadyQueue;
use super::task::{TaskHandle, ThreadWaker, spawn_on};
use crate::error::TaskResult;
use crate::timer::{Command, TimerDriver};

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, JoinHandle};

/// The main runtime handle.
///
/// `Runtime` is responsible for:
/// - spawning tasks onto its ready queue,
/// - driving task execution via the executor's workers,
/// - running the timer thread behind [`sleep`](crate::time::sleep),
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// Dropping the runtime shuts down all internal components in an orderly
/// fashion. Tasks that have not finished by then are dropped without being
/// polled again.
pub struct Runtime {
    /// Task executor responsible for running the ready queue.
    executor: Executor,

    /// Context installed on every worker thread.
    handle: Handle,

    /// Join handle of the timer thread.
    timer_thread: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Creates a new runtime instance.
    ///
    /// # Arguments
    ///
    /// * `worker_threads` - Number of worker threads used by the executor.
    /// * `thread_name` - Prefix of the runtime's thread names.
    /// * `unobserved` - Policy for failures nobody awaits.
    ///
    /// The timer thread is started first, then the workers.
    pub(crate) fn new(
        worker_threads: usize,
        thread_name: &str,
        unobserved: UnobservedFailure,
    ) -> io::Result<Self> {
        let (timer, timer_thread) = TimerDriver::start(thread_name)?;

        let handle = Handle {
            queue: Arc::new(ReadyQueue::new()),
            timer,
            unobserved,
        };

        let executor = match Executor::new(handle.clone(), worker_threads, thread_name) {
            Ok(executor) => executor,
            Err(err) => {
                handle.timer.send(Command::Shutdown);
                let _ = timer_thread.join();
                return Err(err);
            }
        };

        tracing::info!(
            workers = worker_threads,
            unobserved = ?unobserved,
            "runtime started"
        );

        Ok(Self {
            executor,
            handle,
            timer_thread: Some(timer_thread),
        })
    }

    /// Number of worker threads draining the ready queue.
    pub fn worker_threads(&self) -> usize {
        self.executor.worker_count()
    }

    /// Spawns a unit of work onto the runtime.
    ///
    /// This is the same as [`task::spawn`](crate::task::spawn), usable from
    /// outside the runtime's threads.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = runtime.spawn(async { Ok(42) });
    /// ```
    pub fn spawn<F, T>(&self, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = TaskResult<T>> + Send + 'static,
    {
        spawn_on(&self.handle, work, None)
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// This method is typically used as the synchronous entry point
    /// of the runtime (e.g. in `main` or tests).
    ///
    /// The future is spawned as the root task and the calling thread parks
    /// until that task finishes.
    ///
    /// # Panics
    ///
    /// - Panics if called from one of the runtime's worker threads, which
    ///   would otherwise block the scheduler it waits on.
    /// - Panics if the root future panics or is cancelled.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async {
    ///     42
    /// });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        assert!(
            !context::on_worker_thread(),
            "block_on cannot be called from within a runtime worker thread"
        );

        let mut root = self.spawn(async move { Ok(future.await) });

        let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
        let mut cx = Context::from_waker(&waker);

        loop {
            match Pin::new(&mut root).poll(&mut cx) {
                Poll::Ready(Ok(output)) => return output,
                Poll::Ready(Err(err)) => panic!("root task did not complete: {err}"),
                Poll::Pending => thread::park(),
            }
        }
    }
}

impl Drop for Runtime {
    /// Shuts down the runtime.
    ///
    /// This performs the following steps:
    /// 1. Shuts the ready queue down, which stops the workers and releases
    ///    every queued task
    /// 2. Sends a shutdown command to the timer thread
    /// 3. Joins all worker threads, then the timer thread
    fn drop(&mut self) {
        tracing::info!("runtime shutting down");

        self.executor.shutdown();
        self.handle.timer.send(Command::Shutdown);

        self.executor.join();

        if let Some(timer_thread) = self.timer_thread.take() {
            let _ = timer_thread.join();
        }

        tracing::debug!("runtime stopped");
    }
}
