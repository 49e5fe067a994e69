mod common;

use common::init_test_logging;
use concord::task;
use concord::time::{Elapsed, sleep, sleep_until, timeout};
use concord::{TaskError, TaskResult};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[concord::test]
async fn sleep_waits_at_least_the_duration() {
    init_test_logging();

    let started = Instant::now();
    sleep(Duration::from_millis(20)).await;

    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[concord::test]
async fn past_deadline_completes_immediately() {
    init_test_logging();

    let deadline = Instant::now();
    let nap = sleep_until(deadline);

    assert_eq!(nap.deadline(), deadline);
    assert!(nap.is_elapsed());
    nap.await;
}

#[concord::test]
async fn sleepers_wake_in_deadline_order() {
    init_test_logging();

    let log = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = [60u64, 20, 40]
        .into_iter()
        .enumerate()
        .map(|(i, ms)| {
            let log = log.clone();
            task::spawn(async move {
                sleep(Duration::from_millis(ms)).await;
                log.lock().push(i);
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*log.lock(), vec![1, 2, 0]);
}

#[concord::test]
async fn timeout_returns_the_value_when_in_time() {
    init_test_logging();

    let value = timeout(Duration::from_secs(1), async { 5 }).await;

    assert_eq!(value, Ok(5));
}

#[concord::test]
async fn timeout_elapses_on_slow_futures() {
    init_test_logging();

    let started = Instant::now();
    let result = timeout(Duration::from_millis(10), sleep(Duration::from_secs(30))).await;

    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[concord::test]
async fn elapsed_propagates_as_a_failure() {
    init_test_logging();

    async fn slow_lookup() -> TaskResult<u32> {
        let value = timeout(Duration::from_millis(5), async {
            sleep(Duration::from_secs(30)).await;
            7
        })
        .await?;

        Ok(value)
    }

    let err = slow_lookup().await.unwrap_err();
    assert!(err.is_failure());
    assert!(matches!(err, TaskError::OperationFailed { .. }));

    let source = std::error::Error::source(&err).unwrap();
    assert!(source.downcast_ref::<Elapsed>().is_some());
}

#[concord::test]
async fn sleeping_task_can_be_cancelled() {
    init_test_logging();

    let handle = task::spawn(async {
        sleep(Duration::from_secs(30)).await;
        Ok(())
    });

    task::yield_now().await;

    let started = Instant::now();
    handle.cancel();

    assert!(matches!(handle.await, Err(TaskError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
