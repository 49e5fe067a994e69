mod common;

use common::init_test_logging;
use concord::task::{self, TaskStatus};
use concord::{RuntimeBuilder, TaskError};

use parking_lot::Mutex;
use std::sync::Arc;

fn explode() -> u32 {
    panic!("boom")
}

#[concord::test]
async fn spawned_task_resolves_to_its_value() {
    init_test_logging();

    let handle = task::spawn(async { Ok(21 * 2) });

    assert_eq!(handle.await.unwrap(), 42);
}

#[concord::test]
async fn ready_tasks_start_in_spawn_order() {
    init_test_logging();

    let log = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let log = log.clone();
            task::spawn(async move {
                log.lock().push(i);
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
}

#[concord::test]
async fn yielding_tasks_interleave() {
    init_test_logging();

    let log = Arc::new(Mutex::new(Vec::new()));

    let worker = |name: &'static str| {
        let log = log.clone();
        task::spawn(async move {
            for step in 0..3 {
                log.lock().push((name, step));
                task::yield_now().await;
            }
            Ok(())
        })
    };

    let a = worker("a");
    let b = worker("b");

    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(
        *log.lock(),
        vec![("a", 0), ("b", 0), ("a", 1), ("b", 1), ("a", 2), ("b", 2)]
    );
}

#[concord::test]
async fn returned_error_reaches_the_awaiter() {
    init_test_logging();

    let failing = task::spawn(async { Err::<u32, _>(TaskError::failed("no such user")) });
    let healthy = task::spawn(async { Ok(7) });

    let err = failing.await.unwrap_err();
    assert!(err.is_failure());
    assert!(err.to_string().contains("no such user"));

    assert_eq!(healthy.await.unwrap(), 7);
}

#[concord::test]
async fn panic_becomes_operation_failed() {
    init_test_logging();

    let handle = task::spawn(async { Ok(explode()) });

    let err = handle.await.unwrap_err();
    assert!(err.is_failure());
    assert!(err.to_string().contains("boom"));

    // The worker survived the panic.
    assert_eq!(task::spawn(async { Ok(1) }).await.unwrap(), 1);
}

#[concord::test]
async fn status_follows_the_lifecycle() {
    init_test_logging();

    let handle = task::spawn(async { Ok("done") });
    assert_eq!(handle.status(), TaskStatus::Pending);
    assert!(!handle.is_finished());

    task::yield_now().await;

    assert_eq!(handle.status(), TaskStatus::Completed);
    assert!(handle.is_finished());
    assert_eq!(handle.await.unwrap(), "done");
}

#[concord::test]
async fn tasks_know_their_own_id() {
    init_test_logging();

    let handle = task::spawn(async { Ok(task::current_id()) });
    let id = handle.id();

    assert_eq!(handle.await.unwrap(), Some(id));
    assert!(id.to_string().starts_with("task-"));
}

#[concord::test]
async fn tasks_can_spawn_tasks() {
    init_test_logging();

    let outer = task::spawn(async {
        let inner = task::spawn(async { Ok(20) });
        Ok(inner.await? + 1)
    });

    assert_eq!(outer.await.unwrap(), 21);
}

#[concord::test]
async fn dropped_handle_does_not_stop_the_task() {
    init_test_logging();

    let log = Arc::new(Mutex::new(Vec::new()));
    let task_log = log.clone();

    drop(task::spawn(async move {
        task_log.lock().push("ran");
        Ok(())
    }));

    // An unobserved failure is logged and goes nowhere else.
    drop(task::spawn(async { Err::<(), _>(TaskError::failed("ignored")) }));

    task::yield_now().await;
    task::yield_now().await;

    assert_eq!(*log.lock(), vec!["ran"]);
}

#[test]
fn runtime_spawn_from_outside() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build().unwrap();
    let handle = runtime.spawn(async { Ok(5) });

    assert_eq!(runtime.block_on(handle).unwrap(), 5);
}

#[test]
#[should_panic(expected = "root task did not complete")]
fn block_on_propagates_a_root_panic() {
    let runtime = RuntimeBuilder::new().build().unwrap();
    runtime.block_on(async { explode() });
}

#[test]
fn not_cancelled_outside_a_task() {
    assert!(!task::is_cancelled());
    assert_eq!(task::current_id(), None);
}
