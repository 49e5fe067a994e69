mod common;

use common::init_test_logging;
use concord::RuntimeBuilder;
use concord::task;

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn default_runtime_has_one_worker() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build().unwrap();

    assert_eq!(runtime.worker_threads(), 1);
    assert_eq!(runtime.block_on(async { 42 }), 42);
}

#[test]
fn single_worker_runs_everything_on_one_thread() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build().unwrap();
    let threads = Arc::new(Mutex::new(HashSet::new()));
    let seen = threads.clone();

    runtime.block_on(async move {
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let seen = seen.clone();
                task::spawn(async move {
                    seen.lock().insert(thread::current().id());
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    });

    assert_eq!(threads.lock().len(), 1);
}

#[test]
fn workers_run_tasks_in_parallel() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().worker_threads(4).build().unwrap();
    assert_eq!(runtime.worker_threads(), 4);

    let barrier = Arc::new(Barrier::new(4));
    let threads = Arc::new(Mutex::new(HashSet::new()));
    let seen = threads.clone();

    runtime.block_on(async move {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let barrier = barrier.clone();
                let seen = seen.clone();
                task::spawn(async move {
                    // Only passes once all four tasks run at the same time.
                    barrier.wait();
                    seen.lock().insert(thread::current().id());
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    });

    assert_eq!(threads.lock().len(), 4);
}

#[test]
fn worker_threads_are_named() {
    init_test_logging();

    let runtime = RuntimeBuilder::new()
        .worker_threads(2)
        .thread_name("pool")
        .build()
        .unwrap();

    let name = runtime.block_on(async {
        task::spawn(async { Ok(thread::current().name().map(str::to_owned)) })
            .await
            .unwrap()
    });

    assert!(name.unwrap().starts_with("pool-"));
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn zero_workers_is_rejected() {
    let _ = RuntimeBuilder::new().worker_threads(0);
}

#[concord::test(worker_threads = 3, thread_name = "attr")]
async fn test_attribute_configures_the_runtime() {
    init_test_logging();

    let name = thread::current().name().map(str::to_owned).unwrap();
    assert!(name.starts_with("attr-"));
}

#[concord::test(thread_name = "io, batch", worker_threads = 2)]
async fn thread_name_may_contain_commas() {
    init_test_logging();

    let name = thread::current().name().map(str::to_owned).unwrap();
    assert!(name.starts_with("io, batch-"));
}

#[concord::test(thread_name = r"raw,name")]
async fn thread_name_accepts_raw_strings() {
    init_test_logging();

    let name = thread::current().name().map(str::to_owned).unwrap();
    assert!(name.starts_with("raw,name-"));
}
