mod common;

use common::init_test_logging;
use concord::TaskError;
use concord::actor::Mailbox;
use concord::task;

#[concord::test]
async fn operations_run_in_enqueue_order() {
    init_test_logging();

    let mailbox = Mailbox::new(Vec::new());

    let replies: Vec<_> = (0..5)
        .map(|i| {
            mailbox.enqueue(move |log: &mut Vec<i32>| {
                log.push(i);
                Ok(())
            })
        })
        .collect();

    for reply in replies {
        reply.await.unwrap();
    }

    let state = mailbox.stop().unwrap().await.unwrap();
    assert_eq!(state, vec![0, 1, 2, 3, 4]);
}

#[concord::test]
async fn replies_carry_each_operation_result() {
    init_test_logging();

    let counter = Mailbox::new(0u64);

    let increment = |n: &mut u64| {
        *n += 1;
        Ok(*n)
    };

    let first = counter.enqueue(increment);
    let second = counter.enqueue(increment);
    let third = counter.enqueue(increment);

    assert_eq!(first.await.unwrap(), 1);
    assert_eq!(second.await.unwrap(), 2);
    assert_eq!(third.await.unwrap(), 3);
}

#[concord::test]
async fn reentrant_enqueue_is_queued_behind_the_running_operation() {
    init_test_logging();

    let mailbox = Mailbox::new(Vec::<&'static str>::new());
    let inner = mailbox.clone();

    let outer = mailbox.enqueue(move |log| {
        log.push("outer start");

        let nested = inner.enqueue(|log| {
            log.push("nested");
            Ok(())
        });

        log.push("outer end");
        Ok(nested)
    });

    let nested = outer.await.unwrap();
    nested.await.unwrap();

    let state = mailbox.stop().unwrap().await.unwrap();
    assert_eq!(state, vec!["outer start", "outer end", "nested"]);
}

#[concord::test]
async fn failures_only_reach_their_own_reply() {
    init_test_logging();

    let mailbox = Mailbox::new(0u32);

    let failed = mailbox.enqueue(|_| Err::<u32, _>(TaskError::failed("rejected")));
    let panicked = mailbox.enqueue(|_| -> concord::TaskResult<u32> { panic!("corrupt entry") });
    let healthy = mailbox.enqueue(|n| {
        *n += 3;
        Ok(*n)
    });

    let err = failed.await.unwrap_err();
    assert!(err.is_failure());
    assert!(err.to_string().contains("rejected"));

    let err = panicked.await.unwrap_err();
    assert!(err.is_failure());
    assert!(err.to_string().contains("corrupt entry"));

    assert_eq!(healthy.await.unwrap(), 3);
}

#[concord::test]
async fn closed_mailbox_rejects_new_operations() {
    init_test_logging();

    let mailbox = Mailbox::new(());
    mailbox.close();

    assert!(mailbox.is_closed());

    let reply = mailbox.enqueue(|_| Ok(1));
    assert!(matches!(reply.await, Err(TaskError::MailboxClosed)));
}

#[concord::test]
async fn queued_operations_survive_close() {
    init_test_logging();

    let mailbox = Mailbox::new(String::new());

    let reply = mailbox.enqueue(|s| {
        s.push_str("flushed");
        Ok(s.len())
    });
    mailbox.close();

    assert_eq!(reply.await.unwrap(), 7);
}

#[concord::test]
async fn only_the_first_stop_gets_the_state() {
    init_test_logging();

    let mailbox = Mailbox::new(5);
    let other = mailbox.clone();

    let handle = mailbox.stop();
    assert!(other.stop().is_none());

    assert_eq!(handle.unwrap().await.unwrap(), 5);
}

#[concord::test]
async fn enqueue_never_runs_the_operation_inline() {
    init_test_logging();

    let mailbox = Mailbox::new(0);
    let reply = mailbox.enqueue(|n| {
        *n += 1;
        Ok(*n)
    });

    assert!(!reply.is_ready());
    assert_eq!(mailbox.len(), 1);

    assert_eq!(reply.await.unwrap(), 1);
    assert!(mailbox.is_empty());
}

#[concord::test(worker_threads = 4)]
async fn many_tasks_share_one_mailbox() {
    init_test_logging();

    let counter = Mailbox::new(0u64);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = counter.clone();
            task::spawn(async move {
                for _ in 0..100 {
                    counter
                        .enqueue(|n| {
                            *n += 1;
                            Ok(())
                        })
                        .await?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(counter.stop().unwrap().await.unwrap(), 800);
}

#[concord::test]
async fn mailbox_ids_are_distinct() {
    init_test_logging();

    let a = Mailbox::new(());
    let b = Mailbox::new(());

    assert_ne!(a.id(), b.id());
    assert!(a.id().to_string().starts_with("mailbox-"));
}
