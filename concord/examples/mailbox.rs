//! Example: an account actor behind a mailbox

use concord::actor::Mailbox;
use concord::task;
use concord::{TaskError, TaskResult};

struct Account {
    balance: i64,
}

#[concord::main]
async fn main() -> TaskResult<()> {
    let account = Mailbox::new(Account { balance: 100 });

    // Operations run one at a time, in the order they were enqueued
    let deposit = account.enqueue(|acc: &mut Account| {
        acc.balance += 50;
        Ok(acc.balance)
    });
    let overdraw = account.enqueue(|acc: &mut Account| {
        if acc.balance < 1_000 {
            return Err(TaskError::failed("insufficient funds"));
        }
        acc.balance -= 1_000;
        Ok(acc.balance)
    });

    println!("after deposit: {:?}", deposit.await);
    println!("overdraw: {:?}", overdraw.await);

    // Many tasks can share the same mailbox
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let account = account.clone();
            task::spawn(async move {
                account
                    .enqueue(|acc: &mut Account| {
                        acc.balance += 1;
                        Ok(())
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await?;
    }

    if let Some(drain) = account.stop() {
        let final_state = drain.await?;
        println!("final balance: {}", final_state.balance);
    }

    Ok(())
}
