//! Example: fan-out with a task group and fail-fast cancellation

use concord::task::{self, TaskGroup};
use concord::time::sleep;
use concord::{TaskError, TaskResult};
use std::time::Duration;

async fn fetch(id: u64) -> TaskResult<String> {
    sleep(Duration::from_millis(10 * id)).await;

    if id == 3 {
        return Err(TaskError::failed(format!("shard {id} unavailable")));
    }

    Ok(format!("shard {id}"))
}

#[concord::main(worker_threads = 2)]
async fn main() -> TaskResult<()> {
    // Results come back in registration order
    let group = TaskGroup::new();
    for id in [2, 1] {
        group.add(fetch(id))?;
    }
    println!("ok group: {:?}", group.join().await?);

    // The first failure cancels the remaining shards
    let group = TaskGroup::new();
    for id in 1..=5 {
        group.add(fetch(id))?;
    }
    println!("failing group: {:?}", group.join().await);

    // Scoped groups join (or cancel) their children on every exit path
    let (_, sizes) = task::scoped(|scope| async move {
        for word in ["structured", "concurrency"] {
            scope.add(async move { Ok(word.len()) })?;
        }
        Ok(())
    })
    .await?;
    println!("sizes: {sizes:?}");

    Ok(())
}
