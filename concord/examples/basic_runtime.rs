//! Example: spawning, awaiting and cancelling tasks

use concord::TaskError;
use concord::task;
use concord::time::sleep;
use std::time::Duration;

#[concord::main]
async fn main() {
    // Spawn a task and wait for its result
    let answer = task::spawn(async { Ok(21 * 2) });
    println!("answer = {:?}", answer.await);

    // A failing task only reports to whoever awaits it
    let failing = task::spawn(async { Err::<(), _>(TaskError::failed("no route to host")) });
    println!("failing = {:?}", failing.await);

    // Cancel a task blocked in a long sleep
    let sleeper = task::spawn(async {
        sleep(Duration::from_secs(60)).await;
        Ok("woke up")
    });
    task::yield_now().await;
    sleeper.cancel();
    println!("sleeper = {:?}", sleeper.await);
}
