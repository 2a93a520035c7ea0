//! This `Observable` emits values from a Tokio task. Its teardown is a future that
//! is spawned on the runtime when the subscription ends, and the task's handle is
//! kept in the `Subscription` so it can be awaited.
//!
//! The second half wraps a plain future with `Observable::from_future`.
//!
//! To run this example, execute `cargo run --example async_observable_tokio`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rxcore::{
    subscribe::{Subscriber, Subscription, SubscriptionHandle, Teardown},
    BoxError, Observable, ObservableExt, Observer, Subscribeable,
};
use tokio::{sync::mpsc::channel, task, time};
use tracing_subscriber::EnvFilter;

async fn fetch_greeting(name: &'static str) -> Result<String, BoxError> {
    time::sleep(time::Duration::from_millis(100)).await;
    if name.is_empty() {
        return Err("no name given".into());
    }
    Ok(format!("Hello, {}!", name))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Counts up on a Tokio task until told to stop.
    let observable = Observable::new(|mut o| {
        let done = Arc::new(AtomicBool::new(false));
        let done_c = Arc::clone(&done);
        let (tx, mut rx) = channel::<()>(1);

        // Await the signal sent from the teardown.
        task::spawn(async move {
            if rx.recv().await.is_some() {
                done_c.store(true, Ordering::SeqCst);
            }
        });

        let join_handle = task::spawn(async move {
            for i in 0..=10000 {
                if done.load(Ordering::SeqCst) {
                    break;
                }
                println!("producing {}", i);
                o.next(i);
                // Put an await point after each emit so the teardown task gets
                // a chance to run.
                time::sleep(time::Duration::from_millis(1)).await;
            }
            o.complete();
        });

        Ok(Subscription::new(
            Teardown::Future(Box::pin(async move {
                if tx.send(()).await.is_err() {
                    println!("producer task already finished");
                }
            })),
            SubscriptionHandle::JoinTask(join_handle),
        ))
    });

    let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
    observer.on_complete(|| println!("Completed"));

    let subscription = observable
        .take(15)
        .map(|v| format!("Mapped {}", v))
        .subscribe(observer);

    println!("main task is free while values arrive");

    // Wait for the Tokio task to finish.
    if subscription.join_concurrent().await.is_err() {
        println!("Producer task failed.");
    }

    // A future becomes an observable that emits its output once and completes.
    // Each subscribe creates and runs a new future.
    let mut greeting = Observable::from_future(|| fetch_greeting("observer"));
    let mut observer = Subscriber::on_next(|v: String| println!("Future value: {}", v));
    observer.on_complete(|| println!("Future completed"));
    if greeting.subscribe(observer).join_concurrent().await.is_err() {
        println!("Future task failed.");
    }

    let mut failing = Observable::from_future(|| fetch_greeting(""));
    let mut observer = Subscriber::on_next(|v: String| println!("Future value: {}", v));
    observer.on_error(|e| println!("Future failed: {}", e));
    if failing.subscribe(observer).join_concurrent().await.is_err() {
        println!("Future task failed.");
    }

    println!("done")
}
