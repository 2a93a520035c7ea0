//! This `Observable` emits values from an OS thread and returns a `Subscription`
//! whose teardown tells the thread to stop. Operators like `take` rely on that
//! teardown to end background emissions early.
//!
//! To run this example, execute `cargo run --example unsubscribe_observable`.

use std::{sync::mpsc, thread, time::Duration};

use rxcore::{
    subscribe::{Subscriber, Subscription, SubscriptionHandle, Teardown, Unsubscribeable},
    Observable, ObservableExt, Observer, Subscribeable,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Counts up on its own thread until told to stop.
    let observable = Observable::new(|mut o| {
        let (tx, rx) = mpsc::channel::<()>();

        let join_handle = thread::spawn(move || {
            for i in 0..=10000 {
                // Stop signal from the teardown.
                if rx.try_recv().is_ok() {
                    break;
                }
                println!("producing {}", i);
                o.next(i);
                thread::sleep(Duration::from_millis(1));
            }
            o.complete();
        });

        Ok(Subscription::new(
            // Runs once, when the subscription is unsubscribed or the subscriber
            // completes. Here it signals the thread to stop emitting.
            Teardown::logic(move || {
                if tx.send(()).is_err() {
                    println!("Producer thread already finished.");
                }
            }),
            // Lets the caller `join` the producer thread.
            SubscriptionHandle::JoinThread(join_handle),
        ))
    });

    let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
    observer.on_complete(|| println!("Completed"));

    // Returns right away; values arrive from the producer thread.
    let subscription = observable
        // `take` completes after 500 items, which runs the teardown above.
        .take(500)
        .map(|v| format!("Mapped {}", v))
        .subscribe(observer);

    println!("main thread is free while values arrive");
    thread::sleep(Duration::from_millis(50));

    // Unsubscribe from the observable to stop emissions. Calling it again is a no-op.
    subscription.unsubscribe();
    subscription.unsubscribe();

    // Wait for the producer thread to notice the signal.
    if subscription.join().is_err() {
        println!("Producer thread panicked.");
    }
    println!("done")
}
