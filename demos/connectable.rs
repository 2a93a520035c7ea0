//! Demonstrates the two ways of sharing one execution of a cold source.
//!
//! `connectable()` returns a `Connectable` that only starts the source when
//! `connect()` is called. `share()` connects on the first subscriber and
//! disconnects when the last one leaves.
//!
//! To run this example, execute `cargo run --example connectable`.

use std::{thread, time::Duration};

use rxcore::{
    subscribe::{Subscriber, Subscription, SubscriptionHandle, Teardown, Unsubscribeable},
    Observable, ObservableExt, Observer, Subscribeable,
};
use tracing_subscriber::EnvFilter;

fn ticker(last: u32) -> Observable<u32> {
    Observable::new(move |mut o| {
        println!("source started");
        let join_handle = thread::spawn(move || {
            for i in 0..=last {
                if o.is_closed() {
                    break;
                }
                o.next(i);
                thread::sleep(Duration::from_millis(20));
            }
            o.complete();
        });
        Ok(Subscription::new(
            Teardown::logic(|| println!("source torn down")),
            SubscriptionHandle::JoinThread(join_handle),
        ))
    })
}

fn observer(id: u32) -> Subscriber<u32> {
    let mut observer = Subscriber::on_next(move |v| println!("Observer {} emitted {}", id, v));
    observer.on_complete(move || println!("Observer {} completed", id));
    observer
}

fn connectable() {
    println!("\n--- connectable ---");
    let mut connectable = ticker(10).connectable();

    connectable.subscribe(observer(1));
    connectable.subscribe(observer(2));

    // Individual observers can leave before the connection starts.
    let subscription3 = connectable.subscribe(observer(3));
    subscription3.unsubscribe();

    // No emissions happen until `connect()` is called.
    thread::sleep(Duration::from_millis(50));
    let connected = connectable.connect();
    println!("connected: {}", connectable.is_connected());

    // `connected.unsubscribe()` would stop all emissions instead.
    if connected.join().is_err() {
        println!("source thread panicked");
    }
}

fn share() {
    println!("\n--- share ---");
    let mut shared = ticker(1000).share();

    let first = shared.subscribe(observer(1));
    thread::sleep(Duration::from_millis(70));

    // Joins the running execution; "source started" is not printed again.
    let second = shared.subscribe(observer(2));
    thread::sleep(Duration::from_millis(70));

    first.unsubscribe();
    thread::sleep(Duration::from_millis(50));

    // The last subscriber leaving tears the source down.
    second.unsubscribe();
    thread::sleep(Duration::from_millis(50));
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    connectable();
    share();
}
