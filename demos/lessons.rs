//! A guided tour through the core ideas of the crate, one lesson per section:
//! hot and cold observables, disposing subscriptions, creation functions,
//! operator pipelines and subjects.
//!
//! Set `RUST_LOG=rxcore=trace` to see the library's own events between the lines.
//!
//! To run this example, execute `cargo run --example lessons`.

use std::{
    sync::Arc,
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use rxcore::{
    subscribe::{Subscriber, Subscription, SubscriptionBag, SubscriptionHandle, Teardown, Unsubscribeable},
    AsyncSubject, BehaviorSubject, Observable, ObservableExt, Observer, Subject, Subscribeable,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
#[error("this is an error")]
struct LessonError;

fn log_section(title: &str) {
    println!("\n========== {} ==========", title);
}

fn pseudo_random() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() % 100)
        .unwrap_or_default()
}

/// Emits 0, 1, 2, ... every `period` on its own thread until unsubscribed.
fn interval(period: Duration) -> Observable<u64> {
    Observable::new(move |mut o| {
        let join_handle = thread::spawn(move || {
            let mut i = 0;
            loop {
                thread::sleep(period);
                if o.is_closed() {
                    break;
                }
                o.next(i);
                i += 1;
            }
        });
        Ok(Subscription::new(
            Teardown::Nil,
            SubscriptionHandle::JoinThread(join_handle),
        ))
    })
}

fn wait_for(subscription: Subscription) {
    if subscription.join().is_err() {
        println!("producer thread panicked");
    }
}

// Hot and cold.

fn cold_observable() {
    log_section("Cold Observable");

    // The producer runs again for every subscription.
    let mut observable = Observable::new(|mut o| {
        o.next(pseudo_random());
        o.complete();
        Ok(Subscription::empty())
    });

    observable.subscribe(Subscriber::on_next(|n| {
        println!("First Subscription value: {}", n)
    }));
    observable.subscribe(Subscriber::on_next(|n| {
        println!("Second Subscription value: {}", n)
    }));
}

fn hot_observable() {
    log_section("Hot Observable");

    // The value is produced once, outside of the producer.
    let num = pseudo_random();
    let mut observable = Observable::new(move |mut o| {
        o.next(num);
        o.complete();
        Ok(Subscription::empty())
    });

    observable.subscribe(Subscriber::on_next(|n| {
        println!("First Subscription value: {}", n)
    }));
    observable.subscribe(Subscriber::on_next(|n| {
        println!("Second Subscription value: {}", n)
    }));
}

// Disposing.

fn exclusive_execution() {
    log_section("Exclusive Execution");
    let mut source = interval(Duration::from_millis(100));

    let first = source.subscribe(Subscriber::on_next(|v| {
        println!("First Subscription value: {}", v)
    }));

    thread::sleep(Duration::from_millis(200));
    // A second subscription starts its own execution from zero.
    let second = source.subscribe(Subscriber::on_next(|v| {
        println!("Second Subscription value: {}", v)
    }));

    thread::sleep(Duration::from_millis(300));
    first.unsubscribe();
    second.unsubscribe();
    wait_for(first);
    wait_for(second);
}

fn dropped_subscription_keeps_running() {
    log_section("Dropped Subscription");

    let subscription = interval(Duration::from_millis(100))
        .take(4)
        .subscribe(Subscriber::on_next(|v| println!("Subscription value: {}", v)));

    // Dropping the handle does not unsubscribe; the producer goes on until
    // `take` is satisfied.
    drop(subscription);
    thread::sleep(Duration::from_millis(600));
}

fn unsubscribe_with_bag() {
    log_section("Subscription Bag");
    let mut source = interval(Duration::from_millis(100));
    let bag = SubscriptionBag::new();

    bag.add(source.subscribe(Subscriber::on_next(|v| println!("First: {}", v))));
    bag.add(source.subscribe(Subscriber::on_next(|v| println!("Second: {}", v))));

    thread::sleep(Duration::from_millis(350));
    println!("releasing {} subscriptions", bag.len());
    bag.unsubscribe();
    thread::sleep(Duration::from_millis(200));
}

// Creation.

fn basic_creation() {
    log_section("Observable::new");

    let mut observable = Observable::new(|mut o| {
        // Synchronous part.
        o.next(1);
        o.next(2);
        o.next(3);

        // Asynchronous part.
        let join_handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            o.next(4);
            o.complete();
            // Ignored, the subscriber already completed.
            o.next(5);
        });
        Ok(Subscription::new(
            Teardown::Nil,
            SubscriptionHandle::JoinThread(join_handle),
        ))
    });

    let first = observable.subscribe(Subscriber::on_next(|v| {
        println!("First Subscriber - Value: {}", v)
    }));
    let second = observable.subscribe(Subscriber::new(
        |v| println!("Second Subscriber - Value: {}", v),
        |e| println!("Second Subscriber - Error: {}", e),
        || println!("Second Subscriber - Complete"),
    ));
    println!("~End of synchronous results~");

    wait_for(first);
    wait_for(second);
}

fn creation_functions() {
    log_section("Creation Functions");

    let mut observer = Subscriber::on_next(|_: ()| println!("Next"));
    observer.on_complete(|| println!("Empty completed immediately"));
    Observable::empty().subscribe(observer);

    let mut observer = Subscriber::on_next(|v| println!("Value: {}", v));
    observer.on_complete(|| println!("Values complete"));
    Observable::of(vec![1, 2, 3]).subscribe(observer);

    Observable::from_iter("Rusty".chars().collect::<Vec<_>>())
        .subscribe(Subscriber::on_next(|c| println!("Char: {}", c)));

    Observable::range(1, 5).subscribe(Subscriber::on_next(|v| println!("Range: {}", v)));

    let mut observer = Subscriber::on_next(|_: i32| println!("Next"));
    observer.on_error(|e| println!("Error: {}", e));
    Observable::throw_error(Arc::new(LessonError)).subscribe(observer);
}

// Operators.

fn operator_order() {
    log_section("Operator Order");

    let subscription = interval(Duration::from_millis(50))
        .take(6)
        .tap(|v| println!("\nValue produced: {}", v))
        .filter(|v| v % 2 == 0)
        .tap(|v| println!("Value filtered: {}", v))
        .map(|v| v * 10)
        .tap(|v| println!("Value after map: {}", v))
        .subscribe(Subscriber::on_next(|v| println!("Value emitted: {}", v)));

    wait_for(subscription);
}

// Subjects.

fn basic_subject() {
    log_section("Subject");
    let (mut emitter, mut receiver) = Subject::emitter_receiver();

    println!("Create Subscriptions");
    // Subscribing does not start a new execution.
    receiver.subscribe(Subscriber::on_next(|v: i32| {
        println!("First Subscriber value: {}", v)
    }));
    receiver.subscribe(Subscriber::on_next(|v: i32| {
        println!("Second Subscriber value: {}", v)
    }));

    println!("Send Values");
    emitter.next(1);
    emitter.next(2);
}

fn behavior_subject() {
    log_section("Behavior Subject");
    let (mut emitter, mut receiver) = BehaviorSubject::emitter_receiver(1);

    println!("Create Subscriptions");
    // Each subscriber receives the current value right away.
    receiver.subscribe(Subscriber::on_next(|v: i32| {
        println!("First Subscriber value: {}", v)
    }));
    receiver.subscribe(Subscriber::on_next(|v: i32| {
        println!("Second Subscriber value: {}", v)
    }));

    println!("Send Values");
    emitter.next(2);
    emitter.next(3);
    println!("Current value: {}", emitter.value());
}

fn async_subject() {
    log_section("Async Subject");
    let (mut emitter, mut receiver) = AsyncSubject::emitter_receiver();

    println!("Create Subscriptions");
    // Only the last value is delivered, once the subject completes.
    receiver.subscribe(Subscriber::on_next(|v: i32| {
        println!("First Subscriber value: {}", v)
    }));
    receiver.subscribe(Subscriber::on_next(|v: i32| {
        println!("Second Subscriber value: {}", v)
    }));

    println!("Send Values");
    emitter.next(1);
    emitter.next(2);
    emitter.complete();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    cold_observable();
    hot_observable();

    exclusive_execution();
    dropped_subscription_keeps_running();
    unsubscribe_with_bag();

    basic_creation();
    creation_functions();

    operator_order();

    basic_subject();
    behavior_subject();
    async_subject();
}
