//! Subjects multicast: every value sent through the emitter reaches all observers
//! currently registered on the receiver. This example walks through the plain,
//! behavior and async subjects, and uses an emitter as the observer of an
//! `Observable`.
//!
//! To run this example, execute `cargo run --example subjects`.

use std::{fmt::Display, sync::Arc};

use rxcore::{
    subscribe::{Subscriber, Unsubscribeable},
    AsyncSubject, BehaviorSubject, Observable, ObservableExt, Observer, Subject, Subscribeable,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
#[error("sensor went offline")]
struct SensorOffline;

pub fn create_subscriber<T: Display>(subscriber_id: i32) -> Subscriber<T> {
    Subscriber::new(
        move |v| println!("Subscriber #{} emitted: {}", subscriber_id, v),
        move |e| eprintln!("Subscriber #{} error: {}", subscriber_id, e),
        move || println!("Completed {}", subscriber_id),
    )
}

fn subject() {
    println!("\n--- Subject ---");
    let (mut emitter, mut receiver) = Subject::emitter_receiver();

    receiver.subscribe(create_subscriber(1));

    emitter.next(101);
    emitter.next(102);

    // All Observable operators can be applied to the receiver. Cloning it only
    // clones the pointer to the shared subject.
    receiver
        .clone()
        .map(|v| format!("mapped {}", v))
        .subscribe(create_subscriber(2));

    let subscription3 = receiver.subscribe(create_subscriber(3));

    // Reaches subscribers 1, 2 and 3.
    emitter.next(103);

    // Subscriber 3 leaves; the others keep receiving.
    subscription3.unsubscribe();
    emitter.next(104);

    emitter.complete();

    // Subscribing after completion completes immediately.
    receiver.subscribe(create_subscriber(4));

    // Called post-completion, does not emit.
    emitter.next(105);
}

fn behavior_subject() {
    println!("\n--- BehaviorSubject ---");
    let (mut emitter, mut receiver) = BehaviorSubject::emitter_receiver(100);

    // Receives the seed value right away.
    receiver.subscribe(create_subscriber(1));

    emitter.next(101);
    emitter.next(102);

    // Receives 102, the latest value, then everything after.
    receiver.subscribe(create_subscriber(2));
    emitter.next(103);

    emitter.error(Arc::new(SensorOffline));

    // Late subscribers get the error.
    receiver.subscribe(create_subscriber(3));
}

fn async_subject() {
    println!("\n--- AsyncSubject ---");
    let (mut emitter, mut receiver) = AsyncSubject::emitter_receiver();

    receiver.subscribe(create_subscriber(1));

    // Nothing is delivered until completion.
    emitter.next(101);
    emitter.next(102);
    receiver.subscribe(create_subscriber(2));

    // Subscribers 1 and 2 receive 102, then complete.
    emitter.complete();

    // Subscriber 3 also receives 102 and completes.
    receiver.subscribe(create_subscriber(3));
}

fn subject_as_observer() {
    println!("\n--- Subject as observer ---");
    let (emitter, mut receiver) = Subject::emitter_receiver();

    receiver.subscribe(create_subscriber(1));
    receiver.subscribe(create_subscriber(2));

    // The emitter turns into a `Subscriber`, so one execution of the observable
    // is multicast to both subscribers.
    Observable::range(1, 3).subscribe(emitter.into());
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    subject();
    behavior_subject();
    async_subject();
    subject_as_observer();
}
