mod custom_error;
mod register_emissions;

use custom_error::CustomError;
use register_emissions::{event_log_subscriber, tally, Emissions, Tally};
use rxcore::subjects::Subject;
use rxcore::subscribe::{Subscriber, Subscription, Unsubscribeable};
use rxcore::{Observable, ObservableExt, Observer, Subscribeable};
use std::sync::{Arc, Mutex};

#[test]
fn subject_emit_then_complete() {
    let emissions = Emissions::new();
    let (mut stx, mut srx) = Subject::emitter_receiver();

    // Nobody is listening yet, so this value is lost.
    stx.next(1);
    srx.subscribe(emissions.subscriber());
    assert_eq!((srx.len(), emissions.tally()), (1, Tally::default()));

    stx.next(2);
    stx.next(3);
    assert_eq!(emissions.tally(), tally(2, Some(3), 0, 0));

    // Newcomers only see what is emitted after they joined.
    srx.subscribe(emissions.subscriber());
    srx.subscribe(emissions.subscriber());
    stx.next(4);
    assert_eq!((srx.len(), emissions.tally()), (3, tally(5, Some(4), 0, 0)));

    stx.complete();
    assert_eq!((srx.len(), emissions.tally()), (0, tally(5, Some(4), 3, 0)));

    // A late subscriber completes right away and nothing is emitted anymore.
    let late = srx.subscribe(emissions.subscriber());
    stx.next(5);
    assert!(late.is_closed());
    assert_eq!((srx.len(), emissions.tally()), (0, tally(5, Some(4), 4, 0)));
}

#[test]
fn subject_emit_then_error() {
    let emissions = Emissions::new();
    let (mut stx, mut srx) = Subject::emitter_receiver();

    for _ in 0..3 {
        srx.subscribe(emissions.subscriber());
    }
    stx.next(1);
    stx.next(2);
    assert_eq!(emissions.tally(), tally(6, Some(2), 0, 0));

    stx.error(Arc::new(CustomError));
    assert_eq!((srx.len(), emissions.tally()), (0, tally(6, Some(2), 0, 3)));

    // The stored error is replayed to a late subscriber.
    srx.subscribe(emissions.subscriber());
    stx.next(3);
    stx.complete();
    assert_eq!(emissions.tally(), tally(6, Some(2), 0, 4));
    assert_eq!(
        emissions.error_messages(),
        vec!["custom error occurred"; 4]
    );
}

#[test]
fn two_observers_receive_same_value() {
    let (mut stx, mut srx) = Subject::emitter_receiver();
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    srx.subscribe(event_log_subscriber(&first));
    srx.subscribe(event_log_subscriber(&second));
    stx.next(5);
    stx.complete();

    let late = Arc::new(Mutex::new(Vec::new()));
    let late_subscription = srx.subscribe(event_log_subscriber(&late));

    assert_eq!(*first.lock().unwrap(), vec!["next 5", "complete"]);
    assert_eq!(*second.lock().unwrap(), vec!["next 5", "complete"]);
    assert_eq!(*late.lock().unwrap(), vec!["complete"]);
    assert!(late_subscription.is_closed());
}

#[test]
fn observer_unsubscribes_itself_during_broadcast() {
    let (mut stx, mut srx) = Subject::emitter_receiver();
    let holder: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let holder_c = Arc::clone(&holder);

    let received = Arc::new(Mutex::new(Vec::new()));
    let received_c = Arc::clone(&received);
    let quitter = srx.subscribe(Subscriber::on_next(move |v: i32| {
        received_c.lock().unwrap().push(v);
        if let Some(subscription) = holder_c.lock().unwrap().as_ref() {
            subscription.unsubscribe();
        }
    }));
    *holder.lock().unwrap() = Some(quitter);

    let others = Arc::new(Mutex::new(Vec::new()));
    srx.subscribe(event_log_subscriber(&others));

    stx.next(1);
    stx.next(2);

    assert_eq!(*received.lock().unwrap(), vec![1]);
    assert_eq!(*others.lock().unwrap(), vec!["next 1", "next 2"]);
    assert_eq!(srx.len(), 1);
}

#[test]
fn unsubscribing_a_later_observer_mid_broadcast_skips_only_it() {
    let (mut stx, mut srx) = Subject::emitter_receiver();
    let victim_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let victim_slot_c = Arc::clone(&victim_slot);

    let first = Arc::new(Mutex::new(Vec::new()));
    let first_c = Arc::clone(&first);
    srx.subscribe(Subscriber::on_next(move |v: i32| {
        first_c.lock().unwrap().push(v);
        if let Some(victim) = victim_slot_c.lock().unwrap().take() {
            victim.unsubscribe();
        }
    }));

    let victim = Arc::new(Mutex::new(Vec::new()));
    *victim_slot.lock().unwrap() = Some(srx.subscribe(event_log_subscriber(&victim)));

    let last = Arc::new(Mutex::new(Vec::new()));
    srx.subscribe(event_log_subscriber(&last));

    stx.next(1);
    stx.next(2);

    assert_eq!(*first.lock().unwrap(), vec![1, 2]);
    assert!(victim.lock().unwrap().is_empty());
    assert_eq!(*last.lock().unwrap(), vec!["next 1", "next 2"]);
}

#[test]
fn complete_from_handler_reaches_later_observers_after_current_value() {
    let (mut stx, mut srx) = Subject::emitter_receiver();

    let mut stx_c = stx.clone();
    let first = Arc::new(Mutex::new(Vec::new()));
    let first_c = Arc::clone(&first);
    srx.subscribe(Subscriber::on_next(move |v: i32| {
        first_c.lock().unwrap().push(v);
        stx_c.complete();
    }));

    let second = Arc::new(Mutex::new(Vec::new()));
    srx.subscribe(event_log_subscriber(&second));

    stx.next(1);
    stx.next(2);

    assert_eq!(*first.lock().unwrap(), vec![1]);
    assert_eq!(*second.lock().unwrap(), vec!["next 1", "complete"]);
    assert!(srx.is_closed());
}

#[test]
fn next_from_handler_keeps_order_for_every_observer() {
    let (mut stx, mut srx) = Subject::emitter_receiver();

    let mut stx_c = stx.clone();
    srx.subscribe(Subscriber::on_next(move |v: i32| {
        if v < 3 {
            stx_c.next(v + 1);
        }
    }));

    let logs: Vec<_> = (0..2).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
    for log in &logs {
        srx.subscribe(event_log_subscriber(log));
    }

    stx.next(1);

    for log in &logs {
        assert_eq!(*log.lock().unwrap(), vec!["next 1", "next 2", "next 3"]);
    }
}

#[test]
fn panicking_observer_does_not_stop_broadcast() {
    let (mut stx, mut srx) = Subject::emitter_receiver();

    srx.subscribe(Subscriber::on_next(|v: i32| {
        if v == 1 {
            panic!("observer failed on {v}");
        }
    }));
    let after = Arc::new(Mutex::new(Vec::new()));
    srx.subscribe(event_log_subscriber(&after));

    stx.next(1);
    stx.next(2);
    stx.complete();

    assert_eq!(*after.lock().unwrap(), vec!["next 1", "next 2", "complete"]);
}

#[test]
fn emitter_subscribes_to_observable() {
    let (stx, mut srx) = Subject::emitter_receiver();
    let log = Arc::new(Mutex::new(Vec::new()));
    srx.subscribe(event_log_subscriber(&log));

    Observable::of(vec![1, 2, 3]).subscribe(stx.into());

    assert_eq!(
        *log.lock().unwrap(),
        vec!["next 1", "next 2", "next 3", "complete"]
    );
}

#[test]
fn receiver_operators_and_unsubscribe() {
    let (mut stx, srx) = Subject::emitter_receiver();
    let log = Arc::new(Mutex::new(Vec::new()));

    srx.clone()
        .filter(|v| *v > 1)
        .map(|v| v * 2)
        .subscribe(event_log_subscriber(&log));

    stx.next(1);
    stx.next(2);
    srx.unsubscribe();
    stx.next(3);
    stx.complete();

    assert_eq!(*log.lock().unwrap(), vec!["next 4"]);
    assert!(srx.is_closed());
    assert!(srx.is_empty());
}
