use std::{
    sync::{mpsc, Arc, Mutex},
    time::Duration,
};

use rxcore::{
    subscribe::{Subscriber, Subscription, SubscriptionHandle, Teardown},
    Observable, Observer,
};

/// Observable that emits `0..=end` from its own OS thread, one value per
/// millisecond, and stops early when unsubscribed. `last_emit_assert` is called
/// with the last emitted value once the thread finishes.
pub fn generate_u32_observable(
    end: u32,
    last_emit_assert: impl FnMut(u32) + Send + 'static,
) -> Observable<u32> {
    let last_emit_assert = Arc::new(Mutex::new(last_emit_assert));

    Observable::new(move |mut o: Subscriber<_>| {
        let (tx, rx) = mpsc::channel::<()>();
        let last_emit_assert = Arc::clone(&last_emit_assert);

        let jh = std::thread::spawn(move || {
            let mut last_emit = 0;

            for i in 0..=end {
                if rx.try_recv().is_ok() || o.is_closed() {
                    break;
                }
                last_emit = i;
                o.next(i);
                std::thread::sleep(Duration::from_millis(1));
            }
            o.complete();
            (last_emit_assert.lock().unwrap())(last_emit);
        });

        Ok(Subscription::new(
            Teardown::logic(move || {
                if tx.send(()).is_err() {
                    eprintln!("producer thread already finished");
                }
            }),
            SubscriptionHandle::JoinThread(jh),
        ))
    })
}
