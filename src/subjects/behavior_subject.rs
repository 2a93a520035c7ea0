use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    errors::ErrorPayload,
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable, ObservableExt,
};

use super::{close_receiver, emit, removal, Emission, Multicast, Observers};

/// `BehaviorSubject` is a subject that stores a current value and hands it to
/// every new observer as soon as it subscribes.
///
/// It is created with an initial value. Each `next` call replaces the stored value
/// and forwards it to all registered observers, so a late subscriber always starts
/// from the most recent value instead of the one it was seeded with.
///
/// # Examples
///
/// ```
/// use rxcore::{subjects::BehaviorSubject, subscribe::Subscriber};
/// use rxcore::{Observer, Subscribeable};
///
/// let (mut emitter, mut receiver) = BehaviorSubject::emitter_receiver(1);
///
/// // Receives 1 right away.
/// receiver.subscribe(Subscriber::on_next(|v| println!("Subscriber #1 emitted: {}", v)));
///
/// emitter.next(2); // Subscriber 1 receives 2.
///
/// // Receives 2 right away, never 1.
/// receiver.subscribe(Subscriber::on_next(|v| println!("Subscriber #2 emitted: {}", v)));
///
/// assert_eq!(emitter.value(), 2);
/// emitter.complete();
/// ```
pub struct BehaviorSubject<T> {
    value: T,
    observers: Observers<T>,
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
    /// Creates a new pair of `BehaviorSubjectEmitter` for emitting values and
    /// `BehaviorSubjectReceiver` for subscribing to values, seeded with `value`.
    pub fn emitter_receiver(value: T) -> (BehaviorSubjectEmitter<T>, BehaviorSubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(BehaviorSubject {
            value,
            observers: Observers::new(),
        }));

        (
            BehaviorSubjectEmitter(Arc::clone(&s)),
            BehaviorSubjectReceiver(Arc::clone(&s)),
        )
    }
}

impl<T: Send + 'static> Multicast for BehaviorSubject<T> {
    type Item = T;

    fn observers(&mut self) -> &mut Observers<T> {
        &mut self.observers
    }
}

/// Subscription handler for `BehaviorSubject`.
#[derive(Clone)]
pub struct BehaviorSubjectReceiver<T>(Arc<Mutex<BehaviorSubject<T>>>);

/// Multicasting emitter for `BehaviorSubject`.
#[derive(Clone)]
pub struct BehaviorSubjectEmitter<T>(Arc<Mutex<BehaviorSubject<T>>>);

impl<T: Clone> BehaviorSubjectEmitter<T> {
    /// Returns a copy of the current value.
    ///
    /// After the subject terminated this is the last value it held.
    pub fn value(&self) -> T {
        self.0.lock().value.clone()
    }
}

impl<T> BehaviorSubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the subject completed, errored or was unsubscribed.
    pub fn is_closed(&self) -> bool {
        !self.0.lock().observers.is_active()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for BehaviorSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, mut s: Subscriber<Self::ObsType>) -> Subscription {
        let mut src = self.0.lock();
        if let Some(replay) = src.observers.replay() {
            drop(src);
            replay.deliver(&mut s);
            return s.subscription();
        }
        let key = src.observers.push(&s);
        let current = src.value.clone();

        // Broadcasts issued once the subject lock is released already include
        // this observer; they wait on its delivery lock until it has seen
        // `current`.
        let mut seed = s.share();
        s.exclusive(move || {
            drop(src);
            seed.next(current);
        });

        s.add(removal(&self.0, key));
        s.subscription()
    }
}

impl<T: Send + 'static> Unsubscribeable for BehaviorSubjectReceiver<T> {
    fn unsubscribe(&self) {
        close_receiver(&self.0);
    }
}

impl<T: Clone + Send + 'static> Observer for BehaviorSubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        emit(&self.0, |src: &mut BehaviorSubject<T>| {
            src.value = v.clone();
            Emission::Next(v)
        });
    }

    fn error(&mut self, e: ErrorPayload) {
        emit(&self.0, |_| Emission::Error(e));
    }

    fn complete(&mut self) {
        emit(&self.0, |_| Emission::Complete(None));
    }
}

impl<T: Clone + Send + 'static> From<BehaviorSubjectEmitter<T>> for Subscriber<T> {
    fn from(value: BehaviorSubjectEmitter<T>) -> Self {
        let mut vn = value.clone();
        let mut ve = value.clone();
        let mut vc = value;
        Subscriber::new(
            move |v| vn.next(v),
            move |e| ve.error(e),
            move || vc.complete(),
        )
    }
}

impl<T: Clone + Send + 'static> From<BehaviorSubjectReceiver<T>> for Observable<T> {
    fn from(mut value: BehaviorSubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| Ok(value.subscribe(subscriber)))
    }
}

impl<T: Clone + Send + 'static> ObservableExt<T> for BehaviorSubjectReceiver<T> {}
