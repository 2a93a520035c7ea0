use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    errors::ErrorPayload,
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable, ObservableExt,
};

use super::{close_receiver, emit, removal, Emission, Multicast, Observers, Replay};

/// A `Subject` variant that emits only its last value, and only once it completes.
///
/// `AsyncSubject` keeps the most recent value passed to `next` without delivering
/// it. When `complete` is called, every registered observer receives that value
/// (if there was one) followed by the completion. Observers subscribing after
/// completion get the same pair right away.
///
/// If `error` is called instead, the stored value is never emitted and the error is
/// propagated to current and future observers.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use rxcore::{subjects::AsyncSubject, subscribe::Subscriber};
/// use rxcore::{Observer, Subscribeable};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let (mut emitter, mut receiver) = AsyncSubject::emitter_receiver();
///
/// let seen_c = Arc::clone(&seen);
/// receiver.subscribe(Subscriber::on_next(move |v: i32| seen_c.lock().unwrap().push(v)));
///
/// emitter.next(101);
/// emitter.next(102);
/// assert!(seen.lock().unwrap().is_empty());
///
/// emitter.complete();
///
/// // Subscribing after completion still yields the last value.
/// let seen_c = Arc::clone(&seen);
/// receiver.subscribe(Subscriber::on_next(move |v: i32| seen_c.lock().unwrap().push(v)));
///
/// assert_eq!(*seen.lock().unwrap(), vec![102, 102]);
/// ```
pub struct AsyncSubject<T> {
    value: Option<T>,
    observers: Observers<T>,
}

impl<T: Clone + Send + 'static> AsyncSubject<T> {
    /// Creates a new pair of `AsyncSubjectEmitter` for emitting values and
    /// `AsyncSubjectReceiver` for subscribing to values.
    #[must_use]
    pub fn emitter_receiver() -> (AsyncSubjectEmitter<T>, AsyncSubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(AsyncSubject {
            value: None,
            observers: Observers::new(),
        }));

        (
            AsyncSubjectEmitter(Arc::clone(&s)),
            AsyncSubjectReceiver(Arc::clone(&s)),
        )
    }
}

impl<T: Send + 'static> Multicast for AsyncSubject<T> {
    type Item = T;

    fn observers(&mut self) -> &mut Observers<T> {
        &mut self.observers
    }
}

/// Subscription handler for `AsyncSubject`.
#[derive(Clone)]
pub struct AsyncSubjectReceiver<T>(Arc<Mutex<AsyncSubject<T>>>);

/// Multicasting emitter for `AsyncSubject`.
#[derive(Clone)]
pub struct AsyncSubjectEmitter<T>(Arc<Mutex<AsyncSubject<T>>>);

impl<T> AsyncSubjectReceiver<T> {
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

impl<T: Clone + Send + 'static> Subscribeable for AsyncSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, mut s: Subscriber<Self::ObsType>) -> Subscription {
        let mut src = self.0.lock();
        if let Some(replay) = src.observers.replay() {
            let last = match replay {
                Replay::Complete => src.value.clone(),
                _ => None,
            };
            drop(src);
            if let Some(v) = last {
                s.next(v);
            }
            replay.deliver(&mut s);
            return s.subscription();
        }
        let key = src.observers.push(&s);
        drop(src);

        s.add(removal(&self.0, key));
        s.subscription()
    }
}

impl<T: Send + 'static> Unsubscribeable for AsyncSubjectReceiver<T> {
    fn unsubscribe(&self) {
        close_receiver(&self.0);
    }
}

impl<T: Clone + Send + 'static> Observer for AsyncSubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        let mut src = self.0.lock();
        if src.observers.is_active() {
            src.value = Some(v);
        }
    }

    fn error(&mut self, e: ErrorPayload) {
        emit(&self.0, |_| Emission::Error(e));
    }

    fn complete(&mut self) {
        emit(&self.0, |src: &mut AsyncSubject<T>| {
            debug!(has_value = src.value.is_some(), "async subject completing");
            Emission::Complete(src.value.clone())
        });
    }
}

impl<T: Clone + Send + 'static> From<AsyncSubjectEmitter<T>> for Subscriber<T> {
    fn from(value: AsyncSubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<AsyncSubjectReceiver<T>> for Observable<T> {
    fn from(mut value: AsyncSubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| Ok(value.subscribe(subscriber)))
    }
}

impl<T: Clone + Send + 'static> ObservableExt<T> for AsyncSubjectReceiver<T> {}
