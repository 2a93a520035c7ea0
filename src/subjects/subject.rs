use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    errors::ErrorPayload,
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable, ObservableExt,
};

use super::{close_receiver, emit, removal, Emission, Multicast, Observers};

/// A multicast source: every value pushed through the emitter reaches all
/// observers registered on the receiver at that moment.
///
/// An `Observable` runs its producer once per subscriber. A `Subject` has no
/// producer of its own. Subscribing does not start an execution; it only adds the observer to the
/// list that receives the next `next`, `error` or `complete` call. Nothing is
/// replayed to new subscribers.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use rxcore::{subjects::Subject, subscribe::Subscriber};
/// use rxcore::{ObservableExt, Observer, Subscribeable};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let (mut emitter, mut receiver) = Subject::emitter_receiver();
///
/// let seen_c = Arc::clone(&seen);
/// receiver.subscribe(Subscriber::on_next(move |v: i32| seen_c.lock().unwrap().push(v)));
/// emitter.next(101);
///
/// // Operators work on a clone of the receiver; both observers get 102.
/// let seen_c = Arc::clone(&seen);
/// receiver
///     .clone()
///     .map(|v| v + 1000)
///     .subscribe(Subscriber::on_next(move |v| seen_c.lock().unwrap().push(v)));
/// emitter.next(102);
///
/// emitter.complete();
/// // Ignored once completed.
/// emitter.next(103);
///
/// assert_eq!(*seen.lock().unwrap(), vec![101, 102, 1102]);
/// ```
pub struct Subject<T> {
    observers: Observers<T>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Creates a new pair of `SubjectEmitter` for emitting values and
    /// `SubjectReceiver` for subscribing to values.
    #[must_use]
    pub fn emitter_receiver() -> (SubjectEmitter<T>, SubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(Subject {
            observers: Observers::new(),
        }));

        (
            SubjectEmitter(Arc::clone(&s)),
            SubjectReceiver(Arc::clone(&s)),
        )
    }
}

impl<T: Send + 'static> Multicast for Subject<T> {
    type Item = T;

    fn observers(&mut self) -> &mut Observers<T> {
        &mut self.observers
    }
}

/// Observable side of a [`Subject`].
///
/// `subscribe` registers an observer; `unsubscribe` closes the subject and drops
/// every registered observer. Clones refer to the same subject.
#[derive(Clone)]
pub struct SubjectReceiver<T>(Arc<Mutex<Subject<T>>>);

/// Observer side of a [`Subject`]. Each `next`, `error` or `complete` is
/// broadcast to the observers registered when the call is made.
///
/// Calls made from inside an observer's handler are delivered after the
/// broadcast in progress has reached every observer.
#[derive(Clone)]
pub struct SubjectEmitter<T>(Arc<Mutex<Subject<T>>>);

impl<T> SubjectReceiver<T> {
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

impl<T: Clone + Send + 'static> Subscribeable for SubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, mut s: Subscriber<Self::ObsType>) -> Subscription {
        let mut src = self.0.lock();
        if let Some(replay) = src.observers.replay() {
            drop(src);
            replay.deliver(&mut s);
            return s.subscription();
        }
        let key = src.observers.push(&s);
        drop(src);

        s.add(removal(&self.0, key));
        s.subscription()
    }
}

impl<T: Send + 'static> Unsubscribeable for SubjectReceiver<T> {
    fn unsubscribe(&self) {
        close_receiver(&self.0);
    }
}

impl<T: Clone + Send + 'static> Observer for SubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        emit(&self.0, |_| Emission::Next(v));
    }

    fn error(&mut self, e: ErrorPayload) {
        emit(&self.0, |_| Emission::Error(e));
    }

    fn complete(&mut self) {
        emit(&self.0, |_| Emission::Complete(None));
    }
}

impl<T: Clone + Send + 'static> From<SubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<SubjectReceiver<T>> for Observable<T> {
    fn from(mut value: SubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| Ok(value.subscribe(subscriber)))
    }
}

impl<T: Clone + Send + 'static> ObservableExt<T> for SubjectReceiver<T> {}
