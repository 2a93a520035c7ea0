//! Module for handling observables with multicast capabilities.
//!
//! Both wrappers here make a cold source hot by routing it through a [`Subject`]:
//! the source is subscribed once and every registered subscriber receives the
//! same emissions.
//!
//! - [`Connectable`] starts the source only when `connect()` is called.
//! - [`share`](crate::ObservableExt::share) connects on the first subscriber and
//!   disconnects when the last one leaves.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    subjects::{SubjectEmitter, SubjectReceiver},
    subscribe::{Subscriber, Subscription, Teardown},
    Observable, ObservableExt, Subject, Subscribeable, Unsubscribeable,
};

/// Multicasting observable with a `connect()` method for subscribing to an
/// underlying source once on behalf of all of its subscribers.
///
/// Subscribing to a `Connectable` only registers the subscriber on an internal
/// subject; nothing is emitted until [`connect`](Connectable::connect) is called.
/// Subscribers registered after `connect` receive only the values emitted after
/// they subscribed.
///
/// # Examples
///
/// ```
/// use rxcore::{subscribe::{Subscriber, Unsubscribeable}, Observable, ObservableExt, Subscribeable};
///
/// let mut connectable = Observable::from_iter(1..=3).connectable();
///
/// connectable.subscribe(Subscriber::on_next(|v| println!("Subscriber #1 emitted: {}", v)));
/// connectable.subscribe(Subscriber::on_next(|v| println!("Subscriber #2 emitted: {}", v)));
///
/// // Both subscribers receive 1, 2 and 3 from a single run of the source.
/// let connection = connectable.connect();
/// connection.unsubscribe();
/// ```
#[derive(Clone)]
pub struct Connectable<T> {
    source: Arc<Mutex<Option<Observable<T>>>>,
    subject: (SubjectEmitter<T>, SubjectReceiver<T>),
    connection: Arc<Mutex<Option<Subscription>>>,
}

impl<T: Clone + Send + 'static> Connectable<T> {
    /// Creates a new instance of a `Connectable` observable.
    ///
    /// Typically the [`connectable()`](crate::ObservableExt::connectable) operator
    /// is used instead.
    pub fn new<S>(mut source: S) -> Self
    where
        S: Subscribeable<ObsType = T> + Send + 'static,
    {
        Connectable {
            source: Arc::new(Mutex::new(Some(Observable::new(move |s| {
                Ok(source.subscribe(s))
            })))),
            subject: Subject::emitter_receiver(),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribes the source and starts multicasting to all registered
    /// subscribers.
    ///
    /// The returned subscription disconnects the source when unsubscribed and can
    /// be joined to await a source that emits on a thread or task. Calling
    /// `connect` again while connected returns another handle to the running
    /// connection; after a disconnect it subscribes the source again.
    #[must_use]
    pub fn connect(&self) -> Subscription {
        if let Some(existing) = self.connection.lock().as_ref() {
            if !existing.is_closed() {
                return existing.share();
            }
        }

        let Some(mut source) = self.source.lock().take() else {
            // `connect` was called from a handler while the source is emitting.
            return self
                .connection
                .lock()
                .as_ref()
                .map_or_else(Subscription::empty, Subscription::share);
        };
        debug!("connecting source");
        let mut connection = source.subscribe(self.subject.0.clone().into());
        *self.source.lock() = Some(source);

        let mut handle = connection.share();
        handle.subscription_future = connection.take_handle();
        *self.connection.lock() = Some(connection);
        handle
    }

    /// Returns `true` while the source is connected and has not terminated.
    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|c| !c.is_closed())
    }
}

impl<T: Clone + Send + 'static> Subscribeable for Connectable<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription {
        self.subject.1.subscribe(s)
    }
}

impl<T: Clone + Send + 'static> ObservableExt<T> for Connectable<T> {}

struct ShareState<T> {
    // Taken out while it is being subscribed.
    source: Option<Observable<T>>,
    subject: Option<(SubjectEmitter<T>, SubjectReceiver<T>)>,
    connection: Option<Subscription>,
    ref_count: usize,
    // Bumped every time a new subject is created so that releases from an old
    // execution do not touch the current one.
    generation: u64,
    // A subscriber needed a new connection while the source was still running.
    reconnect: bool,
}

pub(crate) fn share<S, T>(mut source: S) -> Observable<T>
where
    S: Subscribeable<ObsType = T> + Send + 'static,
    T: Clone + Send + 'static,
{
    let state = Arc::new(Mutex::new(ShareState {
        source: Some(Observable::new(move |s| Ok(source.subscribe(s)))),
        subject: None,
        connection: None,
        ref_count: 0,
        generation: 0,
        reconnect: false,
    }));

    Observable::new(move |o| {
        let (mut receiver, generation, fresh) = {
            let mut st = state.lock();
            let (receiver, fresh) = match &st.subject {
                Some((_, receiver)) if !receiver.is_closed() => (receiver.clone(), false),
                _ => {
                    let pair = Subject::emitter_receiver();
                    let receiver = pair.1.clone();
                    st.subject = Some(pair);
                    st.generation += 1;
                    st.ref_count = 0;
                    (receiver, true)
                }
            };
            st.ref_count += 1;
            trace!(ref_count = st.ref_count, "shared observable subscribed");
            (receiver, st.generation, fresh)
        };

        let weak = Arc::downgrade(&state);
        o.add(Teardown::logic(move || release(&weak, generation)));
        receiver.subscribe(o);

        if fresh {
            connect(&state);
        }
        Ok(Subscription::empty())
    })
}

fn connect<T: Clone + Send + 'static>(state: &Mutex<ShareState<T>>) {
    loop {
        let (mut source, emitter, generation) = {
            let mut st = state.lock();
            if st.subject.is_none() || st.connection.is_some() {
                return;
            }
            let Some(source) = st.source.take() else {
                // The source is running further up this stack.
                st.reconnect = true;
                return;
            };
            st.reconnect = false;
            let Some((emitter, _)) = st.subject.clone() else {
                st.source = Some(source);
                return;
            };
            (source, emitter, st.generation)
        };

        debug!(generation, "connecting shared source");
        let connection = source.subscribe(emitter.into());

        let (stale, again) = {
            let mut st = state.lock();
            st.source = Some(source);
            let stale = if st.generation == generation && st.ref_count > 0 {
                st.connection = Some(connection);
                None
            } else {
                Some(connection)
            };
            (stale, st.reconnect)
        };
        if let Some(stale) = stale {
            stale.unsubscribe();
        }
        if !again {
            return;
        }
    }
}

fn release<T>(state: &Weak<Mutex<ShareState<T>>>, generation: u64) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let connection = {
        let mut st = state.lock();
        if st.generation != generation || st.ref_count == 0 {
            return;
        }
        st.ref_count -= 1;
        trace!(ref_count = st.ref_count, "shared observable released");
        if st.ref_count > 0 {
            return;
        }
        st.subject = None;
        st.connection.take()
    };
    if let Some(connection) = connection {
        debug!(generation, "last subscriber left, disconnecting shared source");
        connection.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use parking_lot::Mutex;

    use crate::{
        observer::Observer,
        subscribe::{Subscriber, Unsubscribeable},
        Observable, ObservableExt, Subject, Subscribeable,
    };

    #[test]
    fn connect_twice_returns_running_connection() {
        let (_tx, rx) = Subject::<i32>::emitter_receiver();
        let connectable = Observable::from(rx.clone()).connectable();

        let first = connectable.connect();
        let second = connectable.connect();
        assert!(connectable.is_connected());
        assert_eq!(rx.len(), 1);

        second.unsubscribe();
        assert!(first.is_closed());
        assert!(!connectable.is_connected());
    }

    #[test]
    fn share_resubscribes_after_last_subscriber_leaves() {
        let subscribes = Arc::new(AtomicUsize::new(0));
        let subscribes_c = Arc::clone(&subscribes);
        let (mut tx, rx) = Subject::<i32>::emitter_receiver();
        let mut rx_source = rx.clone();

        let mut shared = Observable::new(move |o| {
            subscribes_c.fetch_add(1, Ordering::SeqCst);
            Ok(rx_source.subscribe(o))
        })
        .share();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_c = Arc::clone(&received);
        let first = shared.subscribe(Subscriber::on_next(move |v| received_c.lock().push(v)));
        let second = shared.subscribe(Subscriber::on_next(|_: i32| {}));
        assert_eq!(subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(rx.len(), 1);

        tx.next(1);
        first.unsubscribe();
        second.unsubscribe();
        assert_eq!(rx.len(), 0);

        shared.subscribe(Subscriber::on_next(|_: i32| {}));
        assert_eq!(subscribes.load(Ordering::SeqCst), 2);
        assert_eq!(*received.lock(), vec![1]);
    }
}
