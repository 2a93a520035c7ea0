//! The `observable` module provides the building blocks for creating and composing
//! observables.

use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use tracing::{debug, trace};

use crate::{
    errors::{BoxError, ErrorPayload, ObservableError},
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, SubscriptionHandle, Teardown},
};

pub mod multicast;

pub use multicast::Connectable;

type Producer<T> = Box<dyn FnMut(Subscriber<T>) -> Result<Subscription, BoxError> + Send>;

/// The `Observable` struct represents a lazy source of values that can be observed
/// and transformed.
///
/// An `Observable` only stores its producer. Nothing runs until `subscribe` is
/// called, and every call runs the producer again from scratch with a fresh
/// `Subscriber`, so two subscriptions never share an execution. Sharing one
/// execution between subscribers is done explicitly with
/// [`share`](ObservableExt::share) or [`connectable`](ObservableExt::connectable).
///
/// The producer returns the `Subscription` that carries its teardown logic and,
/// for background producers, the handle of the thread or task doing the work.
/// Returning `Err` signals a synchronous fault: the error is delivered to the
/// subscriber's `error` handler instead of being raised to the caller of
/// `subscribe`. A panic inside the producer is treated the same way.
///
/// # Example: basic synchronous `Observable`
///
/// ```
/// use rxcore::subscribe::{Subscriber, Subscription};
/// use rxcore::{Observable, Observer, Subscribeable};
///
/// let mut emit_3_observable = Observable::new(|mut subscriber| {
///     for i in 1..=3 {
///         subscriber.next(i);
///     }
///     subscriber.complete();
///     Ok(Subscription::empty())
/// });
///
/// let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
/// observer.on_complete(|| println!("Completed"));
///
/// // Observables are cold: nothing is emitted until this line runs.
/// emit_3_observable.subscribe(observer);
/// ```
///
/// # Example: asynchronous `Observable` with teardown
///
/// ```no_run
/// use std::time::Duration;
///
/// use rxcore::subscribe::{Subscriber, Subscription, SubscriptionHandle, Teardown, Unsubscribeable};
/// use rxcore::{Observable, Observer, Subscribeable};
///
/// let mut observable = Observable::new(|mut o| {
///     let (tx, rx) = std::sync::mpsc::channel::<()>();
///     let join_handle = std::thread::spawn(move || {
///         for i in 0.. {
///             // Stop once the teardown signalled or the subscriber closed.
///             if rx.try_recv().is_ok() || o.is_closed() {
///                 break;
///             }
///             o.next(i);
///             std::thread::sleep(Duration::from_millis(1));
///         }
///         o.complete();
///     });
///
///     Ok(Subscription::new(
///         Teardown::logic(move || {
///             let _ = tx.send(());
///         }),
///         SubscriptionHandle::JoinThread(join_handle),
///     ))
/// });
///
/// let subscription = observable.subscribe(Subscriber::on_next(|v: i32| println!("{}", v)));
/// std::thread::sleep(Duration::from_millis(20));
/// subscription.unsubscribe();
/// ```
pub struct Observable<T> {
    subscribe_fn: Producer<T>,
}

impl<T: 'static> Observable<T> {
    /// Creates a new `Observable` from its producer.
    pub fn new(
        sf: impl FnMut(Subscriber<T>) -> Result<Subscription, BoxError> + Send + 'static,
    ) -> Self {
        Observable {
            subscribe_fn: Box::new(sf),
        }
    }

    /// An observable that completes immediately without emitting.
    #[must_use]
    pub fn empty() -> Self {
        Observable::new(|mut o| {
            o.complete();
            Ok(Subscription::empty())
        })
    }

    /// An observable that delivers `error` to every subscriber right away.
    pub fn throw_error(error: ErrorPayload) -> Self {
        Observable::new(move |mut o| {
            o.error(Arc::clone(&error));
            Ok(Subscription::empty())
        })
    }

    /// Emits every item of `iter`, then completes.
    ///
    /// The iterable is cloned for each subscription. Emission stops early once the
    /// subscriber is closed, so infinite iterators can be combined with
    /// [`take`](ObservableExt::take).
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + 'static,
    {
        Observable::new(move |mut o| {
            for v in iter.clone() {
                if o.is_closed() {
                    break;
                }
                o.next(v);
            }
            o.complete();
            Ok(Subscription::empty())
        })
    }

    /// Emits the given values in order, then completes.
    pub fn of(values: Vec<T>) -> Self
    where
        T: Clone + Send,
    {
        Observable::from_iter(values)
    }

    /// Runs the future produced by `factory` on the current Tokio runtime, emits its
    /// output and completes, or delivers its error.
    ///
    /// A new future is created for every subscription. Unsubscribing before the
    /// future resolves cancels it. Subscribing outside of a Tokio runtime delivers
    /// [`ObservableError::NoRuntime`].
    pub fn from_future<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Send,
    {
        Observable::new(move |mut o| {
            let handle =
                tokio::runtime::Handle::try_current().map_err(|_| ObservableError::NoRuntime)?;
            let future = factory();
            let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel::<()>();

            let join_handle = handle.spawn(async move {
                tokio::select! {
                    result = future => match result {
                        Ok(v) => {
                            o.next(v);
                            o.complete();
                        }
                        Err(e) => o.error(Arc::from(e)),
                    },
                    _ = cancel_rx => trace!("future observable cancelled"),
                }
            });

            Ok(Subscription::new(
                Teardown::logic(move || {
                    let _ = cancel_tx.send(());
                }),
                SubscriptionHandle::JoinTask(join_handle),
            ))
        })
    }
}

impl Observable<i64> {
    /// Emits `count` consecutive integers starting at `start`, then completes.
    ///
    /// The sequence stops after `i64::MAX` even if fewer than `count` values
    /// were emitted.
    #[must_use]
    pub fn range(start: i64, count: usize) -> Self {
        let offset = i64::try_from(count.saturating_sub(1)).unwrap_or(i64::MAX);
        let last = start.saturating_add(offset);
        Observable::from_iter((start..=last).take(count))
    }
}

impl<T: 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription {
        let mut observer = s.share();
        let mut subscription = s.subscription();
        trace!("subscribing to observable");

        match panic::catch_unwind(AssertUnwindSafe(|| (self.subscribe_fn)(s))) {
            Ok(Ok(mut inner)) => {
                subscription.subscription_future = inner.take_handle();
                if !inner.shares_state_with(&subscription) {
                    subscription.add(inner);
                }
            }
            Ok(Err(e)) => {
                debug!(error = %e, "producer failed during subscribe");
                observer.error(Arc::from(e));
            }
            Err(payload) => {
                let err = ObservableError::producer_panicked(payload.as_ref());
                debug!(error = %err, "producer panicked during subscribe");
                observer.error(Arc::new(err));
            }
        }
        subscription
    }
}

// Builds the subscriber an operator hands to its source. Errors and completion
// pass straight through, and closing `destination` unsubscribes the source even
// while the source is still emitting synchronously.
fn forward<T, U>(
    destination: &Subscriber<U>,
    mut next_fn: impl FnMut(T, &mut Subscriber<U>) + Send + 'static,
) -> Subscriber<T>
where
    T: 'static,
    U: Send + 'static,
{
    let mut dn = destination.share();
    let mut de = destination.share();
    let mut dc = destination.share();

    let upstream = Subscriber::new(
        move |v| next_fn(v, &mut dn),
        move |e| de.error(e),
        move || dc.complete(),
    );
    destination.add(upstream.subscription());
    upstream
}

/// Pipeline operators shared by [`Observable`] and every subject receiver.
///
/// Each operator returns a new cold `Observable`; the source is subscribed once
/// per subscription to the result.
pub trait ObservableExt<T: Send + 'static>: Subscribeable<ObsType = T> + Sized + Send + 'static {
    /// Transforms each item by applying `f`.
    fn map<U, F>(mut self, f: F) -> Observable<U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            let upstream = forward(&o, move |v, o| o.next(f(v)));
            Ok(self.subscribe(upstream))
        })
    }

    /// Emits only the items for which `predicate` returns `true`.
    fn filter<P>(mut self, predicate: P) -> Observable<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Observable::new(move |o| {
            let predicate = Arc::clone(&predicate);
            let upstream = forward(&o, move |v, o| {
                if predicate(&v) {
                    o.next(v);
                }
            });
            Ok(self.subscribe(upstream))
        })
    }

    /// Calls `f` with a reference to each item and passes the item on unchanged.
    fn tap<F>(mut self, f: F) -> Observable<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            let upstream = forward(&o, move |v, o| {
                f(&v);
                o.next(v);
            });
            Ok(self.subscribe(upstream))
        })
    }

    /// Emits the first `n` items, then completes and unsubscribes the source.
    fn take(mut self, n: usize) -> Observable<T> {
        Observable::new(move |mut o| {
            if n == 0 {
                o.complete();
                return Ok(Subscription::empty());
            }
            let mut taken = 0;
            let upstream = forward(&o, move |v, o| {
                taken += 1;
                o.next(v);
                if taken >= n {
                    o.complete();
                }
            });
            Ok(self.subscribe(upstream))
        })
    }

    /// Turns this source into a [`Connectable`] that starts emitting to all of its
    /// subscribers only when [`Connectable::connect`] is called.
    fn connectable(self) -> Connectable<T>
    where
        T: Clone,
    {
        Connectable::new(self)
    }

    /// Shares one execution of this source among all concurrent subscribers.
    ///
    /// The first subscriber connects the source; later subscribers join the running
    /// execution and only see values emitted after they subscribed. When the last
    /// subscriber leaves, or the source terminates, the execution is torn down and
    /// the next subscriber starts a new one.
    fn share(self) -> Observable<T>
    where
        T: Clone,
    {
        multicast::share(self)
    }
}

impl<T: Send + 'static> ObservableExt<T> for Observable<T> {}

impl<T: Clone + Send + 'static> From<Vec<T>> for Observable<T> {
    fn from(values: Vec<T>) -> Self {
        Observable::of(values)
    }
}
