use std::{
    any::Any,
    cell::RefCell,
    collections::VecDeque,
    future::Future,
    mem,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle as ThreadJoinHandle,
};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

pub use crate::subscription::bag::SubscriptionBag;

use crate::{
    config::report_unhandled,
    errors::{ErrorPayload, ObservableError},
    observer::Observer,
};

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values emitted by an observable stream.
pub trait Subscribeable {
    /// The type of items emitted by the observable stream.
    type ObsType;

    /// Subscribes to the observable stream and specifies how to handle emitted values.
    ///
    /// The `Subscriber` defines the behavior for processing values, errors and
    /// completion. The returned `Subscription` shares the subscriber's closed
    /// state and can be used to cancel delivery or to await a background producer.
    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription;
}

/// A trait for types that can be unsubscribed, releasing the resources held by a
/// subscription and signalling the producer to stop emitting.
///
/// Unsubscribing is idempotent: the teardown logic runs at most once no matter
/// how many times this is called, and it is safe to call from inside an
/// observer's own handler.
pub trait Unsubscribeable {
    fn unsubscribe(&self);
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(ErrorPayload) + Send>;

pub(crate) enum Notification<T> {
    Next(T),
    Error(ErrorPayload),
    Complete,
}

impl<T> Notification<T> {
    fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }
}

// Normalized observer record. Every way of building a `Subscriber` ends up here,
// with missing handlers left as `None`.
struct Handlers<T> {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl<T> Handlers<T> {
    fn dispatch(&mut self, notification: Notification<T>) {
        match notification {
            Notification::Next(v) => {
                if let Some(nfn) = &mut self.next {
                    guarded("next", || nfn(v));
                }
            }
            Notification::Error(e) => match &mut self.error {
                Some(efn) => guarded("error", || efn(e)),
                None => report_unhandled(ObservableError::Unhandled { cause: e }),
            },
            Notification::Complete => {
                if let Some(cfn) = &mut self.complete {
                    guarded("complete", || cfn());
                }
            }
        }
    }
}

// A panicking handler must not take down the producer or other observers.
fn guarded(handler: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        report_unhandled(ObservableError::handler_panicked(handler, payload.as_ref()));
    }
}

struct Dispatch<T> {
    handlers: RefCell<Handlers<T>>,
    // Notifications issued from inside one of this subscriber's own handlers.
    queue: RefCell<VecDeque<Notification<T>>>,
}

/// Closed state and teardown list shared by a `Subscriber` and every
/// `Subscription` handle that refers to it.
pub(crate) struct SubscriptionCore {
    // No further notifications are accepted.
    stopped: AtomicBool,
    // Teardown has run.
    closed: AtomicBool,
    teardowns: Mutex<Vec<Teardown>>,
    runtime_handle: Option<runtime::Handle>,
}

impl SubscriptionCore {
    fn new() -> Arc<Self> {
        Arc::new(SubscriptionCore {
            stopped: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            teardowns: Mutex::new(Vec::new()),
            runtime_handle: runtime::Handle::try_current().ok(),
        })
    }

    fn is_closed(&self) -> bool {
        self.stopped.load(Ordering::Acquire) || self.closed.load(Ordering::Acquire)
    }

    fn is_torn_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Returns `true` only for the call that moved the core into the stopped state.
    fn stop(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }

    fn add(&self, teardown: Teardown) {
        if let Teardown::Nil = teardown {
            return;
        }
        let mut teardowns = self.teardowns.lock();
        if !self.closed.load(Ordering::Acquire) {
            teardowns.push(teardown);
            return;
        }
        drop(teardowns);
        // Already closed, run it right away.
        teardown.execute(self.runtime_handle.as_ref());
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let teardowns = mem::take(&mut *self.teardowns.lock());
        trace!(count = teardowns.len(), "running teardown");
        for teardown in teardowns {
            teardown.execute(self.runtime_handle.as_ref());
        }
    }

    fn unsubscribe(&self) {
        self.stopped.store(true, Ordering::Release);
        self.close();
    }
}

/// A type that acts as an observer, allowing users to handle emitted values, errors,
/// and completion when subscribing to an `Observable` or `Subject`.
///
/// A `Subscriber` is also the handle a producer receives: calling `next`, `error`
/// and `complete` on it routes notifications to the registered handlers. Once
/// `error` or `complete` has been delivered, or the subscription has been
/// unsubscribed, every further notification is silently dropped.
///
/// Handlers are optional; a missing `next` or `complete` handler is a no-op. An
/// error reaching a subscriber without an `error` handler still closes it and
/// runs its teardown, and is then reported to the configured
/// [`UnhandledErrorPolicy`](crate::config::UnhandledErrorPolicy).
pub struct Subscriber<NextFnType> {
    dispatch: Arc<ReentrantMutex<Dispatch<NextFnType>>>,
    core: Arc<SubscriptionCore>,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` with custom handling functions for emitted
    /// values, errors, and completion.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(ErrorPayload) + 'static + Send,
        complete_fn: impl FnMut() + 'static + Send,
    ) -> Self {
        Self::from_handlers(Handlers {
            next: Some(Box::new(next_fn)),
            error: Some(Box::new(error_fn)),
            complete: Some(Box::new(complete_fn)),
        })
    }

    /// Create a new Subscriber with only the provided `next` function.
    ///
    /// Use [`on_error`](Subscriber::on_error) and
    /// [`on_complete`](Subscriber::on_complete) to add the other handlers.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Self::from_handlers(Handlers {
            next: Some(Box::new(next_fn)),
            error: None,
            complete: None,
        })
    }

    /// Create a Subscriber without any handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_handlers(Handlers {
            next: None,
            error: None,
            complete: None,
        })
    }

    fn from_handlers(handlers: Handlers<NextFnType>) -> Self {
        Subscriber {
            dispatch: Arc::new(ReentrantMutex::new(Dispatch {
                handlers: RefCell::new(handlers),
                queue: RefCell::new(VecDeque::new()),
            })),
            core: SubscriptionCore::new(),
        }
    }

    /// Set the completion function for the Subscriber.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send) {
        self.with_handlers(|h| h.complete = Some(Box::new(complete_fn)));
    }

    /// Set the error-handling function for the Subscriber.
    pub fn on_error(&mut self, error_fn: impl FnMut(ErrorPayload) + 'static + Send) {
        self.with_handlers(|h| h.error = Some(Box::new(error_fn)));
    }

    fn with_handlers(&self, f: impl FnOnce(&mut Handlers<NextFnType>)) {
        let dispatch = self.dispatch.lock();
        let result = dispatch.handlers.try_borrow_mut().map(|mut h| f(&mut h));
        if result.is_err() {
            warn!("cannot replace subscriber handlers while one of them is running");
        }
    }

    /// Returns `true` once the subscriber stopped accepting notifications, either
    /// because it received `error`/`complete` or because it was unsubscribed.
    ///
    /// Producers that loop synchronously or in the background should check this
    /// to stop emitting early.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Registers additional teardown logic. If the subscriber is already closed
    /// the teardown runs immediately.
    pub fn add(&self, teardown: impl Into<Teardown>) {
        self.core.add(teardown.into());
    }

    /// Returns a handle to this subscriber's closed state.
    pub(crate) fn subscription(&self) -> Subscription {
        Subscription::from_core(Arc::clone(&self.core), SubscriptionHandle::Nil)
    }

    /// Another handle to the same subscriber, used for multicasting and for
    /// operators that forward into it from several handlers.
    pub(crate) fn share(&self) -> Self {
        Subscriber {
            dispatch: Arc::clone(&self.dispatch),
            core: Arc::clone(&self.core),
        }
    }

    pub(crate) fn unsubscribe(&self) {
        self.core.unsubscribe();
    }

    /// Runs `f` while holding this subscriber's delivery lock. Notifications
    /// sent from other threads in the meantime wait until `f` returns.
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _delivering = self.dispatch.lock();
        f()
    }

    fn deliver(&self, notification: Notification<NextFnType>) {
        let dispatch = self.dispatch.lock();
        let Ok(mut handlers) = dispatch.handlers.try_borrow_mut() else {
            // Called from inside one of our own handlers on this thread. Deliver
            // once the running handler returns so that order is preserved.
            dispatch.queue.borrow_mut().push_back(notification);
            return;
        };

        let mut pending = Some(notification);
        while let Some(notification) = pending {
            if self.core.is_torn_down() {
                dispatch.queue.borrow_mut().clear();
                break;
            }
            let terminal = notification.is_terminal();
            handlers.dispatch(notification);
            if terminal {
                self.core.close();
            }
            pending = dispatch.queue.borrow_mut().pop_front();
        }
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        if self.core.is_closed() {
            trace!("next ignored, subscriber is closed");
            return;
        }
        self.deliver(Notification::Next(v));
    }

    fn complete(&mut self) {
        if !self.core.stop() {
            trace!("complete ignored, subscriber is closed");
            return;
        }
        self.deliver(Notification::Complete);
    }

    fn error(&mut self, observable_error: ErrorPayload) {
        if !self.core.stop() {
            trace!("error ignored, subscriber is closed");
            return;
        }
        self.deliver(Notification::Error(observable_error));
    }
}

/// Enumeration representing different types of handles used to await
/// asynchronous producers.
pub enum SubscriptionHandle {
    /// No specific handle for task or thread awaiting.
    Nil,

    /// Holds a join handle for awaiting an asynchronous observable using Tokio task.
    JoinTask(JoinHandle<()>),

    /// Holds a join handle for awaiting an asynchronous observable using OS thread.
    JoinThread(ThreadJoinHandle<()>),
}

/// Represents a subscription to an observable or a subject, allowing control over
/// the subscription.
///
/// Producers build one with [`Subscription::new`] to hand back their teardown
/// logic and, optionally, a handle to the thread or task that emits. The
/// subscription returned by `subscribe` refers to the subscriber itself, so
/// unsubscribing it closes the subscriber and runs every teardown exactly once.
///
/// Dropping a `Subscription` does not unsubscribe.
pub struct Subscription {
    core: Arc<SubscriptionCore>,
    pub(crate) subscription_future: SubscriptionHandle,
}

impl Subscription {
    /// Creates a new Subscription with the specified teardown logic and
    /// subscription handle.
    #[must_use]
    pub fn new(teardown: Teardown, subscription_future: SubscriptionHandle) -> Self {
        let core = SubscriptionCore::new();
        core.add(teardown);
        Subscription {
            core,
            subscription_future,
        }
    }

    /// A subscription with no teardown and nothing to await.
    #[must_use]
    pub fn empty() -> Self {
        Subscription::new(Teardown::Nil, SubscriptionHandle::Nil)
    }

    pub(crate) fn from_core(
        core: Arc<SubscriptionCore>,
        subscription_future: SubscriptionHandle,
    ) -> Self {
        Subscription {
            core,
            subscription_future,
        }
    }

    /// Another handle to the same subscription, without the join handle.
    pub(crate) fn share(&self) -> Subscription {
        Subscription::from_core(Arc::clone(&self.core), SubscriptionHandle::Nil)
    }

    pub(crate) fn shares_state_with(&self, other: &Subscription) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn take_handle(&mut self) -> SubscriptionHandle {
        mem::replace(&mut self.subscription_future, SubscriptionHandle::Nil)
    }

    /// Returns `true` once the subscription was unsubscribed or the subscriber
    /// behind it received `error` or `complete`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Registers additional teardown logic. If the subscription is already
    /// closed the teardown runs immediately.
    pub fn add(&self, teardown: impl Into<Teardown>) {
        self.core.add(teardown.into());
    }

    /// Awaits the completion of the Tokio task or OS thread associated with
    /// this subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if joining a thread or awaiting a task used by the
    /// observable fails.
    pub async fn join_concurrent(self) -> Result<(), Box<dyn Any + Send>> {
        match self.subscription_future {
            SubscriptionHandle::JoinTask(task_handle) => task_handle
                .await
                .map_err(|e| Box::new(e) as Box<dyn Any + Send>),
            SubscriptionHandle::JoinThread(thread_handle) => {
                match tokio::task::spawn_blocking(move || thread_handle.join()).await {
                    Ok(joined) => joined,
                    Err(e) => Err(Box::new(e)),
                }
            }
            SubscriptionHandle::Nil => Ok(()),
        }
    }

    /// Blocks the current thread until the OS thread associated with this
    /// subscription has finished.
    ///
    /// # Errors
    ///
    /// Returns an error if joining the thread fails, or
    /// [`ObservableError::JoinTaskFromThread`] if the subscription is backed by a
    /// Tokio task; use [`join_concurrent`](Subscription::join_concurrent) for those.
    pub fn join(self) -> Result<(), Box<dyn Any + Send>> {
        match self.subscription_future {
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle.join(),
            SubscriptionHandle::Nil => Ok(()),
            SubscriptionHandle::JoinTask(_) => Err(Box::new(ObservableError::JoinTaskFromThread)),
        }
    }
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(&self) {
        self.core.unsubscribe();
    }
}

/// Cleanup logic attached to a subscription. Runs exactly once, when the
/// subscription is unsubscribed or its subscriber receives `error` or `complete`.
pub enum Teardown {
    /// No specific teardown logic.
    Nil,

    /// If one subscription depends on another. Wrapped subscription's unsubscribe
    /// will be called upon teardown.
    Wrapped(Box<Subscription>),

    /// Teardown logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous teardown logic represented by a future. It is spawned on the
    /// Tokio runtime that was current when the subscription was created.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl Teardown {
    /// Shorthand for [`Teardown::Logic`].
    pub fn logic(f: impl FnOnce() + Send + 'static) -> Self {
        Teardown::Logic(Box::new(f))
    }

    fn execute(self, runtime_handle: Option<&runtime::Handle>) {
        match self {
            Teardown::Nil => (),
            Teardown::Logic(fnc) => guarded("teardown", fnc),
            Teardown::Wrapped(subscription) => subscription.unsubscribe(),
            Teardown::Future(future) => {
                let handle = runtime_handle
                    .cloned()
                    .or_else(|| runtime::Handle::try_current().ok());
                match handle {
                    Some(handle) => {
                        handle.spawn(future);
                    }
                    None => report_unhandled(ObservableError::NoRuntime),
                }
            }
        }
    }
}

impl From<Subscription> for Teardown {
    fn from(subscription: Subscription) -> Self {
        Teardown::Wrapped(Box::new(subscription))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_c = Arc::clone(&count);
        (count, move || {
            count_c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn teardown_runs_once_for_every_trigger() {
        let (count, f) = counter();
        let mut s = Subscriber::<i32>::empty();
        s.add(Teardown::logic(f));
        let subscription = s.subscription();

        s.complete();
        s.error(Arc::new(ObservableError::NoRuntime));
        subscription.unsubscribe();
        subscription.unsubscribe();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(s.is_closed());
    }

    #[test]
    fn adding_to_closed_subscription_runs_immediately() {
        let subscription = Subscription::empty();
        subscription.unsubscribe();

        let (count, f) = counter();
        subscription.add(Teardown::logic(f));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrapped_subscription_is_unsubscribed() {
        let (count, f) = counter();
        let inner = Subscription::new(Teardown::logic(f), SubscriptionHandle::Nil);
        let outer = Subscription::new(inner.into(), SubscriptionHandle::Nil);

        outer.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(outer.is_closed());
    }

    #[test]
    fn reentrant_next_is_delivered_after_running_handler() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_c = Arc::clone(&received);

        let holder: Arc<Mutex<Option<Subscriber<i32>>>> = Arc::new(Mutex::new(None));
        let holder_c = Arc::clone(&holder);

        let s = Subscriber::on_next(move |v: i32| {
            received_c.lock().push(v);
            if v == 1 {
                let inner = holder_c.lock().as_ref().map(Subscriber::share);
                if let Some(mut inner) = inner {
                    inner.next(2);
                    inner.next(3);
                    received_c.lock().push(100);
                }
            }
        });
        *holder.lock() = Some(s.share());

        let mut s = s;
        s.next(1);
        s.next(4);

        assert_eq!(*received.lock(), vec![1, 100, 2, 3, 4]);
    }

    #[test]
    fn handler_panic_does_not_close_subscriber() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_c = Arc::clone(&received);

        let mut s = Subscriber::on_next(move |v: i32| {
            if v == 2 {
                panic!("bad value");
            }
            received_c.lock().push(v);
        });

        s.next(1);
        s.next(2);
        s.next(3);

        assert_eq!(*received.lock(), vec![1, 3]);
        assert!(!s.is_closed());
    }

    #[test]
    fn join_on_task_handle_is_an_error() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let handle = rt.spawn(async {});
        let subscription = Subscription::new(Teardown::Nil, SubscriptionHandle::JoinTask(handle));
        assert!(subscription.join().is_err());
    }
}
