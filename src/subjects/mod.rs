//! The `subjects` module provides the multicasting variants of an observable.
//! Subjects serve both as observers and observables, allowing multiple observers
//! to subscribe to a single source and receive the same notifications.
//!
//! Subjects are split into an emitter and a receiver using the `emitter_receiver`
//! function. Both halves are cheap clones of one shared subject.
//!
//! The emitter behaves as an `Observer`, enabling `next()`, `error()` and
//! `complete()` calls. It converts into a `Subscriber`, so it can be passed to the
//! `subscribe` method of another `Observable`.
//!
//! The receiver functions as an `Observable`, enabling you to use the
//! `subscribe` and `unsubscribe` methods on it as well as every pipeline operator.
//!
//! There are three varieties: the basic `Subject`, `BehaviorSubject` which replays
//! its current value to new subscribers, and `AsyncSubject` which only delivers its
//! last value once it completes.
//!
//! Observers that subscribe after a subject terminated are told right away: they
//! receive the error, or the completion (preceded by the last value for
//! `AsyncSubject`), and get back a closed subscription.

mod async_subject;
mod behavior_subject;
mod subject;

pub use async_subject::*;
pub use behavior_subject::*;
pub use subject::*;

use std::{collections::VecDeque, mem, sync::Arc};

use parking_lot::Mutex;

use crate::{
    errors::ErrorPayload,
    observer::Observer,
    subscription::subscribe::{Subscriber, Teardown},
};

pub(crate) enum SubjectState {
    Active,
    Completed,
    Errored(ErrorPayload),
    // Receiver was unsubscribed while active.
    Closed,
}

// A notification an emitter asked the subject to broadcast.
pub(crate) enum Emission<T> {
    Next(T),
    Error(ErrorPayload),
    // `AsyncSubject` hands over its last value together with the completion.
    Complete(Option<T>),
}

// An emission waiting for the running broadcast to finish, with the observers
// that were registered when it was issued.
struct Pending<T> {
    emission: Emission<T>,
    targets: Vec<Subscriber<T>>,
}

// Registered observers of one subject plus its lifecycle state.
pub(crate) struct Observers<T> {
    entries: Vec<(u64, Subscriber<T>)>,
    next_key: u64,
    state: SubjectState,
    // Set while some call is delivering `pending`; emissions made in the
    // meantime, from handlers or other threads, only queue up.
    emitting: bool,
    pending: VecDeque<Pending<T>>,
}

impl<T> Observers<T> {
    fn new() -> Self {
        Observers {
            entries: Vec::with_capacity(16),
            next_key: 0,
            state: SubjectState::Active,
            emitting: false,
            pending: VecDeque::new(),
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state, SubjectState::Active)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, s: &Subscriber<T>) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.entries.push((key, s.share()));
        key
    }

    fn remove(&mut self, key: u64) {
        self.entries.retain(|(k, _)| *k != key);
    }

    // Broadcasts iterate over a copy so that observers may subscribe or
    // unsubscribe from inside their handlers.
    fn snapshot(&self) -> Vec<Subscriber<T>> {
        self.entries.iter().map(|(_, s)| s.share()).collect()
    }

    fn terminate(&mut self, state: SubjectState) -> Vec<Subscriber<T>> {
        self.state = state;
        self.entries.drain(..).map(|(_, s)| s).collect()
    }

    fn close(&mut self) -> Vec<Subscriber<T>> {
        if self.is_active() {
            self.state = SubjectState::Closed;
        }
        self.entries.drain(..).map(|(_, s)| s).collect()
    }

    // Queues `emission` for the observers registered now and applies its state
    // change. Returns `true` if the caller has to deliver the queue itself.
    fn enqueue(&mut self, emission: Emission<T>) -> bool {
        let targets = match &emission {
            Emission::Next(_) => self.snapshot(),
            Emission::Error(e) => {
                let targets = self.terminate(SubjectState::Errored(Arc::clone(e)));
                tracing::debug!(observers = targets.len(), error = %e, "subject errored");
                targets
            }
            Emission::Complete(_) => {
                let targets = self.terminate(SubjectState::Completed);
                tracing::debug!(observers = targets.len(), "subject completed");
                targets
            }
        };
        self.pending.push_back(Pending { emission, targets });
        !mem::replace(&mut self.emitting, true)
    }

    fn next_pending(&mut self) -> Option<Pending<T>> {
        let pending = self.pending.pop_front();
        if pending.is_none() {
            self.emitting = false;
        }
        pending
    }

    fn replay(&self) -> Option<Replay> {
        match &self.state {
            SubjectState::Active => None,
            SubjectState::Completed => Some(Replay::Complete),
            SubjectState::Errored(e) => Some(Replay::Error(Arc::clone(e))),
            SubjectState::Closed => Some(Replay::Closed),
        }
    }
}

// What a late subscriber is told about a subject that is no longer active.
pub(crate) enum Replay {
    Error(ErrorPayload),
    Complete,
    Closed,
}

impl Replay {
    fn deliver<T>(self, s: &mut Subscriber<T>) {
        match self {
            Replay::Error(e) => s.error(e),
            Replay::Complete => s.complete(),
            Replay::Closed => s.unsubscribe(),
        }
    }
}

// Implemented by the state behind each subject variant.
pub(crate) trait Multicast: Send + 'static {
    type Item;

    fn observers(&mut self) -> &mut Observers<Self::Item>;
}

// Teardown that takes the observer registered under `key` off the subject.
fn removal<S: Multicast>(shared: &Arc<Mutex<S>>, key: u64) -> Teardown {
    let subject = Arc::downgrade(shared);
    Teardown::logic(move || {
        if let Some(subject) = subject.upgrade() {
            subject.lock().observers().remove(key);
        }
    })
}

fn close_receiver<S: Multicast>(shared: &Arc<Mutex<S>>) {
    let observers = shared.lock().observers().close();
    tracing::debug!(observers = observers.len(), "subject receiver unsubscribed");
    for o in observers {
        o.unsubscribe();
    }
}

// Runs `prepare` under the subject lock and broadcasts what it returns.
//
// Broadcasts of one subject never overlap. An emission made while another is
// being delivered is queued and delivered by the call that is already
// broadcasting, once every observer got the earlier one.
fn emit<S, F>(shared: &Arc<Mutex<S>>, prepare: F)
where
    S: Multicast,
    S::Item: Clone,
    F: FnOnce(&mut S) -> Emission<S::Item>,
{
    {
        let mut src = shared.lock();
        if !src.observers().is_active() {
            return;
        }
        let emission = prepare(&mut *src);
        if !src.observers().enqueue(emission) {
            return;
        }
    }

    loop {
        let pending = shared.lock().observers().next_pending();
        let Some(Pending { emission, targets }) = pending else {
            break;
        };
        match emission {
            Emission::Next(v) => {
                for mut o in targets {
                    o.next(v.clone());
                }
            }
            Emission::Error(e) => {
                for mut o in targets {
                    o.error(Arc::clone(&e));
                }
            }
            Emission::Complete(last) => {
                for mut o in targets {
                    if let Some(v) = &last {
                        o.next(v.clone());
                    }
                    o.complete();
                }
            }
        }
    }
}
