//! `rxcore` is a small reactive core for Rust: lazy observables, subscriptions
//! with exactly-once teardown, and multicasting subjects.
//!
//! - An [`Observable`] stores a producer and runs it once per `subscribe` call.
//!   Observables are cold; sharing one execution between subscribers is done
//!   explicitly with a subject, [`ObservableExt::share`] or
//!   [`ObservableExt::connectable`].
//! - A [`Subscriber`](subscribe::Subscriber) routes `next`, `error` and `complete`
//!   notifications to optional handlers and drops everything after it closed.
//! - A [`Subscription`](subscribe::Subscription) cancels delivery, runs teardown
//!   exactly once and can await producers running on a thread or Tokio task.
//! - [`Subject`], [`BehaviorSubject`] and [`AsyncSubject`] are split into an
//!   emitter (an [`Observer`]) and a receiver (subscribable like an observable).
//!
//! Delivery is synchronous on the thread that calls `next`. Asynchronous producers
//! spawn their own thread or task and call the subscriber from there.
//!
//! # Example
//!
//! ```
//! use rxcore::subscribe::Subscriber;
//! use rxcore::{Observable, ObservableExt, Subscribeable};
//!
//! let mut evens = Observable::range(1, 10)
//!     .filter(|v| v % 2 == 0)
//!     .map(|v| v * 10)
//!     .take(3);
//!
//! let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
//! observer.on_complete(|| println!("Completed"));
//!
//! // Prints 20, 40, 60 and then "Completed".
//! evens.subscribe(observer);
//! ```
//!
//! Errors that reach a subscriber without an `error` handler, and panics caught
//! inside handlers, are reported through the policy set in [`config`].

pub mod config;
mod errors;
mod observable;
mod observer;
pub mod subjects;
mod subscription;

pub use errors::*;
pub use observable::*;
pub use observer::Observer;
pub use subjects::{AsyncSubject, BehaviorSubject, Subject};
pub use subscription::subscribe;
pub use subscribe::{Subscribeable, Unsubscribeable};
