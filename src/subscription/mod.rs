//! Provides structures and traits related to subscription management.
//!
//! This module includes types such as `Subscriber` for handling observed values,
//! errors, and completions, `Subscription` for controlling subscriptions to
//! observables and subjects, and `SubscriptionBag` for releasing many
//! subscriptions at once.
//!
//! Additionally, it defines the `Teardown` logic a producer hands back and the
//! handles used to await asynchronous producers.
mod bag;
pub mod subscribe;
