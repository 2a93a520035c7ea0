use std::{any::Any, error::Error, sync::Arc};

use thiserror::Error;

/// Error value delivered to a `Subscriber`'s `error` handler.
///
/// Errors are shared between every observer of a multicast source, so they are
/// reference counted instead of boxed.
pub type ErrorPayload = Arc<dyn Error + Send + Sync>;

/// Error type a producer returns to signal a synchronous fault while it is
/// being subscribed. The value is converted into an [`ErrorPayload`] and
/// delivered to the subscriber's `error` handler.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors raised by `rxcore` itself rather than by user producers.
///
/// Provides [`as_label`](ObservableError::as_label) for logs.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ObservableError {
    /// The producer panicked while `subscribe` was running it.
    #[error("producer panicked during subscribe: {message}")]
    ProducerPanicked {
        /// Panic message, if the payload was a string.
        message: String,
    },

    /// One of the observer handlers panicked while a notification was delivered.
    #[error("{handler} handler panicked: {message}")]
    HandlerPanicked {
        /// Which handler panicked: `next`, `error`, `complete` or `teardown`.
        handler: &'static str,
        /// Panic message, if the payload was a string.
        message: String,
    },

    /// An error reached a subscriber that has no `error` handler.
    #[error("error delivered to a subscriber without an error handler: {cause}")]
    Unhandled {
        /// The undelivered error.
        cause: ErrorPayload,
    },

    /// A future had to be spawned but no Tokio runtime was available.
    #[error("no Tokio runtime available to spawn the future on")]
    NoRuntime,

    /// `Subscription::join` was used on a subscription backed by a Tokio task.
    #[error("subscription is backed by a Tokio task, use `join_concurrent().await` instead")]
    JoinTaskFromThread,
}

impl ObservableError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// ```
    /// use rxcore::ObservableError;
    ///
    /// let err = ObservableError::NoRuntime;
    /// assert_eq!(err.as_label(), "no_runtime");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ObservableError::ProducerPanicked { .. } => "producer_panicked",
            ObservableError::HandlerPanicked { .. } => "handler_panicked",
            ObservableError::Unhandled { .. } => "unhandled_error",
            ObservableError::NoRuntime => "no_runtime",
            ObservableError::JoinTaskFromThread => "join_task_from_thread",
        }
    }

    pub(crate) fn producer_panicked(payload: &(dyn Any + Send)) -> Self {
        ObservableError::ProducerPanicked {
            message: panic_message(payload),
        }
    }

    pub(crate) fn handler_panicked(handler: &'static str, payload: &(dyn Any + Send)) -> Self {
        ObservableError::HandlerPanicked {
            handler,
            message: panic_message(payload),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let err = ObservableError::producer_panicked(payload.as_ref());
        assert_eq!(err.to_string(), "producer panicked during subscribe: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let err = ObservableError::handler_panicked("next", payload.as_ref());
        assert_eq!(err.to_string(), "next handler panicked: owned boom");
        assert_eq!(err.as_label(), "handler_panicked");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        let err = ObservableError::producer_panicked(payload.as_ref());
        assert!(err.to_string().contains("non-string panic payload"));
    }

    #[test]
    fn unhandled_wraps_cause() {
        let cause: ErrorPayload = Arc::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk gone",
        ));
        let err = ObservableError::Unhandled { cause };
        assert_eq!(err.as_label(), "unhandled_error");
        assert!(err.to_string().ends_with("disk gone"));
    }
}
