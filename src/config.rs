//! Process-wide runtime configuration.
//!
//! The only knob is what happens to errors that have nowhere to go: an `error`
//! notification reaching a subscriber without an `error` handler, or a panic
//! caught inside an observer handler. Those never interrupt delivery or
//! teardown; they are handed to the configured [`UnhandledErrorPolicy`].

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use crate::errors::ObservableError;

type ErrorHook = Arc<dyn Fn(&ObservableError) + Send + Sync>;

/// Policy applied to errors that no observer handled.
#[derive(Clone, Default)]
pub enum UnhandledErrorPolicy {
    /// Log the error with `tracing::error!`.
    #[default]
    Log,
    /// Drop the error silently.
    Ignore,
    /// Pass the error to a user supplied function.
    Hook(ErrorHook),
}

impl UnhandledErrorPolicy {
    /// Builds a [`UnhandledErrorPolicy::Hook`] from a closure.
    pub fn hook(f: impl Fn(&ObservableError) + Send + Sync + 'static) -> Self {
        UnhandledErrorPolicy::Hook(Arc::new(f))
    }
}

impl fmt::Debug for UnhandledErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnhandledErrorPolicy::Log => f.write_str("Log"),
            UnhandledErrorPolicy::Ignore => f.write_str("Ignore"),
            UnhandledErrorPolicy::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

static POLICY: RwLock<Option<UnhandledErrorPolicy>> = parking_lot::const_rwlock(None);

/// Replaces the process-wide unhandled error policy.
pub fn set_unhandled_error_policy(policy: UnhandledErrorPolicy) {
    *POLICY.write() = Some(policy);
}

/// Returns the policy currently in effect.
pub fn unhandled_error_policy() -> UnhandledErrorPolicy {
    POLICY.read().clone().unwrap_or_default()
}

pub(crate) fn report_unhandled(err: ObservableError) {
    match unhandled_error_policy() {
        UnhandledErrorPolicy::Log => {
            tracing::error!(label = err.as_label(), error = %err, "unhandled observable error");
        }
        UnhandledErrorPolicy::Ignore => {}
        UnhandledErrorPolicy::Hook(hook) => hook(&err),
    }
}
