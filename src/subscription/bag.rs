use parking_lot::Mutex;

use crate::subscription::subscribe::{Subscription, Unsubscribeable};

/// Collects subscriptions so they can be released together, for example when the
/// component that owns them shuts down.
///
/// Subscriptions added after the bag was unsubscribed are unsubscribed
/// immediately.
///
/// ```
/// use rxcore::subscribe::{Subscriber, SubscriptionBag, Unsubscribeable};
/// use rxcore::{Subject, Subscribeable};
///
/// let (_emitter, mut receiver) = Subject::<i32>::emitter_receiver();
/// let bag = SubscriptionBag::new();
///
/// bag.add(receiver.subscribe(Subscriber::on_next(|v| println!("first {}", v))));
/// bag.add(receiver.subscribe(Subscriber::on_next(|v| println!("second {}", v))));
/// assert_eq!(receiver.len(), 2);
///
/// bag.unsubscribe();
/// assert_eq!(receiver.len(), 0);
/// ```
pub struct SubscriptionBag {
    // `None` once the bag was unsubscribed.
    entries: Mutex<Option<Vec<Subscription>>>,
}

impl SubscriptionBag {
    #[must_use]
    pub fn new() -> Self {
        SubscriptionBag {
            entries: Mutex::new(Some(Vec::new())),
        }
    }

    /// Takes ownership of `subscription` until the bag is unsubscribed.
    ///
    /// Subscriptions that closed on their own since they were added are dropped
    /// from the bag here.
    pub fn add(&self, subscription: Subscription) {
        let mut guard = self.entries.lock();
        if let Some(entries) = guard.as_mut() {
            entries.retain(|s| !s.is_closed());
            if !subscription.is_closed() {
                entries.push(subscription);
            }
            return;
        }
        drop(guard);
        subscription.unsubscribe();
    }

    /// Number of subscriptions held and still open.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .as_ref()
            .map_or(0, |entries| entries.iter().filter(|s| !s.is_closed()).count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriptionBag {
    fn default() -> Self {
        Self::new()
    }
}

impl Unsubscribeable for SubscriptionBag {
    fn unsubscribe(&self) {
        let Some(entries) = self.entries.lock().take() else {
            return;
        };
        tracing::trace!(subscriptions = entries.len(), "subscription bag released");
        for subscription in entries {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::subscription::subscribe::{SubscriptionHandle, Teardown};

    fn counted(count: &Arc<AtomicUsize>) -> Subscription {
        let count = Arc::clone(count);
        Subscription::new(
            Teardown::logic(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
            SubscriptionHandle::Nil,
        )
    }

    #[test]
    fn releases_everything_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let bag = SubscriptionBag::new();
        bag.add(counted(&count));
        bag.add(counted(&count));
        assert_eq!(bag.len(), 2);

        bag.unsubscribe();
        bag.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(bag.is_empty());
    }

    #[test]
    fn late_additions_are_released_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let bag = SubscriptionBag::default();
        bag.unsubscribe();

        let late = counted(&count);
        bag.add(late);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bag.len(), 0);
    }

    #[test]
    fn closed_subscriptions_are_not_kept() {
        let bag = SubscriptionBag::new();
        for _ in 0..1000 {
            let subscription = Subscription::empty();
            subscription.unsubscribe();
            bag.add(subscription);
        }
        assert_eq!(bag.len(), 0);

        let count = Arc::new(AtomicUsize::new(0));
        let open = counted(&count);
        let finished = counted(&count);
        bag.add(open);
        bag.add(finished.share());
        assert_eq!(bag.len(), 2);

        finished.unsubscribe();
        assert_eq!(bag.len(), 1);
        bag.add(Subscription::empty());
        assert_eq!(bag.entries.lock().as_ref().map(Vec::len), Some(2));

        bag.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
