use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

/// Filtered pub/sub fan-out for server-to-client pushes (§4.5 "Hooks").
///
/// Mirrors `warpgate-common::eventhub::EventHub`, reworked onto stable Rust:
/// the teacher's `Vec::drain_filter` is nightly-only, so sending here collects
/// dead subscriptions in a separate pass instead of filtering in place.
type Subscription<E> = (Box<dyn Fn(&E) -> bool + Send + Sync>, UnboundedSender<E>);
type SubscriptionStore<E> = Arc<Mutex<Vec<Subscription<E>>>>;

pub struct HookHub<E: Clone + Send> {
    subscriptions: SubscriptionStore<E>,
}

#[derive(Clone)]
pub struct HookSender<E: Clone> {
    subscriptions: SubscriptionStore<E>,
}

pub struct HookSubscription<E>(UnboundedReceiver<E>);

impl<E> HookSubscription<E> {
    pub async fn recv(&mut self) -> Option<E> {
        self.0.recv().await
    }
}

impl<E: Clone + Send + 'static> HookHub<E> {
    pub fn setup() -> (Self, HookSender<E>) {
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                subscriptions: subscriptions.clone(),
            },
            HookSender { subscriptions },
        )
    }

    /// Registers a new subscriber; `filter` decides which events it receives.
    pub async fn subscribe<F>(&self, filter: F) -> HookSubscription<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = unbounded_channel();
        self.subscriptions
            .lock()
            .await
            .push((Box::new(filter), sender));
        HookSubscription(receiver)
    }
}

impl<E: Clone + Send> HookSender<E> {
    /// Delivers `event` to every subscriber whose filter accepts it.
    /// Best-effort: a subscriber whose receiver was dropped is pruned
    /// silently and does not affect delivery to the others (§4.5).
    pub async fn send(&self, event: E) {
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.retain(|(filter, sender)| {
            if filter(&event) {
                sender.send(event.clone()).is_ok()
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_only_to_matching_subscribers() {
        let (hub, sender) = HookHub::<i32>::setup();
        let mut evens = hub.subscribe(|n: &i32| n % 2 == 0).await;
        let mut all = hub.subscribe(|_: &i32| true).await;

        sender.send(1).await;
        sender.send(2).await;

        assert_eq!(all.recv().await, Some(1));
        assert_eq!(all.recv().await, Some(2));
        assert_eq!(evens.recv().await, Some(2));
    }

    #[tokio::test]
    async fn a_dropped_subscriber_does_not_break_delivery_to_others() {
        let (hub, sender) = HookHub::<i32>::setup();
        {
            let _dropped = hub.subscribe(|_: &i32| true).await;
        }
        let mut survivor = hub.subscribe(|_: &i32| true).await;
        sender.send(7).await;
        assert_eq!(survivor.recv().await, Some(7));
    }
}
