//! Pub/sub hub — subscriber registry and event fan-out.
//!
//! Subscribers register with an unbounded channel sender and a set of
//! [`Topic`]s they care about. Publishing snapshots the matching
//! senders under the read lock, then delivers outside it so a slow or
//! broken connection never blocks registry mutation. A failed send
//! means the receiving side is gone: the subscriber is dropped from
//! the registry and never retried. Messages are fire-and-forget.

use std::collections::{HashMap, HashSet};

use tokio::sync::{RwLock, mpsc};

use verdant_domain::event::{Channel, Event, Topic};
use verdant_domain::id::SubscriberId;

struct Subscriber {
    sender: mpsc::UnboundedSender<Event>,
    topics: HashSet<Topic>,
}

impl Subscriber {
    fn interested_in(&self, channel: Channel) -> bool {
        self.topics.iter().any(|topic| topic.covers(channel))
    }
}

/// In-process publish/subscribe hub.
#[derive(Default)]
pub struct PubSubHub {
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
}

impl PubSubHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber connection with no interests yet.
    pub async fn register(&self, sender: mpsc::UnboundedSender<Event>) -> SubscriberId {
        let id = SubscriberId::new();
        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(
            id,
            Subscriber {
                sender,
                topics: HashSet::new(),
            },
        );
        tracing::debug!(subscriber = %id, total = subscribers.len(), "subscriber registered");
        id
    }

    /// Remove a subscriber. Unknown ids are a no-op.
    pub async fn unregister(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber = %id, total = subscribers.len(), "subscriber removed");
        }
    }

    /// Replace a subscriber's interest set. Unknown ids are a no-op.
    pub async fn set_interest(&self, id: SubscriberId, topics: HashSet<Topic>) {
        let mut subscribers = self.subscribers.write().await;
        if let Some(subscriber) = subscribers.get_mut(&id) {
            subscriber.topics = topics;
        }
    }

    /// Publish an event to every subscriber interested in `channel`.
    ///
    /// Publishing with zero matching subscribers is a silent no-op.
    /// Subscribers whose channel is closed are dropped from the
    /// registry before this call returns.
    pub async fn publish(&self, channel: Channel, kind: &str, payload: serde_json::Value) {
        let event = Event::new(channel, kind, payload);

        let targets: Vec<(SubscriberId, mpsc::UnboundedSender<Event>)> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .filter(|(_, s)| s.interested_in(channel))
                .map(|(id, s)| (*id, s.sender.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        for (id, sender) in targets {
            if sender.send(event.clone()).is_err() {
                dead.push(id);
            }
        }

        self.drop_dead(&dead).await;
    }

    /// Send an event to one specific subscriber, regardless of its
    /// interest set. A failed send drops the subscriber.
    pub async fn send_direct(
        &self,
        id: SubscriberId,
        channel: Channel,
        kind: &str,
        payload: serde_json::Value,
    ) {
        let event = Event::new(channel, kind, payload);
        let sender = {
            let subscribers = self.subscribers.read().await;
            subscribers.get(&id).map(|s| s.sender.clone())
        };
        if let Some(sender) = sender {
            if sender.send(event).is_err() {
                self.drop_dead(&[id]).await;
            }
        }
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    async fn drop_dead(&self, ids: &[SubscriberId]) {
        if ids.is_empty() {
            return;
        }
        let mut subscribers = self.subscribers.write().await;
        for id in ids {
            if subscribers.remove(id).is_some() {
                tracing::warn!(subscriber = %id, "dropping subscriber after failed delivery");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(list: &[Topic]) -> HashSet<Topic> {
        list.iter().copied().collect()
    }

    async fn subscribe(
        hub: &PubSubHub,
        interest: &[Topic],
    ) -> (SubscriberId, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await;
        hub.set_interest(id, topics(interest)).await;
        (id, rx)
    }

    #[tokio::test]
    async fn should_deliver_to_interested_subscriber() {
        let hub = PubSubHub::new();
        let (_, mut rx) = subscribe(&hub, &[Topic::Channel(Channel::Sensors)]).await;

        hub.publish(Channel::Sensors, "update", serde_json::json!({"t": 21.0}))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel, Channel::Sensors);
        assert_eq!(event.kind, "update");
    }

    #[tokio::test]
    async fn should_not_deliver_to_uninterested_subscriber() {
        let hub = PubSubHub::new();
        let (_, mut rx) = subscribe(&hub, &[Topic::Channel(Channel::Gpio)]).await;

        hub.publish(Channel::Sensors, "update", serde_json::json!({}))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_match_every_channel_with_wildcard() {
        let hub = PubSubHub::new();
        let (_, mut rx) = subscribe(&hub, &[Topic::All]).await;

        hub.publish(Channel::Devices, "status_change", serde_json::json!({}))
            .await;
        hub.publish(Channel::Alerts, "new_alert", serde_json::json!({}))
            .await;

        assert_eq!(rx.recv().await.unwrap().channel, Channel::Devices);
        assert_eq!(rx.recv().await.unwrap().channel, Channel::Alerts);
    }

    #[tokio::test]
    async fn should_ignore_publish_with_no_subscribers() {
        let hub = PubSubHub::new();
        hub.publish(Channel::System, "started", serde_json::json!({}))
            .await;
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn should_receive_events_in_publish_order() {
        let hub = PubSubHub::new();
        let (_, mut rx) = subscribe(&hub, &[Topic::Channel(Channel::Gpio)]).await;

        for i in 0..5 {
            hub.publish(Channel::Gpio, "state_change", serde_json::json!({"seq": i}))
                .await;
        }
        for i in 0..5 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.payload["seq"], i);
        }
    }

    #[tokio::test]
    async fn should_drop_subscriber_whose_channel_is_closed() {
        let hub = PubSubHub::new();
        let (_, rx) = subscribe(&hub, &[Topic::All]).await;
        let (_, mut healthy_rx) = subscribe(&hub, &[Topic::All]).await;
        drop(rx);

        hub.publish(Channel::Sensors, "update", serde_json::json!({}))
            .await;

        assert_eq!(hub.subscriber_count().await, 1);
        // The healthy subscriber is unaffected.
        assert!(healthy_rx.recv().await.is_some());

        hub.publish(Channel::Sensors, "update", serde_json::json!({}))
            .await;
        assert!(healthy_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn should_stop_delivering_after_unregister() {
        let hub = PubSubHub::new();
        let (id, mut rx) = subscribe(&hub, &[Topic::All]).await;

        hub.unregister(id).await;
        hub.publish(Channel::Sensors, "update", serde_json::json!({}))
            .await;

        assert!(rx.try_recv().is_err());
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn should_replace_interest_set_on_mutation() {
        let hub = PubSubHub::new();
        let (id, mut rx) = subscribe(&hub, &[Topic::Channel(Channel::Sensors)]).await;

        hub.set_interest(id, topics(&[Topic::Channel(Channel::Gpio)]))
            .await;

        hub.publish(Channel::Sensors, "update", serde_json::json!({}))
            .await;
        hub.publish(Channel::Gpio, "state_change", serde_json::json!({}))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel, Channel::Gpio);
    }

    #[tokio::test]
    async fn should_send_direct_regardless_of_interest() {
        let hub = PubSubHub::new();
        let (id, mut rx) = subscribe(&hub, &[]).await;

        hub.send_direct(id, Channel::System, "welcome", serde_json::json!({}))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, "welcome");
    }

    #[tokio::test]
    async fn should_ignore_interest_update_for_unknown_subscriber() {
        let hub = PubSubHub::new();
        hub.set_interest(SubscriberId::new(), topics(&[Topic::All]))
            .await;
        assert_eq!(hub.subscriber_count().await, 0);
    }
}
