use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Raw payload published on a channel by the inbound-callback path.
pub type Notification = Vec<u8>;

/// Callback invoked by a [`PubSub`] adapter for every message on a subscribed channel.
pub type NotificationHandler = Arc<dyn Fn(Notification) + Send + Sync>;

/// Identifies one subscription on one channel.
pub type SubscriptionId = u64;

/// Durable byte storage keyed by string. Used only as the saga persistence substrate.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Channel-addressed publish/subscribe transport.
///
/// Delivery is at-least-once per subscriber; ordering across channels is not guaranteed.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publishes `message` on `channel`, returning how many subscribers it reached.
    async fn publish(&self, channel: &str, message: Notification) -> Result<usize>;
    async fn subscribe(&self, channel: &str, handler: NotificationHandler)
    -> Result<SubscriptionId>;
    async fn unsubscribe(&self, channel: &str, subscription_id: SubscriptionId) -> Result<()>;
}

pub type KeyValueStoreHandle = Arc<dyn KeyValueStore>;
pub type PubSubHandle = Arc<dyn PubSub>;
