use crate::domain::ports::{
    KeyValueStore, Notification, NotificationHandler, PubSub, SubscriptionId,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// A thread-safe in-memory key-value store.
///
/// Uses `Arc<RwLock<HashMap<String, Vec<u8>>>>` so clones share the same records.
/// Ideal for testing or single-process deployments where durability is not required.
#[derive(Default, Clone)]
pub struct InMemoryKeyValueStore {
    records: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryKeyValueStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(key.to_string(), value);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(key);
        Ok(())
    }
}

/// In-process publish/subscribe keyed by channel name.
///
/// Handlers run on the publishing task, after the registry lock has been released.
/// Messages published on a channel with no subscribers are dropped.
#[derive(Default, Clone)]
pub struct InMemoryPubSub {
    channels: Arc<RwLock<HashMap<String, HashMap<SubscriptionId, NotificationHandler>>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().await;
        channels.get(channel).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, channel: &str, message: Notification) -> Result<usize> {
        let handlers: Vec<NotificationHandler> = {
            let channels = self.channels.read().await;
            channels
                .get(channel)
                .map(|subs| subs.values().cloned().collect())
                .unwrap_or_default()
        };

        debug!(channel, subscribers = handlers.len(), "Publishing notification");
        for handler in &handlers {
            handler(message.clone());
        }
        Ok(handlers.len())
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: NotificationHandler,
    ) -> Result<SubscriptionId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_default()
            .insert(id, handler);
        debug!(channel, subscription_id = id, "Subscribed");
        Ok(id)
    }

    async fn unsubscribe(&self, channel: &str, subscription_id: SubscriptionId) -> Result<()> {
        let mut channels = self.channels.write().await;
        if let Some(subs) = channels.get_mut(channel) {
            subs.remove(&subscription_id);
            if subs.is_empty() {
                channels.remove(channel);
            }
        }
        debug!(channel, subscription_id, "Unsubscribed");
        Ok(())
    }
}
