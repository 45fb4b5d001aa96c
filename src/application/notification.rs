use crate::domain::ports::{Notification, NotificationHandler, PubSubHandle, SubscriptionId};
use crate::error::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How a [`PendingNotification`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Notified(Notification),
    TimedOut,
}

/// A live subscription waiting for the first message on one channel.
///
/// Only the first of {message, deadline} resolves the wait. The subscription is released on every
/// exit path: after [`wait`](Self::wait), on [`cancel`](Self::cancel), and when the value is
/// dropped mid-wait, in which case the unsubscribe runs on a spawned task.
pub struct PendingNotification {
    pubsub: PubSubHandle,
    channel: String,
    subscription_id: SubscriptionId,
    receiver: oneshot::Receiver<Notification>,
    deadline: Instant,
    active: bool,
}

impl PendingNotification {
    /// Subscribes to `channel`. The deadline starts once the subscription is in place.
    pub async fn subscribe(
        pubsub: PubSubHandle,
        channel: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let channel = channel.into();
        let (sender, receiver) = oneshot::channel();
        let slot = Mutex::new(Some(sender));

        let handler: NotificationHandler = Arc::new(move |message: Notification| {
            if let Ok(mut guard) = slot.lock()
                && let Some(sender) = guard.take()
            {
                let _ = sender.send(message);
            }
        });

        let subscription_id = pubsub.subscribe(&channel, handler).await?;
        let deadline = Instant::now() + timeout;
        debug!(channel = %channel, subscription_id, "Awaiting notification");

        Ok(Self {
            pubsub,
            channel,
            subscription_id,
            receiver,
            deadline,
            active: true,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Waits for the first notification or the deadline, then unsubscribes.
    pub async fn wait(mut self) -> WaitOutcome {
        let outcome = match tokio::time::timeout_at(self.deadline, &mut self.receiver).await {
            Ok(Ok(message)) => WaitOutcome::Notified(message),
            Ok(Err(_)) => {
                // The adapter dropped our handler; nothing can arrive any more.
                tokio::time::sleep_until(self.deadline).await;
                WaitOutcome::TimedOut
            }
            Err(_) => WaitOutcome::TimedOut,
        };
        self.release().await;
        outcome
    }

    /// Abandons the wait and unsubscribes.
    pub async fn cancel(mut self) {
        self.release().await;
    }

    async fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(e) = self
            .pubsub
            .unsubscribe(&self.channel, self.subscription_id)
            .await
        {
            warn!(channel = %self.channel, subscription_id = self.subscription_id, error = %e, "Unsubscribe failed");
        }
    }
}

impl Drop for PendingNotification {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let pubsub = self.pubsub.clone();
        let channel = std::mem::take(&mut self.channel);
        let subscription_id = self.subscription_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = pubsub.unsubscribe(&channel, subscription_id).await {
                        warn!(channel = %channel, subscription_id, error = %e, "Unsubscribe after cancellation failed");
                    }
                });
            }
            Err(_) => {
                warn!(channel = %channel, subscription_id, "No runtime to release subscription");
            }
        }
    }
}
