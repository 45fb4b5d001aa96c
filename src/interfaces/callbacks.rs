use crate::application::sagas::account_discovery::{PartyIdType, lookup_channel};
use crate::application::sagas::authorization::authorization_channel;
use crate::application::sagas::otp_validation::otp_validation_channel;
use crate::application::sagas::transaction_phase::{TransactionPhase, transaction_phase_channel};
use crate::domain::ports::{Notification, PubSubHandle};
use crate::error::{Result, SagaError};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Correlates peer callbacks with waiting sagas.
///
/// It only computes the channel and publishes the body. Business handling happens in the saga
/// that subscribed to that channel.
#[derive(Clone)]
pub struct CallbackNotifier {
    pubsub: PubSubHandle,
}

impl CallbackNotifier {
    pub fn new(pubsub: PubSubHandle) -> Self {
        Self { pubsub }
    }

    /// Publishes `body` on `channel` and returns how many subscribers received it.
    pub async fn notify(&self, channel: &str, body: Notification) -> Result<usize> {
        let delivered = self
            .pubsub
            .publish(channel, body)
            .await
            .map_err(|e| match e {
                SagaError::PubSubError(_) => e,
                other => SagaError::PubSubError(other.to_string()),
            })?;
        debug!(channel, delivered, "Callback published");
        Ok(delivered)
    }

    /// Publishes on a detached task; failures are logged and never reach the caller.
    ///
    /// Used by HTTP handlers that have already answered the peer.
    pub fn notify_detached(&self, channel: String, body: Notification) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier.notify(&channel, body).await {
                Ok(0) => debug!(channel = %channel, "Callback had no waiting saga"),
                Ok(_) => {}
                Err(e) => error!(channel = %channel, error = %e, "Failed to publish callback"),
            }
        })
    }

    pub fn party_lookup(
        &self,
        party_id_type: PartyIdType,
        party_identifier: &str,
        party_sub_id_or_type: Option<&str>,
        body: Notification,
    ) -> JoinHandle<()> {
        self.notify_detached(
            lookup_channel(party_id_type, party_identifier, party_sub_id_or_type),
            body,
        )
    }

    pub fn otp_validation(&self, consent_request_id: &str, body: Notification) -> JoinHandle<()> {
        self.notify_detached(otp_validation_channel(consent_request_id), body)
    }

    pub fn authorization(&self, transaction_request_id: &str, body: Notification) -> JoinHandle<()> {
        self.notify_detached(authorization_channel(transaction_request_id), body)
    }

    pub fn transaction_phase(
        &self,
        phase: TransactionPhase,
        transaction_id: &str,
        body: Notification,
    ) -> JoinHandle<()> {
        self.notify_detached(transaction_phase_channel(phase, transaction_id), body)
    }
}
