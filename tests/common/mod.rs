#![allow(dead_code)]

use async_trait::async_trait;
use saga_adapter::application::sagas::account_discovery::{DiscoveryRequests, PartyLookup};
use saga_adapter::application::sagas::otp_validation::{ConsentRequests, OtpValidationArgs};
use saga_adapter::application::sagas::transaction_phase::{PhaseRequests, TransactionPhaseArgs};
use saga_adapter::config::AdapterContext;
use saga_adapter::domain::graph::OutboundError;
use saga_adapter::domain::ports::KeyValueStore;
use saga_adapter::error::{Result as SagaResult, SagaError};
use saga_adapter::infrastructure::in_memory::{InMemoryKeyValueStore, InMemoryPubSub};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Outbound client double that counts requests and signals each one.
#[derive(Default)]
pub struct StubClient {
    calls: AtomicUsize,
    sent: Notify,
    reject: bool,
}

impl StubClient {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            reject: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resolves once a request has been sent.
    pub async fn wait_for_request(&self) {
        self.sent.notified().await;
    }

    fn record(&self) -> Result<(), OutboundError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.notify_one();
        if self.reject {
            return Err(OutboundError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConsentRequests for StubClient {
    async fn patch_consent_request(&self, _args: &OtpValidationArgs) -> Result<(), OutboundError> {
        self.record()
    }
}

#[async_trait]
impl DiscoveryRequests for StubClient {
    async fn get_parties(&self, _lookup: &PartyLookup) -> Result<(), OutboundError> {
        self.record()
    }
}

#[async_trait]
impl PhaseRequests for StubClient {
    async fn send_phase(&self, _args: &TransactionPhaseArgs) -> Result<(), OutboundError> {
        self.record()
    }
}

/// Store whose `fail_on`-th write (1-based) fails; every other call reaches the inner store.
pub struct FailingKeyValueStore {
    pub inner: InMemoryKeyValueStore,
    writes: AtomicUsize,
    fail_on: usize,
}

impl FailingKeyValueStore {
    pub fn failing_on_write(fail_on: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryKeyValueStore::new(),
            writes: AtomicUsize::new(0),
            fail_on,
        })
    }
}

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    async fn get(&self, key: &str) -> SagaResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> SagaResult<()> {
        let write = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if write == self.fail_on {
            return Err(SagaError::PersistenceError("disk full".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn exists(&self, key: &str) -> SagaResult<bool> {
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> SagaResult<()> {
        self.inner.delete(key).await
    }
}

/// In-memory collaborators, with the concrete handles kept for inspection.
pub struct Fixture {
    pub context: AdapterContext,
    pub kvs: InMemoryKeyValueStore,
    pub pubsub: InMemoryPubSub,
}

pub fn fixture(timeout: Duration) -> Fixture {
    let kvs = InMemoryKeyValueStore::new();
    let pubsub = InMemoryPubSub::new();
    let context = AdapterContext::new(
        Arc::new(kvs.clone()),
        Arc::new(pubsub.clone()),
        timeout,
    );
    Fixture {
        context,
        kvs,
        pubsub,
    }
}

/// Like [`fixture`], but storing through `kvs`.
pub fn failing_fixture(
    kvs: Arc<FailingKeyValueStore>,
    timeout: Duration,
) -> (AdapterContext, InMemoryPubSub) {
    let pubsub = InMemoryPubSub::new();
    let context = AdapterContext::new(kvs, Arc::new(pubsub.clone()), timeout);
    (context, pubsub)
}

/// `currentState` of the record stored under `key`.
pub async fn persisted_state(kvs: &dyn KeyValueStore, key: &str) -> String {
    let bytes = kvs.get(key).await.unwrap().expect("record should exist");
    let record: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    record["currentState"].as_str().unwrap().to_string()
}

pub fn otp_args(consent_request_id: &str) -> OtpValidationArgs {
    OtpValidationArgs {
        consent_request_id: consent_request_id.to_string(),
        auth_token: "123456".to_string(),
        to_participant_id: "dfspa".to_string(),
    }
}

/// Blocks until `channel` has a live subscriber.
pub async fn wait_for_subscriber(pubsub: &InMemoryPubSub, channel: &str) {
    while pubsub.subscriber_count(channel).await == 0 {
        tokio::task::yield_now().await;
    }
}
