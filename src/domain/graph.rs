use super::ports::Notification;
use super::saga::ErrorInformation;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure of an outbound request before any callback could be expected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutboundError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Peer rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Declaration of one business saga type.
///
/// A graph supplies argument validation, the key and channel its arguments correlate to, the single
/// outbound action, and how a callback body maps to a response. It is shared read-only by every saga
/// of its type; correlation and persistence belong to the engine.
#[async_trait]
pub trait StateGraph: Send + Sync + 'static {
    type Args: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    type Response: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Stored as `sagaType` in every record of this graph.
    const NAME: &'static str;

    fn validate(&self, args: &Self::Args) -> Result<(), String>;

    /// The saga key `args` belong to. A saga only accepts arguments for its own key, so the
    /// at-most-one-saga-per-key rule also holds per channel.
    fn correlation_key(&self, args: &Self::Args) -> String;

    fn channel(&self, args: &Self::Args) -> String;

    async fn act(&self, args: &Self::Args) -> Result<(), OutboundError>;

    fn on_notification(&self, message: &Notification) -> Result<Self::Response, ErrorInformation>;
}
