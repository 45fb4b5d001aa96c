use crate::domain::channel::{channel, correlation_key};
use crate::domain::graph::{OutboundError, StateGraph};
use crate::domain::ports::Notification;
use crate::domain::saga::{ErrorInformation, decode_callback};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Phases of a third-party transaction whose callbacks are awaited generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionPhase {
    TransactionRequest,
    Authorization,
    Transfer,
    Notification,
}

impl TransactionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionPhase::TransactionRequest => "transactionRequest",
            TransactionPhase::Authorization => "authorization",
            TransactionPhase::Transfer => "transfer",
            TransactionPhase::Notification => "notification",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPhaseArgs {
    pub phase: TransactionPhase,
    pub transaction_id: String,
    pub to_participant_id: String,
    #[serde(default)]
    pub payload: Value,
}

pub fn transaction_phase_channel(phase: TransactionPhase, transaction_id: &str) -> String {
    channel(phase.as_str(), &[transaction_id])
}

#[async_trait]
pub trait PhaseRequests: Send + Sync {
    async fn send_phase(&self, args: &TransactionPhaseArgs) -> Result<(), OutboundError>;
}

/// Sends one transaction-phase message and waits for its opaque callback body.
pub struct TransactionPhaseNotification {
    requests: Arc<dyn PhaseRequests>,
}

impl TransactionPhaseNotification {
    pub fn new(requests: Arc<dyn PhaseRequests>) -> Self {
        Self { requests }
    }
}

#[async_trait]
impl StateGraph for TransactionPhaseNotification {
    type Args = TransactionPhaseArgs;
    type Response = Value;
    const NAME: &'static str = "transactionPhase";

    fn validate(&self, args: &TransactionPhaseArgs) -> Result<(), String> {
        if args.transaction_id.trim().is_empty() {
            return Err("transactionId is required".to_string());
        }
        if args.to_participant_id.trim().is_empty() {
            return Err("toParticipantId is required".to_string());
        }
        if !(args.payload.is_object() || args.payload.is_null()) {
            return Err("payload must be a JSON object".to_string());
        }
        Ok(())
    }

    /// One saga per phase of a transaction.
    fn correlation_key(&self, args: &TransactionPhaseArgs) -> String {
        correlation_key(&[args.phase.as_str(), &args.transaction_id])
    }

    fn channel(&self, args: &TransactionPhaseArgs) -> String {
        transaction_phase_channel(args.phase, &args.transaction_id)
    }

    async fn act(&self, args: &TransactionPhaseArgs) -> Result<(), OutboundError> {
        self.requests.send_phase(args).await
    }

    fn on_notification(&self, message: &Notification) -> Result<Value, ErrorInformation> {
        let body: Value = decode_callback(message)?;
        if !body.is_object() {
            return Err(ErrorInformation::malformed_callback(
                "callback body must be a JSON object",
            ));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoRequests;

    #[async_trait]
    impl PhaseRequests for NoRequests {
        async fn send_phase(&self, _args: &TransactionPhaseArgs) -> Result<(), OutboundError> {
            Ok(())
        }
    }

    #[test]
    fn test_channel_per_phase() {
        assert_eq!(
            transaction_phase_channel(TransactionPhase::Transfer, "t1"),
            "v1:transfer_t1"
        );
        assert_ne!(
            transaction_phase_channel(TransactionPhase::Transfer, "t1"),
            transaction_phase_channel(TransactionPhase::Authorization, "t1")
        );
    }

    #[test]
    fn test_validation_rejects_non_object_payload() {
        let graph = TransactionPhaseNotification::new(Arc::new(NoRequests));
        let mut args = TransactionPhaseArgs {
            phase: TransactionPhase::TransactionRequest,
            transaction_id: "t1".to_string(),
            to_participant_id: "dfspa".to_string(),
            payload: json!({"amount": {"currency": "USD", "amount": "1"}}),
        };
        assert!(graph.validate(&args).is_ok());

        args.payload = json!([1, 2]);
        assert!(graph.validate(&args).is_err());
    }

    #[test]
    fn test_on_notification_keeps_body() {
        let graph = TransactionPhaseNotification::new(Arc::new(NoRequests));
        let body = json!({"transferState": "COMMITTED"});
        let decoded = graph
            .on_notification(&serde_json::to_vec(&body).unwrap())
            .unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn test_on_notification_requires_object_body() {
        let graph = TransactionPhaseNotification::new(Arc::new(NoRequests));
        let bodies: [&[u8]; 3] = [b"null", b"[1,2]", b"\"COMMITTED\""];
        for body in bodies {
            let err = graph.on_notification(&body.to_vec()).unwrap_err();
            assert_eq!(err.error_code, ErrorInformation::MALFORMED_CALLBACK_CODE);
        }
    }

    #[test]
    fn test_correlation_key_per_phase() {
        let graph = TransactionPhaseNotification::new(Arc::new(NoRequests));
        let mut args = TransactionPhaseArgs {
            phase: TransactionPhase::Transfer,
            transaction_id: "t1".to_string(),
            to_participant_id: "dfspa".to_string(),
            payload: Value::Null,
        };
        assert_eq!(graph.correlation_key(&args), "transfer_t1");
        args.phase = TransactionPhase::Notification;
        assert_eq!(graph.correlation_key(&args), "notification_t1");
    }
}
