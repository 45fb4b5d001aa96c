use crate::domain::channel::{channel, correlation_key};
use crate::domain::graph::{OutboundError, StateGraph};
use crate::domain::ports::Notification;
use crate::domain::saga::{ErrorInformation, decode_callback};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const AUTHORIZATION_PHASE: &str = "authorizations";

/// Largest number of decimal places accepted in an amount.
pub const MAX_AMOUNT_SCALE: u32 = 4;

/// A positive amount in a three-letter currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub currency: String,
    pub amount: Decimal,
}

impl Money {
    pub fn validate(&self) -> Result<(), String> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(format!("Invalid currency code '{}'", self.currency));
        }
        if self.amount <= Decimal::ZERO {
            return Err("Amount must be positive".to_string());
        }
        if self.amount.scale() > MAX_AMOUNT_SCALE {
            return Err(format!(
                "Amount supports at most {} decimal places",
                MAX_AMOUNT_SCALE
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthenticationType {
    Otp,
    U2f,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseType {
    Entered,
    Rejected,
    Resend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationArgs {
    pub transaction_request_id: String,
    pub to_participant_id: String,
    pub authentication_type: AuthenticationType,
    pub amount: Money,
    pub retries_left: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationInfo {
    pub authentication: AuthenticationType,
    pub authentication_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResponse {
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_info: Option<AuthenticationInfo>,
}

pub fn authorization_channel(transaction_request_id: &str) -> String {
    channel(AUTHORIZATION_PHASE, &[transaction_request_id])
}

/// Outbound `POST /authorizations`.
#[async_trait]
pub trait AuthorizationRequests: Send + Sync {
    async fn post_authorization(&self, args: &AuthorizationArgs) -> Result<(), OutboundError>;
}

/// Asks the payer to authorize a transaction request and waits for the signed answer.
pub struct ThirdpartyAuthorization {
    requests: Arc<dyn AuthorizationRequests>,
}

impl ThirdpartyAuthorization {
    pub fn new(requests: Arc<dyn AuthorizationRequests>) -> Self {
        Self { requests }
    }
}

#[async_trait]
impl StateGraph for ThirdpartyAuthorization {
    type Args = AuthorizationArgs;
    type Response = AuthorizationResponse;
    const NAME: &'static str = "thirdpartyAuthorization";

    fn validate(&self, args: &AuthorizationArgs) -> Result<(), String> {
        if args.transaction_request_id.trim().is_empty() {
            return Err("transactionRequestId is required".to_string());
        }
        if args.to_participant_id.trim().is_empty() {
            return Err("toParticipantId is required".to_string());
        }
        if args.retries_left == 0 {
            return Err("retriesLeft must be at least 1".to_string());
        }
        args.amount.validate()
    }

    fn correlation_key(&self, args: &AuthorizationArgs) -> String {
        correlation_key(&[&args.transaction_request_id])
    }

    fn channel(&self, args: &AuthorizationArgs) -> String {
        authorization_channel(&args.transaction_request_id)
    }

    async fn act(&self, args: &AuthorizationArgs) -> Result<(), OutboundError> {
        self.requests.post_authorization(args).await
    }

    fn on_notification(
        &self,
        message: &Notification,
    ) -> Result<AuthorizationResponse, ErrorInformation> {
        decode_callback(message)
    }
}
