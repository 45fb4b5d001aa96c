use crate::domain::channel::{channel, correlation_key};
use crate::domain::graph::{OutboundError, StateGraph};
use crate::domain::ports::Notification;
use crate::domain::saga::{ErrorInformation, decode_callback};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const OTP_VALIDATION_PHASE: &str = "OTPValidation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpValidationArgs {
    pub consent_request_id: String,
    pub auth_token: String,
    pub to_participant_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpValidationResponse {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_id: Option<String>,
}

pub fn otp_validation_channel(consent_request_id: &str) -> String {
    channel(OTP_VALIDATION_PHASE, &[consent_request_id])
}

/// Outbound `PATCH /consentRequests/{id}` carrying the OTP.
#[async_trait]
pub trait ConsentRequests: Send + Sync {
    async fn patch_consent_request(&self, args: &OtpValidationArgs) -> Result<(), OutboundError>;
}

/// Forwards a user's OTP to the DFSP and waits for the verification verdict.
pub struct OtpValidation {
    requests: Arc<dyn ConsentRequests>,
}

impl OtpValidation {
    pub fn new(requests: Arc<dyn ConsentRequests>) -> Self {
        Self { requests }
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl StateGraph for OtpValidation {
    type Args = OtpValidationArgs;
    type Response = OtpValidationResponse;
    const NAME: &'static str = "otpValidation";

    fn validate(&self, args: &OtpValidationArgs) -> Result<(), String> {
        if !is_token(&args.consent_request_id) {
            return Err("consentRequestId is required".to_string());
        }
        if !is_token(&args.auth_token) {
            return Err("authToken must be alphanumeric".to_string());
        }
        if args.to_participant_id.trim().is_empty() {
            return Err("toParticipantId is required".to_string());
        }
        Ok(())
    }

    fn correlation_key(&self, args: &OtpValidationArgs) -> String {
        correlation_key(&[&args.consent_request_id])
    }

    fn channel(&self, args: &OtpValidationArgs) -> String {
        otp_validation_channel(&args.consent_request_id)
    }

    async fn act(&self, args: &OtpValidationArgs) -> Result<(), OutboundError> {
        self.requests.patch_consent_request(args).await
    }

    fn on_notification(
        &self,
        message: &Notification,
    ) -> Result<OtpValidationResponse, ErrorInformation> {
        decode_callback(message)
    }
}
