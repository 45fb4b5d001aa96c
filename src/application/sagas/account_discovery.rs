use crate::domain::channel::{channel, correlation_key};
use crate::domain::graph::{OutboundError, StateGraph};
use crate::domain::ports::Notification;
use crate::domain::saga::{ErrorInformation, decode_callback};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const LOOKUP_PHASE: &str = "lookup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyIdType {
    Msisdn,
    Email,
    PersonalId,
    Business,
    Device,
    AccountId,
    Iban,
    Alias,
}

impl PartyIdType {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyIdType::Msisdn => "MSISDN",
            PartyIdType::Email => "EMAIL",
            PartyIdType::PersonalId => "PERSONAL_ID",
            PartyIdType::Business => "BUSINESS",
            PartyIdType::Device => "DEVICE",
            PartyIdType::AccountId => "ACCOUNT_ID",
            PartyIdType::Iban => "IBAN",
            PartyIdType::Alias => "ALIAS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyLookup {
    pub party_id_type: PartyIdType,
    pub party_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_sub_id_or_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyIdInfo {
    pub party_id_type: PartyIdType,
    pub party_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_sub_id_or_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsp_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub party_id_info: PartyIdInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyLookupResponse {
    pub party: Party,
}

/// Channel on which the `PUT /parties` callback for a lookup is published.
pub fn lookup_channel(
    party_id_type: PartyIdType,
    party_identifier: &str,
    party_sub_id_or_type: Option<&str>,
) -> String {
    channel(
        LOOKUP_PHASE,
        &[
            party_id_type.as_str(),
            party_identifier,
            party_sub_id_or_type.unwrap_or(""),
        ],
    )
}

/// Saga key of a lookup; one lookup per party identity may be in flight.
pub fn lookup_key(
    party_id_type: PartyIdType,
    party_identifier: &str,
    party_sub_id_or_type: Option<&str>,
) -> String {
    correlation_key(&[
        party_id_type.as_str(),
        party_identifier,
        party_sub_id_or_type.unwrap_or(""),
    ])
}

/// Outbound `GET /parties` request.
#[async_trait]
pub trait DiscoveryRequests: Send + Sync {
    async fn get_parties(&self, lookup: &PartyLookup) -> Result<(), OutboundError>;
}

/// Resolves a party identifier to the participant that owns it.
pub struct AccountDiscovery {
    requests: Arc<dyn DiscoveryRequests>,
}

impl AccountDiscovery {
    pub fn new(requests: Arc<dyn DiscoveryRequests>) -> Self {
        Self { requests }
    }
}

#[async_trait]
impl StateGraph for AccountDiscovery {
    type Args = PartyLookup;
    type Response = PartyLookupResponse;
    const NAME: &'static str = "accountDiscovery";

    fn validate(&self, args: &PartyLookup) -> Result<(), String> {
        let id = args.party_identifier.as_str();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err("partyIdentifier must be a non-empty token".to_string());
        }
        if args.party_id_type == PartyIdType::Msisdn
            && !(id.len() <= 15 && id.chars().all(|c| c.is_ascii_digit()))
        {
            return Err("MSISDN partyIdentifier must be 1-15 digits".to_string());
        }
        if let Some(sub) = &args.party_sub_id_or_type
            && sub.is_empty()
        {
            return Err("partySubIdOrType must not be empty when present".to_string());
        }
        Ok(())
    }

    fn correlation_key(&self, args: &PartyLookup) -> String {
        lookup_key(
            args.party_id_type,
            &args.party_identifier,
            args.party_sub_id_or_type.as_deref(),
        )
    }

    fn channel(&self, args: &PartyLookup) -> String {
        lookup_channel(
            args.party_id_type,
            &args.party_identifier,
            args.party_sub_id_or_type.as_deref(),
        )
    }

    async fn act(&self, args: &PartyLookup) -> Result<(), OutboundError> {
        self.requests.get_parties(args).await
    }

    fn on_notification(
        &self,
        message: &Notification,
    ) -> Result<PartyLookupResponse, ErrorInformation> {
        decode_callback(message)
    }
}
