use crate::error::{Result, SagaError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// States of every saga graph.
///
/// `RequestSent` is persisted right before the outbound action is issued, so a record found in
/// that state after a crash may already have reached the peer and must never be re-sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SagaState {
    Start,
    RequestSent,
    Succeeded,
    Errored,
}

impl SagaState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SagaState::Succeeded | SagaState::Errored)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SagaState::Start => "start",
            SagaState::RequestSent => "requestSent",
            SagaState::Succeeded => "succeeded",
            SagaState::Errored => "errored",
        }
    }

    /// The single transition enabled from this state, if any.
    pub fn transition(self) -> Option<&'static Transition> {
        TRANSITIONS.iter().find(|t| t.from == self)
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edge of the saga graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub name: &'static str,
    pub from: SagaState,
    pub on_success: SagaState,
    pub on_error: SagaState,
}

pub const REQUEST_ACTION: Transition = Transition {
    name: "requestAction",
    from: SagaState::Start,
    on_success: SagaState::RequestSent,
    on_error: SagaState::Errored,
};

pub const NOTIFICATION_RECEIVED: Transition = Transition {
    name: "notificationReceived",
    from: SagaState::RequestSent,
    on_success: SagaState::Succeeded,
    on_error: SagaState::Errored,
};

/// Linear graph shared by every saga type. Terminal states have no outgoing edge.
pub const TRANSITIONS: [Transition; 2] = [REQUEST_ACTION, NOTIFICATION_RECEIVED];

/// Error payload carried by peer callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInformation {
    pub error_code: String,
    pub error_description: String,
}

impl ErrorInformation {
    pub const MALFORMED_CALLBACK_CODE: &'static str = "3100";

    pub fn new(error_code: impl Into<String>, error_description: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            error_description: error_description.into(),
        }
    }

    pub fn malformed_callback(reason: impl fmt::Display) -> Self {
        Self::new(
            Self::MALFORMED_CALLBACK_CODE,
            format!("Malformed callback: {}", reason),
        )
    }
}

impl fmt::Display for ErrorInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.error_code, self.error_description)
    }
}

/// Why a saga ended in `errored`. Persisted so a re-read yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TerminalError {
    OutboundAction {
        reason: String,
    },
    Timeout {
        seconds: u64,
    },
    #[serde(rename_all = "camelCase")]
    Callback {
        error_information: ErrorInformation,
    },
}

impl TerminalError {
    pub fn to_error(&self, key: &str) -> SagaError {
        let key = key.to_string();
        match self {
            TerminalError::OutboundAction { reason } => SagaError::OutboundActionError {
                key,
                reason: reason.clone(),
            },
            TerminalError::Timeout { seconds } => SagaError::TimeoutError {
                key,
                seconds: *seconds,
            },
            TerminalError::Callback { error_information } => SagaError::CallbackError {
                key,
                error_information: error_information.clone(),
            },
        }
    }
}

/// The persisted record of one saga instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaData<A, R> {
    pub key: String,
    pub saga_type: String,
    pub current_state: SagaState,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub args: Option<A>,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub response: Option<R>,
    #[serde(
        rename = "errorInformation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<TerminalError>,
}

fn none<T>() -> Option<T> {
    None
}

impl<A: Clone, R: Clone> SagaData<A, R> {
    pub fn new(key: impl Into<String>, saga_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            saga_type: saga_type.into(),
            current_state: SagaState::Start,
            args: None,
            response: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }

    pub fn with_args(&self, args: A) -> Self {
        Self {
            args: Some(args),
            ..self.clone()
        }
    }

    /// Returns the record after taking `transition` with the given outcome.
    ///
    /// `Ok` moves to `on_success` (storing the response when present), `Err` to `on_error`.
    pub fn apply(
        &self,
        transition: &Transition,
        outcome: std::result::Result<Option<R>, TerminalError>,
    ) -> Result<Self> {
        if self.current_state != transition.from {
            return Err(SagaError::ValidationError(format!(
                "Transition '{}' is not enabled from state '{}'",
                transition.name, self.current_state
            )));
        }

        let mut next = self.clone();
        match outcome {
            Ok(response) => {
                next.current_state = transition.on_success;
                if response.is_some() {
                    next.response = response;
                }
            }
            Err(error) => {
                next.current_state = transition.on_error;
                next.error = Some(error);
            }
        }
        Ok(next)
    }

    /// The stored result of a terminal record; `None` while the saga is still in flight.
    pub fn result(&self) -> Option<Result<R>> {
        match self.current_state {
            SagaState::Succeeded => Some(self.response.clone().ok_or_else(|| {
                SagaError::PersistenceError(format!(
                    "Succeeded saga '{}' has no stored response",
                    self.key
                ))
            })),
            SagaState::Errored => Some(Err(match &self.error {
                Some(error) => error.to_error(&self.key),
                None => SagaError::PersistenceError(format!(
                    "Errored saga '{}' has no stored error",
                    self.key
                )),
            })),
            SagaState::Start | SagaState::RequestSent => None,
        }
    }
}

/// Decodes a callback body, treating any `errorInformation` member as a business error.
pub fn decode_callback<R: DeserializeOwned>(
    message: &[u8],
) -> std::result::Result<R, ErrorInformation> {
    let value: serde_json::Value =
        serde_json::from_slice(message).map_err(ErrorInformation::malformed_callback)?;

    if let Some(info) = value.get("errorInformation") {
        return Err(serde_json::from_value(info.clone())
            .unwrap_or_else(ErrorInformation::malformed_callback));
    }

    serde_json::from_value(value).map_err(ErrorInformation::malformed_callback)
}
