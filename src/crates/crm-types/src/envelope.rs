//! The uniform `{valid, data|error}` shape every domain tool call normalizes
//! into (spec §4.3), and the error taxonomy of spec §7.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Authentication,
    Authorization,
    RateLimit,
    ServerError,
    Timeout,
    Network,
    Unknown,
}

impl ErrorClass {
    /// Only idempotent reads may be retried, and only for these classes
    /// (spec §4.3: network/5xx/"expired token" on GET/list/search).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::ServerError | ErrorClass::Timeout | ErrorClass::Network)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorClass::Authentication => "Your session has expired. Please sign in again.",
            ErrorClass::Authorization => "You don't have permission to do that.",
            ErrorClass::RateLimit => "The CRM is rate-limiting us right now. Please try again shortly.",
            ErrorClass::ServerError => "The CRM is having trouble. Please try again shortly.",
            ErrorClass::Timeout => "That request took too long and timed out.",
            ErrorClass::Network => "We couldn't reach the CRM.",
            ErrorClass::Unknown => "Something went wrong talking to the CRM.",
        }
    }

    /// Classify by HTTP status, the way spec §4.3 requires.
    pub fn from_status(status: u16) -> ErrorClass {
        match status {
            401 => ErrorClass::Authentication,
            403 => ErrorClass::Authorization,
            429 => ErrorClass::RateLimit,
            500..=599 => ErrorClass::ServerError,
            _ => ErrorClass::Unknown,
        }
    }
}

/// Normalized response from a domain tool call. CRM responses may arrive as
/// `[{..., Valid: true}]` or a plain object; `Envelope` is the one shape
/// every caller above the tool layer deals with. Built by hand in the
/// normalizer (spec §4.3) rather than deserialized directly off the wire,
/// so its own `Serialize`/`Deserialize` impl is for internal caching only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Envelope {
    Valid { data: serde_json::Value },
    Invalid { error: ToolError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub class: ErrorClass,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl Envelope {
    pub fn ok(data: serde_json::Value) -> Self {
        Envelope::Valid { data }
    }

    pub fn err(class: ErrorClass, message: impl Into<String>, status: Option<u16>) -> Self {
        Envelope::Invalid { error: ToolError { class, message: message.into(), status } }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Envelope::Valid { .. })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Envelope::Valid { data } => Some(data),
            Envelope::Invalid { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            Envelope::Valid { .. } => None,
            Envelope::Invalid { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_server_and_timeout_are_retryable() {
        assert!(ErrorClass::ServerError.is_retryable());
        assert!(ErrorClass::Timeout.is_retryable());
        assert!(ErrorClass::Network.is_retryable());
        assert!(!ErrorClass::Authentication.is_retryable());
        assert!(!ErrorClass::RateLimit.is_retryable());
    }

    #[test]
    fn status_classification_matches_spec_buckets() {
        assert_eq!(ErrorClass::from_status(401), ErrorClass::Authentication);
        assert_eq!(ErrorClass::from_status(403), ErrorClass::Authorization);
        assert_eq!(ErrorClass::from_status(429), ErrorClass::RateLimit);
        assert_eq!(ErrorClass::from_status(503), ErrorClass::ServerError);
        assert_eq!(ErrorClass::from_status(418), ErrorClass::Unknown);
    }

    #[test]
    fn normalize_idempotence_holds_for_valid_and_invalid() {
        let valid = Envelope::ok(serde_json::json!({"id": 1}));
        assert!(valid.is_valid());

        let invalid = Envelope::err(ErrorClass::Network, "boom", None);
        assert!(!invalid.is_valid());
    }
}
