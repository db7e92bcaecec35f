//! The CRM HTTP client (spec §4.3): one `reqwest::Client` per process for
//! keep-alive reuse, a 10s timeout, envelope normalization, and the
//! retry/dedup policies layered on top.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{info, warn};

use crm_types::{Envelope, ErrorClass};

use crate::dedup::MutationDedup;
use crate::error::{DomainToolError, Result};
use crate::retry::{retryable_for_reads, with_retry, RetryConfig};

const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CrmClient {
    http: reqwest::Client,
    base_url: String,
    dedup: MutationDedup,
    retry: RetryConfig,
}

impl CrmClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(NETWORK_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| DomainToolError::Request(e.to_string()))?;
        Ok(Self { http, base_url: base_url.into(), dedup: MutationDedup::default(), retry: RetryConfig::default() })
    }

    /// Idempotent read: GET-like, retried with backoff, never deduped.
    pub async fn read(&self, endpoint: &str, token: &str, org_id: &str, query: Value) -> Envelope {
        let label = endpoint.to_string();
        with_retry(&self.retry, &label, || {
            let endpoint = endpoint.to_string();
            let query = query.clone();
            async move {
                let envelope = self.send(&endpoint, token, org_id, query).await;
                let retry = matches!(&envelope, Envelope::Invalid { error } if retryable_for_reads(error.class));
                (envelope, retry)
            }
        })
        .await
    }

    /// Mutation: POST-like, never retried automatically, deduped against
    /// identical `{endpoint, payload}` fingerprints within the dedup window.
    pub async fn mutate(&self, endpoint: &str, token: &str, org_id: &str, payload: Value) -> Envelope {
        let fingerprint = MutationDedup::fingerprint(endpoint, &payload);
        if let Some(cached) = self.dedup.get(&fingerprint) {
            info!(endpoint, "[DOMAIN_TOOLS:DEDUP] short-circuited duplicate mutation");
            return cached;
        }
        let envelope = self.send(endpoint, token, org_id, payload).await;
        self.dedup.put(fingerprint, envelope.clone());
        envelope
    }

    async fn send(&self, endpoint: &str, token: &str, org_id: &str, payload: Value) -> Envelope {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut body = serde_json::json!({
            "Token": token,
            "OrganizationId": org_id,
        });
        if let Value::Object(extra) = payload {
            if let Value::Object(map) = &mut body {
                map.extend(extra);
            }
        }

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(resp) => resp,
            Err(err) => {
                let class = if err.is_timeout() { ErrorClass::Timeout } else { ErrorClass::Network };
                warn!(endpoint, class = ?class, "[DOMAIN_TOOLS:CALL] transport failure");
                return Envelope::err(class, class.user_message(), None);
            }
        };

        let status = response.status();
        let parsed = response.json::<Value>().await.unwrap_or(Value::Null);
        let envelope = Self::normalize(status, parsed);
        info!(endpoint, status = status.as_u16(), valid = envelope.is_valid(), "[DOMAIN_TOOLS:CALL] completed");
        envelope
    }

    /// CRM responses arrive as `[{..., Valid: true}]` or a plain object
    /// (spec §4.3); both normalize to the same `Envelope`.
    fn normalize(status: StatusCode, body: Value) -> Envelope {
        if !status.is_success() {
            let class = ErrorClass::from_status(status.as_u16());
            let message = body
                .get("error")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .unwrap_or(class.user_message())
                .to_string();
            return Envelope::err(class, message, Some(status.as_u16()));
        }

        let object = match body {
            Value::Array(mut items) if !items.is_empty() => items.remove(0),
            other => other,
        };

        let valid = object
            .get("Valid")
            .or_else(|| object.get("valid"))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        if valid {
            Envelope::ok(object)
        } else {
            let message = object.get("error").and_then(Value::as_str).unwrap_or("the CRM rejected the request").to_string();
            Envelope::err(ErrorClass::Unknown, message, Some(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unwraps_array_wrapped_responses() {
        let body = serde_json::json!([{"Valid": true, "id": 7}]);
        let envelope = CrmClient::normalize(StatusCode::OK, body);
        assert!(envelope.is_valid());
        assert_eq!(envelope.data().unwrap()["id"], 7);
    }

    #[test]
    fn normalize_accepts_plain_object_responses() {
        let body = serde_json::json!({"valid": true, "id": 9});
        let envelope = CrmClient::normalize(StatusCode::OK, body);
        assert!(envelope.is_valid());
    }

    #[test]
    fn normalize_treats_200_with_valid_false_as_an_error() {
        let body = serde_json::json!({"Valid": false, "error": "duplicate"});
        let envelope = CrmClient::normalize(StatusCode::OK, body);
        assert!(!envelope.is_valid());
    }

    #[test]
    fn normalize_classifies_non_2xx_by_status() {
        let envelope = CrmClient::normalize(StatusCode::UNAUTHORIZED, Value::Null);
        assert!(!envelope.is_valid());
        assert_eq!(envelope.error().unwrap().class, ErrorClass::Authentication);
    }
}
