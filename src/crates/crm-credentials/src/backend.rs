use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// The two-hop OAuth dance and the refresh call of spec §4.1, abstracted
/// behind a trait so the single-flight store can be tested without a live
/// CRM. A real implementation exchanges the one-time `code` for a bearer
/// token and then the bearer for an opaque session token; both hops are
/// collapsed into `exchange_code` since callers only ever need the result.
#[async_trait]
pub trait OAuthBackend: Send + Sync + 'static {
    async fn exchange_code(&self, code: &str) -> Result<(String, DateTime<Utc>)>;

    /// Refresh using the *current* opaque token; the CRM has no separate
    /// refresh token (spec §4.1).
    async fn refresh(&self, current_token: &str) -> Result<(String, DateTime<Utc>)>;
}

/// Talks to the real CRM OAuth endpoints over `reqwest`.
pub struct HttpOAuthBackend {
    client: reqwest::Client,
    token_ttl: chrono::Duration,
    oauth_exchange_url: String,
    token_exchange_url: String,
    refresh_url: String,
}

impl HttpOAuthBackend {
    pub fn new(
        client: reqwest::Client,
        oauth_exchange_url: impl Into<String>,
        token_exchange_url: impl Into<String>,
        refresh_url: impl Into<String>,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            client,
            token_ttl,
            oauth_exchange_url: oauth_exchange_url.into(),
            token_exchange_url: token_exchange_url.into(),
            refresh_url: refresh_url.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct BearerResponse {
    access_token: String,
}

#[derive(serde::Deserialize)]
struct SessionTokenResponse {
    token: String,
}

#[async_trait]
impl OAuthBackend for HttpOAuthBackend {
    async fn exchange_code(&self, code: &str) -> Result<(String, DateTime<Utc>)> {
        let bearer: BearerResponse = self
            .client
            .post(&self.oauth_exchange_url)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .map_err(|e| crate::error::CredentialError::ExchangeFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| crate::error::CredentialError::ExchangeFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| crate::error::CredentialError::ExchangeFailed(e.to_string()))?;

        let session: SessionTokenResponse = self
            .client
            .post(&self.token_exchange_url)
            .bearer_auth(&bearer.access_token)
            .send()
            .await
            .map_err(|e| crate::error::CredentialError::ExchangeFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| crate::error::CredentialError::ExchangeFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| crate::error::CredentialError::ExchangeFailed(e.to_string()))?;

        Ok((session.token, Utc::now() + self.token_ttl))
    }

    async fn refresh(&self, current_token: &str) -> Result<(String, DateTime<Utc>)> {
        let resp: SessionTokenResponse = self
            .client
            .post(&self.refresh_url)
            .bearer_auth(current_token)
            .send()
            .await
            .map_err(|e| crate::error::CredentialError::RefreshFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| crate::error::CredentialError::RefreshFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| crate::error::CredentialError::RefreshFailed(e.to_string()))?;

        Ok((resp.token, Utc::now() + self.token_ttl))
    }
}
