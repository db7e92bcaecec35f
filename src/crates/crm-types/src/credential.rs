//! Credential entity (spec §3, §4.1). The opaque token is never exposed by
//! `Debug` or `Display` — only by the explicit `.token()` accessor, so a
//! stray `tracing::debug!(?credential)` can't leak it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum remaining lifetime before `CredentialStore::get_token` triggers a
/// proactive refresh (spec §4.1).
pub const REFRESH_THRESHOLD: Duration = Duration::minutes(5);

#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub session_id: String,
    pub user_id: Option<String>,
    token: String,
    pub expiry: DateTime<Utc>,
}

impl Credential {
    pub fn new(session_id: impl Into<String>, token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self { session_id: session_id.into(), user_id: None, token: token.into(), expiry }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// True when fewer than [`REFRESH_THRESHOLD`] remain before expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expiry - now < REFRESH_THRESHOLD
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_token() {
        let cred = Credential::new("sess", "super-secret-token", Utc::now());
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn needs_refresh_at_five_minute_boundary() {
        let now = Utc::now();
        let cred = Credential::new("sess", "tok", now + Duration::minutes(4));
        assert!(cred.needs_refresh(now));

        let cred = Credential::new("sess", "tok", now + Duration::minutes(10));
        assert!(!cred.needs_refresh(now));
    }

    #[test]
    fn is_expired_is_a_strict_upper_bound() {
        let now = Utc::now();
        let cred = Credential::new("sess", "tok", now - Duration::seconds(1));
        assert!(cred.is_expired(now));
    }
}
