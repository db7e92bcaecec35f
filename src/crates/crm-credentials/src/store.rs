use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crm_types::Credential;

use crate::backend::OAuthBackend;
use crate::error::{CredentialError, Result};

/// Per-session credential store with single-flight refresh (spec §4.1).
///
/// Each session gets its own `tokio::sync::Mutex<Option<Credential>>`. The
/// lock is held across the `.await` of a refresh call, so a second caller
/// blocked on the same session's lock observes the token a prior caller just
/// refreshed and never issues a redundant network call — no separate
/// in-flight-future bookkeeping is needed.
pub struct CredentialStore<B: OAuthBackend> {
    backend: B,
    sessions: DashMap<String, Arc<Mutex<Option<Credential>>>>,
}

impl<B: OAuthBackend> CredentialStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, sessions: DashMap::new() }
    }

    fn slot(&self, session_id: &str) -> Arc<Mutex<Option<Credential>>> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Exchange a one-time OAuth code for an opaque session token and
    /// persist it. The one-time code itself is never stored.
    pub async fn complete_oauth(&self, session_id: &str, code: &str) -> Result<()> {
        let (token, expiry) = self.backend.exchange_code(code).await?;
        let slot = self.slot(session_id);
        let mut guard = slot.lock().await;
        *guard = Some(Credential::new(session_id, token, expiry));
        info!(session_id, "[CREDENTIALS:OAUTH] session token issued");
        Ok(())
    }

    /// Return a live token for `session_id`, refreshing proactively if fewer
    /// than [`crm_types::REFRESH_THRESHOLD`] remain. Returns `None` if no
    /// credential is on file, or if the stored token has actually expired
    /// and a refresh attempt failed.
    pub async fn get_token(&self, session_id: &str) -> Result<Option<String>> {
        let slot = self.slot(session_id);
        let mut guard = slot.lock().await;

        let cred = match guard.as_ref() {
            Some(cred) => cred,
            None => return Ok(None),
        };

        let now = Utc::now();
        if !cred.needs_refresh(now) {
            return Ok(Some(cred.token().to_string()));
        }

        match self.backend.refresh(cred.token()).await {
            Ok((token, expiry)) => {
                let user_id = cred.user_id.clone();
                let mut refreshed = Credential::new(session_id, token, expiry);
                if let Some(user_id) = user_id {
                    refreshed = refreshed.with_user_id(user_id);
                }
                let out = refreshed.token().to_string();
                *guard = Some(refreshed);
                info!(session_id, "[CREDENTIALS:REFRESH] token refreshed proactively");
                Ok(Some(out))
            }
            Err(err) => {
                warn!(session_id, error = %err, "[CREDENTIALS:REFRESH] proactive refresh failed");
                // Leave the stored credential untouched. If it hasn't
                // actually expired yet, the caller gets one more turn on the
                // old token before a downstream 401 forces reactive refresh.
                if cred.is_expired(now) {
                    Ok(None)
                } else {
                    Ok(Some(cred.token().to_string()))
                }
            }
        }
    }

    /// Force a refresh regardless of remaining TTL — the reactive path after
    /// a domain call comes back with a 401 (spec §4.1/§4.3). Still
    /// single-flighted through the same per-session lock as `get_token`.
    pub async fn refresh(&self, session_id: &str) -> Result<String> {
        let slot = self.slot(session_id);
        let mut guard = slot.lock().await;

        let cred = guard.as_ref().ok_or(CredentialError::NotFound)?;
        let (token, expiry) = self.backend.refresh(cred.token()).await?;
        let user_id = cred.user_id.clone();
        let mut refreshed = Credential::new(session_id, token, expiry);
        if let Some(user_id) = user_id {
            refreshed = refreshed.with_user_id(user_id);
        }
        let out = refreshed.token().to_string();
        *guard = Some(refreshed);
        info!(session_id, "[CREDENTIALS:REFRESH] token refreshed reactively");
        Ok(out)
    }

    /// Drop the session's credential entirely — terminal state after a
    /// second consecutive 401 (spec §4.1: "reauth required").
    pub fn forget(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}
