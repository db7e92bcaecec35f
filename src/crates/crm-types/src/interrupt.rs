//! Interrupt payloads delivered to the client (spec §3, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approval::ApprovalRequest;
use crate::domain::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptType {
    ApprovalRequired,
    ContactDisambiguation,
}

/// Ephemeral payload handed to the transport layer. This is a recovery aid,
/// not the source of truth — the checkpoint behind it is (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInterrupt {
    pub session_id: String,
    pub thread_id: String,
    #[serde(rename = "type")]
    pub interrupt_type: InterruptType,
    pub payload: InterruptPayload,
    pub created_at: DateTime<Utc>,
}

impl PendingInterrupt {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// Consolidated interrupt payload as serialized to the client (spec §4.6
/// `approval_handler`, §6 `/api/agent/execute` 202 response shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptPayload {
    #[serde(rename = "type")]
    pub interrupt_type: InterruptType,
    pub previews: Vec<String>,
    pub message: String,
    pub thread_id: String,
    pub domains: Vec<Domain>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<ApprovalRequest>,
}
