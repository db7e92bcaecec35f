//! Contact search (spec §4.5.1). Scoring/disambiguation lives in
//! `crm-planner`'s sibling crate `crm-subgraphs`; this module only wraps the
//! CRM endpoint.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crm_types::Envelope;

use crate::client::CrmClient;

#[derive(Debug, Clone, Serialize)]
pub struct ContactSearchParams {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub async fn search(client: &CrmClient, token: &str, org_id: &str, params: ContactSearchParams) -> Envelope {
    client.read("/contacts/search", token, org_id, json!(params)).await
}
