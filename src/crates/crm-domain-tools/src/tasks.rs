//! Task CRUD (spec §4.5.3): window fetch, create/update/complete/delete,
//! contact linking, bare-date to full-day ISO window conversion.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crm_types::Envelope;

use crate::client::CrmClient;

/// Expands a bare calendar date into `[start-of-day, end-of-day)` in UTC
/// (spec §4.5.3).
pub fn full_day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is always valid"));
    let end = Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).expect("23:59:59 is always valid"));
    (start, end)
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskWindowParams {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskParams {
    pub subject: String,
    pub due: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskParams {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTaskParams {
    pub task_id: String,
    pub contact_id: String,
}

pub async fn list_window(client: &CrmClient, token: &str, org_id: &str, params: TaskWindowParams) -> Envelope {
    client.read("/tasks", token, org_id, json!(params)).await
}

pub async fn create(client: &CrmClient, token: &str, org_id: &str, params: CreateTaskParams) -> Envelope {
    client.mutate("/tasks", token, org_id, json!(params)).await
}

pub async fn update(client: &CrmClient, token: &str, org_id: &str, params: UpdateTaskParams) -> Envelope {
    client.mutate("/tasks/update", token, org_id, json!(params)).await
}

pub async fn complete(client: &CrmClient, token: &str, org_id: &str, task_id: &str) -> Envelope {
    client.mutate("/tasks/complete", token, org_id, json!({ "task_id": task_id })).await
}

pub async fn delete(client: &CrmClient, token: &str, org_id: &str, task_id: &str) -> Envelope {
    client.mutate("/tasks/delete", token, org_id, json!({ "task_id": task_id })).await
}

pub async fn link_contact(client: &CrmClient, token: &str, org_id: &str, params: LinkTaskParams) -> Envelope {
    client.mutate("/tasks/link", token, org_id, json!(params)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_day_window_spans_midnight_to_just_before_next_midnight() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let (start, end) = full_day_window(date);
        assert_eq!(start.format("%H:%M:%S").to_string(), "00:00:00");
        assert_eq!(end.format("%H:%M:%S").to_string(), "23:59:59");
        assert_eq!(start.date_naive(), date);
        assert_eq!(end.date_naive(), date);
    }
}
