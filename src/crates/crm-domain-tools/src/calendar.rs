//! Calendar activities (spec §4.5.2): window fetch, appointment creation,
//! attendee linking.

use serde::{Deserialize, Serialize};
use serde_json::json;

use chrono::{DateTime, Utc};
use crm_types::Envelope;

use crate::client::CrmClient;

/// Entity kinds the CRM's link endpoint accepts for an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Contact,
    Company,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActivityWindow {
    /// The CRM treats windows as half-open; a single-day window is widened
    /// by ±1 day so the target day's boundary activities aren't dropped
    /// (spec §4.5.2).
    pub fn widened_if_single_day(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start.date_naive() == end.date_naive() {
            Self { start: start - chrono::Duration::days(1), end: end + chrono::Duration::days(1) }
        } else {
            Self { start, end }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentParams {
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkAppointmentParams {
    pub appointment_id: String,
    pub linked_id: String,
    pub kind: LinkKind,
}

pub async fn list_window(client: &CrmClient, token: &str, org_id: &str, window: ActivityWindow) -> Envelope {
    client.read("/calendar/activities", token, org_id, json!(window)).await
}

pub async fn create_appointment(client: &CrmClient, token: &str, org_id: &str, params: CreateAppointmentParams) -> Envelope {
    client.mutate("/calendar/appointments", token, org_id, json!(params)).await
}

pub async fn link_appointment(client: &CrmClient, token: &str, org_id: &str, params: LinkAppointmentParams) -> Envelope {
    client.mutate("/calendar/appointments/link", token, org_id, json!(params)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn single_day_windows_are_widened_by_one_day_on_each_side() {
        let day = Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap();
        let window = ActivityWindow::widened_if_single_day(day, day + chrono::Duration::hours(23));
        assert_eq!(window.start, day - chrono::Duration::days(1));
        assert_eq!(window.end, day + chrono::Duration::hours(23) + chrono::Duration::days(1));
    }

    #[test]
    fn multi_day_windows_pass_through_unchanged() {
        let start = Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 7, 29, 0, 0, 0).unwrap();
        let window = ActivityWindow::widened_if_single_day(start, end);
        assert_eq!(window.start, start);
        assert_eq!(window.end, end);
    }
}
