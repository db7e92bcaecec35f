//! Natural-language date window resolution shared by the Calendar and Task
//! subgraphs (spec §4.5.2, §4.5.3). A small ordered set of heuristics, not a
//! general date parser — the planner's entity extraction already isolates
//! the date phrase; this module turns it into a concrete window.
//!
//! All weekday/day-boundary arithmetic happens in the caller's local zone —
//! converting to UTC first would shift "today" for zones whose offset
//! crosses midnight UTC (spec: `SubgraphInput.timezone` must be honored).

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

fn resolve_tz(tz: &str) -> Tz {
    tz.parse().unwrap_or(Tz::UTC)
}

fn start_of_day(dt: DateTime<Tz>) -> DateTime<Tz> {
    dt.timezone().with_ymd_and_hms(dt.year(), dt.month(), dt.day(), 0, 0, 0).unwrap()
}

fn weekday_from(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Resolves a single-day or ranged window from `query`, relative to `now`
/// and expressed in `tz` (an IANA name, e.g. `"America/New_York"`; falls
/// back to UTC if unrecognized). Returns `[start, end)` in UTC — callers
/// needing the CRM's half-open widening apply it separately (spec §4.5.2).
pub fn resolve_window(query: &str, now: DateTime<Utc>, tz: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let zone = resolve_tz(tz);
    let lower = query.to_lowercase();
    let now_local = now.with_timezone(&zone);
    let today = start_of_day(now_local);

    let window = if lower.contains("today") {
        Some((today, today + Duration::days(1)))
    } else if lower.contains("tomorrow") {
        let day = today + Duration::days(1);
        Some((day, day + Duration::days(1)))
    } else if lower.contains("yesterday") {
        let day = today - Duration::days(1);
        Some((day, day + Duration::days(1)))
    } else if lower.contains("next week") {
        let days_until_monday = (8 - today.weekday().num_days_from_monday() as i64) % 7;
        let days_until_monday = if days_until_monday == 0 { 7 } else { days_until_monday };
        let start = today + Duration::days(days_until_monday);
        Some((start, start + Duration::days(7)))
    } else if lower.contains("this week") {
        let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        Some((start, start + Duration::days(7)))
    } else {
        [
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
        ]
        .into_iter()
        .find(|name| lower.contains(name))
        .and_then(|name| {
            let target = weekday_from(name)?;
            let current = today.weekday().num_days_from_monday() as i64;
            let wanted = target.num_days_from_monday() as i64;
            let mut delta = wanted - current;
            if delta <= 0 {
                delta += 7;
            }
            let day = today + Duration::days(delta);
            Some((day, day + Duration::days(1)))
        })
    };

    window.map(|(start, end)| (start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        // A Monday.
        Utc.with_ymd_and_hms(2026, 7, 27, 15, 0, 0).unwrap()
    }

    #[test]
    fn today_resolves_to_the_current_calendar_day_in_utc() {
        let (start, end) = resolve_window("what's on today", fixed_now(), "UTC").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap());
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn tomorrow_resolves_to_the_next_calendar_day() {
        let (start, _) = resolve_window("schedule something tomorrow", fixed_now(), "UTC").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn next_week_resolves_to_the_following_monday_through_sunday() {
        let (start, end) = resolve_window("what's happening next week", fixed_now(), "UTC").unwrap();
        assert_eq!(start.weekday(), Weekday::Mon);
        assert_eq!(end - start, Duration::days(7));
    }

    #[test]
    fn a_named_weekday_resolves_to_its_next_occurrence() {
        let (start, _) = resolve_window("book something for friday", fixed_now(), "UTC").unwrap();
        assert_eq!(start.weekday(), Weekday::Fri);
        assert!(start > fixed_now());
    }

    #[test]
    fn unresolvable_queries_return_none() {
        assert!(resolve_window("do something vague", fixed_now(), "UTC").is_none());
    }

    #[test]
    fn a_non_utc_zone_resolves_today_to_its_own_local_calendar_day() {
        // 2026-07-27T15:00:00Z is already 2026-07-28 00:00 in Tokyo (+9), so
        // "today" there must mean the 28th, not the UTC day of the 27th.
        let (start, end) = resolve_window("what's on today", fixed_now(), "Asia/Tokyo").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 27, 15, 0, 0).unwrap());
        assert_eq!(end - start, Duration::days(1));
    }
}
