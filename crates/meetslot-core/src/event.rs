//! Domain types for the scheduling engine.
//!
//! This module provides the types exchanged between the engine and its
//! callers:
//! - [`CalendarSummary`]: a calendar as reported by the remote listing
//! - [`EventDescriptor`]: a scheduled event with zone-resolved instants
//! - [`FreeSlot`]: a computed free interval within working hours
//! - [`WorkingHours`]: a user's stored working-hours preference
//!
//! Instants are carried as [`DateTime<FixedOffset>`] so they render in the
//! resolved zone's local time; the IANA zone name travels alongside as a
//! plain string.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A calendar as reported by the remote calendar list.
///
/// Ephemeral: derived from a listing call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSummary {
    /// The calendar ID (e.g. `"primary"` or an email address).
    pub id: String,
    /// The calendar display name.
    pub summary: String,
    /// Whether this is the account's primary calendar.
    #[serde(default)]
    pub primary: bool,
    /// The calendar's IANA timezone, normalized; `None` if the remote
    /// reported an unresolvable zone.
    pub time_zone: Option<String>,
}

/// An attendee attached to an event at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Attendee email address.
    pub email: String,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A scheduled event, echoed back from the remote API.
///
/// `start` and `end` are rendered in the resolved zone's local offset;
/// the invariant `end > start` holds for every descriptor the engine
/// constructs (it is enforced before any remote mutation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// The remote event ID.
    pub id: String,
    /// Browser link to the event, when the remote provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    /// Zoned start instant.
    pub start: DateTime<FixedOffset>,
    /// Zoned end instant.
    pub end: DateTime<FixedOffset>,
    /// The IANA zone the instants are rendered in, when resolvable.
    pub time_zone: Option<String>,
}

/// A free interval within working hours.
///
/// Computed, ephemeral, exactly the requested duration; a result list is
/// always non-overlapping and sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    /// Zoned slot start.
    pub start: DateTime<FixedOffset>,
    /// Zoned slot end.
    pub end: DateTime<FixedOffset>,
    /// The IANA zone the slot was computed in.
    pub time_zone: String,
}

/// Per-user working-hours preference.
///
/// Stored verbatim: days are kept as the caller supplied them (`"0"`–`"6"`
/// Sunday-based or day names), and no `start < end` ordering is enforced
/// here. Consumers fall back to `09:00`–`17:00` when a user has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    /// Days of week the user works.
    pub days: Vec<String>,
    /// Start of the working day, `"HH:mm"`.
    pub start: String,
    /// End of the working day, `"HH:mm"`.
    pub end: String,
    /// Optional IANA zone the hours are expressed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_hours_roundtrip() {
        let hours = WorkingHours {
            days: vec!["1".to_string(), "2".to_string()],
            start: "09:00".to_string(),
            end: "17:30".to_string(),
            time_zone: Some("Europe/London".to_string()),
        };

        let json = serde_json::to_string(&hours).unwrap();
        let back: WorkingHours = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hours);
    }

    #[test]
    fn working_hours_omits_missing_zone() {
        let hours = WorkingHours {
            days: vec![],
            start: "08:00".to_string(),
            end: "16:00".to_string(),
            time_zone: None,
        };

        let json = serde_json::to_string(&hours).unwrap();
        assert!(!json.contains("time_zone"));
    }

    #[test]
    fn calendar_summary_primary_defaults_to_false() {
        let json = r#"{"id": "work@example.com", "summary": "Work", "time_zone": null}"#;
        let cal: CalendarSummary = serde_json::from_str(json).unwrap();
        assert!(!cal.primary);
    }
}
