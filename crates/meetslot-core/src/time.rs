//! Zone-aware time helpers.
//!
//! The remote calendar service reports zones as IANA identifiers but may
//! also hand back legacy aliases (`US/Eastern`, `Asia/Calcutta`, ...).
//! [`normalize_zone`] resolves both and never fails hard: an unresolvable
//! zone yields `None`, and callers substitute their own fallback (the
//! primary calendar's zone, then UTC).
//!
//! [`local_instant`] turns a wall-clock date + time-of-day into a zoned
//! instant, making DST edge cases explicit: a time inside a spring-forward
//! gap does not exist and yields `None`; an ambiguous fall-back time
//! resolves to the earlier offset.

use chrono::{DateTime, MappedLocalTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Resolves a zone identifier to an IANA timezone.
///
/// Passes through canonical IANA names and resolves the backward links the
/// tz database ships (the chrono-tz table includes both), so legacy names
/// like `US/Eastern` come back as valid zones. Whitespace is trimmed.
/// Returns `None` for anything unresolvable; never panics.
pub fn normalize_zone(zone: &str) -> Option<Tz> {
    let zone = zone.trim();
    if zone.is_empty() {
        return None;
    }
    zone.parse::<Tz>().ok()
}

/// Parses a `YYYY-MM-DD` date string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parses an `HH:mm` time-of-day string.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Constructs the zoned instant for a wall-clock date and time-of-day.
///
/// Returns `None` when the local time does not exist in the zone (the
/// spring-forward gap). An ambiguous time (the fall-back fold) resolves to
/// the earlier of the two candidate instants.
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&date.and_time(time)) {
        MappedLocalTime::Single(instant) => Some(instant),
        MappedLocalTime::Ambiguous(earliest, _latest) => Some(earliest),
        MappedLocalTime::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn normalize_accepts_canonical_zones() {
        assert_eq!(normalize_zone("Europe/London"), Some(chrono_tz::Europe::London));
        assert_eq!(normalize_zone("UTC"), Some(chrono_tz::UTC));
        assert_eq!(normalize_zone("America/New_York"), Some(chrono_tz::America::New_York));
    }

    #[test]
    fn normalize_resolves_legacy_aliases() {
        // Backward links from the tz database.
        assert!(normalize_zone("US/Eastern").is_some());
        assert!(normalize_zone("Asia/Calcutta").is_some());
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert_eq!(normalize_zone("Not/AZone"), None);
        assert_eq!(normalize_zone(""), None);
        assert_eq!(normalize_zone("   "), None);
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_zone(" Europe/Paris "), Some(chrono_tz::Europe::Paris));
    }

    #[test]
    fn parse_date_and_time() {
        assert_eq!(parse_date("2025-03-15"), NaiveDate::from_ymd_opt(2025, 3, 15));
        assert_eq!(parse_time_of_day("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_date("15/03/2025"), None);
        assert_eq!(parse_time_of_day("9am"), None);
    }

    #[test]
    fn local_instant_plain_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let instant = local_instant(date, time, chrono_tz::Europe::London).unwrap();
        assert_eq!(instant.hour(), 9);
        // BST in June: one hour ahead of UTC.
        assert_eq!(instant.to_utc().hour(), 8);
    }

    #[test]
    fn local_instant_spring_forward_gap_is_none() {
        // Europe/London jumps 01:00 -> 02:00 on 2025-03-30; 01:30 never exists.
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let time = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
        assert!(local_instant(date, time, chrono_tz::Europe::London).is_none());
    }

    #[test]
    fn local_instant_fall_back_picks_earlier_offset() {
        // Europe/London repeats 01:00-02:00 on 2025-10-26; the earlier pass
        // is still BST (UTC+1).
        let date = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();
        let time = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
        let instant = local_instant(date, time, chrono_tz::Europe::London).unwrap();
        assert_eq!(instant.to_utc().hour(), 0);
    }
}
