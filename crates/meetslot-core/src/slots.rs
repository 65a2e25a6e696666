//! Free-slot computation.
//!
//! [`sweep_free_slots`] is the algorithmic heart of scheduling: given a
//! working-hours window and the day's busy intervals (sorted by start, as
//! the remote API returns them), it sweeps a cursor forward and emits one
//! slot of exactly the requested duration in every gap large enough to
//! hold it.
//!
//! The cursor only ever advances, so overlapping or nested busy intervals
//! cannot produce overlapping slots, and the result is sorted ascending by
//! construction.

use chrono::{DateTime, Duration, TimeZone};

/// Sweeps the `[day_start, day_end]` window for free slots.
///
/// `busy` must be sorted ascending by start time; this is a precondition
/// the caller obtains from the remote listing's sort order and is not
/// re-verified here. Intervals may overlap or extend past the window.
///
/// Returns `(start, end)` pairs of exactly `duration` each, in order.
/// Empty when the window is shorter than `duration` or fully occupied.
pub fn sweep_free_slots<Tz: TimeZone>(
    day_start: DateTime<Tz>,
    day_end: DateTime<Tz>,
    busy: &[(DateTime<Tz>, DateTime<Tz>)],
    duration: Duration,
) -> Vec<(DateTime<Tz>, DateTime<Tz>)> {
    let mut slots = Vec::new();
    if duration <= Duration::zero() {
        return slots;
    }

    let mut cursor = day_start;
    for (busy_start, busy_end) in busy {
        if cursor < *busy_start {
            let candidate_end = cursor.clone() + duration;
            if candidate_end <= *busy_start && candidate_end <= day_end {
                slots.push((cursor.clone(), candidate_end));
            }
        }
        // Monotonic: never move the cursor backwards over an already-swept
        // interval.
        if cursor < *busy_end {
            cursor = busy_end.clone();
        }
    }

    if cursor < day_end {
        let candidate_end = cursor.clone() + duration;
        if candidate_end <= day_end {
            slots.push((cursor, candidate_end));
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use chrono_tz::Tz;

    fn at(hour: u32, min: u32) -> DateTime<Tz> {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let time = NaiveTime::from_hms_opt(hour, min, 0).unwrap();
        crate::time::local_instant(date, time, chrono_tz::Europe::London).unwrap()
    }

    #[test]
    fn empty_day_yields_single_window_spanning_slot() {
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &[], Duration::minutes(480));
        assert_eq!(slots, vec![(at(9, 0), at(17, 0))]);
    }

    #[test]
    fn single_busy_interval_splits_the_day() {
        let busy = vec![(at(12, 0), at(13, 0))];
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &busy, Duration::minutes(60));
        // One slot per gap: the morning gap and the slot immediately after
        // the busy interval.
        assert_eq!(slots, vec![(at(9, 0), at(10, 0)), (at(13, 0), at(14, 0))]);
    }

    #[test]
    fn duration_longer_than_window_yields_nothing() {
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &[], Duration::minutes(481));
        assert!(slots.is_empty());
    }

    #[test]
    fn gap_shorter_than_duration_is_skipped() {
        let busy = vec![(at(9, 30), at(12, 0))];
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &busy, Duration::minutes(60));
        // The 30-minute morning gap cannot hold an hour.
        assert_eq!(slots, vec![(at(12, 0), at(13, 0))]);
    }

    #[test]
    fn overlapping_busy_intervals_never_overlap_slots() {
        let busy = vec![
            (at(10, 0), at(12, 0)),
            (at(11, 0), at(11, 30)), // nested
            (at(11, 45), at(13, 0)), // overlaps the first
        ];
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &busy, Duration::minutes(30));
        assert_eq!(slots, vec![(at(9, 0), at(9, 30)), (at(13, 0), at(13, 30))]);
        for window in slots.windows(2) {
            assert!(window[0].1 <= window[1].0);
        }
    }

    #[test]
    fn busy_interval_covering_whole_window_yields_nothing() {
        let busy = vec![(at(8, 0), at(18, 0))];
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &busy, Duration::minutes(15));
        assert!(slots.is_empty());
    }

    #[test]
    fn slot_exactly_filling_tail_gap_is_emitted() {
        let busy = vec![(at(9, 0), at(16, 0))];
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &busy, Duration::minutes(60));
        assert_eq!(slots, vec![(at(16, 0), at(17, 0))]);
    }

    #[test]
    fn inverted_window_yields_nothing() {
        let slots = sweep_free_slots(at(17, 0), at(9, 0), &[], Duration::minutes(30));
        assert!(slots.is_empty());
    }

    #[test]
    fn zero_duration_yields_nothing() {
        let slots = sweep_free_slots(at(9, 0), at(17, 0), &[], Duration::minutes(0));
        assert!(slots.is_empty());
    }
}
