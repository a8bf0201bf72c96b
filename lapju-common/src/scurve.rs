//! Quadratic S-curve ramp for first-entry progress backfill
//!
//! When the first progress entry for a task arrives, history from the
//! project start date up to the day before the entry is synthesized along a
//! quadratic S-curve ramp toward the entered percentage: slow start, fast
//! middle, slow approach. The curve passes through `(0, 0)` and approaches
//! `(1, 1)` without re-touching the entered value, which stays a separate
//! already-persisted record.

use crate::fixed;
use chrono::{Duration, NaiveDate};

/// S-curve shape value at normalized time `t`
///
/// - `t ≤ 0.5`: `2t²`
/// - `t > 0.5`: `1 − 2(1 − t)²`
pub fn shape(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t <= 0.5 {
        2.0 * t * t
    } else {
        let inv = 1.0 - t;
        1.0 - 2.0 * inv * inv
    }
}

/// One synthesized backfill row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillDay {
    pub date: NaiveDate,
    pub percentage_h: i64,
}

/// Build the daily backfill schedule for a first entry
///
/// `percentage_h` is the entered percentage in hundredths, `entry_date` the
/// date it was entered for. Covers `start_date ..= entry_date − 1`; empty
/// when there is nothing before the entry date to fill.
pub fn backfill_schedule(
    percentage_h: i64,
    start_date: NaiveDate,
    entry_date: NaiveDate,
) -> Vec<BackfillDay> {
    let Some(day_before) = entry_date.pred_opt() else {
        return Vec::new();
    };
    if day_before < start_date {
        return Vec::new();
    }

    let total_days = (day_before - start_date).num_days() + 1;
    (0..total_days)
        .map(|day_index| {
            let t = day_index as f64 / total_days as f64;
            BackfillDay {
                date: start_date + Duration::days(day_index),
                percentage_h: fixed::round_half_away(percentage_h as f64 * shape(t)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_shape_boundaries() {
        assert_eq!(shape(0.0), 0.0);
        assert_eq!(shape(0.5), 0.5);
        assert_eq!(shape(1.0), 1.0);
        // clamped outside [0, 1]
        assert_eq!(shape(-0.3), 0.0);
        assert_eq!(shape(1.7), 1.0);
    }

    #[test]
    fn test_shape_monotonic() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = shape(i as f64 / 100.0);
            assert!(v >= prev, "shape not monotonic at t={}", i);
            prev = v;
        }
    }

    #[test]
    fn test_schedule_ten_days_at_eighty_percent() {
        // total_days = 10, P = 80.00
        let schedule = backfill_schedule(8_000, date(2025, 1, 1), date(2025, 1, 11));
        assert_eq!(schedule.len(), 10);

        // day_index 0: t = 0 → 0.00
        assert_eq!(schedule[0].date, date(2025, 1, 1));
        assert_eq!(schedule[0].percentage_h, 0);

        // day_index 5: t = 0.5 → shape 0.5 → 40.00
        assert_eq!(schedule[5].date, date(2025, 1, 6));
        assert_eq!(schedule[5].percentage_h, 4_000);

        // strictly increasing after the flat start
        for pair in schedule.windows(2) {
            assert!(pair[1].percentage_h >= pair[0].percentage_h);
        }
        assert!(schedule[9].percentage_h > schedule[1].percentage_h);

        // the entered value itself is never part of the schedule
        assert!(schedule.iter().all(|d| d.date < date(2025, 1, 11)));
    }

    #[test]
    fn test_schedule_empty_when_nothing_to_fill() {
        // entry on the start date itself
        assert!(backfill_schedule(5_000, date(2025, 3, 1), date(2025, 3, 1)).is_empty());
        // entry before the start date
        assert!(backfill_schedule(5_000, date(2025, 3, 1), date(2025, 2, 15)).is_empty());
    }

    #[test]
    fn test_schedule_single_day() {
        // entry one day after start: a single synthesized day at t = 0
        let schedule = backfill_schedule(5_000, date(2025, 3, 1), date(2025, 3, 2));
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].date, date(2025, 3, 1));
        assert_eq!(schedule[0].percentage_h, 0);
    }

    #[test]
    fn test_schedule_never_reaches_entered_value() {
        let schedule = backfill_schedule(10_000, date(2025, 1, 1), date(2025, 1, 31));
        // last synthesized day is t = 29/30, short of full scale
        let last = schedule.last().unwrap();
        assert!(last.percentage_h < 10_000);
    }
}
