use chrono::{NaiveDateTime, Timelike};

use crate::error::RecordError;
use crate::model::shift::Shift;

/// Minutes early an arrival must be before it counts as "early".
const EARLY_ARRIVAL_MARGIN: i64 = 30;

/// Time boundaries derived from a shift, all in minutes from midnight in
/// the facility's timezone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftPolicy {
    pub shift_start: i64,
    pub shift_end: i64,
    /// (start + end) / 2; may land on a half minute.
    pub midpoint: f64,
    /// start + check-in grace. A punch at exactly this minute is on time.
    pub late_threshold: i64,
    pub early_threshold: i64,
    /// end − check-out grace.
    pub early_departure_threshold: i64,
}

impl ShiftPolicy {
    pub fn evaluate(shift: &Shift) -> Result<Self, RecordError> {
        let bad = || RecordError::BadShiftConfig { shift_id: shift.id };
        let start = parse_hhmm(&shift.start_time).ok_or_else(bad)?;
        let end = parse_hhmm(&shift.end_time).ok_or_else(bad)?;

        Ok(ShiftPolicy {
            shift_start: start,
            shift_end: end,
            midpoint: (start + end) as f64 / 2.0,
            late_threshold: start + shift.grace_check_in as i64,
            early_threshold: start - EARLY_ARRIVAL_MARGIN,
            early_departure_threshold: end - shift.grace_check_out as i64,
        })
    }

    pub fn is_check_in_side(&self, minute: i64) -> bool {
        minute as f64 <= self.midpoint
    }
}

/// "HH:MM" → minutes from midnight.
pub fn parse_hhmm(s: &str) -> Option<i64> {
    let (h, m) = s.split_once(':')?;
    let h: i64 = h.trim().parse().ok()?;
    let m: i64 = m.trim().parse().ok()?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return None;
    }
    Some(h * 60 + m)
}

/// Seconds are ignored, matching the device's minute granularity.
pub fn minute_of_day(t: NaiveDateTime) -> i64 {
    t.hour() as i64 * 60 + t.minute() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::shift::Shift;
    use sqlx::types::Json;

    fn shift(start: &str, end: &str, grace_in: i32, grace_out: i32) -> Shift {
        Shift {
            id: 1,
            facility_id: 1,
            name: "Day".into(),
            start_time: start.into(),
            end_time: end.into(),
            working_hours: 8.0,
            grace_check_in: grace_in,
            grace_check_out: grace_out,
            break_tracking_enabled: false,
            breaks: Json(vec![]),
        }
    }

    #[test]
    fn thresholds_for_nine_to_five() {
        let p = ShiftPolicy::evaluate(&shift("09:00", "17:00", 15, 15)).unwrap();
        assert_eq!(p.shift_start, 540);
        assert_eq!(p.shift_end, 1020);
        assert_eq!(p.midpoint, 780.0);
        assert_eq!(p.late_threshold, 555);
        assert_eq!(p.early_threshold, 510);
        assert_eq!(p.early_departure_threshold, 1005);
    }

    #[test]
    fn midpoint_is_inclusive_on_the_check_in_side() {
        let p = ShiftPolicy::evaluate(&shift("09:00", "17:00", 15, 15)).unwrap();
        assert!(p.is_check_in_side(780));
        assert!(!p.is_check_in_side(781));
    }

    #[test]
    fn half_minute_midpoint() {
        // 09:00-17:01 → midpoint 780.5: minute 780 is check-in side.
        let p = ShiftPolicy::evaluate(&shift("09:00", "17:01", 15, 15)).unwrap();
        assert!(p.is_check_in_side(780));
        assert!(!p.is_check_in_side(781));
    }

    #[test]
    fn malformed_times_are_rejected() {
        assert!(ShiftPolicy::evaluate(&shift("9am", "17:00", 15, 15)).is_err());
        assert!(parse_hhmm("25:00").is_none());
        assert!(parse_hhmm("09:61").is_none());
        assert_eq!(parse_hhmm("09:05"), Some(545));
    }
}
