use std::fmt;

use crate::model::attendance::AttendanceStatus;
use crate::model::shift::Shift;
use crate::sync::policy::{ShiftPolicy, parse_hhmm};

/// Why a punch was dropped instead of applied.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Checkout-side punch with no check-in on record. Flagged for
    /// manual review instead of guessing intent.
    OrphanPunch,
    /// Punch in one break type's window while a different type is
    /// ongoing; starting a second break would violate the
    /// single-ongoing-break rule.
    BreakTypeMismatch { ongoing: String, punched: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::OrphanPunch => {
                write!(f, "punch after shift midpoint with no check-in on record")
            }
            RejectReason::BreakTypeMismatch { ongoing, punched } => write!(
                f,
                "punch in '{punched}' break window while '{ongoing}' break is ongoing"
            ),
        }
    }
}

/// What a device punch means for the day it lands on. Classification is
/// pure: it never touches the aggregate, so every arm of the state
/// machine is testable on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    CheckIn {
        status: AttendanceStatus,
        late_arrival: i64,
        early_arrival: i64,
    },
    CheckOut {
        early_departure: i64,
    },
    /// Opens a break against break window `window_idx` of the shift.
    BreakStart {
        window_idx: usize,
    },
    /// Closes the ongoing break matched by window `window_idx`.
    BreakEnd {
        window_idx: usize,
    },
    DuplicateCheckIn,
    DuplicateCheckOut,
    Rejected(RejectReason),
}

pub fn classify(
    policy: &ShiftPolicy,
    shift: &Shift,
    has_check_in: bool,
    has_check_out: bool,
    ongoing_break_type: Option<&str>,
    minute: i64,
) -> Classification {
    if policy.is_check_in_side(minute) {
        if has_check_in {
            return Classification::DuplicateCheckIn;
        }
        return Classification::CheckIn {
            status: arrival_status(policy, minute),
            late_arrival: (minute - policy.late_threshold).max(0),
            early_arrival: (policy.early_threshold - minute).max(0),
        };
    }

    if !has_check_in {
        return Classification::Rejected(RejectReason::OrphanPunch);
    }
    if has_check_out {
        return Classification::DuplicateCheckOut;
    }

    if shift.break_tracking_enabled {
        if let Some(idx) = matching_break_window(shift, minute) {
            return match ongoing_break_type {
                None => Classification::BreakStart { window_idx: idx },
                Some(ongoing) if ongoing == shift.breaks[idx].break_type => {
                    Classification::BreakEnd { window_idx: idx }
                }
                Some(ongoing) => Classification::Rejected(RejectReason::BreakTypeMismatch {
                    ongoing: ongoing.to_string(),
                    punched: shift.breaks[idx].break_type.clone(),
                }),
            };
        }
    }

    Classification::CheckOut {
        early_departure: (policy.early_departure_threshold - minute).max(0),
    }
}

/// The grace boundary is inclusive: a punch at exactly the late
/// threshold is still on time.
fn arrival_status(policy: &ShiftPolicy, minute: i64) -> AttendanceStatus {
    if minute > policy.late_threshold {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

pub fn matching_break_window(shift: &Shift, minute: i64) -> Option<usize> {
    shift.breaks.iter().position(|b| {
        match (parse_hhmm(&b.start_window), parse_hhmm(&b.end_window)) {
            (Some(start), Some(end)) => minute >= start && minute <= end,
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::shift::{BreakConfig, Shift};
    use sqlx::types::Json;

    fn shift(break_tracking: bool) -> Shift {
        Shift {
            id: 1,
            facility_id: 1,
            name: "Day".into(),
            start_time: "09:00".into(),
            end_time: "17:00".into(),
            working_hours: 8.0,
            grace_check_in: 15,
            grace_check_out: 15,
            break_tracking_enabled: break_tracking,
            breaks: Json(vec![
                BreakConfig {
                    break_type: "lunch".into(),
                    name: "Lunch Break".into(),
                    duration: 60,
                    start_window: "12:00".into(),
                    end_window: "14:30".into(),
                    max_duration: 90,
                    is_paid: false,
                },
                BreakConfig {
                    break_type: "tea".into(),
                    name: "Tea Break".into(),
                    duration: 15,
                    start_window: "15:30".into(),
                    end_window: "16:00".into(),
                    max_duration: 20,
                    is_paid: true,
                },
            ]),
        }
    }

    fn policy(s: &Shift) -> ShiftPolicy {
        ShiftPolicy::evaluate(s).unwrap()
    }

    #[test]
    fn on_time_check_in() {
        let s = shift(false);
        let c = classify(&policy(&s), &s, false, false, None, 9 * 60);
        assert_eq!(
            c,
            Classification::CheckIn {
                status: AttendanceStatus::Present,
                late_arrival: 0,
                early_arrival: 0
            }
        );
    }

    #[test]
    fn grace_boundary_is_inclusive() {
        let s = shift(false);
        // 09:15 with 15 min grace: present with zero lateness.
        let at_grace = classify(&policy(&s), &s, false, false, None, 9 * 60 + 15);
        assert_eq!(
            at_grace,
            Classification::CheckIn {
                status: AttendanceStatus::Present,
                late_arrival: 0,
                early_arrival: 0
            }
        );
        // 09:16 is one minute late.
        let past_grace = classify(&policy(&s), &s, false, false, None, 9 * 60 + 16);
        assert_eq!(
            past_grace,
            Classification::CheckIn {
                status: AttendanceStatus::Late,
                late_arrival: 1,
                early_arrival: 0
            }
        );
    }

    #[test]
    fn early_arrival_minutes() {
        let s = shift(false);
        // 08:00, early threshold 08:30 → 30 minutes early.
        let c = classify(&policy(&s), &s, false, false, None, 8 * 60);
        assert_eq!(
            c,
            Classification::CheckIn {
                status: AttendanceStatus::Present,
                late_arrival: 0,
                early_arrival: 30
            }
        );
    }

    #[test]
    fn punch_at_midpoint_is_a_check_in() {
        let s = shift(false);
        // Midpoint of 09:00-17:00 is 13:00.
        let c = classify(&policy(&s), &s, false, false, None, 13 * 60);
        assert!(matches!(c, Classification::CheckIn { .. }));
    }

    #[test]
    fn second_morning_punch_is_duplicate() {
        let s = shift(false);
        let c = classify(&policy(&s), &s, true, false, None, 10 * 60);
        assert_eq!(c, Classification::DuplicateCheckIn);
    }

    #[test]
    fn pre_midpoint_break_window_punch_stays_duplicate() {
        // The lunch window opens at 12:00, before the 13:00 midpoint;
        // at 12:30 the punch is still on the check-in side, so with a
        // check-in on record it is a duplicate, not a break.
        let s = shift(true);
        let c = classify(&policy(&s), &s, true, false, None, 12 * 60 + 30);
        assert_eq!(c, Classification::DuplicateCheckIn);
    }

    #[test]
    fn window_punch_starts_a_break() {
        let s = shift(true);
        let c = classify(&policy(&s), &s, true, false, None, 13 * 60 + 30);
        assert_eq!(c, Classification::BreakStart { window_idx: 0 });
    }

    #[test]
    fn window_punch_ends_the_matching_break() {
        let s = shift(true);
        let c = classify(&policy(&s), &s, true, false, Some("lunch"), 14 * 60);
        assert_eq!(c, Classification::BreakEnd { window_idx: 0 });
    }

    #[test]
    fn window_punch_of_other_type_is_rejected_while_on_break() {
        let s = shift(true);
        let c = classify(&policy(&s), &s, true, false, Some("lunch"), 15 * 60 + 35);
        assert_eq!(
            c,
            Classification::Rejected(RejectReason::BreakTypeMismatch {
                ongoing: "lunch".into(),
                punched: "tea".into()
            })
        );
    }

    #[test]
    fn break_window_ignored_when_tracking_disabled() {
        let s = shift(false);
        let c = classify(&policy(&s), &s, true, false, None, 13 * 60 + 30);
        assert!(matches!(c, Classification::CheckOut { .. }));
    }

    #[test]
    fn checkout_with_early_departure() {
        let s = shift(false);
        // 16:30 against threshold 16:45 → 15 minutes early.
        let c = classify(&policy(&s), &s, true, false, None, 16 * 60 + 30);
        assert_eq!(c, Classification::CheckOut { early_departure: 15 });
    }

    #[test]
    fn on_time_checkout_has_zero_early_departure() {
        let s = shift(false);
        let c = classify(&policy(&s), &s, true, false, None, 17 * 60 + 5);
        assert_eq!(c, Classification::CheckOut { early_departure: 0 });
    }

    #[test]
    fn second_evening_punch_is_duplicate() {
        let s = shift(false);
        let c = classify(&policy(&s), &s, true, true, None, 17 * 60 + 30);
        assert_eq!(c, Classification::DuplicateCheckOut);
    }

    #[test]
    fn evening_punch_without_check_in_is_an_anomaly() {
        let s = shift(false);
        let c = classify(&policy(&s), &s, false, false, None, 20 * 60);
        assert_eq!(c, Classification::Rejected(RejectReason::OrphanPunch));
    }
}
