use chrono::NaiveDateTime;

use crate::model::attendance::BreakCompliance;

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Gross hours between check-in and check-out.
pub fn work_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    round2((check_out - check_in).num_seconds() as f64 / 3600.0)
}

/// Gross hours minus break minutes, floored at zero.
pub fn net_work_hours(work_hours: f64, total_break_minutes: i64) -> f64 {
    round2((work_hours - total_break_minutes as f64 / 60.0).max(0.0))
}

pub fn overtime(net_work_hours: f64, working_hours: f64) -> f64 {
    round2((net_work_hours - working_hours).max(0.0))
}

pub fn undertime(net_work_hours: f64, working_hours: f64) -> f64 {
    round2((working_hours - net_work_hours).max(0.0))
}

pub fn is_half_day(net_work_hours: f64, working_hours: f64) -> bool {
    net_work_hours < working_hours / 2.0
}

/// Break minutes, rounded to the nearest minute.
pub fn break_duration_minutes(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    ((end - start).num_seconds() as f64 / 60.0).round() as i64
}

/// Taken break time against the shift's scheduled total: more than 1.5x
/// is exceeded, less than 0.5x insufficient.
pub fn break_compliance(total_break_minutes: i64, scheduled_minutes: i64) -> BreakCompliance {
    if total_break_minutes == 0 {
        return BreakCompliance::None;
    }
    let total = total_break_minutes as f64;
    let scheduled = scheduled_minutes as f64;
    if total > scheduled * 1.5 {
        BreakCompliance::Exceeded
    } else if total < scheduled * 0.5 {
        BreakCompliance::Insufficient
    } else {
        BreakCompliance::Compliant
    }
}
