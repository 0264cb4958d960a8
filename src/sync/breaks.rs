use chrono::NaiveDateTime;

use crate::error::BreakViolation;
use crate::model::attendance::{
    AttendanceDay, AttendanceStatus, BreakEntry, BreakState, RecordedBy,
};
use crate::model::shift::Shift;
use crate::sync::metrics;

/// Opens a break against break window `window_idx`. The classifier has
/// already established that nothing is ongoing.
pub fn start_device(
    day: &mut AttendanceDay,
    shift: &Shift,
    window_idx: usize,
    at: NaiveDateTime,
) -> String {
    let config = &shift.breaks[window_idx];
    day.breaks.0.push(BreakEntry {
        break_type: config.break_type.clone(),
        name: config.name.clone(),
        start_time: at,
        end_time: None,
        duration: 0,
        status: BreakState::Ongoing,
        recorded_by: RecordedBy::Device,
    });
    config.name.clone()
}

/// Closes the ongoing break matched by a device punch. The classifier
/// has already established that one exists.
pub fn end_device(day: &mut AttendanceDay, shift: &Shift, at: NaiveDateTime) -> EndedBreak {
    end_ongoing(day, shift, at)
}

/// Self-service break start. Preconditions per the manual protocol:
/// tracking enabled, checked in, not checked out, nothing ongoing, and
/// the type must be configured on the shift.
pub fn start_manual(
    day: &mut AttendanceDay,
    shift: &Shift,
    break_type: &str,
    at: NaiveDateTime,
) -> Result<BreakEntry, BreakViolation> {
    if !shift.break_tracking_enabled {
        return Err(BreakViolation::TrackingDisabled);
    }
    if !day.has_check_in() {
        return Err(BreakViolation::NotCheckedIn);
    }
    if day.has_check_out() {
        return Err(BreakViolation::AlreadyCheckedOut);
    }
    if let Some(ongoing) = day.ongoing_break() {
        return Err(BreakViolation::AlreadyOnBreak {
            name: ongoing.name.clone(),
            since: ongoing.start_time.format("%H:%M").to_string(),
        });
    }
    let config = shift
        .break_config(break_type)
        .ok_or_else(|| BreakViolation::UnknownBreakType(break_type.to_string()))?;

    let entry = BreakEntry {
        break_type: config.break_type.clone(),
        name: config.name.clone(),
        start_time: at,
        end_time: None,
        duration: 0,
        status: BreakState::Ongoing,
        recorded_by: RecordedBy::Employee,
    };
    day.breaks.0.push(entry.clone());
    Ok(entry)
}

/// Self-service break end: closes whatever is ongoing.
pub fn end_manual(
    day: &mut AttendanceDay,
    shift: &Shift,
    at: NaiveDateTime,
) -> Result<EndedBreak, BreakViolation> {
    if day.ongoing_break().is_none() {
        return Err(BreakViolation::NoActiveBreak);
    }
    Ok(end_ongoing(day, shift, at))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndedBreak {
    pub name: String,
    pub duration: i64,
    pub exceeded: bool,
}

/// Closes the ongoing break, then refreshes the day's break totals,
/// compliance, and (when already checked out) net hours and status.
/// Callers guarantee an ongoing break exists.
fn end_ongoing(day: &mut AttendanceDay, shift: &Shift, at: NaiveDateTime) -> EndedBreak {
    let max_duration = day
        .ongoing_break()
        .and_then(|b| shift.break_config(&b.break_type))
        .map(|c| c.max_duration);

    let entry = day
        .ongoing_break_mut()
        .expect("caller checked for an ongoing break");
    let duration = metrics::break_duration_minutes(entry.start_time, at);
    entry.end_time = Some(at);
    entry.duration = duration;
    // A break whose type is no longer configured can't exceed anything.
    let exceeded = max_duration.is_some_and(|max| duration > max);
    entry.status = if exceeded {
        BreakState::Exceeded
    } else {
        BreakState::Completed
    };
    let name = entry.name.clone();

    refresh_day(day, shift);

    EndedBreak {
        name,
        duration,
        exceeded,
    }
}

/// Recomputes the aggregate fields a finished break can move.
fn refresh_day(day: &mut AttendanceDay, shift: &Shift) {
    day.recompute_break_total();
    day.break_compliance = metrics::break_compliance(
        day.total_break_time as i64,
        shift.scheduled_break_total(),
    );

    if let (Some(check_in), Some(check_out)) = (day.check_in_time, day.check_out_time) {
        day.work_hours = metrics::work_hours(check_in, check_out);
        day.net_work_hours =
            metrics::net_work_hours(day.work_hours, day.total_break_time as i64);
        day.overtime = metrics::overtime(day.net_work_hours, shift.working_hours);
        day.undertime = metrics::undertime(day.net_work_hours, shift.working_hours);
        if metrics::is_half_day(day.net_work_hours, shift.working_hours) {
            day.tighten_status(AttendanceStatus::HalfDay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::BreakCompliance;
    use crate::model::shift::BreakConfig;
    use chrono::NaiveDate;
    use sqlx::types::Json;

    fn t(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn shift() -> Shift {
        Shift {
            id: 1,
            facility_id: 1,
            name: "Day".into(),
            start_time: "09:00".into(),
            end_time: "17:00".into(),
            working_hours: 8.0,
            grace_check_in: 15,
            grace_check_out: 15,
            break_tracking_enabled: true,
            breaks: Json(vec![
                BreakConfig {
                    break_type: "lunch".into(),
                    name: "Lunch Break".into(),
                    duration: 60,
                    start_window: "13:00".into(),
                    end_window: "14:30".into(),
                    max_duration: 45,
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

    fn checked_in_day() -> AttendanceDay {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        AttendanceDay {
            id: 1,
            employee_id: 10,
            facility_id: 1,
            shift_id: 1,
            date,
            scheduled_check_in: date.and_hms_opt(9, 0, 0).unwrap(),
            scheduled_check_out: date.and_hms_opt(17, 0, 0).unwrap(),
            check_in_time: Some(date.and_hms_opt(9, 0, 0).unwrap()),
            check_in_method: Some("face".into()),
            check_in_device_id: None,
            check_out_time: None,
            check_out_method: None,
            check_out_device_id: None,
            status: AttendanceStatus::Present,
            work_hours: 0.0,
            net_work_hours: 0.0,
            overtime: 0.0,
            undertime: 0.0,
            late_arrival: 0,
            early_arrival: 0,
            early_departure: 0,
            breaks: Json(vec![]),
            total_break_time: 0,
            break_compliance: BreakCompliance::None,
            raw_audit: Json(vec![]),
            version: 0,
        }
    }

    #[test]
    fn device_punch_starts_then_ends_a_break() {
        let s = shift();
        let mut day = checked_in_day();

        let name = start_device(&mut day, &s, 0, t(13, 0, 0));
        assert_eq!(name, "Lunch Break");
        assert!(day.ongoing_break().is_some());

        let ended = end_device(&mut day, &s, t(13, 40, 0));
        assert_eq!(
            ended,
            EndedBreak { name: "Lunch Break".into(), duration: 40, exceeded: false }
        );
        assert!(day.ongoing_break().is_none());
        assert_eq!(day.total_break_time, 40);
    }

    #[test]
    fn fifty_minute_break_exceeds_forty_five_max() {
        let s = shift();
        let mut day = checked_in_day();
        start_device(&mut day, &s, 0, t(12, 0, 0));
        let ended = end_device(&mut day, &s, t(12, 50, 0));
        assert_eq!(
            ended,
            EndedBreak { name: "Lunch Break".into(), duration: 50, exceeded: true }
        );
        assert_eq!(day.breaks.0[0].status, BreakState::Exceeded);
        assert_eq!(day.total_break_time, 50);
    }

    #[test]
    fn manual_start_requires_check_in() {
        let s = shift();
        let mut day = checked_in_day();
        day.check_in_time = None;
        let err = start_manual(&mut day, &s, "lunch", t(13, 0, 0)).unwrap_err();
        assert!(matches!(err, BreakViolation::NotCheckedIn));
        assert!(day.breaks.0.is_empty());
    }

    #[test]
    fn manual_start_rejects_double_break() {
        let s = shift();
        let mut day = checked_in_day();
        start_manual(&mut day, &s, "lunch", t(13, 0, 0)).unwrap();
        let err = start_manual(&mut day, &s, "tea", t(13, 10, 0)).unwrap_err();
        assert!(matches!(err, BreakViolation::AlreadyOnBreak { .. }));
        assert_eq!(day.breaks.0.len(), 1);
    }

    #[test]
    fn manual_start_rejects_unconfigured_type() {
        let s = shift();
        let mut day = checked_in_day();
        let err = start_manual(&mut day, &s, "prayer", t(13, 0, 0)).unwrap_err();
        assert!(matches!(err, BreakViolation::UnknownBreakType(_)));
    }

    #[test]
    fn manual_end_without_active_break_is_rejected() {
        let s = shift();
        let mut day = checked_in_day();
        let err = end_manual(&mut day, &s, t(13, 0, 0)).unwrap_err();
        assert!(matches!(err, BreakViolation::NoActiveBreak));
    }

    #[test]
    fn break_end_after_checkout_refreshes_net_hours_and_status() {
        let s = shift();
        let mut day = checked_in_day();
        // Manual lunch started 13:00; meanwhile the day was checked out
        // by a device punch at 17:00 before the employee ended the break.
        start_manual(&mut day, &s, "lunch", t(13, 0, 0)).unwrap();
        day.check_out_time = Some(t(17, 0, 0));
        day.work_hours = 8.0;
        day.net_work_hours = 8.0;

        let ended = end_manual(&mut day, &s, t(14, 0, 0)).unwrap();
        assert_eq!(ended.duration, 60);
        assert!(ended.exceeded);
        assert_eq!(day.work_hours, 8.0);
        assert_eq!(day.net_work_hours, 7.0);
        assert_eq!(day.undertime, 1.0);
        assert_eq!(day.overtime, 0.0);
        // 60 of 75 scheduled minutes: compliant.
        assert_eq!(day.break_compliance, BreakCompliance::Compliant);
        // 7h net of 8h required is not a half day.
        assert_eq!(day.status, AttendanceStatus::Present);
    }
}
