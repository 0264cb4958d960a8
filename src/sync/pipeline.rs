use chrono::{NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::error::RecordError;
use crate::model::attendance::{AttendanceDay, AttendanceStatus};
use crate::model::facility::Facility;
use crate::model::shift::Shift;
use crate::store;
use crate::store::attendance::{DayTemplate, Mutation};
use crate::sync::breaks;
use crate::sync::classifier::{Classification, classify};
use crate::sync::metrics;
use crate::sync::normalizer::CanonicalEvent;
use crate::sync::policy::{ShiftPolicy, minute_of_day, parse_hhmm};
use crate::sync::resolver;

/// What one device punch did to the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    CheckedIn(AttendanceStatus),
    CheckedOut,
    BreakStarted(String),
    BreakEnded {
        name: String,
        duration: i64,
        exceeded: bool,
    },
    /// Ignored replay of an already-recorded check-in/check-out; only
    /// the raw audit log grows.
    Duplicate,
    /// Dropped without touching the aggregate; surfaced to operators
    /// through the sync-failure audit.
    Rejected(String),
}

/// Applies one classified punch to the day. Pure and deterministic: the
/// same day state and event always produce the same mutation, so the
/// optimistic-concurrency retry loop can safely re-run it.
pub fn apply_event(
    day: &mut AttendanceDay,
    shift: &Shift,
    policy: &ShiftPolicy,
    local: NaiveDateTime,
    raw: &Value,
    source_device_id: Option<&str>,
) -> Mutation<Applied> {
    let minute = minute_of_day(local);
    let ongoing_type = day.ongoing_break().map(|b| b.break_type.clone());
    let classification = classify(
        policy,
        shift,
        day.has_check_in(),
        day.has_check_out(),
        ongoing_type.as_deref(),
        minute,
    );

    let applied = match classification {
        Classification::CheckIn {
            status,
            late_arrival,
            early_arrival,
        } => {
            day.check_in_time = Some(local);
            day.check_in_method = Some("face".into());
            day.check_in_device_id = source_device_id.map(str::to_string);
            day.late_arrival = late_arrival as i32;
            day.early_arrival = early_arrival as i32;
            day.tighten_status(status);
            Applied::CheckedIn(day.status)
        }

        Classification::CheckOut { early_departure } => {
            day.check_out_time = Some(local);
            day.check_out_method = Some("face".into());
            day.check_out_device_id = source_device_id.map(str::to_string);
            day.early_departure = early_departure as i32;

            if let Some(check_in) = day.check_in_time {
                day.work_hours = metrics::work_hours(check_in, local);
                day.net_work_hours =
                    metrics::net_work_hours(day.work_hours, day.total_break_time as i64);
                day.overtime = metrics::overtime(day.net_work_hours, shift.working_hours);
                day.undertime = metrics::undertime(day.net_work_hours, shift.working_hours);
                if metrics::is_half_day(day.net_work_hours, shift.working_hours) {
                    day.tighten_status(AttendanceStatus::HalfDay);
                }
            }
            Applied::CheckedOut
        }

        Classification::BreakStart { window_idx } => {
            Applied::BreakStarted(breaks::start_device(day, shift, window_idx, local))
        }

        Classification::BreakEnd { .. } => {
            let ended = breaks::end_device(day, shift, local);
            Applied::BreakEnded {
                name: ended.name,
                duration: ended.duration,
                exceeded: ended.exceeded,
            }
        }

        Classification::DuplicateCheckIn | Classification::DuplicateCheckOut => Applied::Duplicate,

        Classification::Rejected(reason) => Applied::Rejected(reason.to_string()),
    };

    if matches!(applied, Applied::Rejected(_)) {
        Mutation::Skip(applied)
    } else {
        day.raw_audit.0.push(raw.clone());
        Mutation::Save(applied)
    }
}

/// Full per-record path: resolve identity, derive the shift policy,
/// convert to facility-local time, then reconcile against the stored
/// aggregate under optimistic concurrency.
pub async fn process_event(
    pool: &MySqlPool,
    facility: &Facility,
    event: &CanonicalEvent,
    retry_limit: u32,
) -> Result<Applied, RecordError> {
    let (employee, shift) = resolver::resolve(pool, facility, event).await?;
    let policy = ShiftPolicy::evaluate(&shift)?;

    let local = event.timestamp.with_timezone(&facility.tz()).naive_local();
    let date = local.date();

    let template = DayTemplate {
        employee_id: employee.id,
        facility_id: facility.id,
        shift_id: shift.id,
        date,
        scheduled_check_in: date.and_time(scheduled_time(&shift.start_time)),
        scheduled_check_out: date.and_time(scheduled_time(&shift.end_time)),
    };

    let device_id = facility.device_id.clone();
    let applied = store::attendance::reconcile_day(pool, &template, retry_limit, |day| {
        apply_event(day, &shift, &policy, local, &event.raw, device_id.as_deref())
    })
    .await?;

    match &applied {
        Applied::Rejected(reason) => {
            warn!(
                employee_id = employee.id,
                date = %date,
                reason = %reason,
                "punch rejected for manual review"
            );
            store::failure::record(pool, facility.id, "rejected-punch", reason, Some(&event.raw))
                .await;
        }
        outcome => {
            info!(
                employee_id = employee.id,
                date = %date,
                outcome = ?outcome,
                "processed device punch"
            );
        }
    }

    Ok(applied)
}

/// Policy evaluation has already validated the shift times; fall back to
/// midnight rather than panicking if a malformed value slips through.
fn scheduled_time(hhmm: &str) -> NaiveTime {
    parse_hhmm(hhmm)
        .and_then(|m| NaiveTime::from_hms_opt((m / 60) as u32, (m % 60) as u32, 0))
        .unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::shift::BreakConfig;
    use chrono::NaiveDate;
    use serde_json::json;
    use sqlx::types::Json;

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
            breaks: Json(vec![BreakConfig {
                break_type: "lunch".into(),
                name: "Lunch Break".into(),
                duration: 60,
                start_window: "13:00".into(),
                end_window: "14:30".into(),
                max_duration: 45,
                is_paid: false,
            }]),
        }
    }

    fn fresh_day() -> AttendanceDay {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        DayTemplate {
            employee_id: 10,
            facility_id: 1,
            shift_id: 1,
            date,
            scheduled_check_in: date.and_hms_opt(9, 0, 0).unwrap(),
            scheduled_check_out: date.and_hms_opt(17, 0, 0).unwrap(),
        }
        .fresh()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn punch(day: &mut AttendanceDay, s: &Shift, time: NaiveDateTime) -> Applied {
        let policy = ShiftPolicy::evaluate(s).unwrap();
        let raw = json!({"personUUID": "p-10", "Time": time.format("%Y-%m-%dT%H:%M:%S").to_string()});
        match apply_event(day, s, &policy, time, &raw, Some("dev-1")) {
            Mutation::Save(a) | Mutation::Skip(a) => a,
        }
    }

    #[test]
    fn full_day_with_break_and_overtime_arithmetic() {
        let s = shift();
        let mut day = fresh_day();

        assert_eq!(
            punch(&mut day, &s, at(9, 5)),
            Applied::CheckedIn(AttendanceStatus::Present)
        );
        assert_eq!(
            punch(&mut day, &s, at(13, 10)),
            Applied::BreakStarted("Lunch Break".into())
        );
        assert_eq!(
            punch(&mut day, &s, at(14, 0)),
            Applied::BreakEnded {
                name: "Lunch Break".into(),
                duration: 50,
                exceeded: true
            }
        );
        assert_eq!(punch(&mut day, &s, at(17, 5)), Applied::CheckedOut);

        assert_eq!(day.work_hours, 8.0);
        assert_eq!(day.total_break_time, 50);
        assert_eq!(day.net_work_hours, 7.17);
        assert_eq!(day.overtime, 0.0);
        assert_eq!(day.undertime, 0.83);
        assert_eq!(day.status, AttendanceStatus::Present);
        assert_eq!(day.raw_audit.0.len(), 4);
    }

    #[test]
    fn replay_is_deterministic_and_idempotent() {
        let s = shift();
        let times = [at(9, 20), at(9, 25), at(16, 50), at(17, 10)];

        let run = |_: usize| {
            let mut day = fresh_day();
            for t in times {
                punch(&mut day, &s, t);
            }
            day
        };
        let first = run(0);
        let second = run(1);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );

        // Replaying the checkout again changes nothing but the audit.
        let mut replayed = run(2);
        let before = serde_json::to_value(&replayed).unwrap();
        assert_eq!(punch(&mut replayed, &s, at(17, 10)), Applied::Duplicate);
        let mut after = serde_json::to_value(&replayed).unwrap();
        after["raw_audit"] = before["raw_audit"].clone();
        assert_eq!(before, after);
    }

    #[test]
    fn first_check_in_wins() {
        let s = shift();
        let mut day = fresh_day();
        assert!(matches!(punch(&mut day, &s, at(8, 55)), Applied::CheckedIn(_)));
        assert_eq!(punch(&mut day, &s, at(9, 10)), Applied::Duplicate);
        assert_eq!(punch(&mut day, &s, at(10, 0)), Applied::Duplicate);
        assert_eq!(day.check_in_time, Some(at(8, 55)));
        assert_eq!(day.raw_audit.0.len(), 3);
    }

    #[test]
    fn late_day_is_never_downgraded_by_checkout() {
        let s = shift();
        let mut day = fresh_day();
        // 12:30 check-in: hours late, still on the check-in side.
        assert_eq!(
            punch(&mut day, &s, at(12, 30)),
            Applied::CheckedIn(AttendanceStatus::Late)
        );
        assert_eq!(day.late_arrival, 195);
        // Checkout past the break window: barely two net hours, far
        // under the half-day threshold, but the late status must hold.
        assert_eq!(punch(&mut day, &s, at(14, 40)), Applied::CheckedOut);
        assert!(metrics::is_half_day(day.net_work_hours, s.working_hours));
        assert_eq!(day.status, AttendanceStatus::Late);
    }

    #[test]
    fn short_present_day_becomes_half_day() {
        let mut s = shift();
        s.break_tracking_enabled = false;
        let mut day = fresh_day();
        assert_eq!(
            punch(&mut day, &s, at(9, 10)),
            Applied::CheckedIn(AttendanceStatus::Present)
        );
        // 13:05 is just past the midpoint: 3h55m gross.
        assert_eq!(punch(&mut day, &s, at(13, 5)), Applied::CheckedOut);
        assert_eq!(day.work_hours, 3.92);
        assert_eq!(day.status, AttendanceStatus::HalfDay);
    }

    #[test]
    fn orphan_punch_is_rejected_without_mutation() {
        let s = shift();
        let mut day = fresh_day();
        let policy = ShiftPolicy::evaluate(&s).unwrap();
        let raw = json!({"personUUID": "p-10", "Time": "2026-03-02T20:00:00"});
        let out = apply_event(&mut day, &s, &policy, at(20, 0), &raw, None);
        assert!(matches!(out, Mutation::Skip(Applied::Rejected(_))));
        assert!(!day.has_check_in());
        assert!(!day.has_check_out());
        assert!(day.raw_audit.0.is_empty());
        assert_eq!(day.status, AttendanceStatus::Absent);
    }

    #[test]
    fn early_checkout_records_early_departure() {
        let s = shift();
        let mut day = fresh_day();
        punch(&mut day, &s, at(9, 0));
        punch(&mut day, &s, at(16, 0));
        assert_eq!(day.early_departure, 45);
    }
}
