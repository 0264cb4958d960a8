use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceStatus, BreakCompliance};
use crate::model::employee::Employee;
use crate::store::leave::ApprovedLeave;
use crate::sync::metrics;

/// Filters accepted by the reporting query surface.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub facility_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub status: Option<AttendanceStatus>,
}

/// Raw per-day attendance row as fetched for reporting, joined with the
/// employee and the shift's required hours.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub employee_id: u64,
    pub employee_code: String,
    pub employee_name: String,
    pub facility_id: u64,
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub late_arrival: i32,
    pub early_arrival: i32,
    pub early_departure: i32,
    pub total_break_time: i32,
    pub break_compliance: BreakCompliance,
    pub working_hours: f64,
}

/// One merged logical row per (employee, date) as served to consumers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayRow {
    pub employee_id: u64,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    pub facility_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub work_hours: f64,
    pub net_work_hours: f64,
    pub overtime: f64,
    pub undertime: f64,
    pub late_arrival: i32,
    pub early_arrival: i32,
    pub early_departure: i32,
    pub total_break_time: i32,
    pub break_compliance: BreakCompliance,
    /// True for rows invented for employees with no record in the window.
    pub synthesized: bool,
}

/// Builds the unified day view: sort, merge per (employee, date),
/// synthesize absences, overlay approved leave, filter, final sort.
/// Deterministic regardless of the input row ordering.
pub fn aggregate(
    mut rows: Vec<ReportRow>,
    active_employees: &[Employee],
    leaves: &[ApprovedLeave],
    filter: &ReportFilter,
    absent_synthesis_max_days: i64,
) -> Vec<DayRow> {
    rows.sort_by(|a, b| {
        (a.employee_id, a.date, a.check_in_time, a.check_out_time)
            .cmp(&(b.employee_id, b.date, b.check_in_time, b.check_out_time))
    });

    // Merged row plus the shift's required hours, needed once more when
    // the arithmetic is re-derived after merging.
    let mut merged: BTreeMap<(u64, NaiveDate), (DayRow, f64)> = BTreeMap::new();
    for row in rows {
        let key = (row.employee_id, row.date);
        match merged.entry(key) {
            Entry::Vacant(slot) => {
                let required = row.working_hours;
                slot.insert((into_day_row(row), required));
            }
            Entry::Occupied(mut slot) => merge_into(&mut slot.get_mut().0, &row),
        }
    }
    for (day, required) in merged.values_mut() {
        recompute_metrics(day, *required);
    }

    let present: HashSet<(u64, NaiveDate)> = merged.keys().copied().collect();
    for row in synthesize_absent(active_employees, filter, absent_synthesis_max_days, &present) {
        merged.insert((row.employee_id, row.date), (row, 0.0));
    }

    overlay_leaves(&mut merged, leaves);

    merged
        .into_values()
        .map(|(row, _)| row)
        .filter(|r| filter.status.is_none_or(|s| r.status == s))
        .collect()
}

fn into_day_row(row: ReportRow) -> DayRow {
    DayRow {
        employee_id: row.employee_id,
        employee_code: row.employee_code,
        employee_name: row.employee_name,
        facility_id: row.facility_id,
        date: row.date,
        check_in_time: row.check_in_time,
        check_out_time: row.check_out_time,
        status: row.status,
        work_hours: 0.0,
        net_work_hours: 0.0,
        overtime: 0.0,
        undertime: 0.0,
        late_arrival: row.late_arrival,
        early_arrival: row.early_arrival,
        early_departure: row.early_departure,
        total_break_time: row.total_break_time,
        break_compliance: row.break_compliance,
        synthesized: false,
    }
}

/// Later duplicate rows for the same (employee, date) tighten the
/// merged row: earliest check-in, latest check-out, worst status (late
/// and excused take precedence over present), max of the minute metrics.
fn merge_into(existing: &mut DayRow, row: &ReportRow) {
    existing.check_in_time = match (existing.check_in_time, row.check_in_time) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    existing.check_out_time = match (existing.check_out_time, row.check_out_time) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    if row.status.severity() > existing.status.severity() {
        existing.status = row.status;
    }
    existing.late_arrival = existing.late_arrival.max(row.late_arrival);
    existing.early_arrival = existing.early_arrival.max(row.early_arrival);
    existing.early_departure = existing.early_departure.max(row.early_departure);
    existing.total_break_time = existing.total_break_time.max(row.total_break_time);
    existing.break_compliance =
        worse_compliance(existing.break_compliance, row.break_compliance);
}

fn worse_compliance(a: BreakCompliance, b: BreakCompliance) -> BreakCompliance {
    fn rank(c: BreakCompliance) -> u8 {
        match c {
            BreakCompliance::None => 0,
            BreakCompliance::Compliant => 1,
            BreakCompliance::Insufficient => 2,
            BreakCompliance::Exceeded => 3,
        }
    }
    if rank(b) > rank(a) { b } else { a }
}

/// Re-derives the work-hour arithmetic exactly as the write side does.
fn recompute_metrics(day: &mut DayRow, required: f64) {
    match (day.check_in_time, day.check_out_time) {
        (Some(check_in), Some(check_out)) => {
            day.work_hours = metrics::work_hours(check_in, check_out);
            day.net_work_hours =
                metrics::net_work_hours(day.work_hours, day.total_break_time as i64);
            day.overtime = metrics::overtime(day.net_work_hours, required);
            day.undertime = metrics::undertime(day.net_work_hours, required);
        }
        _ => {
            day.work_hours = 0.0;
            day.net_work_hours = 0.0;
            day.overtime = 0.0;
            day.undertime = 0.0;
        }
    }
}

/// Invents absent rows for active employees with no record on a day in
/// the window. Skipped entirely (with a log) when the window exceeds
/// the synthesis bound, so a years-long query cannot explode.
fn synthesize_absent(
    active_employees: &[Employee],
    filter: &ReportFilter,
    max_days: i64,
    present: &HashSet<(u64, NaiveDate)>,
) -> Vec<DayRow> {
    let span_days = (filter.end - filter.start).num_days() + 1;
    if span_days <= 0 {
        return vec![];
    }
    if span_days > max_days {
        tracing::warn!(
            span_days,
            max_days,
            "date window too wide, skipping absent-row synthesis"
        );
        return vec![];
    }

    let mut rows = Vec::new();
    for employee in active_employees {
        if filter.employee_id.is_some_and(|id| id != employee.id) {
            continue;
        }
        if filter.facility_id.is_some_and(|id| id != employee.facility_id) {
            continue;
        }
        let mut date = filter.start;
        while date <= filter.end {
            if !present.contains(&(employee.id, date)) {
                rows.push(DayRow {
                    employee_id: employee.id,
                    employee_code: employee.employee_code.clone(),
                    employee_name: employee.full_name(),
                    facility_id: employee.facility_id,
                    date,
                    check_in_time: None,
                    check_out_time: None,
                    status: AttendanceStatus::Absent,
                    work_hours: 0.0,
                    net_work_hours: 0.0,
                    overtime: 0.0,
                    undertime: 0.0,
                    late_arrival: 0,
                    early_arrival: 0,
                    early_departure: 0,
                    total_break_time: 0,
                    break_compliance: BreakCompliance::None,
                    synthesized: true,
                });
            }
            date = match date.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
    }
    rows
}

/// Approved leave turns absent days (real or synthesized) into
/// on-leave / half-day rows. Days with an actual punch keep their
/// recorded classification.
fn overlay_leaves(
    merged: &mut BTreeMap<(u64, NaiveDate), (DayRow, f64)>,
    leaves: &[ApprovedLeave],
) {
    for (row, _) in merged.values_mut() {
        if row.status != AttendanceStatus::Absent {
            continue;
        }
        let covered = leaves.iter().find(|l| {
            l.employee_id == row.employee_id
                && l.start_date <= row.date
                && row.date <= l.end_date
        });
        if let Some(leave) = covered {
            row.status = if leave.half_day {
                AttendanceStatus::HalfDay
            } else {
                AttendanceStatus::OnLeave
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn t(day: u32, h: u32, m: u32) -> NaiveDateTime {
        d(day).and_hms_opt(h, m, 0).unwrap()
    }

    fn row(
        employee_id: u64,
        day: u32,
        check_in: Option<NaiveDateTime>,
        check_out: Option<NaiveDateTime>,
        status: AttendanceStatus,
    ) -> ReportRow {
        ReportRow {
            employee_id,
            employee_code: format!("EMP-{employee_id:03}"),
            employee_name: "Test Person".into(),
            facility_id: 1,
            date: d(day),
            check_in_time: check_in,
            check_out_time: check_out,
            status,
            late_arrival: 0,
            early_arrival: 0,
            early_departure: 0,
            total_break_time: 60,
            break_compliance: BreakCompliance::Compliant,
            working_hours: 8.0,
        }
    }

    fn employee(id: u64) -> Employee {
        Employee {
            id,
            employee_code: format!("EMP-{id:03}"),
            first_name: "Test".into(),
            last_name: "Person".into(),
            facility_id: 1,
            shift_id: Some(1),
            device_id: None,
            card_id: None,
            profile_image: None,
            status: "active".into(),
        }
    }

    fn filter(start: u32, end: u32) -> ReportFilter {
        ReportFilter {
            start: d(start),
            end: d(end),
            facility_id: None,
            employee_id: None,
            status: None,
        }
    }

    #[test]
    fn merging_is_order_independent() {
        let a = row(1, 2, Some(t(2, 9, 0)), None, AttendanceStatus::Present);
        let b = row(1, 2, None, Some(t(2, 17, 0)), AttendanceStatus::Late);
        let forward = aggregate(vec![a.clone(), b.clone()], &[], &[], &filter(2, 2), 31);
        let backward = aggregate(vec![b, a], &[], &[], &filter(2, 2), 31);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].status, backward[0].status);
        assert_eq!(forward[0].check_in_time, backward[0].check_in_time);
        assert_eq!(forward[0].work_hours, backward[0].work_hours);
    }

    #[test]
    fn late_overrides_present_and_metrics_are_rederived() {
        let a = row(1, 2, Some(t(2, 9, 0)), None, AttendanceStatus::Present);
        let b = row(1, 2, None, Some(t(2, 17, 0)), AttendanceStatus::Late);
        let out = aggregate(vec![a, b], &[], &[], &filter(2, 2), 31);
        assert_eq!(out[0].status, AttendanceStatus::Late);
        assert_eq!(out[0].work_hours, 8.0);
        assert_eq!(out[0].net_work_hours, 7.0);
        assert_eq!(out[0].undertime, 1.0);
        assert_eq!(out[0].overtime, 0.0);
    }

    #[test]
    fn excused_overrides_present() {
        let a = row(1, 2, Some(t(2, 9, 0)), None, AttendanceStatus::Excused);
        let b = row(1, 2, Some(t(2, 9, 30)), None, AttendanceStatus::Present);
        let out = aggregate(vec![a, b], &[], &[], &filter(2, 2), 31);
        assert_eq!(out[0].status, AttendanceStatus::Excused);
        // Earliest check-in wins.
        assert_eq!(out[0].check_in_time, Some(t(2, 9, 0)));
    }

    #[test]
    fn absent_rows_are_synthesized_for_idle_employees() {
        let rows = vec![row(1, 2, Some(t(2, 9, 0)), Some(t(2, 17, 0)), AttendanceStatus::Present)];
        let employees = [employee(1), employee(2)];
        let out = aggregate(rows, &employees, &[], &filter(2, 3), 31);
        // Employee 1: present on the 2nd, absent on the 3rd.
        // Employee 2: absent both days.
        assert_eq!(out.len(), 4);
        let absents: Vec<_> = out.iter().filter(|r| r.synthesized).collect();
        assert_eq!(absents.len(), 3);
        assert!(absents.iter().all(|r| r.status == AttendanceStatus::Absent));
    }

    #[test]
    fn synthesis_is_bounded_by_the_window_cap() {
        let employees = [employee(1)];
        let out = aggregate(vec![], &employees, &[], &filter(1, 28), 14);
        assert!(out.is_empty());
    }

    #[test]
    fn approved_leave_overlays_absent_days() {
        let employees = [employee(1)];
        let leaves = [ApprovedLeave {
            employee_id: 1,
            start_date: d(2),
            end_date: d(3),
            half_day: false,
        }];
        let out = aggregate(vec![], &employees, &leaves, &filter(2, 4), 31);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].status, AttendanceStatus::OnLeave);
        assert_eq!(out[1].status, AttendanceStatus::OnLeave);
        assert_eq!(out[2].status, AttendanceStatus::Absent);
    }

    #[test]
    fn half_day_leave_overlays_as_half_day() {
        let employees = [employee(1)];
        let leaves = [ApprovedLeave {
            employee_id: 1,
            start_date: d(2),
            end_date: d(2),
            half_day: true,
        }];
        let out = aggregate(vec![], &employees, &leaves, &filter(2, 2), 31);
        assert_eq!(out[0].status, AttendanceStatus::HalfDay);
    }

    #[test]
    fn leave_does_not_clobber_recorded_punches() {
        let rows = vec![row(1, 2, Some(t(2, 9, 20)), None, AttendanceStatus::Late)];
        let employees = [employee(1)];
        let leaves = [ApprovedLeave {
            employee_id: 1,
            start_date: d(2),
            end_date: d(2),
            half_day: false,
        }];
        let out = aggregate(rows, &employees, &leaves, &filter(2, 2), 31);
        assert_eq!(out[0].status, AttendanceStatus::Late);
    }

    #[test]
    fn status_filter_applies_after_synthesis() {
        let rows = vec![row(1, 2, Some(t(2, 9, 0)), Some(t(2, 17, 0)), AttendanceStatus::Present)];
        let employees = [employee(1), employee(2)];
        let mut f = filter(2, 2);
        f.status = Some(AttendanceStatus::Absent);
        let out = aggregate(rows, &employees, &[], &f, 31);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].employee_id, 2);
    }
}
