use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use sqlx::types::Json;
use std::time::Duration;

use crate::error::{BreakViolation, RecordError};
use crate::model::attendance::{AttendanceDay, AttendanceStatus, BreakCompliance};

/// Identity of a day row created lazily on its first event.
#[derive(Debug, Clone)]
pub struct DayTemplate {
    pub employee_id: u64,
    pub facility_id: u64,
    pub shift_id: u64,
    pub date: NaiveDate,
    pub scheduled_check_in: NaiveDateTime,
    pub scheduled_check_out: NaiveDateTime,
}

/// Whether the mutation closure's changes should be persisted. Rejected
/// punches leave the aggregate untouched, so saving (and lazily creating
/// a row) would be wrong.
pub enum Mutation<T> {
    Save(T),
    Skip(T),
}

impl DayTemplate {
    pub(crate) fn fresh(&self) -> AttendanceDay {
        AttendanceDay {
            id: 0,
            employee_id: self.employee_id,
            facility_id: self.facility_id,
            shift_id: self.shift_id,
            date: self.date,
            scheduled_check_in: self.scheduled_check_in,
            scheduled_check_out: self.scheduled_check_out,
            check_in_time: None,
            check_in_method: None,
            check_in_device_id: None,
            check_out_time: None,
            check_out_method: None,
            check_out_device_id: None,
            status: AttendanceStatus::Absent,
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
}

pub async fn find_day(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> sqlx::Result<Option<AttendanceDay>> {
    sqlx::query_as::<_, AttendanceDay>(
        r#"
        SELECT * FROM attendance_days
        WHERE employee_id = ? AND date = ?
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/// Returns the new row id, or None when another writer created the
/// (employee, date) row first.
async fn insert_day(pool: &MySqlPool, day: &AttendanceDay) -> sqlx::Result<Option<u64>> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_days
            (employee_id, facility_id, shift_id, date,
             scheduled_check_in, scheduled_check_out,
             check_in_time, check_in_method, check_in_device_id,
             check_out_time, check_out_method, check_out_device_id,
             status, work_hours, net_work_hours, overtime, undertime,
             late_arrival, early_arrival, early_departure,
             breaks, total_break_time, break_compliance, raw_audit, version)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(day.employee_id)
    .bind(day.facility_id)
    .bind(day.shift_id)
    .bind(day.date)
    .bind(day.scheduled_check_in)
    .bind(day.scheduled_check_out)
    .bind(day.check_in_time)
    .bind(&day.check_in_method)
    .bind(&day.check_in_device_id)
    .bind(day.check_out_time)
    .bind(&day.check_out_method)
    .bind(&day.check_out_device_id)
    .bind(day.status)
    .bind(day.work_hours)
    .bind(day.net_work_hours)
    .bind(day.overtime)
    .bind(day.undertime)
    .bind(day.late_arrival)
    .bind(day.early_arrival)
    .bind(day.early_departure)
    .bind(&day.breaks)
    .bind(day.total_break_time)
    .bind(day.break_compliance)
    .bind(&day.raw_audit)
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(Some(done.last_insert_id())),
        Err(e) => {
            // Unique (employee, date) race: first writer wins the insert.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(None);
                }
            }
            Err(e)
        }
    }
}

/// Compare-and-swap on the version column. Returns false on a conflict,
/// bumps the in-memory version on success.
async fn update_day(pool: &MySqlPool, day: &mut AttendanceDay) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE attendance_days SET
            check_in_time = ?, check_in_method = ?, check_in_device_id = ?,
            check_out_time = ?, check_out_method = ?, check_out_device_id = ?,
            status = ?, work_hours = ?, net_work_hours = ?,
            overtime = ?, undertime = ?,
            late_arrival = ?, early_arrival = ?, early_departure = ?,
            breaks = ?, total_break_time = ?, break_compliance = ?,
            raw_audit = ?, version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(day.check_in_time)
    .bind(&day.check_in_method)
    .bind(&day.check_in_device_id)
    .bind(day.check_out_time)
    .bind(&day.check_out_method)
    .bind(&day.check_out_device_id)
    .bind(day.status)
    .bind(day.work_hours)
    .bind(day.net_work_hours)
    .bind(day.overtime)
    .bind(day.undertime)
    .bind(day.late_arrival)
    .bind(day.early_arrival)
    .bind(day.early_departure)
    .bind(&day.breaks)
    .bind(day.total_break_time)
    .bind(day.break_compliance)
    .bind(&day.raw_audit)
    .bind(day.id)
    .bind(day.version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }
    day.version += 1;
    Ok(true)
}

/// Read-modify-write against the current document version, retried with
/// a fresh read a bounded number of times before surfacing a conflict.
/// `mutate` must be deterministic; it may run more than once.
pub async fn reconcile_day<T>(
    pool: &MySqlPool,
    template: &DayTemplate,
    retry_limit: u32,
    mutate: impl Fn(&mut AttendanceDay) -> Mutation<T>,
) -> Result<T, RecordError> {
    for attempt in 0..=retry_limit {
        let mut day = match find_day(pool, template.employee_id, template.date).await? {
            Some(existing) => existing,
            None => template.fresh(),
        };

        let outcome = match mutate(&mut day) {
            Mutation::Skip(outcome) => return Ok(outcome),
            Mutation::Save(outcome) => outcome,
        };

        let saved = if day.id == 0 {
            insert_day(pool, &day).await?.is_some()
        } else {
            update_day(pool, &mut day).await?
        };
        if saved {
            return Ok(outcome);
        }

        tracing::warn!(
            employee_id = template.employee_id,
            date = %template.date,
            attempt,
            "attendance day version conflict, retrying with fresh read"
        );
        tokio::time::sleep(Duration::from_millis(25 * (attempt as u64 + 1))).await;
    }
    Err(RecordError::ConcurrencyConflict {
        attempts: retry_limit + 1,
    })
}

/// Same discipline for the manual break API, which only ever touches an
/// existing day. Ok(None) means no day exists for the date; a
/// `BreakViolation` from `mutate` aborts without writing.
pub async fn mutate_existing_day<T>(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    retry_limit: u32,
    mutate: impl Fn(&mut AttendanceDay) -> Result<T, BreakViolation>,
) -> Result<Option<Result<(T, AttendanceDay), BreakViolation>>, RecordError> {
    for attempt in 0..=retry_limit {
        let Some(mut day) = find_day(pool, employee_id, date).await? else {
            return Ok(None);
        };

        match mutate(&mut day) {
            Err(violation) => return Ok(Some(Err(violation))),
            Ok(value) => {
                if update_day(pool, &mut day).await? {
                    return Ok(Some(Ok((value, day))));
                }
            }
        }

        tracing::warn!(
            employee_id,
            date = %date,
            attempt,
            "attendance day version conflict on manual break, retrying"
        );
        tokio::time::sleep(Duration::from_millis(25 * (attempt as u64 + 1))).await;
    }
    Err(RecordError::ConcurrencyConflict {
        attempts: retry_limit + 1,
    })
}

/// Day rows carrying at least one break, newest first, capped at 30.
pub async fn break_history(
    pool: &MySqlPool,
    employee_id: u64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> sqlx::Result<Vec<AttendanceDay>> {
    let mut sql = String::from(
        "SELECT * FROM attendance_days \
         WHERE employee_id = ? AND JSON_LENGTH(breaks) > 0",
    );
    if start.is_some() {
        sql.push_str(" AND date >= ?");
    }
    if end.is_some() {
        sql.push_str(" AND date <= ?");
    }
    sql.push_str(" ORDER BY date DESC LIMIT 30");

    let mut query = sqlx::query_as::<_, AttendanceDay>(&sql).bind(employee_id);
    if let Some(s) = start {
        query = query.bind(s);
    }
    if let Some(e) = end {
        query = query.bind(e);
    }
    query.fetch_all(pool).await
}
