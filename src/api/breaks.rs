use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::error::{BreakViolation, RecordError};
use crate::model::employee::Employee;
use crate::model::facility::Facility;
use crate::model::shift::Shift;
use crate::store;
use crate::sync::breaks;
use crate::sync::metrics;

#[derive(Deserialize, ToSchema)]
pub struct StartBreakRequest {
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = "lunch")]
    pub break_type: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EndBreakRequest {
    #[schema(example = 42)]
    pub employee_id: u64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BreakHistoryQuery {
    #[schema(example = "2026-03-01", value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-03-31", value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
}

/// Looks up the employee with their shift and facility; the manual break
/// protocol needs all three.
async fn load_employee_context(
    pool: &MySqlPool,
    employee_id: u64,
) -> actix_web::Result<Result<(Employee, Shift, Facility), HttpResponse>> {
    let employee = store::employee::find(pool, employee_id)
        .await
        .map_err(internal("Failed to fetch employee"))?;

    let Some(employee) = employee else {
        return Ok(Err(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))));
    };

    let Some(shift_id) = employee.shift_id else {
        return Ok(Err(HttpResponse::BadRequest().json(json!({
            "message": "Employee has no shift assigned"
        }))));
    };

    let shift = store::shift::find(pool, shift_id)
        .await
        .map_err(internal("Failed to fetch shift"))?;
    let Some(shift) = shift else {
        return Ok(Err(HttpResponse::BadRequest().json(json!({
            "message": "Employee has no shift assigned"
        }))));
    };

    let facility = store::facility::find(pool, employee.facility_id)
        .await
        .map_err(internal("Failed to fetch facility"))?;
    let Some(facility) = facility else {
        return Ok(Err(HttpResponse::BadRequest().json(json!({
            "message": "Employee facility not found"
        }))));
    };

    Ok(Ok((employee, shift, facility)))
}

fn internal(context: &'static str) -> impl Fn(sqlx::Error) -> actix_web::Error {
    move |e: sqlx::Error| {
        error!(error = %e, context, "Database error");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    }
}

fn record_error_response(e: RecordError) -> actix_web::Error {
    match e {
        RecordError::ConcurrencyConflict { .. } => actix_web::error::ErrorConflict(
            "Attendance record is being updated concurrently, try again",
        ),
        other => {
            error!(error = %other, "Manual break operation failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        }
    }
}

/// Start a break (employee self-service)
#[utoipa::path(
    post,
    path = "/api/v1/breaks/start",
    request_body = StartBreakRequest,
    responses(
        (status = 200, description = "Break started", body = Object, example = json!({
            "success": true,
            "message": "Lunch Break started"
        })),
        (status = 400, description = "Break protocol violation", body = Object, example = json!({
            "message": "Already on Lunch Break break since 13:02"
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Concurrent update, retry"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Breaks"
)]
pub async fn start_break(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<StartBreakRequest>,
) -> actix_web::Result<impl Responder> {
    let (employee, shift, facility) =
        match load_employee_context(pool.get_ref(), payload.employee_id).await? {
            Ok(ctx) => ctx,
            Err(response) => return Ok(response),
        };

    let now_local = Utc::now().with_timezone(&facility.tz()).naive_local();
    let today = now_local.date();

    let outcome = store::attendance::mutate_existing_day(
        pool.get_ref(),
        employee.id,
        today,
        config.write_retry_limit,
        |day| breaks::start_manual(day, &shift, &payload.break_type, now_local),
    )
    .await
    .map_err(record_error_response)?;

    let result = match outcome {
        None => Err(BreakViolation::NotCheckedIn),
        Some(inner) => inner.map(|(entry, _day)| entry),
    };

    match result {
        Err(violation) => Ok(HttpResponse::BadRequest().json(json!({
            "message": violation.to_string()
        }))),
        Ok(entry) => {
            let config_entry = shift.break_config(&entry.break_type);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": format!("{} started", entry.name),
                "break": entry,
                "expectedDuration": config_entry.map(|c| c.duration),
                "maxDuration": config_entry.map(|c| c.max_duration),
            })))
        }
    }
}

/// End the ongoing break (employee self-service)
#[utoipa::path(
    post,
    path = "/api/v1/breaks/end",
    request_body = EndBreakRequest,
    responses(
        (status = 200, description = "Break ended", body = Object, example = json!({
            "success": true,
            "message": "Lunch Break ended. Duration: 50 minutes"
        })),
        (status = 400, description = "No active break", body = Object, example = json!({
            "message": "No active break found"
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Concurrent update, retry"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Breaks"
)]
pub async fn end_break(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<EndBreakRequest>,
) -> actix_web::Result<impl Responder> {
    let (employee, shift, facility) =
        match load_employee_context(pool.get_ref(), payload.employee_id).await? {
            Ok(ctx) => ctx,
            Err(response) => return Ok(response),
        };

    let now_local = Utc::now().with_timezone(&facility.tz()).naive_local();
    let today = now_local.date();

    let outcome = store::attendance::mutate_existing_day(
        pool.get_ref(),
        employee.id,
        today,
        config.write_retry_limit,
        |day| breaks::end_manual(day, &shift, now_local),
    )
    .await
    .map_err(record_error_response)?;

    let result = match outcome {
        None => Err(BreakViolation::NoActiveBreak),
        Some(inner) => inner,
    };

    match result {
        Err(violation) => Ok(HttpResponse::BadRequest().json(json!({
            "message": violation.to_string()
        }))),
        Ok((ended, day)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("{} ended. Duration: {} minutes", ended.name, ended.duration),
            "totalBreakTime": day.total_break_time,
            "netWorkHours": day.net_work_hours,
            "breakCompliance": day.break_compliance,
            "exceeded": ended.exceeded,
        }))),
    }
}

/// Current break status for an employee
#[utoipa::path(
    get,
    path = "/api/v1/breaks/status/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Break status", body = Object),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Breaks"
)]
pub async fn break_status(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    let (employee, shift, facility) =
        match load_employee_context(pool.get_ref(), employee_id).await? {
            Ok(ctx) => ctx,
            Err(response) => return Ok(response),
        };

    let now_local = Utc::now().with_timezone(&facility.tz()).naive_local();
    let today = now_local.date();

    let day = store::attendance::find_day(pool.get_ref(), employee.id, today)
        .await
        .map_err(internal("Failed to fetch attendance day"))?;

    let Some(day) = day else {
        return Ok(HttpResponse::Ok().json(json!({
            "onBreak": false,
            "message": "No attendance record for today",
            "availableBreaks": shift.breaks.0,
            "breakTrackingEnabled": shift.break_tracking_enabled,
        })));
    };

    let ongoing = day.ongoing_break();
    let current_duration = ongoing
        .map(|b| metrics::break_duration_minutes(b.start_time, now_local))
        .unwrap_or(0);

    Ok(HttpResponse::Ok().json(json!({
        "onBreak": ongoing.is_some(),
        "currentBreak": ongoing,
        "currentDuration": current_duration,
        "allBreaks": day.breaks.0,
        "totalBreakTime": day.total_break_time,
        "breakCompliance": day.break_compliance,
        "availableBreaks": shift.breaks.0,
        "breakTrackingEnabled": shift.break_tracking_enabled,
    })))
}

/// Break history for an employee (capped at the last 30 days with breaks)
#[utoipa::path(
    get,
    path = "/api/v1/breaks/history/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        BreakHistoryQuery
    ),
    responses(
        (status = 200, description = "Break history", body = Object),
        (status = 500, description = "Internal server error")
    ),
    tag = "Breaks"
)]
pub async fn break_history(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<BreakHistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let records =
        store::attendance::break_history(pool.get_ref(), employee_id, query.start_date, query.end_date)
            .await
            .map_err(internal("Failed to fetch break history"))?;

    let history: Vec<_> = records
        .iter()
        .map(|day| {
            json!({
                "date": day.date,
                "breaks": day.breaks.0,
                "totalBreakTime": day.total_break_time,
                "breakCompliance": day.break_compliance,
                "status": day.status,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "history": history,
        "totalRecords": history.len(),
    })))
}
