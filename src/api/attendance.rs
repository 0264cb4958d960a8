use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::model::attendance::AttendanceStatus;
use crate::report::aggregator::{self, DayRow, ReportFilter};
use crate::store;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    #[schema(example = "2026-03-01", value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-03-31", value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
    /// Filter by facility
    pub facility_id: Option<u64>,
    /// Filter by employee
    pub employee_id: Option<u64>,
    /// Filter by merged day status
    #[schema(example = "late", value_type = String)]
    pub status: Option<AttendanceStatus>,
    /// Pagination page number (1-based)
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<DayRow>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 50)]
    pub per_page: u64,
    #[schema(example = 240)]
    pub total: usize,
}

/// Merged per-day attendance rows
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated merged day rows", body = AttendanceListResponse),
        (status = 400, description = "Invalid filters", body = Object, example = json!({
            "message": "start_date and end_date are required"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_date and end_date are required"
        })));
    };
    if start > end {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);

    let filter = ReportFilter {
        start,
        end,
        facility_id: query.facility_id,
        employee_id: query.employee_id,
        status: query.status,
    };

    let rows = store::report::fetch_rows(pool.get_ref(), &filter)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance rows");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let employees = store::employee::list_active(pool.get_ref(), filter.facility_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let leaves = store::leave::approved_overlapping(
        pool.get_ref(),
        start,
        end,
        filter.facility_id,
        filter.employee_id,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch approved leave");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let merged = aggregator::aggregate(
        rows,
        &employees,
        &leaves,
        &filter,
        config.absent_synthesis_max_days,
    );

    let total = merged.len();
    let data: Vec<DayRow> = merged
        .into_iter()
        .skip(((page - 1) * per_page) as usize)
        .take(per_page as usize)
        .collect();

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}
