use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::model::attendance::AttendanceStatus;
use crate::report::aggregator::{self, ReportFilter};
use crate::store;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DailyReportQuery {
    /// Defaults to today (UTC)
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub date: Option<NaiveDate>,
    pub facility_id: Option<u64>,
}

/// Daily attendance summary over the merged day view
#[utoipa::path(
    get,
    path = "/api/v1/reports/daily",
    params(DailyReportQuery),
    responses(
        (status = 200, description = "Per-status counts plus rows", body = Object, example = json!({
            "date": "2026-03-02",
            "totalEmployees": 120,
            "present": 96,
            "late": 10,
            "halfDay": 2,
            "absent": 9,
            "onLeave": 3,
            "excused": 0
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Reports"
)]
pub async fn daily_report(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DailyReportQuery>,
) -> actix_web::Result<impl Responder> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let filter = ReportFilter {
        start: date,
        end: date,
        facility_id: query.facility_id,
        employee_id: None,
        status: None,
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

    let leaves =
        store::leave::approved_overlapping(pool.get_ref(), date, date, filter.facility_id, None)
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

    let count = |status: AttendanceStatus| merged.iter().filter(|r| r.status == status).count();

    Ok(HttpResponse::Ok().json(json!({
        "date": date,
        "totalEmployees": employees.len(),
        "present": count(AttendanceStatus::Present),
        "late": count(AttendanceStatus::Late),
        "halfDay": count(AttendanceStatus::HalfDay),
        "absent": count(AttendanceStatus::Absent),
        "onLeave": count(AttendanceStatus::OnLeave),
        "excused": count(AttendanceStatus::Excused),
        "records": merged,
    })))
}
