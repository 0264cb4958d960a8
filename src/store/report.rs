use sqlx::MySqlPool;

use crate::report::aggregator::{ReportFilter, ReportRow};
use crate::utils::sql::FilterValue;

/// Hard cap on rows pulled for one reporting query.
const MAX_REPORT_ROWS: i64 = 5000;

/// Per-day rows joined with employee identity and the shift's required
/// hours, ready for the aggregator. The status filter is intentionally
/// not pushed down: it applies to the merged view, not raw rows.
pub async fn fetch_rows(pool: &MySqlPool, filter: &ReportFilter) -> sqlx::Result<Vec<ReportRow>> {
    let mut sql = String::from(
        "SELECT a.employee_id, e.employee_code, \
                TRIM(CONCAT(e.first_name, ' ', e.last_name)) AS employee_name, \
                a.facility_id, a.date, a.check_in_time, a.check_out_time, \
                a.status, a.late_arrival, a.early_arrival, a.early_departure, \
                a.total_break_time, a.break_compliance, s.working_hours \
         FROM attendance_days a \
         JOIN employees e ON e.id = a.employee_id \
         JOIN shifts s ON s.id = a.shift_id \
         WHERE a.date >= ? AND a.date <= ?",
    );
    let mut args: Vec<FilterValue> = vec![
        FilterValue::Date(filter.start),
        FilterValue::Date(filter.end),
    ];

    if let Some(fid) = filter.facility_id {
        sql.push_str(" AND a.facility_id = ?");
        args.push(FilterValue::U64(fid));
    }
    if let Some(eid) = filter.employee_id {
        sql.push_str(" AND a.employee_id = ?");
        args.push(FilterValue::U64(eid));
    }

    sql.push_str(" ORDER BY a.employee_id, a.date LIMIT ?");
    args.push(FilterValue::I64(MAX_REPORT_ROWS));

    let mut query = sqlx::query_as::<_, ReportRow>(&sql);
    for arg in args {
        query = arg.bind_as(query);
    }
    query.fetch_all(pool).await
}
