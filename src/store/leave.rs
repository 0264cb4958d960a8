use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::utils::sql::FilterValue;

/// Slice of an approved leave request the reporting overlay needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApprovedLeave {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub half_day: bool,
}

/// Approved leave requests overlapping [start, end], optionally scoped
/// to a facility or a single employee.
pub async fn approved_overlapping(
    pool: &MySqlPool,
    start: NaiveDate,
    end: NaiveDate,
    facility_id: Option<u64>,
    employee_id: Option<u64>,
) -> sqlx::Result<Vec<ApprovedLeave>> {
    let mut sql = String::from(
        "SELECT l.employee_id, l.start_date, l.end_date, l.half_day \
         FROM leave_requests l \
         JOIN employees e ON e.id = l.employee_id \
         WHERE l.status = 'approved' AND l.start_date <= ? AND l.end_date >= ?",
    );
    let mut args: Vec<FilterValue> = vec![FilterValue::Date(end), FilterValue::Date(start)];

    if let Some(fid) = facility_id {
        sql.push_str(" AND e.facility_id = ?");
        args.push(FilterValue::U64(fid));
    }
    if let Some(eid) = employee_id {
        sql.push_str(" AND l.employee_id = ?");
        args.push(FilterValue::U64(eid));
    }

    let mut query = sqlx::query_as::<_, ApprovedLeave>(&sql);
    for arg in args {
        query = arg.bind_as(query);
    }
    query.fetch_all(pool).await
}
