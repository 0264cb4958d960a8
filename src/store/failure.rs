use serde_json::Value;
use sqlx::MySqlPool;

use crate::model::sync_failure::SyncFailure;
use crate::utils::sql::FilterValue;

/// Best-effort audit row for a dropped record; a failed insert is
/// logged and swallowed so auditing can never fail a batch.
pub async fn record(
    pool: &MySqlPool,
    facility_id: u64,
    reason: &str,
    detail: &str,
    raw: Option<&Value>,
) {
    let result = sqlx::query(
        "INSERT INTO sync_failures (facility_id, reason, detail, raw) VALUES (?, ?, ?, ?)",
    )
    .bind(facility_id)
    .bind(reason)
    .bind(detail)
    .bind(raw.map(|v| sqlx::types::Json(v.clone())))
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::error!(error = %e, facility_id, reason, "Failed to record sync failure");
    }
}

/// Latest dropped-record audit rows for the ops surface.
pub async fn recent(
    pool: &MySqlPool,
    facility_id: Option<u64>,
    reason: Option<&str>,
) -> sqlx::Result<Vec<SyncFailure>> {
    let mut sql = String::from("SELECT * FROM sync_failures WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(fid) = facility_id {
        sql.push_str(" AND facility_id = ?");
        args.push(FilterValue::U64(fid));
    }
    if let Some(reason) = reason {
        sql.push_str(" AND reason = ?");
        args.push(FilterValue::Str(reason.to_string()));
    }
    sql.push_str(" ORDER BY id DESC LIMIT 100");

    let mut query = sqlx::query_as::<_, SyncFailure>(&sql);
    for arg in args {
        query = arg.bind_as(query);
    }
    query.fetch_all(pool).await
}
