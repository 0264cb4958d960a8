use sqlx::MySqlPool;

use crate::model::facility::{Facility, SyncStatus};

/// Facilities the scheduler should visit on a tick.
pub async fn list_auto_sync(pool: &MySqlPool) -> sqlx::Result<Vec<Facility>> {
    sqlx::query_as::<_, Facility>(
        "SELECT * FROM facilities WHERE status = 'active' AND auto_sync = TRUE ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &MySqlPool) -> sqlx::Result<Vec<Facility>> {
    sqlx::query_as::<_, Facility>("SELECT * FROM facilities ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &MySqlPool, id: u64) -> sqlx::Result<Option<Facility>> {
    sqlx::query_as::<_, Facility>("SELECT * FROM facilities WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Terminal statuses also stamp last_sync_time; in-progress does not, so
/// the next fetch window still starts at the previous completed sync.
pub async fn update_sync_status(
    pool: &MySqlPool,
    facility_id: u64,
    status: SyncStatus,
    error: Option<&str>,
) -> sqlx::Result<()> {
    let stamp = !matches!(status, SyncStatus::InProgress);
    let sql = if stamp {
        "UPDATE facilities SET sync_status = ?, last_sync_error = ?, last_sync_time = UTC_TIMESTAMP() WHERE id = ?"
    } else {
        "UPDATE facilities SET sync_status = ?, last_sync_error = ? WHERE id = ?"
    };
    sqlx::query(sql)
        .bind(status)
        .bind(error)
        .bind(facility_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persists the device identity volunteered in a gateway response the
/// first time it is observed (or when it changes).
pub async fn capture_device_identity(
    pool: &MySqlPool,
    facility_id: u64,
    device_id: Option<&str>,
) -> sqlx::Result<()> {
    if let Some(device_id) = device_id {
        sqlx::query(
            "UPDATE facilities SET device_id = ? WHERE id = ? AND (device_id IS NULL OR device_id <> ?)",
        )
        .bind(device_id)
        .bind(facility_id)
        .bind(device_id)
        .execute(pool)
        .await?;
    }
    Ok(())
}
