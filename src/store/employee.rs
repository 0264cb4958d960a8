use sqlx::MySqlPool;

use crate::model::employee::Employee;

/// Ordered identity fallback scoped to one facility: device identifier,
/// then card id, then a case-insensitive first-name prefix.
pub async fn find_by_identity(
    pool: &MySqlPool,
    facility_id: u64,
    identifier: Option<&str>,
    card_id: Option<&str>,
    name_prefix: Option<&str>,
) -> sqlx::Result<Option<Employee>> {
    if let Some(identifier) = identifier {
        let found = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE facility_id = ? AND device_id = ?",
        )
        .bind(facility_id)
        .bind(identifier)
        .fetch_optional(pool)
        .await?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if let Some(card_id) = card_id {
        let found = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE facility_id = ? AND card_id = ?",
        )
        .bind(facility_id)
        .bind(card_id)
        .fetch_optional(pool)
        .await?;
        if found.is_some() {
            return Ok(found);
        }
    }

    if let Some(prefix) = name_prefix {
        if !prefix.is_empty() {
            return sqlx::query_as::<_, Employee>(
                "SELECT * FROM employees \
                 WHERE facility_id = ? AND first_name LIKE CONCAT(?, '%') \
                 LIMIT 1",
            )
            .bind(facility_id)
            .bind(prefix)
            .fetch_optional(pool)
            .await;
        }
    }

    Ok(None)
}

pub async fn find(pool: &MySqlPool, id: u64) -> sqlx::Result<Option<Employee>> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Active employees, optionally narrowed to one facility. Used by the
/// reporting aggregator when synthesizing absent rows.
pub async fn list_active(
    pool: &MySqlPool,
    facility_id: Option<u64>,
) -> sqlx::Result<Vec<Employee>> {
    match facility_id {
        Some(fid) => {
            sqlx::query_as::<_, Employee>(
                "SELECT * FROM employees WHERE status = 'active' AND facility_id = ? ORDER BY id",
            )
            .bind(fid)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Employee>(
                "SELECT * FROM employees WHERE status = 'active' ORDER BY id",
            )
            .fetch_all(pool)
            .await
        }
    }
}

/// Directory-sync write-back: populate device-observed fields the first
/// time they are seen (or when the device reports new values). The only
/// write this service makes to the employee directory.
pub async fn write_back_device_fields(
    pool: &MySqlPool,
    employee_id: u64,
    device_id: Option<&str>,
    card_id: Option<&str>,
    profile_image: Option<&str>,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE employees SET
            device_id = COALESCE(?, device_id),
            card_id = COALESCE(?, card_id),
            profile_image = COALESCE(?, profile_image)
        WHERE id = ?
        "#,
    )
    .bind(device_id)
    .bind(card_id)
    .bind(profile_image)
    .bind(employee_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
