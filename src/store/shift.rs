use sqlx::MySqlPool;

use crate::model::shift::Shift;

pub async fn find(pool: &MySqlPool, id: u64) -> sqlx::Result<Option<Shift>> {
    sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}
