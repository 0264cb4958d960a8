use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

/// Operator-visible audit row for a device record the pipeline dropped.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SyncFailure {
    pub id: u64,
    pub facility_id: u64,

    /// Machine-readable category, e.g. "identity-resolution".
    #[schema(example = "identity-resolution")]
    pub reason: String,

    pub detail: String,

    #[schema(value_type = Object, nullable = true)]
    pub raw: Option<Json<serde_json::Value>>,

    pub created_at: NaiveDateTime,
}
