use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Facility {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Central Clinic")]
    pub name: String,

    #[schema(example = "FAC-001")]
    pub code: String,

    /// Device gateway endpoint for attendance batches.
    pub device_api_url: String,

    /// Optional endpoint for the device's registered-user directory.
    pub user_api_url: Option<String>,

    pub device_api_key: Option<String>,

    /// IANA timezone name, e.g. "Africa/Lagos".
    #[schema(example = "Africa/Lagos")]
    pub timezone: String,

    #[schema(example = "active")]
    pub status: String,

    pub auto_sync: bool,

    #[schema(example = 5)]
    pub sync_interval_minutes: u32,

    /// Auto-captured from the device response once first observed.
    pub device_id: Option<String>,

    pub last_sync_time: Option<NaiveDateTime>,

    pub sync_status: SyncStatus,

    pub last_sync_error: Option<String>,
}

impl Facility {
    /// Falls back to UTC when the configured name does not parse.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }
}
