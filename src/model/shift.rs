use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

/// One configured break slot on a shift, stored in the `breaks` JSON column.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BreakConfig {
    #[serde(rename = "type")]
    #[schema(example = "lunch")]
    pub break_type: String,

    #[schema(example = "Lunch Break")]
    pub name: String,

    /// Expected duration in minutes.
    #[schema(example = 60)]
    pub duration: i64,

    /// Earliest time the break can start, "HH:MM".
    #[schema(example = "12:00")]
    pub start_window: String,

    /// Latest time the break can end, "HH:MM".
    #[schema(example = "14:00")]
    pub end_window: String,

    /// Alert threshold in minutes.
    #[schema(example = 90)]
    pub max_duration: i64,

    #[serde(default)]
    pub is_paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 3)]
    pub facility_id: u64,

    #[schema(example = "Day Shift")]
    pub name: String,

    /// "HH:MM", 24-hour.
    #[schema(example = "09:00")]
    pub start_time: String,

    /// "HH:MM", 24-hour.
    #[schema(example = "17:00")]
    pub end_time: String,

    #[schema(example = 8.0)]
    pub working_hours: f64,

    /// Check-in grace period in minutes.
    #[schema(example = 15)]
    pub grace_check_in: i32,

    /// Check-out grace period in minutes.
    #[schema(example = 15)]
    pub grace_check_out: i32,

    pub break_tracking_enabled: bool,

    #[schema(value_type = Vec<BreakConfig>)]
    pub breaks: Json<Vec<BreakConfig>>,
}

impl Shift {
    pub fn break_config(&self, break_type: &str) -> Option<&BreakConfig> {
        self.breaks.iter().find(|b| b.break_type == break_type)
    }

    /// Sum of expected break durations, in minutes.
    pub fn scheduled_break_total(&self) -> i64 {
        self.breaks.iter().map(|b| b.duration).sum()
    }
}
