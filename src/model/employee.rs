use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = 3)]
    pub facility_id: u64,

    #[schema(example = 1, nullable = true)]
    pub shift_id: Option<u64>,

    /// Device-assigned person identifier, populated by directory sync.
    pub device_id: Option<String>,

    /// RFID/ID card number as reported by the device.
    pub card_id: Option<String>,

    pub profile_image: Option<String>,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}
