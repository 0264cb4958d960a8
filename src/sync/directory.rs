use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::error::FacilityError;
use crate::model::facility::Facility;
use crate::store;
use crate::sync::gateway::{DeviceBatch, DeviceGateway};

#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryStats {
    pub total: usize,
    pub updated: usize,
    pub unknown: usize,
    pub skipped: usize,
}

/// Pulls the device's registered-user list and writes device-observed
/// identity fields back onto matched employees. Unknown device users are
/// only counted; the employee directory itself is managed elsewhere.
pub async fn sync_directory(
    pool: &MySqlPool,
    gateway: &dyn DeviceGateway,
    facility: &Facility,
) -> Result<DirectoryStats, FacilityError> {
    let batch: DeviceBatch = gateway.fetch_directory(facility).await?;

    store::facility::capture_device_identity(pool, facility.id, batch.device_id.as_deref())
        .await?;

    let mut stats = DirectoryStats {
        total: batch.records.len(),
        ..Default::default()
    };

    for user in &batch.records {
        let identifier = string_field(user, &["personUUID", "PersonUUID", "IdCard"]);
        let card_id = string_field(user, &["RFIDCard", "IdCard"])
            .filter(|c| c != "0");
        let profile_image = string_field(user, &["RegPicinfo"]);
        let name = string_field(user, &["Name", "name"]);

        if identifier.is_none() && card_id.is_none() {
            stats.skipped += 1;
            continue;
        }

        let employee = store::employee::find_by_identity(
            pool,
            facility.id,
            identifier.as_deref(),
            card_id.as_deref(),
            None,
        )
        .await?;

        match employee {
            Some(employee) => {
                let rows = store::employee::write_back_device_fields(
                    pool,
                    employee.id,
                    identifier.as_deref(),
                    card_id.as_deref(),
                    profile_image.as_deref(),
                )
                .await?;
                if rows > 0 {
                    stats.updated += 1;
                }
            }
            None => {
                stats.unknown += 1;
                warn!(
                    facility_id = facility.id,
                    name = name.as_deref().unwrap_or("Unknown"),
                    identifier = identifier.as_deref().unwrap_or("-"),
                    "device user has no matching employee"
                );
            }
        }
    }

    info!(
        facility_id = facility.id,
        total = stats.total,
        updated = stats.updated,
        unknown = stats.unknown,
        skipped = stats.skipped,
        "directory sync finished"
    );
    Ok(stats)
}

fn string_field(record: &Value, candidates: &[&str]) -> Option<String> {
    for field in candidates {
        match record.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}
