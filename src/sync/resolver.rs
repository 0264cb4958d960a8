use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::error::RecordError;
use crate::model::employee::Employee;
use crate::model::facility::Facility;
use crate::model::shift::Shift;
use crate::store;
use crate::sync::normalizer::CanonicalEvent;

/// Identity lookups repeat heavily within one sync tick (every punch of
/// the same person hits the same keys), so resolved pairs are cached
/// briefly. Negative results are cached too.
static IDENTITY_CACHE: Lazy<Cache<String, Option<(Employee, Shift)>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(300))
        .build()
});

/// Directory sync may have rewritten device ids; drop everything before
/// a new tick.
pub fn invalidate_cache() {
    IDENTITY_CACHE.invalidate_all();
}

/// Maps a canonical event to an employee and their shift, scoped to the
/// facility: device identifier first, then card id, then a first-name
/// prefix match.
pub async fn resolve(
    pool: &MySqlPool,
    facility: &Facility,
    event: &CanonicalEvent,
) -> Result<(Employee, Shift), RecordError> {
    let name_prefix = event
        .name
        .as_deref()
        .and_then(|n| n.split_whitespace().next())
        .map(str::to_string);

    let cache_key = format!(
        "{}|{}|{}|{}",
        facility.id,
        event.identifier.as_deref().unwrap_or(""),
        event.card_id.as_deref().unwrap_or(""),
        name_prefix.as_deref().unwrap_or("")
    );

    if let Some(cached) = IDENTITY_CACHE.get(&cache_key).await {
        return cached.ok_or_else(|| not_found(event, name_prefix.as_deref()));
    }

    let employee = store::employee::find_by_identity(
        pool,
        facility.id,
        event.identifier.as_deref(),
        event.card_id.as_deref(),
        name_prefix.as_deref(),
    )
    .await?;

    let Some(employee) = employee else {
        IDENTITY_CACHE.insert(cache_key, None).await;
        return Err(not_found(event, name_prefix.as_deref()));
    };

    let Some(shift_id) = employee.shift_id else {
        // No caching here: shift assignment is what the operator will
        // fix first, and the next tick should see it immediately.
        return Err(RecordError::NoShiftAssigned {
            employee_id: employee.id,
        });
    };

    let shift = store::shift::find(pool, shift_id).await?.ok_or(
        RecordError::NoShiftAssigned {
            employee_id: employee.id,
        },
    )?;

    IDENTITY_CACHE
        .insert(cache_key, Some((employee.clone(), shift.clone())))
        .await;

    Ok((employee, shift))
}

fn not_found(event: &CanonicalEvent, name_prefix: Option<&str>) -> RecordError {
    RecordError::IdentityResolution {
        device_id: event.identifier.clone(),
        card_id: event.card_id.clone(),
        name: name_prefix.map(str::to_string),
    }
}
