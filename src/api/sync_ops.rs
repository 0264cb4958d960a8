use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::store;
use crate::sync::scheduler::{SyncOutcome, SyncScheduler};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SyncFailureQuery {
    pub facility_id: Option<u64>,
    /// Failure category, e.g. "identity-resolution"
    #[schema(example = "identity-resolution")]
    pub reason: Option<String>,
}

/// Trigger one facility's sync on demand
#[utoipa::path(
    post,
    path = "/api/v1/sync/facilities/{facility_id}",
    params(("facility_id" = u64, Path, description = "Facility ID")),
    responses(
        (status = 200, description = "Sync finished", body = Object, example = json!({
            "message": "Sync completed",
            "fetched": 42,
            "processed": 40,
            "dropped": 2
        })),
        (status = 404, description = "Facility not found"),
        (status = 502, description = "Device gateway failure", body = Object, example = json!({
            "message": "Sync failed",
            "error": "device call timed out after 30s"
        }))
    ),
    tag = "Sync"
)]
pub async fn trigger_facility_sync(
    scheduler: web::Data<Arc<SyncScheduler>>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let facility_id = path.into_inner();

    match scheduler.sync_one(facility_id).await {
        Ok(None) => Ok(HttpResponse::NotFound().json(json!({
            "message": "Facility not found"
        }))),
        Ok(Some(SyncOutcome::Skipped(reason))) => Ok(HttpResponse::Ok().json(json!({
            "message": "Sync skipped",
            "reason": reason,
        }))),
        Ok(Some(SyncOutcome::Processed {
            fetched,
            processed,
            dropped,
        })) => Ok(HttpResponse::Ok().json(json!({
            "message": "Sync completed",
            "fetched": fetched,
            "processed": processed,
            "dropped": dropped,
        }))),
        Err(e) => {
            error!(facility_id, error = %e, "Manual facility sync failed");
            Ok(HttpResponse::BadGateway().json(json!({
                "message": "Sync failed",
                "error": e.to_string(),
            })))
        }
    }
}

/// Per-facility sync state listing
#[utoipa::path(
    get,
    path = "/api/v1/sync/status",
    responses(
        (status = 200, description = "Facility sync states", body = Object),
        (status = 500, description = "Internal server error")
    ),
    tag = "Sync"
)]
pub async fn sync_status(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let facilities = store::facility::list_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to list facilities");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data: Vec<_> = facilities
        .iter()
        .map(|f| {
            json!({
                "id": f.id,
                "name": f.name,
                "code": f.code,
                "autoSync": f.auto_sync,
                "syncStatus": f.sync_status,
                "lastSyncTime": f.last_sync_time,
                "lastSyncError": f.last_sync_error,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

/// Recent device records the pipeline dropped, for manual review
#[utoipa::path(
    get,
    path = "/api/v1/sync/failures",
    params(SyncFailureQuery),
    responses(
        (status = 200, description = "Latest dropped-record audit rows", body = Object),
        (status = 500, description = "Internal server error")
    ),
    tag = "Sync"
)]
pub async fn sync_failures(
    pool: web::Data<MySqlPool>,
    query: web::Query<SyncFailureQuery>,
) -> actix_web::Result<impl Responder> {
    let failures =
        store::failure::recent(pool.get_ref(), query.facility_id, query.reason.as_deref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch sync failures");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let total = failures.len();
    Ok(HttpResponse::Ok().json(json!({
        "data": failures,
        "total": total,
    })))
}
