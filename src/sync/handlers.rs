// src/sync/handlers.rs

use axum::{
    extract::{Extension, Json, Path},
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::models::{ImportReport, MappingStatus, SyncReport, ToggleMappingRequest};
use super::reconciler;
use crate::auth::AdminUser;
use crate::common::{ApiError, AppState};
use crate::identity::{repository, UserMapping};

/// POST /api/supabase/admin/sync-mappings
pub async fn admin_sync_mappings(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<SyncReport>, ApiError> {
    let state = state_lock.read().await.clone();

    info!(admin_user_id = %admin.user.id, "Admin triggered mapping sync");

    let report = reconciler::reconcile_mappings(&state.db, state.identity_provider.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Mapping sync failed");
            ApiError::from(e)
        })?;

    Ok(Json(report))
}

/// GET /api/sync-mappings
/// One-time bootstrap sync. Refused once any mapping exists.
pub async fn bootstrap_sync_mappings(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let existing = repository::count_mappings(&state.db).await?;
    if existing > 0 {
        warn!(existing, "Bootstrap sync refused: mappings already present");
        return Err(ApiError::Forbidden(
            "Sync already completed. Use admin endpoint for re-sync.".to_string(),
        ));
    }

    let report =
        reconciler::reconcile_mappings(&state.db, state.identity_provider.as_ref()).await?;
    Ok(Json(report))
}

/// GET /api/supabase/admin/mapping-status
pub async fn admin_mapping_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<MappingStatus>, ApiError> {
    let state = state_lock.read().await.clone();
    let status = reconciler::mapping_status(&state.db, state.identity_provider.as_ref()).await?;
    Ok(Json(status))
}

/// POST /api/supabase/admin/import-users
pub async fn admin_import_users(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<ImportReport>, ApiError> {
    let state = state_lock.read().await.clone();

    info!(admin_user_id = %admin.user.id, "Admin triggered remote user import");

    let report = reconciler::import_remote_users(&state.db, state.identity_provider.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Remote user import failed");
            ApiError::from(e)
        })?;

    Ok(Json(report))
}

/// PATCH /api/supabase/admin/mappings/:supabase_id/toggle-status
pub async fn toggle_mapping_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AdminUser(admin): AdminUser,
    Path(supabase_id): Path<String>,
    Json(payload): Json<ToggleMappingRequest>,
) -> Result<Json<UserMapping>, ApiError> {
    let state = state_lock.read().await.clone();

    if !payload.is_active {
        let own = repository::find_mapping_for_user(&state.db, &admin.user.id).await?;
        if own.is_some_and(|m| m.supabase_id == supabase_id) {
            warn!(admin_user_id = %admin.user.id, "Admin tried to disable own mapping");
            return Err(ApiError::BadRequest(
                "Cannot disable your own mapping".to_string(),
            ));
        }
    }

    let mapping = repository::set_mapping_active(&state.db, &supabase_id, payload.is_active)
        .await?
        .ok_or_else(|| ApiError::NotFound("Mapping not found".to_string()))?;

    info!(
        admin_user_id = %admin.user.id,
        supabase_id = %supabase_id,
        is_active = payload.is_active,
        "Mapping status changed"
    );

    Ok(Json(mapping))
}
