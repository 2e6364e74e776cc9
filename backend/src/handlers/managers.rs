use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use shared::api::{CreateManagerRequest, CreateManagerResponse, MessageResponse, UpdateManagerRequest};
use shared::models::{InviteStatus, Manager};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::mail::OutgoingMail;
use crate::models::{ManagerChanges, NewManager};
use crate::AppState;

const MANAGER_NOT_FOUND: &str = "Manager not found";

fn manager_id(path: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("Invalid manager ID"))
}

/// List the managers the caller has added.
pub async fn list_managers(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<Vec<Manager>>> {
    let managers = state
        .store
        .list_managers(&caller.external_id)
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(managers))
}

/// Add a manager under the caller and send them an invitation.
pub async fn create_manager(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<CreateManagerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateManagerResponse>)> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::bad_request(format!("Invalid JSON payload: {}", rejection.body_text())))?;

    request
        .validate()
        .map_err(|e| ApiError::bad_request(format!("Validation failed: {}", e)))?;

    let id = state
        .store
        .insert_manager(NewManager {
            admin_external_id: caller.external_id.clone(),
            name: request.name.clone(),
            email: request.email.clone(),
            invite_status: InviteStatus::Pending.as_str().to_string(),
        })
        .await
        .map_err(ApiError::from_store)?;

    tracing::info!(manager_id = %id, admin = %caller.external_id, "Manager added");

    // Invitation delivery never fails the request
    let invitation = OutgoingMail::invitation(&request.name, &request.email, &caller.email);
    if let Err(e) = state.mailer.send(&invitation).await {
        tracing::warn!(manager_id = %id, "Failed to send manager invitation: {:#}", e);
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateManagerResponse {
            message: "Manager added successfully".to_string(),
            id,
        }),
    ))
}

/// Fetch one of the caller's managers.
pub async fn get_manager(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Manager>> {
    let id = manager_id(path)?;

    let manager = state
        .store
        .find_manager(&caller.external_id, id)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::NotFound(MANAGER_NOT_FOUND.to_string()))?;

    Ok(Json(manager))
}

/// Update name, email or invite status of one of the caller's managers.
pub async fn update_manager(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateManagerRequest>, JsonRejection>,
) -> ApiResult<Json<Manager>> {
    let id = manager_id(path)?;
    let Json(request) = payload
        .map_err(|rejection| ApiError::bad_request(format!("Invalid JSON payload: {}", rejection.body_text())))?;

    request
        .validate()
        .map_err(|e| ApiError::bad_request(format!("Validation failed: {}", e)))?;

    let changes = ManagerChanges {
        name: request.name,
        email: request.email,
        invite_status: request.invite_status.map(|s| s.as_str().to_string()),
    };

    let manager = state
        .store
        .update_manager(&caller.external_id, id, changes)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::NotFound(MANAGER_NOT_FOUND.to_string()))?;

    tracing::info!(manager_id = %id, "Manager updated");
    Ok(Json(manager))
}

pub async fn delete_manager(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let id = manager_id(path)?;

    let deleted = state
        .store
        .delete_manager(&caller.external_id, id)
        .await
        .map_err(ApiError::from_store)?;
    if !deleted {
        return Err(ApiError::NotFound(MANAGER_NOT_FOUND.to_string()));
    }

    tracing::info!(manager_id = %id, admin = %caller.external_id, "Manager deleted");
    Ok(Json(MessageResponse::new("Manager deleted successfully")))
}
