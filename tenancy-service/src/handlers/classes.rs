//! Class roster endpoints, scoped to the active organization.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    middleware::ActiveOrg,
    models::{CreateClassRequest, NurseryClassResponse, UpdateClassRequest},
    services::{Action, ResourceType},
    utils::ValidatedJson,
    AppState,
};
use service_core::error::AppError;

/// List classes in the active organization
pub async fn list_classes(
    State(state): State<AppState>,
    org: ActiveOrg,
) -> Result<impl IntoResponse, AppError> {
    state.authorize(org.role, ResourceType::Class, Action::Read)?;

    let classes = state.classes.list_classes(org.organization_id).await?;
    let responses: Vec<NurseryClassResponse> =
        classes.into_iter().map(NurseryClassResponse::from).collect();
    Ok(Json(responses))
}

/// Fetch one class
pub async fn get_class(
    State(state): State<AppState>,
    org: ActiveOrg,
    Path(class_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.authorize(org.role, ResourceType::Class, Action::Read)?;

    let class = state
        .classes
        .find_class(org.organization_id, class_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Class not found")))?;
    Ok(Json(NurseryClassResponse::from(class)))
}

/// Create a class in the active organization
pub async fn create_class(
    State(state): State<AppState>,
    org: ActiveOrg,
    ValidatedJson(req): ValidatedJson<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.authorize(org.role, ResourceType::Class, Action::Create)?;

    let class = state.classes.create_class(org.organization_id, &req).await?;
    tracing::info!(org_id = %org.organization_id, class_id = %class.class_id, "Class created");
    Ok((StatusCode::CREATED, Json(NurseryClassResponse::from(class))))
}

/// Update a class
pub async fn update_class(
    State(state): State<AppState>,
    org: ActiveOrg,
    Path(class_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.authorize(org.role, ResourceType::Class, Action::Update)?;

    let class = state
        .classes
        .update_class(org.organization_id, class_id, &req)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Class not found")))?;
    Ok(Json(NurseryClassResponse::from(class)))
}

/// Delete a class
pub async fn delete_class(
    State(state): State<AppState>,
    org: ActiveOrg,
    Path(class_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.authorize(org.role, ResourceType::Class, Action::Delete)?;

    let deleted = state
        .classes
        .delete_class(org.organization_id, class_id)
        .await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Class not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
