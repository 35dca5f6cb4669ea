//! Organization listing, creation, selection, and membership management.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    middleware::{ActiveOrg, CurrentPrincipal},
    models::{
        AddMemberRequest, CreateOrganizationRequest, Membership, MembershipSummary, Organization,
        OrganizationResponse, SelectOrganizationRequest, SessionInfo,
    },
    services::{Action, ResourceType},
    utils::ValidatedJson,
    AppState,
};
use service_core::error::AppError;

/// List the caller's memberships with organization names and roles
pub async fn list_organizations(
    State(state): State<AppState>,
    current: CurrentPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let entries = state
        .directory
        .list_memberships(current.principal.principal_id)
        .await?;

    let summaries: Vec<MembershipSummary> = entries
        .into_iter()
        .filter_map(|entry| {
            let role = entry.role()?;
            Some(MembershipSummary {
                org_id: entry.org_id,
                org_name: entry.org_name,
                role,
                created_utc: entry.created_utc,
            })
        })
        .collect();

    Ok(Json(summaries))
}

/// Create an organization; the creator becomes its owner and the new
/// organization becomes the session's active one
pub async fn create_organization(
    State(state): State<AppState>,
    current: CurrentPrincipal,
    ValidatedJson(req): ValidatedJson<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let org = Organization::new(req.name, current.principal.principal_id);
    state.directory.create_organization(&org).await?;

    state
        .sessions
        .set_active_organization(&current.token, org.org_id)
        .await?;
    tracing::info!(org_id = %org.org_id, "Organization created");

    Ok((StatusCode::CREATED, Json(OrganizationResponse::from(org))))
}

/// Switch the session's active organization
pub async fn select_organization(
    State(state): State<AppState>,
    current: CurrentPrincipal,
    Json(req): Json<SelectOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .set_active_organization(&current.token, req.organization_id)
        .await?;

    Ok(Json(SessionInfo::from(session)))
}

/// Add a principal to the active organization by email
pub async fn add_member(
    State(state): State<AppState>,
    org: ActiveOrg,
    ValidatedJson(req): ValidatedJson<AddMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.authorize(org.role, ResourceType::Organization, Action::Update)?;

    let principal = state
        .directory
        .find_principal_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No principal with that email")))?;

    let membership = Membership::new(principal.principal_id, org.organization_id, req.role);
    state.directory.add_membership(&membership).await?;
    tracing::info!(
        org_id = %org.organization_id,
        principal_id = %principal.principal_id,
        role = %req.role,
        "Membership added"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "org_id": org.organization_id,
            "principal_id": principal.principal_id,
            "role": req.role,
        })),
    ))
}
