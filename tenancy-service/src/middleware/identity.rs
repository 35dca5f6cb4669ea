//! Request identification middleware and the extractors built on top of it.
//!
//! Every request passes through [`identify_request`], which resolves the
//! session cookie into a [`RequestIdentity`] and stashes it in request
//! extensions. Identification never rejects a request on its own: requests
//! without a usable session simply carry an anonymous identity, and the
//! extractors decide whether that is acceptable for the route.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::models::{Role, SanitizedPrincipal, Session};
use crate::AppState;
use service_core::error::AppError;

/// The resolved identity of an incoming request.
#[derive(Clone, Default)]
pub struct RequestIdentity {
    /// Raw session token from the cookie, kept so handlers can act on the
    /// session itself (logout, organization selection).
    pub token: Option<String>,
    pub principal: Option<SanitizedPrincipal>,
    pub session: Option<Session>,
    pub active_organization_id: Option<Uuid>,
    pub role: Option<Role>,
}

/// Resolve the session cookie into a [`RequestIdentity`].
///
/// Resolution stops at the first missing link and the request proceeds
/// anonymously: no cookie, an unknown or expired token, and a deactivated
/// principal all degrade to the same anonymous identity. Storage failures
/// are the only way this middleware rejects a request.
pub async fn identify_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(request.headers());
    let token = jar
        .get(&state.config.session.cookie_name)
        .map(|cookie| cookie.value().to_string());

    let identity = match token {
        Some(token) => resolve_identity(&state, token).await?,
        None => RequestIdentity::default(),
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

async fn resolve_identity(state: &AppState, token: String) -> Result<RequestIdentity, AppError> {
    let Some(session) = state.sessions.get_session(&token).await? else {
        tracing::debug!("Session token did not resolve; treating request as anonymous");
        return Ok(RequestIdentity::default());
    };

    let principal = state.directory.find_principal_by_id(session.principal_id).await?;
    let Some(principal) = principal.filter(|p| p.is_active()) else {
        tracing::warn!(
            principal_id = %session.principal_id,
            "Session resolved to a missing or deactivated principal"
        );
        return Ok(RequestIdentity::default());
    };

    let (active_organization_id, role) =
        resolve_active_organization(state, &token, &session).await?;

    Ok(RequestIdentity {
        token: Some(token),
        principal: Some(principal.into()),
        session: Some(session),
        active_organization_id,
        role,
    })
}

/// Determine the request's active organization and the principal's role in it.
///
/// The session's stored selection wins when the membership still exists.
/// A revoked membership clears the selection rather than failing the
/// request. With no usable selection, a principal with exactly one
/// membership adopts it automatically and the session is updated so later
/// requests skip the lookup.
async fn resolve_active_organization(
    state: &AppState,
    token: &str,
    session: &Session,
) -> Result<(Option<Uuid>, Option<Role>), AppError> {
    if let Some(org_id) = session.active_org_id {
        match state
            .directory
            .membership_role(session.principal_id, org_id)
            .await?
        {
            Some(role) => return Ok((Some(org_id), Some(role))),
            None => {
                tracing::warn!(
                    principal_id = %session.principal_id,
                    org_id = %org_id,
                    "Active organization no longer held by principal; clearing selection"
                );
            }
        }
    }

    let Some(entry) = state
        .directory
        .resolve_default_organization(session.principal_id)
        .await?
    else {
        return Ok((None, None));
    };

    state
        .sessions
        .set_active_organization(token, entry.org_id)
        .await?;
    Ok((Some(entry.org_id), entry.role()))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Extractor for routes requiring an authenticated principal.
pub struct CurrentPrincipal {
    pub principal: SanitizedPrincipal,
    pub token: String,
    pub session: Session,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = RequestIdentity::from_request_parts(parts, state).await?;
        match (identity.principal, identity.token, identity.session) {
            (Some(principal), Some(token), Some(session)) => Ok(Self {
                principal,
                token,
                session,
            }),
            _ => Err(AppError::Unauthorized(anyhow::anyhow!(
                "Authentication required"
            ))),
        }
    }
}

/// Extractor for organization-scoped routes.
///
/// Rejects anonymous requests with 401 and authenticated requests that have
/// no resolvable active organization with 400, so a caller holding several
/// memberships must select one explicitly.
pub struct ActiveOrg {
    pub principal: SanitizedPrincipal,
    pub organization_id: Uuid,
    pub role: Role,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ActiveOrg
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = RequestIdentity::from_request_parts(parts, state).await?;
        let principal = identity.principal.ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
        })?;
        match (identity.active_organization_id, identity.role) {
            (Some(organization_id), Some(role)) => Ok(Self {
                principal,
                organization_id,
                role,
            }),
            _ => Err(AppError::AmbiguousOrganization(anyhow::anyhow!(
                "No active organization selected"
            ))),
        }
    }
}
