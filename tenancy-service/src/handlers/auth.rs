//! Registration, login, logout, and session introspection.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    middleware::{CurrentPrincipal, RequestIdentity},
    models::{LoginRequest, Principal, RegisterRequest, SanitizedPrincipal, SessionInfo},
    utils::{hash_password, verify_password, Password, PasswordHashString, ValidatedJson},
    AppState,
};
use service_core::error::AppError;

/// Register a new principal
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password_hash = hash_password(&Password::new(req.password))?;
    let principal = Principal::new(req.email, req.display_name, password_hash.into_string());

    state.directory.create_principal(&principal).await?;
    tracing::info!(principal_id = %principal.principal_id, "Principal registered");

    Ok((
        StatusCode::CREATED,
        Json(SanitizedPrincipal::from(principal)),
    ))
}

/// Login with email and password, establishing a session cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Same rejection for unknown email, wrong password, and deactivated
    // accounts so callers cannot probe which emails exist.
    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"));

    let principal = state
        .directory
        .find_principal_by_email(&req.email)
        .await?
        .filter(|p| p.is_active())
        .ok_or_else(invalid)?;

    verify_password(
        &Password::new(req.password),
        &PasswordHashString::new(principal.password_hash.clone()),
    )
    .map_err(|_| invalid())?;

    let (session, token) = state.sessions.create_session(principal.principal_id).await?;
    tracing::info!(principal_id = %principal.principal_id, "Login successful");

    let cookie = session_cookie(&state, token);
    Ok((
        jar.add(cookie),
        Json(serde_json::json!({
            "principal": SanitizedPrincipal::from(principal),
            "session": SessionInfo::from(session),
        })),
    ))
}

/// Logout, invalidating the session and clearing the cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    current: CurrentPrincipal,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.invalidate_session(&current.token).await?;

    let removal = Cookie::build((state.config.session.cookie_name.clone(), ""))
        .path("/")
        .build();
    Ok((
        jar.remove(removal),
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}

/// Introspect the current session
pub async fn get_session(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> Result<impl IntoResponse, AppError> {
    let (principal, session) = match (identity.principal, identity.session) {
        (Some(principal), Some(session)) => (principal, session),
        _ => {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Authentication required"
            )))
        }
    };

    let grants = identity.role.map(|role| {
        state
            .access
            .grants_for(role)
            .into_iter()
            .map(|(resource, action)| format!("{}:{}", resource.as_str(), action.as_str()))
            .collect::<Vec<_>>()
    });

    Ok(Json(serde_json::json!({
        "principal": principal,
        "session": SessionInfo::from(session),
        "active_organization_id": identity.active_organization_id,
        "role": identity.role,
        "grants": grants,
    })))
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((state.config.session.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.session.cookie_secure)
        .build()
}
