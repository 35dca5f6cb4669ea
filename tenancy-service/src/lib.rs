pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::TenancyConfig;
use crate::models::Role;
use crate::services::{AccessControlEngine, Action, ClassStore, Directory, ResourceType, SessionStore};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: TenancyConfig,
    pub sessions: Arc<dyn SessionStore>,
    pub directory: Arc<dyn Directory>,
    pub classes: Arc<dyn ClassStore>,
    pub access: Arc<AccessControlEngine>,
    pub login_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub register_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub ip_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
}

impl AppState {
    /// Check the capability table, rejecting with 403 when the role lacks
    /// the grant. Unknown pairs deny.
    pub fn authorize(
        &self,
        role: Role,
        resource: ResourceType,
        action: Action,
    ) -> Result<(), AppError> {
        if self.access.is_allowed(role, resource, action) {
            Ok(())
        } else {
            tracing::warn!(
                role = %role,
                resource = resource.as_str(),
                action = action.as_str(),
                "Access denied"
            );
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Insufficient permissions for this operation"
            )))
        }
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login and register get their own tighter limiters
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let register_limiter = state.register_rate_limiter.clone();
    let register_route = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            register_limiter,
            ip_rate_limit_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(login_route)
        .merge(register_route)
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/session", get(handlers::auth::get_session))
        .route(
            "/organizations",
            get(handlers::org::list_organizations).post(handlers::org::create_organization),
        )
        .route(
            "/organizations/select",
            post(handlers::org::select_organization),
        )
        .route("/organizations/members", post(handlers::org::add_member))
        .route(
            "/classes",
            get(handlers::classes::list_classes).post(handlers::classes::create_class),
        )
        .route(
            "/classes/:class_id",
            get(handlers::classes::get_class)
                .patch(handlers::classes::update_class)
                .delete(handlers::classes::delete_class),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::identify_request,
        ))
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Tracing layer with request correlation
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("http://localhost:3000")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        );

    Ok(app)
}

/// Service health check
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.directory.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        e
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": "up"
        }
    })))
}
