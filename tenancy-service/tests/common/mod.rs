//! Test helpers for tenancy-service integration tests.
//!
//! Routes requests through the full router with the in-memory store, so
//! middleware, extractors, and handlers are exercised without PostgreSQL.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use service_core::config::Config as CoreConfig;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use tenancy_service::config::{
    DatabaseConfig, Environment, RateLimitConfig, SecurityConfig, SessionConfig, TenancyConfig,
};
use tenancy_service::services::{AccessControlEngine, MemoryStore};
use tenancy_service::{build_router, AppState};

pub const COOKIE_NAME: &str = "nestkeeper_session";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

fn test_config() -> TenancyConfig {
    TenancyConfig {
        common: CoreConfig { port: 0 },
        environment: Environment::Dev,
        service_name: "tenancy-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        session: SessionConfig {
            cookie_name: COOKIE_NAME.to_string(),
            ttl_minutes: 30,
            cookie_secure: false,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            register_attempts: 1000,
            register_window_seconds: 60,
            global_ip_limit: 10000,
            global_ip_window_seconds: 60,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new(30));
        let config = test_config();

        let state = AppState {
            config,
            sessions: store.clone(),
            directory: store.clone(),
            classes: store.clone(),
            access: Arc::new(AccessControlEngine::platform_defaults()),
            login_rate_limiter: create_ip_rate_limiter(1000, 60),
            register_rate_limiter: create_ip_rate_limiter(1000, 60),
            ip_rate_limiter: create_ip_rate_limiter(10000, 60),
        };

        let router = build_router(state).await.expect("Failed to build router");
        Self { router, store }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{}={}", COOKIE_NAME, token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response<Body> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    /// Register a principal, asserting success.
    pub async fn register(&self, email: &str, password: &str) {
        let response = self
            .post(
                "/auth/register",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    /// Login and return the raw session token from the cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_token(&response).expect("Login response missing session cookie")
    }

    /// Create an organization, returning its id. The caller's session
    /// switches to the new organization.
    pub async fn create_organization(&self, token: &str, name: &str) -> String {
        let response = self
            .post(
                "/organizations",
                Some(token),
                serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = read_json(response).await;
        body["org_id"].as_str().expect("Missing org_id").to_string()
    }
}

/// Collect a response body as JSON.
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body was not valid JSON")
}

/// Pull the session token out of a Set-Cookie header.
pub fn session_token(response: &Response<Body>) -> Option<String> {
    let header = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    (name == COOKIE_NAME && !value.is_empty()).then(|| value.to_string())
}
