use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy shared by all nestkeeper services.
///
/// Expected authorization outcomes (`Unauthorized`, `Forbidden`,
/// `AmbiguousOrganization`) are converted into response short-circuits by
/// `IntoResponse`; infrastructure failures surface as 5xx and are never
/// masked as authorization failures.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Ambiguous organization: {0}")]
    AmbiguousOrganization(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) | AppError::AmbiguousOrganization(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(..) => StatusCode::TOO_MANY_REQUESTS,
            AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Every error body carries a single `message` field, matching the
        // error shape used across the platform API.
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let status = self.status_code();

        let (message, retry_after) = match self {
            AppError::ValidationError(err) => (err.to_string(), None),
            AppError::BadRequest(err)
            | AppError::NotFound(err)
            | AppError::Unauthorized(err)
            | AppError::Forbidden(err)
            | AppError::AmbiguousOrganization(err)
            | AppError::Conflict(err) => (err.to_string(), None),
            AppError::TooManyRequests(msg, retry) => (msg, retry),
            AppError::InternalError(err) => {
                tracing::error!(error = %err, "internal server error");
                ("Internal server error".to_string(), None)
            }
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "database error");
                ("Internal server error".to_string(), None)
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "configuration error");
                ("Internal server error".to_string(), None)
            }
        };

        let mut res = (status, Json(ErrorResponse { message })).into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_outcomes_map_to_client_errors() {
        let unauthorized = AppError::Unauthorized(anyhow::anyhow!("no session"));
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);

        let forbidden = AppError::Forbidden(anyhow::anyhow!("denied"));
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let ambiguous = AppError::AmbiguousOrganization(anyhow::anyhow!("pick one"));
        assert_eq!(ambiguous.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_infrastructure_failures_are_5xx() {
        let db = AppError::DatabaseError(anyhow::anyhow!("connection refused"));
        assert_eq!(db.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
