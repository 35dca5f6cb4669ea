//! Principal model - an authenticated identity on the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Principal state codes. Principals are never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalState {
    Active,
    Deactivated,
}

impl PrincipalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalState::Active => "active",
            PrincipalState::Deactivated => "deactivated",
        }
    }
}

/// Principal entity.
#[derive(Debug, Clone, FromRow)]
pub struct Principal {
    pub principal_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub platform_admin: bool,
    pub principal_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl Principal {
    /// Create a new active principal.
    pub fn new(email: String, display_name: Option<String>, password_hash: String) -> Self {
        Self {
            principal_id: Uuid::new_v4(),
            email,
            display_name,
            password_hash,
            platform_admin: false,
            principal_state_code: PrincipalState::Active.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    /// Check if principal is active.
    pub fn is_active(&self) -> bool {
        self.principal_state_code == PrincipalState::Active.as_str()
    }
}

/// Principal without credential material, safe for API responses and
/// request context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedPrincipal {
    pub principal_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub platform_admin: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<Principal> for SanitizedPrincipal {
    fn from(p: Principal) -> Self {
        Self {
            principal_id: p.principal_id,
            email: p.email,
            display_name: p.display_name,
            platform_admin: p.platform_admin,
            created_utc: p.created_utc,
        }
    }
}

/// Request to register a principal.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(max = 120))]
    pub display_name: Option<String>,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Request to authenticate with email and password.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_principal_is_active() {
        let p = Principal::new("parent@example.org".to_string(), None, "hash".to_string());
        assert!(p.is_active());
        assert!(!p.platform_admin);
    }

    #[test]
    fn test_sanitized_principal_drops_credentials() {
        let p = Principal::new(
            "teacher@example.org".to_string(),
            Some("Ms. Rivera".to_string()),
            "$argon2id$...".to_string(),
        );
        let sanitized = SanitizedPrincipal::from(p.clone());
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(sanitized.principal_id, p.principal_id);
    }
}
