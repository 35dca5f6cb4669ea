//! Session model - server-tracked proof of authentication.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Session entity. The bearer token is stored only as a SHA-256 hash;
/// `active_org_id`, when set, must reference an organization the owning
/// principal is a member of.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub principal_id: Uuid,
    pub token_hash: String,
    pub active_org_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
}

impl Session {
    /// Create a new session expiring `ttl_minutes` from now.
    pub fn new(principal_id: Uuid, token_hash: String, ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            principal_id,
            token_hash,
            active_org_id: None,
            created_utc: now,
            expiry_utc: now + Duration::minutes(ttl_minutes),
        }
    }

    /// Check if session has lapsed.
    pub fn is_expired(&self) -> bool {
        self.expiry_utc <= Utc::now()
    }
}

/// Session info for API responses.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub active_organization_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(s: Session) -> Self {
        Self {
            session_id: s.session_id,
            active_organization_id: s.active_org_id,
            created_utc: s.created_utc,
            expiry_utc: s.expiry_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_not_expired() {
        let s = Session::new(Uuid::new_v4(), "hash".to_string(), 60);
        assert!(!s.is_expired());
        assert!(s.active_org_id.is_none());
    }

    #[test]
    fn test_session_expiry() {
        let mut s = Session::new(Uuid::new_v4(), "hash".to_string(), 60);
        s.expiry_utc = Utc::now() - Duration::minutes(1);
        assert!(s.is_expired());
    }
}
