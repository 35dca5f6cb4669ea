//! Membership model - principal→organization binding with exactly one role.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Role;

/// Membership row. Unique on (principal_id, org_id): a principal cannot
/// hold two roles in the same organization.
#[derive(Debug, Clone, FromRow)]
pub struct Membership {
    pub principal_id: Uuid,
    pub org_id: Uuid,
    pub role_code: String,
    pub created_utc: DateTime<Utc>,
}

impl Membership {
    /// Create a new membership.
    pub fn new(principal_id: Uuid, org_id: Uuid, role: Role) -> Self {
        Self {
            principal_id,
            org_id,
            role_code: role.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    /// Parse the stored role code. Unknown codes are treated as absent
    /// grants rather than panics.
    pub fn role(&self) -> Option<Role> {
        self.role_code.parse().ok()
    }
}

/// Membership joined with its organization, as produced by
/// `list_memberships` (ordered by membership creation time ascending).
#[derive(Debug, Clone, FromRow)]
pub struct MembershipEntry {
    pub org_id: Uuid,
    pub org_name: String,
    pub role_code: String,
    pub created_utc: DateTime<Utc>,
}

impl MembershipEntry {
    pub fn role(&self) -> Option<Role> {
        self.role_code.parse().ok()
    }
}

/// Request to add a principal to the active organization.
#[derive(Debug, serde::Deserialize, validator::Validate)]
pub struct AddMemberRequest {
    #[validate(email)]
    pub email: String,

    pub role: Role,
}

/// Membership summary for API responses.
#[derive(Debug, Serialize)]
pub struct MembershipSummary {
    pub org_id: Uuid,
    pub org_name: String,
    pub role: Role,
    pub created_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_role_parsing() {
        let m = Membership::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        assert_eq!(m.role(), Some(Role::Admin));
    }

    #[test]
    fn test_unknown_role_code_yields_no_grant() {
        let mut m = Membership::new(Uuid::new_v4(), Uuid::new_v4(), Role::Member);
        m.role_code = "janitor".to_string();
        assert_eq!(m.role(), None);
    }
}
