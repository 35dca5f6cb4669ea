//! Organization model - the tenant boundary. All nursery data (classes,
//! children, posts) is scoped to exactly one organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Organization entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub org_id: Uuid,
    pub org_name: String,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization.
    pub fn new(org_name: String, created_by: Uuid) -> Self {
        Self {
            org_id: Uuid::new_v4(),
            org_name,
            created_by,
            created_utc: Utc::now(),
        }
    }
}

/// Request to create an organization.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

/// Request to switch the session's active organization.
#[derive(Debug, Deserialize)]
pub struct SelectOrganizationRequest {
    pub organization_id: Uuid,
}

/// Organization response for API.
#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub org_id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(o: Organization) -> Self {
        Self {
            org_id: o.org_id,
            name: o.org_name,
            created_utc: o.created_utc,
        }
    }
}
