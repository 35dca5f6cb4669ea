//! Nursery class model - the representative tenant-scoped resource.
//!
//! Every read/write path filters by the requester's active organization
//! before touching a row; a class id from another tenant behaves as if it
//! does not exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Nursery class entity (organization-scoped).
#[derive(Debug, Clone, FromRow)]
pub struct NurseryClass {
    pub class_id: Uuid,
    pub org_id: Uuid,
    pub class_name: String,
    pub room_label: Option<String>,
    pub capacity: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl NurseryClass {
    /// Create a new class within an organization.
    pub fn new(org_id: Uuid, class_name: String, room_label: Option<String>, capacity: i32) -> Self {
        let now = Utc::now();
        Self {
            class_id: Uuid::new_v4(),
            org_id,
            class_name,
            room_label,
            capacity,
            created_utc: now,
            updated_utc: now,
        }
    }
}

/// Request to create a class.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,

    #[validate(length(max = 60))]
    pub room: Option<String>,

    #[validate(range(min = 1, max = 200))]
    pub capacity: i32,
}

/// Request to update a class. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClassRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,

    #[validate(length(max = 60))]
    pub room: Option<String>,

    #[validate(range(min = 1, max = 200))]
    pub capacity: Option<i32>,
}

/// Class response for API.
#[derive(Debug, Serialize)]
pub struct NurseryClassResponse {
    pub class_id: Uuid,
    pub name: String,
    pub room: Option<String>,
    pub capacity: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<NurseryClass> for NurseryClassResponse {
    fn from(c: NurseryClass) -> Self {
        Self {
            class_id: c.class_id,
            name: c.class_name,
            room: c.room_label,
            capacity: c.capacity,
            created_utc: c.created_utc,
            updated_utc: c.updated_utc,
        }
    }
}
