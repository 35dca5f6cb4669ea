//! Storage traits for the authorization core.
//!
//! App state holds these as trait objects so the Postgres implementation
//! ([`super::Database`]) can be swapped for the in-memory one
//! ([`super::MemoryStore`]) in tests.

use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{
    CreateClassRequest, Membership, MembershipEntry, NurseryClass, Organization, Principal, Role,
    Session, UpdateClassRequest,
};
use service_core::error::AppError;

/// Generate an opaque session token and the hash it is stored under.
/// Only the hash ever touches durable storage.
pub fn generate_session_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    (raw.clone(), hash_session_token(&raw))
}

/// Hash a raw session token for storage or lookup.
pub fn hash_session_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Durable session state. Expiry is enforced here, not by callers: a lookup
/// for an expired token behaves exactly like a miss.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for a principal. Returns the session and the raw
    /// bearer token (the store keeps only the hash).
    async fn create_session(&self, principal_id: Uuid) -> Result<(Session, String), AppError>;

    /// Look up a live session by raw token. Unknown and expired tokens both
    /// yield `None`; a hit slides the expiry window forward.
    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError>;

    /// Invalidate a session. Idempotent.
    async fn invalidate_session(&self, token: &str) -> Result<(), AppError>;

    /// Bind the session's active organization. Fails `Unauthorized` for an
    /// unknown/expired token and `Forbidden` when the principal is not a
    /// member of the target organization.
    async fn set_active_organization(
        &self,
        token: &str,
        organization_id: Uuid,
    ) -> Result<Session, AppError>;
}

/// Principal and membership reads (plus the minimal writes the HTTP surface
/// needs to bring tenants into existence).
#[async_trait]
pub trait Directory: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    async fn find_principal_by_id(&self, principal_id: Uuid)
        -> Result<Option<Principal>, AppError>;

    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, AppError>;

    /// Create a principal. Fails `Conflict` on a duplicate email.
    async fn create_principal(&self, principal: &Principal) -> Result<(), AppError>;

    /// Memberships for a principal, joined with their organizations,
    /// ordered by membership creation time ascending. Stable across calls.
    async fn list_memberships(&self, principal_id: Uuid)
        -> Result<Vec<MembershipEntry>, AppError>;

    /// Role held by a principal in one organization, if any.
    async fn membership_role(
        &self,
        principal_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<Role>, AppError>;

    /// Create an organization and its owner membership atomically.
    async fn create_organization(&self, org: &Organization) -> Result<(), AppError>;

    /// Add a membership. Fails `Conflict` when the (principal, organization)
    /// pair already exists.
    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError>;

    /// Default active organization: the sole membership when exactly one
    /// exists, `None` for zero or many. Never guesses among several -
    /// callers must then ask for an explicit organization id.
    async fn resolve_default_organization(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<MembershipEntry>, AppError> {
        let mut memberships = self.list_memberships(principal_id).await?;
        if memberships.len() == 1 {
            Ok(memberships.pop())
        } else {
            Ok(None)
        }
    }
}

/// Tenant-scoped class storage. Every method takes the active organization
/// id; rows outside that organization are invisible.
#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn list_classes(&self, org_id: Uuid) -> Result<Vec<NurseryClass>, AppError>;

    async fn find_class(
        &self,
        org_id: Uuid,
        class_id: Uuid,
    ) -> Result<Option<NurseryClass>, AppError>;

    async fn create_class(
        &self,
        org_id: Uuid,
        req: &CreateClassRequest,
    ) -> Result<NurseryClass, AppError>;

    async fn update_class(
        &self,
        org_id: Uuid,
        class_id: Uuid,
        req: &UpdateClassRequest,
    ) -> Result<Option<NurseryClass>, AppError>;

    /// Delete a class. Returns whether a row in this organization matched.
    async fn delete_class(&self, org_id: Uuid, class_id: Uuid) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_is_stable_and_distinct_from_raw() {
        let (raw, hash) = generate_session_token();
        assert_ne!(raw, hash);
        assert_eq!(hash, hash_session_token(&raw));
    }

    #[test]
    fn test_tokens_are_unique() {
        let (a, _) = generate_session_token();
        let (b, _) = generate_session_token();
        assert_ne!(a, b);
    }
}
