//! In-memory storage backend.
//!
//! Backs the router in integration tests and local experiments where a
//! PostgreSQL instance is unavailable. Behavior mirrors [`Database`]
//! exactly, including sliding session expiry and conflict handling.
//!
//! [`Database`]: crate::services::Database

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    CreateClassRequest, Membership, MembershipEntry, NurseryClass, Organization, Principal, Role,
    Session, UpdateClassRequest,
};
use crate::services::store::{
    generate_session_token, hash_session_token, ClassStore, Directory, SessionStore,
};
use service_core::error::AppError;

#[derive(Default)]
struct Inner {
    principals: HashMap<Uuid, Principal>,
    // Keyed by token hash, same as the sessions table index.
    sessions: HashMap<String, Session>,
    organizations: HashMap<Uuid, Organization>,
    memberships: Vec<Membership>,
    classes: HashMap<Uuid, NurseryClass>,
}

/// Thread-safe in-memory store implementing every storage trait.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    session_ttl_minutes: i64,
}

impl MemoryStore {
    pub fn new(session_ttl_minutes: i64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            session_ttl_minutes,
        }
    }

    /// Force a session past its expiry. Test helper.
    pub async fn expire_session(&self, token: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.sessions.get_mut(&hash_session_token(token)) {
            session.expiry_utc = Utc::now() - Duration::minutes(1);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, principal_id: Uuid) -> Result<(Session, String), AppError> {
        let (raw, token_hash) = generate_session_token();
        let session = Session::new(principal_id, token_hash.clone(), self.session_ttl_minutes);
        let mut inner = self.inner.lock().await;
        inner.sessions.insert(token_hash, session.clone());
        Ok((session, raw))
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let ttl = self.session_ttl_minutes;
        Ok(inner
            .sessions
            .get_mut(&hash_session_token(token))
            .filter(|session| session.expiry_utc > now)
            .map(|session| {
                session.expiry_utc = now + Duration::minutes(ttl);
                session.clone()
            }))
    }

    async fn invalidate_session(&self, token: &str) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.remove(&hash_session_token(token));
        Ok(())
    }

    async fn set_active_organization(
        &self,
        token: &str,
        organization_id: Uuid,
    ) -> Result<Session, AppError> {
        let mut inner = self.inner.lock().await;
        let token_hash = hash_session_token(token);
        let principal_id = inner
            .sessions
            .get(&token_hash)
            .filter(|session| !session.is_expired())
            .map(|session| session.principal_id)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Session not found")))?;

        let is_member = inner
            .memberships
            .iter()
            .any(|m| m.principal_id == principal_id && m.org_id == organization_id);
        if !is_member {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Not a member of the requested organization"
            )));
        }

        let session = inner
            .sessions
            .get_mut(&token_hash)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Session not found")))?;
        session.active_org_id = Some(organization_id);
        Ok(session.clone())
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_principal_by_id(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<Principal>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.principals.get(&principal_id).cloned())
    }

    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .principals
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_principal(&self, principal: &Principal) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if inner
            .principals
            .values()
            .any(|p| p.email.eq_ignore_ascii_case(&principal.email))
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Email is already registered"
            )));
        }
        inner
            .principals
            .insert(principal.principal_id, principal.clone());
        Ok(())
    }

    async fn list_memberships(
        &self,
        principal_id: Uuid,
    ) -> Result<Vec<MembershipEntry>, AppError> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<MembershipEntry> = inner
            .memberships
            .iter()
            .filter(|m| m.principal_id == principal_id)
            .filter_map(|m| {
                inner.organizations.get(&m.org_id).map(|org| MembershipEntry {
                    org_id: m.org_id,
                    org_name: org.org_name.clone(),
                    role_code: m.role_code.clone(),
                    created_utc: m.created_utc,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            a.created_utc
                .cmp(&b.created_utc)
                .then(a.org_id.cmp(&b.org_id))
        });
        Ok(entries)
    }

    async fn membership_role(
        &self,
        principal_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<Role>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .memberships
            .iter()
            .find(|m| m.principal_id == principal_id && m.org_id == org_id)
            .and_then(|m| m.role()))
    }

    async fn create_organization(&self, org: &Organization) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        inner.organizations.insert(org.org_id, org.clone());
        inner
            .memberships
            .push(Membership::new(org.created_by, org.org_id, Role::Owner));
        Ok(())
    }

    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if inner
            .memberships
            .iter()
            .any(|m| m.principal_id == membership.principal_id && m.org_id == membership.org_id)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Principal is already a member of this organization"
            )));
        }
        inner.memberships.push(membership.clone());
        Ok(())
    }
}

#[async_trait]
impl ClassStore for MemoryStore {
    async fn list_classes(&self, org_id: Uuid) -> Result<Vec<NurseryClass>, AppError> {
        let inner = self.inner.lock().await;
        let mut classes: Vec<NurseryClass> = inner
            .classes
            .values()
            .filter(|c| c.org_id == org_id)
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.created_utc.cmp(&b.created_utc));
        Ok(classes)
    }

    async fn find_class(
        &self,
        org_id: Uuid,
        class_id: Uuid,
    ) -> Result<Option<NurseryClass>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .classes
            .get(&class_id)
            .filter(|c| c.org_id == org_id)
            .cloned())
    }

    async fn create_class(
        &self,
        org_id: Uuid,
        req: &CreateClassRequest,
    ) -> Result<NurseryClass, AppError> {
        let class = NurseryClass::new(org_id, req.name.clone(), req.room.clone(), req.capacity);
        let mut inner = self.inner.lock().await;
        inner.classes.insert(class.class_id, class.clone());
        Ok(class)
    }

    async fn update_class(
        &self,
        org_id: Uuid,
        class_id: Uuid,
        req: &UpdateClassRequest,
    ) -> Result<Option<NurseryClass>, AppError> {
        let mut inner = self.inner.lock().await;
        let Some(class) = inner
            .classes
            .get_mut(&class_id)
            .filter(|c| c.org_id == org_id)
        else {
            return Ok(None);
        };
        if let Some(name) = &req.name {
            class.class_name = name.clone();
        }
        if let Some(room) = &req.room {
            class.room_label = Some(room.clone());
        }
        if let Some(capacity) = req.capacity {
            class.capacity = capacity;
        }
        class.updated_utc = Utc::now();
        Ok(Some(class.clone()))
    }

    async fn delete_class(&self, org_id: Uuid, class_id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        let matched = inner
            .classes
            .get(&class_id)
            .is_some_and(|c| c.org_id == org_id);
        if matched {
            inner.classes.remove(&class_id);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(email: &str) -> Principal {
        Principal::new(email.to_string(), None, "hash".to_string())
    }

    #[tokio::test]
    async fn session_lookup_slides_expiry() {
        let store = MemoryStore::new(30);
        let (session, token) = store.create_session(Uuid::new_v4()).await.unwrap();

        let fetched = store.get_session(&token).await.unwrap().unwrap();
        assert_eq!(fetched.session_id, session.session_id);
        assert!(fetched.expiry_utc >= session.expiry_utc);
    }

    #[tokio::test]
    async fn expired_session_is_absent() {
        let store = MemoryStore::new(30);
        let (_, token) = store.create_session(Uuid::new_v4()).await.unwrap();
        store.expire_session(&token).await;

        assert!(store.get_session(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let store = MemoryStore::new(30);
        let (_, token) = store.create_session(Uuid::new_v4()).await.unwrap();

        store.invalidate_session(&token).await.unwrap();
        store.invalidate_session(&token).await.unwrap();
        assert!(store.get_session(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn selecting_foreign_organization_is_forbidden() {
        let store = MemoryStore::new(30);
        let owner = principal("owner@example.com");
        let outsider = principal("outsider@example.com");
        store.create_principal(&owner).await.unwrap();
        store.create_principal(&outsider).await.unwrap();

        let org = Organization::new("Sunnybrook".to_string(), owner.principal_id);
        store.create_organization(&org).await.unwrap();

        let (_, token) = store.create_session(outsider.principal_id).await.unwrap();
        let err = store
            .set_active_organization(&token, org.org_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = MemoryStore::new(30);
        store
            .create_principal(&principal("jo@example.com"))
            .await
            .unwrap();
        let err = store
            .create_principal(&principal("JO@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn single_membership_resolves_as_default() {
        let store = MemoryStore::new(30);
        let owner = principal("solo@example.com");
        store.create_principal(&owner).await.unwrap();
        let org = Organization::new("Acorns".to_string(), owner.principal_id);
        store.create_organization(&org).await.unwrap();

        let resolved = store
            .resolve_default_organization(owner.principal_id)
            .await
            .unwrap();
        assert_eq!(resolved.map(|e| e.org_id), Some(org.org_id));

        let second = Organization::new("Maples".to_string(), owner.principal_id);
        store.create_organization(&second).await.unwrap();
        assert!(store
            .resolve_default_organization(owner.principal_id)
            .await
            .unwrap()
            .is_none());
    }
}
