//! Access control engine.
//!
//! Pure mapping from (role, resource type, action) to allow/deny. The
//! statement table is built once at startup and immutable afterwards, so
//! concurrent evaluation needs no synchronization. Any triple without an
//! explicit grant is denied (fail-closed).

use std::collections::{HashMap, HashSet};

use crate::models::Role;

/// Resource categories subject to access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Organization,
    Class,
}

impl ResourceType {
    pub const ALL: [ResourceType; 2] = [ResourceType::Organization, ResourceType::Class];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Organization => "organization",
            ResourceType::Class => "class",
        }
    }
}

/// Actions a role statement can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Builder for the statement table. Statements are additive: each `allow`
/// call merges into the role's grant set, so a new resource type can be
/// introduced without touching existing role statements.
#[derive(Debug, Default)]
pub struct AccessPolicyBuilder {
    grants: HashMap<Role, HashSet<(ResourceType, Action)>>,
}

impl AccessPolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `actions` on `resource` to `role`.
    pub fn allow(mut self, role: Role, resource: ResourceType, actions: &[Action]) -> Self {
        let set = self.grants.entry(role).or_default();
        for action in actions {
            set.insert((resource, *action));
        }
        self
    }

    pub fn build(self) -> AccessControlEngine {
        AccessControlEngine {
            grants: self.grants,
        }
    }
}

/// Immutable statement table evaluated per request.
#[derive(Debug)]
pub struct AccessControlEngine {
    grants: HashMap<Role, HashSet<(ResourceType, Action)>>,
}

impl AccessControlEngine {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::new()
    }

    /// Platform default policy.
    ///
    /// Owner holds every grant admin holds, admin every grant member holds.
    /// Member is read-only; only owners may delete an organization.
    pub fn platform_defaults() -> Self {
        Self::builder()
            .allow(Role::Member, ResourceType::Organization, &[Action::Read])
            .allow(Role::Member, ResourceType::Class, &[Action::Read])
            .allow(Role::Admin, ResourceType::Organization, &[Action::Read, Action::Update])
            .allow(Role::Admin, ResourceType::Class, &Action::ALL)
            .allow(
                Role::Owner,
                ResourceType::Organization,
                &[Action::Create, Action::Read, Action::Update, Action::Delete],
            )
            .allow(Role::Owner, ResourceType::Class, &Action::ALL)
            .build()
    }

    /// Evaluate a single grant. Deterministic, no I/O.
    pub fn is_allowed(&self, role: Role, resource: ResourceType, action: Action) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|set| set.contains(&(resource, action)))
    }

    /// All grants held by a role, for introspection responses.
    pub fn grants_for(&self, role: Role) -> Vec<(ResourceType, Action)> {
        let mut grants: Vec<_> = self
            .grants
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        grants.sort_by_key(|(r, a)| (r.as_str(), a.as_str()));
        grants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deny_for_ungranted_triples() {
        let engine = AccessControlEngine::builder().build();
        for role in Role::ALL {
            for resource in ResourceType::ALL {
                for action in Action::ALL {
                    assert!(
                        !engine.is_allowed(role, resource, action),
                        "empty policy must deny {role} {resource:?} {action:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_member_is_read_only_on_classes() {
        let engine = AccessControlEngine::platform_defaults();
        assert!(engine.is_allowed(Role::Member, ResourceType::Class, Action::Read));
        assert!(!engine.is_allowed(Role::Member, ResourceType::Class, Action::Create));
        assert!(!engine.is_allowed(Role::Member, ResourceType::Class, Action::Update));
        assert!(!engine.is_allowed(Role::Member, ResourceType::Class, Action::Delete));
    }

    #[test]
    fn test_only_owner_deletes_organizations() {
        let engine = AccessControlEngine::platform_defaults();
        assert!(engine.is_allowed(Role::Owner, ResourceType::Organization, Action::Delete));
        assert!(!engine.is_allowed(Role::Admin, ResourceType::Organization, Action::Delete));
        assert!(!engine.is_allowed(Role::Member, ResourceType::Organization, Action::Delete));
    }

    #[test]
    fn test_role_monotonicity() {
        let engine = AccessControlEngine::platform_defaults();
        // owner ⊇ admin ⊇ member across every (resource, action) pair
        for resource in ResourceType::ALL {
            for action in Action::ALL {
                if engine.is_allowed(Role::Member, resource, action) {
                    assert!(engine.is_allowed(Role::Admin, resource, action));
                }
                if engine.is_allowed(Role::Admin, resource, action) {
                    assert!(engine.is_allowed(Role::Owner, resource, action));
                }
            }
        }
    }

    #[test]
    fn test_statements_merge_additively() {
        // Declaring a new resource type must not disturb existing grants.
        let base = AccessControlEngine::builder()
            .allow(Role::Member, ResourceType::Class, &[Action::Read]);
        let engine = base
            .allow(Role::Member, ResourceType::Organization, &[Action::Read])
            .build();
        assert!(engine.is_allowed(Role::Member, ResourceType::Class, Action::Read));
        assert!(engine.is_allowed(Role::Member, ResourceType::Organization, Action::Read));
        assert!(!engine.is_allowed(Role::Member, ResourceType::Class, Action::Delete));
    }
}
