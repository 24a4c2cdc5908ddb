//! In-memory implementation of [`AccessStore`] for tests and local runs.
//!
//! All state sits behind one mutex, which gives the same serialized
//! check-and-set semantics the Postgres schema enforces with its partial
//! unique index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    MasqueradeSession, Organization, OrganizationMembership, PermissionRule, Role, SecurityEvent,
};

use super::{AccessStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    organizations: HashMap<Uuid, Organization>,
    // keyed by (user_id, organization_id) - the registry invariant
    memberships: HashMap<(Uuid, Uuid), OrganizationMembership>,
    super_admins: HashSet<Uuid>,
    rules: HashMap<(Role, String), PermissionRule>,
    sessions: Vec<MasqueradeSession>,
    events: Vec<SecurityEvent>,
}

#[derive(Default)]
pub struct MemoryAccessStore {
    inner: Mutex<Inner>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only happens after a panic in a test; propagating
        // the panic is the right behavior there.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.organizations.contains_key(&org.organization_id) {
            return Err(StoreError::Duplicate);
        }
        inner.organizations.insert(org.organization_id, org.clone());
        Ok(())
    }

    async fn find_organization(&self, organization_id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.lock().organizations.get(&organization_id).cloned())
    }

    async fn insert_membership(&self, membership: &OrganizationMembership) -> StoreResult<()> {
        let mut inner = self.lock();
        let key = (membership.user_id, membership.organization_id);
        if inner.memberships.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        inner.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> StoreResult<Option<OrganizationMembership>> {
        Ok(self
            .lock()
            .memberships
            .get(&(user_id, organization_id))
            .cloned())
    }

    async fn list_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>> {
        let inner = self.lock();
        let mut memberships: Vec<_> = inner
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| m.created_utc);
        Ok(memberships)
    }

    async fn update_member_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: Role,
    ) -> StoreResult<OrganizationMembership> {
        let mut inner = self.lock();
        match inner.memberships.get_mut(&(user_id, organization_id)) {
            Some(m) => {
                m.role = role;
                m.updated_utc = Utc::now();
                Ok(m.clone())
            }
            None => Err(StoreError::RowNotFound),
        }
    }

    async fn grant_super_admin(&self, user_id: Uuid) -> StoreResult<()> {
        self.lock().super_admins.insert(user_id);
        Ok(())
    }

    async fn is_super_admin(&self, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.lock().super_admins.contains(&user_id))
    }

    async fn find_rule(
        &self,
        role: Role,
        resource_type: &str,
    ) -> StoreResult<Option<PermissionRule>> {
        Ok(self
            .lock()
            .rules
            .get(&(role, resource_type.to_string()))
            .cloned())
    }

    async fn upsert_rule(&self, rule: &PermissionRule) -> StoreResult<()> {
        self.lock()
            .rules
            .insert((rule.role, rule.resource_type.clone()), rule.clone());
        Ok(())
    }

    async fn list_rules(&self) -> StoreResult<Vec<PermissionRule>> {
        let inner = self.lock();
        let mut rules: Vec<_> = inner.rules.values().cloned().collect();
        rules.sort_by(|a, b| {
            (a.role.as_str(), &a.resource_type).cmp(&(b.role.as_str(), &b.resource_type))
        });
        Ok(rules)
    }

    async fn insert_session(&self, session: &MasqueradeSession) -> StoreResult<()> {
        let mut inner = self.lock();
        // Check-and-set under the lock: one active session per super-admin.
        let already_active = inner
            .sessions
            .iter()
            .any(|s| s.super_admin_id == session.super_admin_id && s.is_active);
        if already_active {
            return Err(StoreError::Duplicate);
        }
        if inner
            .sessions
            .iter()
            .any(|s| s.token_hash == session.token_hash)
        {
            return Err(StoreError::Duplicate);
        }
        inner.sessions.push(session.clone());
        Ok(())
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<MasqueradeSession>> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn end_session_by_token_hash(
        &self,
        token_hash: &str,
        ended_utc: DateTime<Utc>,
    ) -> StoreResult<Option<MasqueradeSession>> {
        let mut inner = self.lock();
        match inner
            .sessions
            .iter_mut()
            .find(|s| s.token_hash == token_hash && s.is_active)
        {
            Some(s) => {
                s.is_active = false;
                s.ended_utc = Some(ended_utc);
                Ok(Some(s.clone()))
            }
            None => Ok(None),
        }
    }

    async fn end_expired_sessions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<MasqueradeSession>> {
        let mut inner = self.lock();
        let mut ended = Vec::new();
        for s in inner
            .sessions
            .iter_mut()
            .filter(|s| s.is_active && s.expires_utc <= cutoff)
        {
            s.is_active = false;
            s.ended_utc = Some(cutoff);
            ended.push(s.clone());
        }
        Ok(ended)
    }

    async fn insert_event(&self, event: &SecurityEvent) -> StoreResult<()> {
        self.lock().events.push(event.clone());
        Ok(())
    }

    async fn list_events(
        &self,
        organization_id: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<SecurityEvent>> {
        let inner = self.lock();
        let mut events: Vec<_> = inner
            .events
            .iter()
            .filter(|e| organization_id.is_none() || e.organization_id == organization_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
