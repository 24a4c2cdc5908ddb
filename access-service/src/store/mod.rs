//! Storage abstraction for the access service.
//!
//! Services depend on `Arc<dyn AccessStore>` so the HTTP layer, unit tests
//! and the Postgres deployment share one contract. The store is the only
//! place where the single-active-session invariant is enforced; every
//! implementation must make `insert_session` an atomic check-and-set.

mod memory;
mod postgres;

pub use memory::MemoryAccessStore;
pub use postgres::PgAccessStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    MasqueradeSession, Organization, OrganizationMembership, PermissionRule, Role, SecurityEvent,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (e.g. a second active
    /// masquerade session for the same super-admin).
    #[error("duplicate row violates a uniqueness constraint")]
    Duplicate,

    #[error("row not found")]
    RowNotFound,

    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AccessStore: Send + Sync {
    // Organizations
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()>;
    async fn find_organization(&self, organization_id: Uuid) -> StoreResult<Option<Organization>>;

    // Role registry
    async fn insert_membership(&self, membership: &OrganizationMembership) -> StoreResult<()>;
    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> StoreResult<Option<OrganizationMembership>>;
    async fn list_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>>;
    /// Change the single role a member holds; `RowNotFound` when the user has
    /// no membership in the organization.
    async fn update_member_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: Role,
    ) -> StoreResult<OrganizationMembership>;

    // Platform super-admin grants
    async fn grant_super_admin(&self, user_id: Uuid) -> StoreResult<()>;
    async fn is_super_admin(&self, user_id: Uuid) -> StoreResult<bool>;

    // Permission matrix
    async fn find_rule(
        &self,
        role: Role,
        resource_type: &str,
    ) -> StoreResult<Option<PermissionRule>>;
    async fn upsert_rule(&self, rule: &PermissionRule) -> StoreResult<()>;
    async fn list_rules(&self) -> StoreResult<Vec<PermissionRule>>;

    // Masquerade sessions
    /// Insert a new active session. Returns `Duplicate` when the super-admin
    /// already has an active one; concurrent inserts must serialize so that
    /// exactly one wins.
    async fn insert_session(&self, session: &MasqueradeSession) -> StoreResult<()>;
    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<MasqueradeSession>>;
    /// Atomically flip `is_active` false (guarded by the current value) and
    /// set `ended_utc`. Returns the ended session, or `None` when no active
    /// session matched - the caller maps that to `NotActive`.
    async fn end_session_by_token_hash(
        &self,
        token_hash: &str,
        ended_utc: DateTime<Utc>,
    ) -> StoreResult<Option<MasqueradeSession>>;
    /// End every active session whose expiry is at or before `cutoff`,
    /// returning the sessions that were transitioned (for audit).
    async fn end_expired_sessions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<MasqueradeSession>>;

    // Security audit ledger (append-only)
    async fn insert_event(&self, event: &SecurityEvent) -> StoreResult<()>;
    async fn list_events(
        &self,
        organization_id: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<SecurityEvent>>;

    async fn health_check(&self) -> StoreResult<()>;
}
