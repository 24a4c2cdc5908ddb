//! PostgreSQL implementation of [`AccessStore`].
//!
//! Queries are runtime-bound. The masquerade invariants live in the schema:
//! a partial unique index on `(super_admin_id) WHERE is_active` serializes
//! concurrent starts, and `end_*` statements are guarded by `is_active` so a
//! race between an operator end and the expiry sweep collapses into one
//! transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{
    MasqueradeSession, MemberState, OrgStatus, Organization, OrganizationMembership,
    PermissionRule, Role, SecurityEvent,
};

use super::{AccessStore, StoreError, StoreResult};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

#[derive(Debug, FromRow)]
struct OrganizationRow {
    organization_id: Uuid,
    org_label: String,
    org_status: String,
    created_utc: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_model(self) -> Option<Organization> {
        let org_status: OrgStatus = match self.org_status.parse() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(organization_id = %self.organization_id, error = %e, "Skipping organization row with invalid status");
                return None;
            }
        };
        Some(Organization {
            organization_id: self.organization_id,
            org_label: self.org_label,
            org_status,
            created_utc: self.created_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    membership_id: Uuid,
    user_id: Uuid,
    organization_id: Uuid,
    member_role: String,
    member_state: String,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl MembershipRow {
    /// Rows whose role or state string falls outside the closed sets are
    /// treated as absent (deny), never guessed at.
    fn into_model(self) -> Option<OrganizationMembership> {
        let role: Role = match self.member_role.parse() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    organization_id = %self.organization_id,
                    error = %e,
                    "Skipping membership row with unknown role"
                );
                return None;
            }
        };
        let state: MemberState = match self.member_state.parse() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "Skipping membership row with unknown state");
                return None;
            }
        };
        Some(OrganizationMembership {
            membership_id: self.membership_id,
            user_id: self.user_id,
            organization_id: self.organization_id,
            role,
            state,
            created_utc: self.created_utc,
            updated_utc: self.updated_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct RuleRow {
    member_role: String,
    resource_type: String,
    can_view: bool,
    can_create: bool,
    can_edit: bool,
    can_delete: bool,
    updated_utc: DateTime<Utc>,
}

impl RuleRow {
    fn into_model(self) -> Option<PermissionRule> {
        let role: Role = match self.member_role.parse() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping permission rule row with unknown role");
                return None;
            }
        };
        Some(PermissionRule {
            role,
            resource_type: self.resource_type,
            can_view: self.can_view,
            can_create: self.can_create,
            can_edit: self.can_edit,
            can_delete: self.can_delete,
            updated_utc: self.updated_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    session_id: Uuid,
    super_admin_id: Uuid,
    target_user_id: Uuid,
    target_organization_id: Uuid,
    token_hash: String,
    started_utc: DateTime<Utc>,
    expires_utc: DateTime<Utc>,
    ended_utc: Option<DateTime<Utc>>,
    is_active: bool,
}

impl From<SessionRow> for MasqueradeSession {
    fn from(r: SessionRow) -> Self {
        MasqueradeSession {
            session_id: r.session_id,
            super_admin_id: r.super_admin_id,
            target_user_id: r.target_user_id,
            target_organization_id: r.target_organization_id,
            token_hash: r.token_hash,
            started_utc: r.started_utc,
            expires_utc: r.expires_utc,
            ended_utc: r.ended_utc,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    event_id: Uuid,
    event_type_code: String,
    actor_user_id: Option<Uuid>,
    target_user_id: Option<Uuid>,
    organization_id: Option<Uuid>,
    detail: Option<serde_json::Value>,
    system_initiated: bool,
    created_utc: DateTime<Utc>,
}

impl From<EventRow> for SecurityEvent {
    fn from(r: EventRow) -> Self {
        SecurityEvent {
            event_id: r.event_id,
            event_type_code: r.event_type_code,
            actor_user_id: r.actor_user_id,
            target_user_id: r.target_user_id,
            organization_id: r.organization_id,
            detail: r.detail,
            system_initiated: r.system_initiated,
            created_utc: r.created_utc,
        }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations (organization_id, org_label, org_status, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(org.organization_id)
        .bind(&org.org_label)
        .bind(org.org_status.as_str())
        .bind(org.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn find_organization(&self, organization_id: Uuid) -> StoreResult<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT * FROM organizations WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.and_then(OrganizationRow::into_model))
    }

    async fn insert_membership(&self, membership: &OrganizationMembership) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organization_members
                (membership_id, user_id, organization_id, member_role, member_state,
                 created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(membership.membership_id)
        .bind(membership.user_id)
        .bind(membership.organization_id)
        .bind(membership.role.as_str())
        .bind(membership.state.as_str())
        .bind(membership.created_utc)
        .bind(membership.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> StoreResult<Option<OrganizationMembership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            "SELECT * FROM organization_members WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.and_then(MembershipRow::into_model))
    }

    async fn list_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            "SELECT * FROM organization_members WHERE user_id = $1 ORDER BY created_utc",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows
            .into_iter()
            .filter_map(MembershipRow::into_model)
            .collect())
    }

    async fn update_member_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: Role,
    ) -> StoreResult<OrganizationMembership> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            UPDATE organization_members
            SET member_role = $3, updated_utc = now()
            WHERE user_id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.and_then(MembershipRow::into_model)
            .ok_or(StoreError::RowNotFound)
    }

    async fn grant_super_admin(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO super_admins (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn is_super_admin(&self, user_id: Uuid) -> StoreResult<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM super_admins WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.is_some())
    }

    async fn find_rule(
        &self,
        role: Role,
        resource_type: &str,
    ) -> StoreResult<Option<PermissionRule>> {
        let row = sqlx::query_as::<_, RuleRow>(
            "SELECT * FROM permission_rules WHERE member_role = $1 AND resource_type = $2",
        )
        .bind(role.as_str())
        .bind(resource_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.and_then(RuleRow::into_model))
    }

    async fn upsert_rule(&self, rule: &PermissionRule) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permission_rules
                (member_role, resource_type, can_view, can_create, can_edit, can_delete, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (member_role, resource_type) DO UPDATE SET
                can_view = EXCLUDED.can_view,
                can_create = EXCLUDED.can_create,
                can_edit = EXCLUDED.can_edit,
                can_delete = EXCLUDED.can_delete,
                updated_utc = now()
            "#,
        )
        .bind(rule.role.as_str())
        .bind(&rule.resource_type)
        .bind(rule.can_view)
        .bind(rule.can_create)
        .bind(rule.can_edit)
        .bind(rule.can_delete)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn list_rules(&self) -> StoreResult<Vec<PermissionRule>> {
        let rows = sqlx::query_as::<_, RuleRow>(
            "SELECT * FROM permission_rules ORDER BY member_role, resource_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().filter_map(RuleRow::into_model).collect())
    }

    async fn insert_session(&self, session: &MasqueradeSession) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO masquerade_sessions
                (session_id, super_admin_id, target_user_id, target_organization_id,
                 token_hash, started_utc, expires_utc, ended_utc, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.session_id)
        .bind(session.super_admin_id)
        .bind(session.target_user_id)
        .bind(session.target_organization_id)
        .bind(&session.token_hash)
        .bind(session.started_utc)
        .bind(session.expires_utc)
        .bind(session.ended_utc)
        .bind(session.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<MasqueradeSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM masquerade_sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(MasqueradeSession::from))
    }

    async fn end_session_by_token_hash(
        &self,
        token_hash: &str,
        ended_utc: DateTime<Utc>,
    ) -> StoreResult<Option<MasqueradeSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE masquerade_sessions
            SET is_active = FALSE, ended_utc = $2
            WHERE token_hash = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(token_hash)
        .bind(ended_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(MasqueradeSession::from))
    }

    async fn end_expired_sessions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<MasqueradeSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE masquerade_sessions
            SET is_active = FALSE, ended_utc = $1
            WHERE is_active AND expires_utc <= $1
            RETURNING *
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(MasqueradeSession::from).collect())
    }

    async fn insert_event(&self, event: &SecurityEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_events
                (event_id, event_type_code, actor_user_id, target_user_id,
                 organization_id, detail, system_initiated, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.event_id)
        .bind(&event.event_type_code)
        .bind(event.actor_user_id)
        .bind(event.target_user_id)
        .bind(event.organization_id)
        .bind(&event.detail)
        .bind(event.system_initiated)
        .bind(event.created_utc)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn list_events(
        &self,
        organization_id: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<SecurityEvent>> {
        let rows = match organization_id {
            Some(org_id) => {
                sqlx::query_as::<_, EventRow>(
                    r#"
                    SELECT * FROM security_events
                    WHERE organization_id = $1
                    ORDER BY created_utc DESC
                    LIMIT $2
                    "#,
                )
                .bind(org_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, EventRow>(
                    "SELECT * FROM security_events ORDER BY created_utc DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(backend)?;
        Ok(rows.into_iter().map(SecurityEvent::from).collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
