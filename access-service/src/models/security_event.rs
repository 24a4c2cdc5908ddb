//! Security event model - the append-only audit ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Privileged actions worth a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    SessionStart,
    SessionEnd,
    PermissionDenied,
    CrossOrganizationDenied,
    RoleChanged,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::SessionStart => "session_start",
            SecurityEventType::SessionEnd => "session_end",
            SecurityEventType::PermissionDenied => "permission_denied",
            SecurityEventType::CrossOrganizationDenied => "cross_organization_denied",
            SecurityEventType::RoleChanged => "role_changed",
        }
    }
}

/// Immutable audit entry. There is no update or delete path anywhere in the
/// service; retention is an external policy.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub event_id: Uuid,
    pub event_type_code: String,
    /// The responsible actor. Under masquerade this is always the
    /// super-admin, never the assumed identity.
    pub actor_user_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub detail: Option<serde_json::Value>,
    pub system_initiated: bool,
    pub created_utc: DateTime<Utc>,
}

impl SecurityEvent {
    /// Event attributed to a user action.
    pub fn actor_action(
        event_type: SecurityEventType,
        actor_user_id: Uuid,
        target_user_id: Option<Uuid>,
        organization_id: Option<Uuid>,
        detail: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type_code: event_type.as_str().to_string(),
            actor_user_id: Some(actor_user_id),
            target_user_id,
            organization_id,
            detail,
            system_initiated: false,
            created_utc: Utc::now(),
        }
    }

    /// Event emitted by a background process (no acting user).
    pub fn system_action(
        event_type: SecurityEventType,
        target_user_id: Option<Uuid>,
        organization_id: Option<Uuid>,
        detail: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type_code: event_type.as_str().to_string(),
            actor_user_id: None,
            target_user_id,
            organization_id,
            detail,
            system_initiated: true,
            created_utc: Utc::now(),
        }
    }
}
