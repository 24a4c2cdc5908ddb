//! Organization membership model - the role registry rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// Invitation/confirmation state of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberState {
    Invited,
    Confirmed,
}

impl MemberState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberState::Invited => "invited",
            MemberState::Confirmed => "confirmed",
        }
    }
}

impl std::str::FromStr for MemberState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invited" => Ok(MemberState::Invited),
            "confirmed" => Ok(MemberState::Confirmed),
            other => Err(format!("unknown member state: {other}")),
        }
    }
}

/// Binds a user to an organization with exactly one role.
///
/// Invariant: (user_id, organization_id) is unique; removing the row is the
/// soft-revocation path and equals losing all access in that organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
    pub state: MemberState,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl OrganizationMembership {
    /// Create a membership in the invited state.
    pub fn new(user_id: Uuid, organization_id: Uuid, role: Role) -> Self {
        let now = Utc::now();
        Self {
            membership_id: Uuid::new_v4(),
            user_id,
            organization_id,
            role,
            state: MemberState::Invited,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Create a membership that is already confirmed.
    pub fn confirmed(user_id: Uuid, organization_id: Uuid, role: Role) -> Self {
        let mut m = Self::new(user_id, organization_id, role);
        m.state = MemberState::Confirmed;
        m
    }
}

/// Membership response for API consumers.
#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
    pub state: MemberState,
    pub updated_utc: DateTime<Utc>,
}

impl From<OrganizationMembership> for MembershipResponse {
    fn from(m: OrganizationMembership) -> Self {
        Self {
            user_id: m.user_id,
            organization_id: m.organization_id,
            role: m.role,
            state: m.state,
            updated_utc: m.updated_utc,
        }
    }
}
