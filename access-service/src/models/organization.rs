//! Organization model - the tenant boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgStatus {
    Active,
    Suspended,
}

impl OrgStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgStatus::Active => "active",
            OrgStatus::Suspended => "suspended",
        }
    }
}

impl std::str::FromStr for OrgStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OrgStatus::Active),
            "suspended" => Ok(OrgStatus::Suspended),
            other => Err(format!("unknown org status: {other}")),
        }
    }
}

/// Organization entity. Domain records (patients, invoices, ...) live in
/// other services and carry this id as their tenant key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: Uuid,
    pub org_label: String,
    pub org_status: OrgStatus,
    pub created_utc: DateTime<Utc>,
}

impl Organization {
    pub fn new(org_label: String) -> Self {
        Self {
            organization_id: Uuid::new_v4(),
            org_label,
            org_status: OrgStatus::Active,
            created_utc: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.org_status == OrgStatus::Active
    }
}
