//! Permission rule model - one cell row of the (role, resource type) matrix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::{Operation, Role};

/// Allowed operations for a (role, resource type) pair.
///
/// Absence of a rule means every flag is false; the resolver never infers a
/// grant from a missing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRule {
    pub role: Role,
    pub resource_type: String,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub updated_utc: DateTime<Utc>,
}

impl PermissionRule {
    pub fn new(
        role: Role,
        resource_type: impl Into<String>,
        can_view: bool,
        can_create: bool,
        can_edit: bool,
        can_delete: bool,
    ) -> Self {
        Self {
            role,
            resource_type: resource_type.into(),
            can_view,
            can_create,
            can_edit,
            can_delete,
            updated_utc: Utc::now(),
        }
    }

    /// Whether this rule grants the given operation.
    pub fn allows(&self, operation: Operation) -> bool {
        match operation {
            Operation::View => self.can_view,
            Operation::Create => self.can_create,
            Operation::Edit => self.can_edit,
            Operation::Delete => self.can_delete,
        }
    }
}
