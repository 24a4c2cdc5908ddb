//! Role and operation enums - the closed vocabulary of the permission matrix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organization-scoped role. The set is closed; role strings from storage or
/// requests that fall outside it never resolve to a role (and therefore deny).
///
/// The platform-level super-admin grant is tracked separately from
/// organization membership and is deliberately not a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Administrator,
    Reception,
    RegisteredNurse,
    Caregiver,
    Staff,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Owner,
        Role::Admin,
        Role::Administrator,
        Role::Reception,
        Role::RegisteredNurse,
        Role::Caregiver,
        Role::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Administrator => "administrator",
            Role::Reception => "reception",
            Role::RegisteredNurse => "registered_nurse",
            Role::Caregiver => "caregiver",
            Role::Staff => "staff",
        }
    }

    /// The owner role is the organization's structural authority and bypasses
    /// the permission matrix entirely.
    pub fn is_owner(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "administrator" => Ok(Role::Administrator),
            "reception" => Ok(Role::Reception),
            "registered_nurse" => Ok(Role::RegisteredNurse),
            "caregiver" => Ok(Role::Caregiver),
            "staff" => Ok(Role::Staff),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

/// The four operations a permission rule can grant on a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    View,
    Create,
    Edit,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::View,
        Operation::Create,
        Operation::Edit,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::View => "view",
            Operation::Create => "create",
            Operation::Edit => "edit",
            Operation::Delete => "delete",
        }
    }
}

impl FromStr for Operation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Operation::View),
            "create" => Ok(Operation::Create),
            "edit" => Ok(Operation::Edit),
            "delete" => Ok(Operation::Delete),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
