//! Domain models for the access service.

pub mod masquerade_session;
pub mod membership;
pub mod organization;
pub mod permission_rule;
pub mod role;
pub mod security_event;

pub use masquerade_session::{EndReason, MasqueradeSession};
pub use membership::{MemberState, MembershipResponse, OrganizationMembership};
pub use organization::{OrgStatus, Organization};
pub use permission_rule::PermissionRule;
pub use role::{Operation, Role, UnknownRole};
pub use security_event::{SecurityEvent, SecurityEventType};
