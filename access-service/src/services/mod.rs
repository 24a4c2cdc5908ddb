//! Services layer for the access service.
//!
//! The four core components live here: the permission resolver, the
//! organization scope guard, the masquerade session manager and the security
//! audit log, all backed by one [`crate::store::AccessStore`].

mod audit;
mod context;
pub mod error;
mod masquerade;
pub mod metrics;
mod permissions;
mod scope;

pub use audit::AuditService;
pub use context::EffectiveContext;
pub use error::AccessError;
pub use masquerade::{generate_token, hash_token, MasqueradeService, StartedMasquerade};
pub use permissions::PermissionService;
pub use scope::ScopeService;
