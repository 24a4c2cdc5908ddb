use service_core::error::AppError;
use thiserror::Error;

use crate::store::StoreError;

/// Typed outcomes of authorization and masquerade operations.
///
/// These are expected, recoverable results; none of them is allowed to fail
/// open. Storage faults are a distinct variant so callers can tell a denial
/// from "cannot determine", but both must behave as deny.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("No valid identity or session")]
    Unauthorized,

    #[error("Permission denied")]
    Forbidden,

    #[error("An active masquerade session already exists; end it first")]
    AlreadyActive,

    #[error("No active masquerade session to end")]
    NotActive,

    #[error("Masquerade target is missing or cannot be impersonated")]
    InvalidTarget,

    #[error("A super-admin cannot impersonate themselves")]
    SelfImpersonation,

    #[error("Resource belongs to a different organization")]
    CrossOrganization,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AccessError::AlreadyActive,
            StoreError::RowNotFound => AccessError::NotFound("record"),
            StoreError::Backend(e) => AccessError::Storage(e),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized => {
                AppError::Unauthorized(anyhow::anyhow!("No valid identity or session"))
            }
            AccessError::Forbidden => AppError::Forbidden(anyhow::anyhow!("Permission denied")),
            AccessError::AlreadyActive => AppError::Conflict(anyhow::anyhow!(
                "An active masquerade session already exists; end it first"
            )),
            AccessError::NotActive => {
                AppError::Conflict(anyhow::anyhow!("No active masquerade session to end"))
            }
            AccessError::InvalidTarget => AppError::ValidationError(
                "Masquerade target is missing or cannot be impersonated".to_string(),
            ),
            AccessError::SelfImpersonation => AppError::ValidationError(
                "A super-admin cannot impersonate themselves".to_string(),
            ),
            AccessError::CrossOrganization => AppError::Forbidden(anyhow::anyhow!(
                "Resource belongs to a different organization"
            )),
            AccessError::NotFound(what) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", what))
            }
            AccessError::Storage(e) => AppError::DatabaseError(e),
        }
    }
}
