//! Masquerade session manager - controlled impersonation for support work.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{EndReason, MasqueradeSession, SecurityEvent, SecurityEventType};
use crate::services::audit::AuditService;
use crate::services::error::AccessError;
use crate::store::{AccessStore, StoreError};

/// Result of a successful `start`: the only place the raw token ever exists.
#[derive(Debug)]
pub struct StartedMasquerade {
    pub session_id: Uuid,
    pub session_token: String,
    pub expires_utc: DateTime<Utc>,
}

/// Drives the per-super-admin `Idle -> Active -> Ended` state machine.
///
/// `Active -> Active` does not exist: starting while a session is active is
/// an `AlreadyActive` failure, never an implicit replacement. Sessions are
/// never deleted; ending is the one permitted mutation.
#[derive(Clone)]
pub struct MasqueradeService {
    store: Arc<dyn AccessStore>,
    audit: AuditService,
    session_ttl: Duration,
}

impl MasqueradeService {
    pub fn new(store: Arc<dyn AccessStore>, audit: AuditService, session_ttl: Duration) -> Self {
        Self {
            store,
            audit,
            session_ttl,
        }
    }

    /// Begin impersonating `target_user_id` inside `target_organization_id`.
    ///
    /// The super-admin grant is verified against the registry, never trusted
    /// from the request. The target must hold a membership in the target
    /// organization and must not itself be a super-admin (no chaining).
    pub async fn start(
        &self,
        super_admin_id: Uuid,
        target_user_id: Uuid,
        target_organization_id: Uuid,
    ) -> Result<StartedMasquerade, AccessError> {
        if !self
            .store
            .is_super_admin(super_admin_id)
            .await
            .map_err(AccessError::from)?
        {
            return Err(AccessError::Unauthorized);
        }
        if target_user_id == super_admin_id {
            return Err(AccessError::SelfImpersonation);
        }
        if self
            .store
            .is_super_admin(target_user_id)
            .await
            .map_err(AccessError::from)?
        {
            return Err(AccessError::InvalidTarget);
        }

        self.store
            .find_organization(target_organization_id)
            .await
            .map_err(AccessError::from)?
            .ok_or(AccessError::InvalidTarget)?;
        self.store
            .find_membership(target_user_id, target_organization_id)
            .await
            .map_err(AccessError::from)?
            .ok_or(AccessError::InvalidTarget)?;

        let token = generate_token();
        let session = MasqueradeSession::new(
            super_admin_id,
            target_user_id,
            target_organization_id,
            hash_token(&token),
            self.session_ttl,
        );

        // The storage layer serializes this check-and-set; a concurrent
        // start for the same super-admin loses with `Duplicate`.
        match self.store.insert_session(&session).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => return Err(AccessError::AlreadyActive),
            Err(e) => return Err(AccessError::from(e)),
        }

        self.audit.record(SecurityEvent::actor_action(
            SecurityEventType::SessionStart,
            super_admin_id,
            Some(target_user_id),
            Some(target_organization_id),
            Some(serde_json::json!({ "session_id": session.session_id })),
        ));

        tracing::info!(
            super_admin_id = %super_admin_id,
            target_user_id = %target_user_id,
            organization_id = %target_organization_id,
            session_id = %session.session_id,
            "Masquerade session started"
        );

        Ok(StartedMasquerade {
            session_id: session.session_id,
            session_token: token,
            expires_utc: session.expires_utc,
        })
    }

    /// End the session the token identifies.
    ///
    /// Strict in result: a token with no active session behind it returns
    /// `NotActive` so callers can tell "nothing to end" from "ended".
    pub async fn end(&self, session_token: &str) -> Result<MasqueradeSession, AccessError> {
        let ended = self
            .store
            .end_session_by_token_hash(&hash_token(session_token), Utc::now())
            .await
            .map_err(AccessError::from)?
            .ok_or(AccessError::NotActive)?;

        self.audit.record(SecurityEvent::actor_action(
            SecurityEventType::SessionEnd,
            ended.super_admin_id,
            Some(ended.target_user_id),
            Some(ended.target_organization_id),
            Some(serde_json::json!({
                "session_id": ended.session_id,
                "reason": EndReason::Operator.as_str(),
            })),
        ));

        tracing::info!(
            super_admin_id = %ended.super_admin_id,
            session_id = %ended.session_id,
            "Masquerade session ended"
        );

        Ok(ended)
    }

    /// One pass of the expiry sweep: end every active session past its
    /// expiry, with the audit event tagged system-initiated. The sweep is a
    /// cleanup guarantee only; resolution already rejects expired tokens.
    pub async fn sweep_once(&self) -> Result<usize, AccessError> {
        let ended = self
            .store
            .end_expired_sessions(Utc::now())
            .await
            .map_err(AccessError::from)?;

        for session in &ended {
            self.audit.record(SecurityEvent::system_action(
                SecurityEventType::SessionEnd,
                Some(session.target_user_id),
                Some(session.target_organization_id),
                Some(serde_json::json!({
                    "session_id": session.session_id,
                    "reason": EndReason::Expired.as_str(),
                })),
            ));
        }

        if !ended.is_empty() {
            tracing::info!(count = ended.len(), "Expiry sweep ended masquerade sessions");
        }
        Ok(ended.len())
    }

    /// Spawn the periodic sweep loop.
    pub fn spawn_expiry_sweep(&self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = service.sweep_once().await {
                    tracing::error!(error = %e, "Masquerade expiry sweep failed");
                }
            }
        })
    }
}

/// 32 random bytes, hex-encoded. Unguessable by construction.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Tokens are stored and looked up only as SHA-256 hashes.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
