//! Masquerade session model - one impersonation episode.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Records a super-admin acting as another user inside one organization.
///
/// Lifecycle per super-admin is `Idle -> Active -> Ended`; the ended state is
/// terminal and rows are retained forever for audit. The raw token is never
/// stored, only its SHA-256 hash.
#[derive(Debug, Clone)]
pub struct MasqueradeSession {
    pub session_id: Uuid,
    pub super_admin_id: Uuid,
    pub target_user_id: Uuid,
    pub target_organization_id: Uuid,
    pub token_hash: String,
    pub started_utc: DateTime<Utc>,
    pub expires_utc: DateTime<Utc>,
    pub ended_utc: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl MasqueradeSession {
    pub fn new(
        super_admin_id: Uuid,
        target_user_id: Uuid,
        target_organization_id: Uuid,
        token_hash: String,
        ttl: chrono::Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            super_admin_id,
            target_user_id,
            target_organization_id,
            token_hash,
            started_utc: now,
            expires_utc: now + ttl,
            ended_utc: None,
            is_active: true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_utc <= now
    }

    /// A token resolves only while the session is active and unexpired; the
    /// expiry check never waits for the background sweep.
    pub fn is_resolvable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// Who triggered the `Active -> Ended` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Operator,
    Expired,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Operator => "operator",
            EndReason::Expired => "expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_resolves() {
        let s = MasqueradeSession::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hash".into(),
            chrono::Duration::minutes(30),
        );
        assert!(s.is_resolvable(Utc::now()));
    }

    #[test]
    fn expired_session_stops_resolving_without_sweep() {
        let s = MasqueradeSession::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hash".into(),
            chrono::Duration::zero(),
        );
        // Still flagged active in storage, but the wall clock rejects it.
        assert!(s.is_active);
        assert!(!s.is_resolvable(Utc::now()));
    }

    #[test]
    fn ended_session_does_not_resolve() {
        let mut s = MasqueradeSession::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hash".into(),
            chrono::Duration::minutes(30),
        );
        s.is_active = false;
        s.ended_utc = Some(Utc::now());
        assert!(!s.is_resolvable(Utc::now()));
    }
}
