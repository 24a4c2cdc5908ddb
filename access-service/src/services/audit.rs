//! Security audit service - append-only ledger of privileged actions.

use metrics::counter;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::SecurityEvent;
use crate::services::error::AccessError;
use crate::store::AccessStore;

/// Writes [`SecurityEvent`]s to the ledger.
///
/// Appends are fire-and-forget: a logging failure must never roll back or
/// fail the authorization decision it describes. Failures surface only in
/// logs and the `security_audit_write_failures_total` counter.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AccessStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self { store }
    }

    /// Append an event without blocking the caller.
    pub fn record(&self, event: SecurityEvent) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.insert_event(&event).await {
                counter!("security_audit_write_failures_total").increment(1);
                tracing::error!(
                    error = %e,
                    event_type = %event.event_type_code,
                    "Failed to write security audit event"
                );
            } else {
                tracing::debug!(
                    event_type = %event.event_type_code,
                    system_initiated = event.system_initiated,
                    "Security event recorded"
                );
            }
        });
    }

    /// Read back ledger entries for reporting consumers.
    pub async fn list(
        &self,
        organization_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<SecurityEvent>, AccessError> {
        self.store
            .list_events(organization_id, limit)
            .await
            .map_err(AccessError::from)
    }
}
