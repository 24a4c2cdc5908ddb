use std::sync::{Arc, OnceLock};

use access_service::config::{
    AccessConfig, DatabaseConfig, Environment, MasqueradeConfig, SecurityConfig,
};
use access_service::models::{Organization, OrganizationMembership, Role};
use access_service::store::{AccessStore, MemoryAccessStore};
use access_service::{build_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower::ServiceExt;
use uuid::Uuid;

/// The recorder is process-global, so every test shares one handle.
fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("Failed to install test metrics recorder")
        })
        .clone()
}

fn test_config(session_ttl_minutes: i64) -> AccessConfig {
    AccessConfig {
        common: service_core::config::Config { port: 0 },
        environment: Environment::Dev,
        service_name: "access-service".to_string(),
        log_level: "warn".to_string(),
        database: DatabaseConfig {
            url: "postgres://unused-in-tests".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        masquerade: MasqueradeConfig {
            session_ttl_minutes,
            sweep_interval_seconds: 60,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryAccessStore>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with_ttl(30)
    }

    /// A zero TTL makes every session expired the instant it starts, which
    /// lets tests exercise expiry without a clock.
    pub fn spawn_with_ttl(session_ttl_minutes: i64) -> Self {
        let store = Arc::new(MemoryAccessStore::new());
        let state = AppState::new(
            test_config(session_ttl_minutes),
            store.clone(),
            metrics_handle(),
        );
        let router = build_router(state.clone());
        TestApp {
            router,
            state,
            store,
        }
    }

    pub async fn seed_org(&self, label: &str) -> Organization {
        let org = Organization::new(label.to_string());
        self.store.insert_organization(&org).await.unwrap();
        org
    }

    pub async fn seed_member(&self, org: &Organization, role: Role) -> Uuid {
        let user = Uuid::new_v4();
        self.store
            .insert_membership(&OrganizationMembership::confirmed(
                user,
                org.organization_id,
                role,
            ))
            .await
            .unwrap();
        user
    }

    pub async fn seed_super_admin(&self) -> Uuid {
        let user = Uuid::new_v4();
        self.store.grant_super_admin(user).await.unwrap();
        user
    }

    /// Send one request through the full middleware stack.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    /// Audit appends are fire-and-forget; give the spawned writes a moment
    /// to land before asserting on the ledger.
    pub async fn settle(&self) {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

pub fn user_header(user: Uuid) -> (&'static str, String) {
    ("x-user-id", user.to_string())
}

pub fn org_header(org: &Organization) -> (&'static str, String) {
    ("x-org-id", org.organization_id.to_string())
}

pub fn token_header(token: &str) -> (&'static str, String) {
    ("x-masquerade-token", token.to_string())
}
