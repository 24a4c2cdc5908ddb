mod common;

use access_service::store::AccessStore;
use axum::http::StatusCode;
use common::{token_header, user_header, TestApp};
use serde_json::json;

#[tokio::test]
async fn full_masquerade_lifecycle_over_http() {
    let app = TestApp::spawn();
    let admin = app.seed_super_admin().await;
    let org = app.seed_org("Harborview Clinic").await;
    let nurse = app
        .seed_member(&org, access_service::models::Role::RegisteredNurse)
        .await;

    let (status, body) = app
        .request(
            "POST",
            "/masquerade/start",
            &[user_header(admin)],
            Some(json!({
                "target_user_id": nurse,
                "target_organization_id": org.organization_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["session_token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    // The token resolves: the effective identity is the nurse.
    let (status, body) = app
        .request(
            "POST",
            "/authz/check",
            &[user_header(admin), token_header(&token)],
            Some(json!({
                "resource_type": "medical_records",
                "operation": "view",
                "resource_organization_id": org.organization_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acting_user_id"], nurse.to_string());
    assert_eq!(body["responsible_actor_id"], admin.to_string());
    assert_eq!(body["is_impersonating"], true);

    let (status, body) = app
        .request(
            "POST",
            "/masquerade/end",
            &[],
            Some(json!({ "session_token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ended"], true);

    // Ending again is a conflict, not a silent no-op.
    let (status, _) = app
        .request(
            "POST",
            "/masquerade/end",
            &[],
            Some(json!({ "session_token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The ended token no longer resolves.
    let (status, _) = app
        .request(
            "GET",
            "/authz/can?resource_type=medical_records&operation=view",
            &[user_header(admin), token_header(&token)],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn start_requires_the_super_admin_grant() {
    let app = TestApp::spawn();
    let org = app.seed_org("Sunrise Home Care").await;
    let member = app
        .seed_member(&org, access_service::models::Role::Owner)
        .await;
    let target = app
        .seed_member(&org, access_service::models::Role::Staff)
        .await;

    // Even an organization owner cannot start a masquerade.
    let (status, _) = app
        .request(
            "POST",
            "/masquerade/start",
            &[user_header(member)],
            Some(json!({
                "target_user_id": target,
                "target_organization_id": org.organization_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_start_conflicts_while_a_session_is_active() {
    let app = TestApp::spawn();
    let admin = app.seed_super_admin().await;
    let org = app.seed_org("Harborview Clinic").await;
    let target = app
        .seed_member(&org, access_service::models::Role::Caregiver)
        .await;
    let payload = json!({
        "target_user_id": target,
        "target_organization_id": org.organization_id,
    });

    let (status, _) = app
        .request(
            "POST",
            "/masquerade/start",
            &[user_header(admin)],
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            "POST",
            "/masquerade/start",
            &[user_header(admin)],
            Some(payload),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn concurrent_starts_produce_exactly_one_session() {
    let app = TestApp::spawn();
    let admin = app.seed_super_admin().await;
    let org = app.seed_org("Harborview Clinic").await;
    let target = app
        .seed_member(&org, access_service::models::Role::Staff)
        .await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let masquerade = app.state.masquerade.clone();
        let org_id = org.organization_id;
        handles.push(tokio::spawn(async move {
            masquerade.start(admin, target, org_id).await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(access_service::services::AccessError::AlreadyActive) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn expired_session_is_rejected_before_any_sweep_runs() {
    let app = TestApp::spawn_with_ttl(0);
    let admin = app.seed_super_admin().await;
    let org = app.seed_org("Harborview Clinic").await;
    let target = app
        .seed_member(&org, access_service::models::Role::Reception)
        .await;

    let started = app
        .state
        .masquerade
        .start(admin, target, org.organization_id)
        .await
        .unwrap();

    // No sweep has run; expiry is enforced at resolution time.
    let (status, _) = app
        .request(
            "GET",
            "/authz/can?resource_type=patients&operation=view",
            &[user_header(admin), token_header(&started.session_token)],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The sweep then retires the row and audits it as system-initiated.
    assert_eq!(app.state.masquerade.sweep_once().await.unwrap(), 1);
    app.settle().await;
    let events = app
        .store
        .list_events(Some(org.organization_id), 100)
        .await
        .unwrap();
    let sweep_end = events
        .iter()
        .find(|e| e.event_type_code == "session_end")
        .unwrap();
    assert!(sweep_end.system_initiated);
    assert_eq!(sweep_end.actor_user_id, None);
}

#[tokio::test]
async fn invalid_targets_are_rejected_with_reasons() {
    let app = TestApp::spawn();
    let admin = app.seed_super_admin().await;
    let other_admin = app.seed_super_admin().await;
    let org = app.seed_org("Harborview Clinic").await;
    let outsider = uuid::Uuid::new_v4();

    // Self-impersonation.
    let (status, _) = app
        .request(
            "POST",
            "/masquerade/start",
            &[user_header(admin)],
            Some(json!({
                "target_user_id": admin,
                "target_organization_id": org.organization_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Another super-admin (no chaining).
    let (status, _) = app
        .request(
            "POST",
            "/masquerade/start",
            &[user_header(admin)],
            Some(json!({
                "target_user_id": other_admin,
                "target_organization_id": org.organization_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // A user with no membership in the organization.
    let (status, _) = app
        .request(
            "POST",
            "/masquerade/start",
            &[user_header(admin)],
            Some(json!({
                "target_user_id": outsider,
                "target_organization_id": org.organization_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn session_start_is_audited_with_the_super_admin_as_actor() {
    let app = TestApp::spawn();
    let admin = app.seed_super_admin().await;
    let org = app.seed_org("Harborview Clinic").await;
    let target = app
        .seed_member(&org, access_service::models::Role::Caregiver)
        .await;

    app.state
        .masquerade
        .start(admin, target, org.organization_id)
        .await
        .unwrap();
    app.settle().await;

    let events = app
        .store
        .list_events(Some(org.organization_id), 100)
        .await
        .unwrap();
    let start = events
        .iter()
        .find(|e| e.event_type_code == "session_start")
        .unwrap();
    assert_eq!(start.actor_user_id, Some(admin));
    assert_eq!(start.target_user_id, Some(target));
    assert!(!start.system_initiated);
}
