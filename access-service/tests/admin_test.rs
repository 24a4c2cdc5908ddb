mod common;

use access_service::models::Role;
use access_service::store::AccessStore;
use axum::http::StatusCode;
use common::{org_header, user_header, TestApp};
use serde_json::json;

#[tokio::test]
async fn permission_rules_are_super_admin_only() {
    let app = TestApp::spawn();
    let org = app.seed_org("Sunrise Home Care").await;
    let owner = app.seed_member(&org, Role::Owner).await;

    let rule = json!({
        "role": "staff",
        "resource_type": "timesheets",
        "can_view": true,
    });

    let (status, _) = app
        .request(
            "PUT",
            "/admin/permission-rules",
            &[user_header(owner)],
            Some(rule.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.seed_super_admin().await;
    let (status, body) = app
        .request(
            "PUT",
            "/admin/permission-rules",
            &[user_header(admin)],
            Some(rule),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_view"], true);
    assert_eq!(body["can_edit"], false);

    let (status, body) = app
        .request("GET", "/admin/permission-rules", &[user_header(admin)], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rule_update_changes_decisions_immediately() {
    let app = TestApp::spawn();
    let org = app.seed_org("Sunrise Home Care").await;
    let staff = app.seed_member(&org, Role::Staff).await;
    let admin = app.seed_super_admin().await;

    let (status, _) = app
        .request(
            "PUT",
            "/admin/permission-rules",
            &[user_header(admin)],
            Some(json!({
                "role": "staff",
                "resource_type": "timesheets",
                "can_view": true,
                "can_edit": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .request(
            "GET",
            "/authz/can?resource_type=timesheets&operation=edit",
            &[user_header(staff)],
            None,
        )
        .await;
    assert_eq!(body["allowed"], true);

    // Tighten the rule; the cached grant must not survive.
    app.request(
        "PUT",
        "/admin/permission-rules",
        &[user_header(admin)],
        Some(json!({
            "role": "staff",
            "resource_type": "timesheets",
            "can_view": true,
        })),
    )
    .await;

    let (_, body) = app
        .request(
            "GET",
            "/authz/can?resource_type=timesheets&operation=edit",
            &[user_header(staff)],
            None,
        )
        .await;
    assert_eq!(body["allowed"], false);
}

#[tokio::test]
async fn owner_changes_a_member_role_and_the_change_is_audited() {
    let app = TestApp::spawn();
    let org = app.seed_org("Sunrise Home Care").await;
    let owner = app.seed_member(&org, Role::Owner).await;
    let member = app.seed_member(&org, Role::Staff).await;

    let uri = format!(
        "/orgs/{}/members/{}/role",
        org.organization_id, member
    );
    let (status, body) = app
        .request(
            "PUT",
            &uri,
            &[user_header(owner)],
            Some(json!({ "role": "reception" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "reception");

    app.settle().await;
    let events = app
        .store
        .list_events(Some(org.organization_id), 100)
        .await
        .unwrap();
    let changed = events
        .iter()
        .find(|e| e.event_type_code == "role_changed")
        .unwrap();
    assert_eq!(changed.actor_user_id, Some(owner));
    assert_eq!(changed.target_user_id, Some(member));
}

#[tokio::test]
async fn role_change_for_an_unknown_member_is_not_found() {
    let app = TestApp::spawn();
    let org = app.seed_org("Sunrise Home Care").await;
    let owner = app.seed_member(&org, Role::Owner).await;

    let uri = format!(
        "/orgs/{}/members/{}/role",
        org.organization_id,
        uuid::Uuid::new_v4()
    );
    let (status, _) = app
        .request(
            "PUT",
            &uri,
            &[user_header(owner)],
            Some(json!({ "role": "staff" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_change_without_the_matrix_grant_is_forbidden() {
    let app = TestApp::spawn();
    let org = app.seed_org("Sunrise Home Care").await;
    let reception = app.seed_member(&org, Role::Reception).await;
    let member = app.seed_member(&org, Role::Staff).await;

    let uri = format!(
        "/orgs/{}/members/{}/role",
        org.organization_id, member
    );
    let (status, _) = app
        .request(
            "PUT",
            &uri,
            &[user_header(reception)],
            Some(json!({ "role": "caregiver" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn audit_listing_enforces_its_read_policy() {
    let app = TestApp::spawn();
    let org = app.seed_org("Clinic A").await;
    let other_org = app.seed_org("Clinic B").await;
    let org_admin = app.seed_member(&org, Role::Admin).await;
    let caregiver = app.seed_member(&org, Role::Caregiver).await;
    let super_admin = app.seed_super_admin().await;

    // Seed one event per organization.
    let target = app.seed_member(&org, Role::Staff).await;
    app.state
        .masquerade
        .start(super_admin, target, org.organization_id)
        .await
        .unwrap();
    app.settle().await;

    // Super-admin: any organization, or the whole ledger.
    let (status, body) = app
        .request("GET", "/audit/events", &[user_header(super_admin)], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());

    // Organization admin: own organization only.
    let uri = format!("/audit/events?organization_id={}", org.organization_id);
    let (status, body) = app
        .request("GET", &uri, &[user_header(org_admin)], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["organization_id"] == org.organization_id.to_string()));

    // ...but not a foreign one, and not without naming one.
    let foreign = format!(
        "/audit/events?organization_id={}",
        other_org.organization_id
    );
    let (status, _) = app
        .request("GET", &foreign, &[user_header(org_admin)], None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request("GET", "/audit/events", &[user_header(org_admin)], None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Non-administrative roles cannot read the ledger at all.
    let (status, _) = app
        .request("GET", &uri, &[user_header(caregiver)], None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cross_org_role_change_is_rejected() {
    let app = TestApp::spawn();
    let org = app.seed_org("Clinic A").await;
    let other_org = app.seed_org("Clinic B").await;
    let owner = app.seed_member(&org, Role::Owner).await;
    let foreign_member = app.seed_member(&other_org, Role::Staff).await;

    let uri = format!(
        "/orgs/{}/members/{}/role",
        other_org.organization_id, foreign_member
    );
    let (status, _) = app
        .request(
            "PUT",
            &uri,
            &[user_header(owner), org_header(&org)],
            Some(json!({ "role": "caregiver" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
