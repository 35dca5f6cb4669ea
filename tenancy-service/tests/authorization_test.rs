//! Authorization behavior across the request pipeline: anonymous access,
//! organization resolution, role enforcement, and session expiry.

mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};

#[tokio::test]
async fn anonymous_request_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app.get("/organizations", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = read_json(response).await;
    assert!(body["message"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn garbage_token_is_treated_as_anonymous() {
    let app = TestApp::spawn().await;

    let response = app.get("/auth/session", Some("not-a-real-token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sole_membership_is_adopted_automatically() {
    let app = TestApp::spawn().await;
    app.register("owner@acorns.example", "hunter2hunter2").await;

    let first = app.login("owner@acorns.example", "hunter2hunter2").await;
    let org_id = app.create_organization(&first, "Acorns Nursery").await;

    // A fresh session starts with no selection; the single membership is
    // adopted on the first identified request.
    let second = app.login("owner@acorns.example", "hunter2hunter2").await;
    let response = app.get("/auth/session", Some(&second)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["active_organization_id"].as_str(), Some(org_id.as_str()));
    assert_eq!(body["role"].as_str(), Some("owner"));
    let grants = body["grants"].as_array().expect("Expected grants array");
    assert!(grants.iter().any(|g| g == "class:delete"));
    assert!(grants.iter().any(|g| g == "organization:delete"));
}

#[tokio::test]
async fn multiple_memberships_require_explicit_selection() {
    let app = TestApp::spawn().await;
    app.register("owner@two.example", "hunter2hunter2").await;

    let setup = app.login("owner@two.example", "hunter2hunter2").await;
    let org_a = app.create_organization(&setup, "Org A").await;
    let _org_b = app.create_organization(&setup, "Org B").await;

    let token = app.login("owner@two.example", "hunter2hunter2").await;
    let response = app.get("/classes", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/organizations/select",
            Some(&token),
            serde_json::json!({ "organization_id": org_a }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/classes", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn selecting_foreign_organization_is_forbidden() {
    let app = TestApp::spawn().await;
    app.register("owner@mine.example", "hunter2hunter2").await;
    app.register("outsider@other.example", "hunter2hunter2").await;

    let owner = app.login("owner@mine.example", "hunter2hunter2").await;
    let org_id = app.create_organization(&owner, "Mine").await;

    let outsider = app.login("outsider@other.example", "hunter2hunter2").await;
    let response = app
        .post(
            "/organizations/select",
            Some(&outsider),
            serde_json::json!({ "organization_id": org_id }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn member_role_is_read_only() {
    let app = TestApp::spawn().await;
    app.register("owner@rbac.example", "hunter2hunter2").await;
    app.register("helper@rbac.example", "hunter2hunter2").await;

    let owner = app.login("owner@rbac.example", "hunter2hunter2").await;
    app.create_organization(&owner, "Rbac Nursery").await;

    let response = app
        .post(
            "/classes",
            Some(&owner),
            serde_json::json!({ "name": "Bumblebees", "capacity": 12 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let class_id = read_json(response).await["class_id"]
        .as_str()
        .expect("Missing class_id")
        .to_string();

    let response = app
        .post(
            "/organizations/members",
            Some(&owner),
            serde_json::json!({ "email": "helper@rbac.example", "role": "member" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Member can read but not write.
    let member = app.login("helper@rbac.example", "hunter2hunter2").await;
    let response = app.get("/classes", Some(&member)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post(
            "/classes",
            Some(&member),
            serde_json::json!({ "name": "Dragonflies", "capacity": 10 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::DELETE,
            &format!("/classes/{}", class_id),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_holds_full_class_control() {
    let app = TestApp::spawn().await;
    app.register("owner@tiers.example", "hunter2hunter2").await;
    app.register("admin@tiers.example", "hunter2hunter2").await;

    let owner = app.login("owner@tiers.example", "hunter2hunter2").await;
    app.create_organization(&owner, "Tiers").await;

    let response = app
        .post(
            "/organizations/members",
            Some(&owner),
            serde_json::json!({ "email": "admin@tiers.example", "role": "admin" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Admins hold full class control, including adding further members.
    let admin = app.login("admin@tiers.example", "hunter2hunter2").await;
    let response = app
        .post(
            "/classes",
            Some(&admin),
            serde_json::json!({ "name": "Caterpillars", "capacity": 8 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let class_id = read_json(response).await["class_id"]
        .as_str()
        .expect("Missing class_id")
        .to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/classes/{}", class_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn expired_session_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.register("sleepy@exp.example", "hunter2hunter2").await;

    let token = app.login("sleepy@exp.example", "hunter2hunter2").await;
    let response = app.get("/auth/session", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.store.expire_session(&token).await;

    let response = app.get("/auth/session", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_session() {
    let app = TestApp::spawn().await;
    app.register("bye@out.example", "hunter2hunter2").await;

    let token = app.login("bye@out.example", "hunter2hunter2").await;
    let response = app
        .post("/auth/logout", Some(&token), serde_json::json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/auth/session", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
