//! HTTP-level tests for activities, approval transitions and hold points.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{
    body_json, build_test_app, delete_auth, get_auth, patch_json_auth, post_json_auth, token,
    TestApp,
};

fn bored_pile() -> Value {
    json!({
        "siteId": 7,
        "activityType": "BORED_PILING",
        "activityDate": "2026-03-02",
        "details": {"diameter": 1200, "depth": 10, "concreteVolume": 13}
    })
}

/// Create an activity as operator 1 and return its id.
async fn create(app: &TestApp) -> String {
    let response = post_json_auth(
        &app.router,
        "/api/v1/activities",
        &token(1, "operator"),
        bored_pile(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

// ---------------------------------------------------------------------------
// Test: CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_derived_values() {
    let app = build_test_app().await;
    let response = post_json_auth(
        &app.router,
        "/api/v1/activities",
        &token(1, "operator"),
        bored_pile(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "DRAFT");
    assert_eq!(json["data"]["createdBy"], 1);
    assert!(json["data"]["details"]["theoreticalVolume"].is_number());
}

#[tokio::test]
async fn create_replay_by_client_change_id_returns_200() {
    let app = build_test_app().await;
    let mut body = bored_pile();
    body["clientChangeId"] = json!("offline-1");
    let operator = token(1, "operator");

    let first = post_json_auth(&app.router, "/api/v1/activities", &operator, body.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_id = body_json(first).await["data"]["id"].clone();

    let second = post_json_auth(&app.router, "/api/v1/activities", &operator, body).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["data"]["id"], first_id);
}

#[tokio::test]
async fn malformed_create_is_400() {
    let app = build_test_app().await;
    let response = post_json_auth(
        &app.router,
        "/api/v1/activities",
        &token(1, "operator"),
        json!({"siteId": 7}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn patch_with_stale_version_is_409() {
    let app = build_test_app().await;
    let id = create(&app).await;
    let operator = token(1, "operator");
    let uri = format!("/api/v1/activities/{id}");

    let response =
        patch_json_auth(&app.router, &uri, &operator, json!({"notes": "cage ok", "expectedVersion": 1})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["notes"], "cage ok");
    assert_eq!(json["data"]["version"], 2);

    let response =
        patch_json_auth(&app.router, &uri, &operator, json!({"notes": "late", "expectedVersion": 1})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn patch_by_another_operator_is_403() {
    let app = build_test_app().await;
    let id = create(&app).await;

    let response = patch_json_auth(
        &app.router,
        &format!("/api/v1/activities/{id}"),
        &token(2, "operator"),
        json!({"notes": "not mine"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_then_get_is_404() {
    let app = build_test_app().await;
    let id = create(&app).await;
    let operator = token(1, "operator");
    let uri = format!("/api/v1/activities/{id}");

    let response = delete_auth(&app.router, &uri, &operator).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(&app.router, &uri, &operator).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: approval transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_and_approve() {
    let app = build_test_app().await;
    let id = create(&app).await;

    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/activities/{id}/submit"),
        &token(1, "operator"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "SUBMITTED");

    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/activities/{id}/approve"),
        &token(1, "operator"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/activities/{id}/approve"),
        &token(3, "supervisor"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "APPROVED");
    assert_eq!(json["data"]["approvedBy"], 3);
}

#[tokio::test]
async fn approve_draft_is_400() {
    let app = build_test_app().await;
    let id = create(&app).await;

    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/activities/{id}/approve"),
        &token(3, "supervisor"),
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reject_requires_notes() {
    let app = build_test_app().await;
    let id = create(&app).await;
    let supervisor = token(3, "supervisor");
    post_json_auth(
        &app.router,
        &format!("/api/v1/activities/{id}/submit"),
        &token(1, "operator"),
        json!({}),
    )
    .await;
    let uri = format!("/api/v1/activities/{id}/reject");

    let response = post_json_auth(&app.router, &uri, &supervisor, json!({"notes": "  "})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        post_json_auth(&app.router, &uri, &supervisor, json!({"notes": "Depth log missing"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "REJECTED");
    assert_eq!(json["data"]["rejectionNotes"], "Depth log missing");
}

// ---------------------------------------------------------------------------
// Test: hold points
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hold_points_are_created_once_and_signed_in_order() {
    let app = build_test_app().await;
    let id = create(&app).await;
    let operator = token(1, "operator");
    let engineer = token(4, "site_engineer");
    let uri = format!("/api/v1/activities/{id}/hold-points");

    let response = post_json_auth(&app.router, &uri, &operator, json!({})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let stages = created["data"].as_array().unwrap();
    assert_eq!(stages.len(), 3);
    assert_eq!(stages[0]["holdPointType"], "PRE_BORING");
    assert_eq!(stages[1]["holdPointType"], "PRE_CAGE");
    assert!(stages.iter().all(|hp| hp["status"] == "PENDING"));
    let pre_boring = stages[0]["id"].as_i64().unwrap();
    let pre_cage = stages[1]["id"].as_i64().unwrap();

    let response = post_json_auth(&app.router, &uri, &operator, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let sign_off = json!({"signedByName": "J. Okafor"});
    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/hold-points/{pre_cage}/sign"),
        &engineer,
        sign_off.clone(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Previous hold point must be approved first"));

    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/hold-points/{pre_boring}/sign"),
        &engineer,
        sign_off.clone(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "APPROVED");
    assert_eq!(json["data"]["signedById"], 4);

    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/hold-points/{pre_cage}/sign"),
        &engineer,
        sign_off,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(&app.router, &uri, &operator).await;
    let listed = body_json(response).await;
    assert_eq!(listed["data"][1]["status"], "APPROVED");
    assert_eq!(listed["data"][2]["status"], "PENDING");
}

#[tokio::test]
async fn hold_point_rejection_needs_notes_and_signer_role() {
    let app = build_test_app().await;
    let id = create(&app).await;
    let response = post_json_auth(
        &app.router,
        &format!("/api/v1/activities/{id}/hold-points"),
        &token(1, "operator"),
        json!({}),
    )
    .await;
    let first = body_json(response).await["data"][0]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/hold-points/{first}/reject");

    let response =
        post_json_auth(&app.router, &uri, &token(1, "operator"), json!({"notes": "no"})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app.router,
        &uri,
        &token(4, "site_engineer"),
        json!({"notes": "Casing misaligned"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "REJECTED");
    assert_eq!(json["data"]["rejectionNotes"], "Casing misaligned");
}

#[tokio::test]
async fn unknown_hold_point_is_404() {
    let app = build_test_app().await;
    let response = post_json_auth(
        &app.router,
        "/api/v1/hold-points/999/sign",
        &token(4, "site_engineer"),
        json!({"signedByName": "J. Okafor"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
