// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP surface tests: response envelopes and status codes.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

mod common;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/meetings",
        Some(common::new_meeting_json(&common::upcoming_date())),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["meetingId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = common::create_test_app();
    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_and_list_pending() {
    let app = common::create_test_app();
    let id = create(&app.router).await;

    let (status, body) = send(&app.router, "GET", "/api/meetings/mentee/mentee-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let meetings = body["meetings"].as_array().unwrap();
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0]["id"], id.as_str());
    assert_eq!(meetings[0]["status"], "pending");
    assert_eq!(meetings[0]["menteeApproved"], false);
    assert_eq!(meetings[0]["mentorApproved"], false);
    assert_eq!(meetings[0]["meetLink"], Value::Null);
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    let app = common::create_test_app();
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/meetings",
        Some(serde_json::json!({
            "menteeId": "mentee-1",
            "mentorId": "",
            "meetingDate": "2025-09-02",
            "meetingTime": "1:00 PM",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("mentorId"));
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = common::create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/meetings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_approvals_confirm_meeting() {
    let app = common::create_test_app();
    common::seed_party(&app.store, "mentee-1", "ada@example.com", "ada-token", false).await;
    let id = create(&app.router).await;

    let (status, body) = send(&app.router, "POST", &format!("/api/meetings/{id}/accept"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert!(body.get("meetLink").is_none());

    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{id}/mentor-approve"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["meetLink"], "https://meet.google.com/fake-ada-token");

    for party in ["mentee-1", "mentor-1"] {
        let (_, body) = send(
            &app.router,
            "GET",
            &format!("/api/meetings/confirmed/{party}"),
            None,
        )
        .await;
        let meetings = body["meetings"].as_array().unwrap();
        assert_eq!(meetings.len(), 1, "{party}");
        assert_eq!(meetings[0]["calendarEventId"], "event-1");
    }

    let (_, body) = send(&app.router, "GET", "/api/meetings/mentee/mentee-1", None).await;
    assert!(body["meetings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_approve_unknown_meeting_is_404() {
    let app = common::create_test_app();
    let (status, body) = send(&app.router, "POST", "/api/meetings/nope/accept", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_propose_new_time() {
    let app = common::create_test_app();
    let id = create(&app.router).await;
    send(
        &app.router,
        "POST",
        &format!("/api/meetings/{id}/mentor-approve"),
        None,
    )
    .await;

    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{id}/propose"),
        Some(serde_json::json!({"meetingDate": "Oct 10", "meetingTime": "4:00 PM"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&app.router, "GET", "/api/meetings/mentee/mentee-1", None).await;
    let meeting = &body["meetings"][0];
    assert_eq!(meeting["meetingDate"], "Oct 10");
    assert_eq!(meeting["meetingTime"], "4:00 PM");
    assert_eq!(meeting["menteeApproved"], true);
    assert_eq!(meeting["mentorApproved"], false);

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/meetings/{id}/propose"),
        Some(serde_json::json!({"meetingDate": "Oct 10"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_move_expired_endpoint() {
    let app = common::create_test_app();
    let (status, body) = send(&app.router, "POST", "/api/meetings/move-expired", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["movedCount"], 0);

    let (status, body) = send(&app.router, "GET", "/api/meetings/mentee/mentee-1/past", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["meetings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = common::create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/meetings/mentee/mentee-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
}
