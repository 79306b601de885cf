// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode as HttpStatusCode},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Correct-Horse-42";

/// Helper to create a router over a fresh in-memory database with a
/// bootstrap administrator.
fn create_test_app() -> (Router, TempDir) {
    let upload_dir = TempDir::new().expect("temp dir");
    let mut persistence =
        SqlitePersistence::new_in_memory().expect("Failed to create persistence");
    let catalog = PermissionCatalog::standard();
    initialize(
        &mut persistence,
        &catalog,
        Some((ADMIN_EMAIL, ADMIN_PASSWORD)),
        "2026-03-01T00:00:00Z",
    )
    .expect("Failed to initialize");

    let app_state = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        config: Arc::new(ServiceConfig::new(upload_dir.path())),
        catalog: Arc::new(catalog),
    };
    (build_router(app_state), upload_dir)
}

/// Sends a request with an optional bearer token and JSON body.
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (HttpStatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login_token(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK, "login failed: {body}");
    body["session_token"].as_str().unwrap().to_string()
}

fn booking(center_id: Option<&str>) -> Value {
    json!({
        "customer_name": "Ada Lovelace",
        "customer_phone": "+1 555 0100",
        "address": "1 Main Street",
        "appointment_date": "2026-03-02",
        "appointment_time_slot": "10:00",
        "issue_description": "Dishwasher will not drain",
        "center_id": center_id,
    })
}

async fn book(app: &Router, center_id: Option<&str>) -> i64 {
    let (status, body) = send(app, "POST", "/bookings", None, Some(booking(center_id))).await;
    assert_eq!(status, HttpStatusCode::OK);
    body["ticket_id"].as_i64().unwrap()
}

async fn role_id(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = send(app, "GET", "/roles", Some(token), None).await;
    assert_eq!(status, HttpStatusCode::OK);
    body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == name)
        .and_then(|r| r["role_id"].as_i64())
        .unwrap()
}

#[tokio::test]
async fn test_booking_is_public() {
    let (app, _dir) = create_test_app();

    let (status, body) = send(&app, "POST", "/bookings", None, Some(booking(None))).await;

    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["status"], "BOOKED");
    assert!(body["booking_reference"].as_str().unwrap().starts_with("TK"));
}

#[tokio::test]
async fn test_invalid_booking_is_bad_request() {
    let (app, _dir) = create_test_app();
    let mut request = booking(None);
    request["customer_name"] = json!("   ");

    let (status, body) = send(&app, "POST", "/bookings", None, Some(request)).await;

    assert_eq!(status, HttpStatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_staff_routes_require_session() {
    let (app, _dir) = create_test_app();

    let (missing, body) = send(&app, "GET", "/tickets", None, None).await;
    assert_eq!(missing, HttpStatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);

    let (unknown, _) = send(&app, "GET", "/tickets", Some("not-a-token"), None).await;
    assert_eq!(unknown, HttpStatusCode::UNAUTHORIZED);

    let basic = Request::builder()
        .uri("/tickets")
        .header("authorization", "Basic YWRtaW46YWRtaW4=")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(basic).await.unwrap();
    assert_eq!(response.status(), HttpStatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let (app, _dir) = create_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "Wrong-Horse-42" })),
    )
    .await;

    assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_whoami_and_logout() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(&app, "GET", "/auth/whoami", Some(&token), None).await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["roles"], json!(["admin"]));

    let (status, _) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, HttpStatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/auth/whoami", Some(&token), None).await;
    assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ticket_lifecycle_over_http() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        "POST",
        "/technicians",
        Some(&token),
        Some(json!({ "name": "Grace Hopper", "center_id": "north" })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    let technician_id = body["technician"]["technician_id"].as_i64().unwrap();

    let ticket_id = book(&app, Some("north")).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/confirm"),
        Some(&token),
        Some(json!({ "expected_version": 0 })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["ticket"]["status"], "CONFIRMED");
    let version = body["ticket"]["version"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/assign"),
        Some(&token),
        Some(json!({ "expected_version": version })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["ticket"]["status"], "ASSIGNED");
    assert_eq!(body["ticket"]["technician_id"], technician_id);

    let upload = Request::builder()
        .method("POST")
        .uri(format!(
            "/tickets/{ticket_id}/images?image_type=RECEIPT&file_name=receipt.png"
        ))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "image/png")
        .body(Body::from(vec![0x89_u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a]))
        .unwrap();
    let response = app.clone().oneshot(upload).await.unwrap();
    assert_eq!(response.status(), HttpStatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["ticket"]["status"], "IN_PROGRESS");
    assert_eq!(body["image"]["image_type"], "RECEIPT");
    let version = body["ticket"]["version"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "GET",
        &format!("/tickets/{ticket_id}/images"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["images"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/complete"),
        Some(&token),
        Some(json!({ "expected_version": version })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["ticket"]["status"], "COMPLETED");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/audit/events?ticket_id={ticket_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    let actions: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["COMPLETE", "UPLOAD", "ASSIGN", "CONFIRM", "BOOK"]);
}

#[tokio::test]
async fn test_stale_version_is_conflict() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let ticket_id = book(&app, None).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/confirm"),
        Some(&token),
        Some(json!({ "expected_version": 5 })),
    )
    .await;

    assert_eq!(status, HttpStatusCode::CONFLICT);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_invalid_transition_is_unprocessable() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let ticket_id = book(&app, None).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/complete"),
        Some(&token),
        Some(json!({ "expected_version": 0 })),
    )
    .await;

    assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_missing_ticket_is_not_found() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, _) = send(&app, "GET", "/tickets/9999", Some(&token), None).await;

    assert_eq!(status, HttpStatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_viewer_cannot_confirm() {
    let (app, _dir) = create_test_app();
    let admin_token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let viewer_role = role_id(&app, &admin_token, "viewer").await;

    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(&admin_token),
        Some(json!({
            "email": "viewer@example.com",
            "display_name": "Viewer",
            "password": ADMIN_PASSWORD,
            "role_ids": [viewer_role],
        })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);

    let viewer_token = login_token(&app, "viewer@example.com", ADMIN_PASSWORD).await;
    let ticket_id = book(&app, None).await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/tickets/{ticket_id}"),
        Some(&viewer_token),
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/confirm"),
        Some(&viewer_token),
        Some(json!({ "expected_version": 0 })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("tickets.write"));
}

#[tokio::test]
async fn test_system_role_cannot_be_deleted() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let admin_role = role_id(&app, &token, "admin").await;

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/roles/{admin_role}"),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_custom_role_round_trip() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        "POST",
        "/roles",
        Some(&token),
        Some(json!({
            "name": "dispatcher",
            "description": "Assigns tickets",
            "permissions": ["tickets.read", "tickets.assign"],
        })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    let role_id = body["role"]["role_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/roles/{role_id}"),
        Some(&token),
        Some(json!({ "permissions": ["tickets.read"] })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["role"]["permissions"], json!(["tickets.read"]));

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/roles/{role_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/roles/{role_id}"), Some(&token), None).await;
    assert_eq!(status, HttpStatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_becomes_audit_cause() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let request = Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("content-type", "application/json")
        .header("x-request-id", "req-42")
        .body(Body::from(serde_json::to_string(&booking(None)).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), HttpStatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let booked: Value = serde_json::from_slice(&bytes).unwrap();
    let event_id = booked["event_id"].as_i64().unwrap();

    let (status, event) = send(
        &app,
        "GET",
        &format!("/audit/events/{event_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(event["cause_id"], "req-42");
    assert_eq!(event["cause_description"], "POST /bookings");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let ticket_id = book(&app, None).await;

    let limit = usize::try_from(DEFAULT_MAX_UPLOAD_BYTES).unwrap();
    let upload = Request::builder()
        .method("POST")
        .uri(format!(
            "/tickets/{ticket_id}/images?image_type=RECEIPT&file_name=receipt.png"
        ))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "image/png")
        .body(Body::from(vec![0_u8; limit + 128 * 1024]))
        .unwrap();
    let response = app.clone().oneshot(upload).await.unwrap();

    assert_eq!(response.status(), HttpStatusCode::PAYLOAD_TOO_LARGE);
}

/// Books, confirms and assigns a ticket in `north`, then uploads a PNG
/// receipt. Returns the stored image ID.
async fn assigned_ticket_with_receipt(app: &Router, token: &str, png: &[u8]) -> i64 {
    let (status, _) = send(
        app,
        "POST",
        "/technicians",
        Some(token),
        Some(json!({ "name": "Grace Hopper", "center_id": "north" })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);

    let ticket_id = book(app, Some("north")).await;
    let (status, body) = send(
        app,
        "POST",
        &format!("/tickets/{ticket_id}/confirm"),
        Some(token),
        Some(json!({ "expected_version": 0 })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    let version = body["ticket"]["version"].as_i64().unwrap();
    let (status, _) = send(
        app,
        "POST",
        &format!("/tickets/{ticket_id}/assign"),
        Some(token),
        Some(json!({ "expected_version": version })),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);

    let upload = Request::builder()
        .method("POST")
        .uri(format!(
            "/tickets/{ticket_id}/images?image_type=RECEIPT&file_name=receipt.png"
        ))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "image/png")
        .body(Body::from(png.to_vec()))
        .unwrap();
    let response = app.clone().oneshot(upload).await.unwrap();
    assert_eq!(response.status(), HttpStatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    body["image"]["image_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_download_ticket_image_returns_bytes() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let png = [0x89_u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];
    let image_id = assigned_ticket_with_receipt(&app, &token, &png).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/files/ticket-images/{image_id}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), HttpStatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(
        response.headers()["content-disposition"],
        "inline; filename=\"receipt.png\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), png.as_slice());
}

#[tokio::test]
async fn test_download_missing_ticket_image_is_not_found() {
    let (app, _dir) = create_test_app();
    let token = login_token(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let image_id = assigned_ticket_with_receipt(&app, &token, &[0x89, 0x50]).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/files/ticket-images/{}", image_id + 100),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/files/ticket-images/{image_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
}
