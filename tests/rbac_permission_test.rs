//! Role gates on every workstation route group, plus login and error bodies.

mod common;

use axum::http::{Method, StatusCode};
use common::{data, response_json, TestApp, TEST_PASSWORD};
use refurb_ops::entities::UserRole;
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn missing_token_is_rejected_with_401() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/devices", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());
    assert!(body["request_id"].is_string(), "error body carries the request id");
}

#[tokio::test]
async fn garbage_token_is_rejected_with_401() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/devices", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case(UserRole::QcEngineer, "/api/v1/inward")]
#[case(UserRole::PaintTechnician, "/api/v1/repairs")]
#[case(UserRole::InwardExecutive, "/api/v1/spares")]
#[case(UserRole::L2Engineer, "/api/v1/outward")]
#[case(UserRole::SparesManager, "/api/v1/reports/dashboard")]
#[case(UserRole::DispatchExecutive, "/api/v1/users")]
#[case(UserRole::WarehouseManager, "/api/v1/users")]
#[case(UserRole::InspectionEngineer, "/api/v1/paint")]
#[tokio::test]
async fn wrong_role_is_rejected_with_403(#[case] role: UserRole, #[case] uri: &str) {
    let app = TestApp::new().await;
    let token = app.token_for(role).await;

    let response = app.request(Method::GET, uri, None, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role} on {uri}");

    let body = response_json(response).await;
    assert_eq!(body["error"], "Forbidden");
}

#[rstest]
#[case(UserRole::InwardExecutive, "/api/v1/inward")]
#[case(UserRole::WarehouseManager, "/api/v1/purchase-orders")]
#[case(UserRole::L2Engineer, "/api/v1/repairs")]
#[case(UserRole::BatteryTechnician, "/api/v1/specialist")]
#[case(UserRole::PaintTechnician, "/api/v1/paint")]
#[case(UserRole::SparesManager, "/api/v1/spares")]
#[case(UserRole::DispatchExecutive, "/api/v1/outward")]
#[case(UserRole::WarehouseManager, "/api/v1/reports/dashboard")]
#[case(UserRole::QcEngineer, "/api/v1/devices")]
#[case(UserRole::Admin, "/api/v1/users")]
#[case(UserRole::Admin, "/api/v1/spares")]
#[tokio::test]
async fn allowed_role_reaches_the_handler(#[case] role: UserRole, #[case] uri: &str) {
    let app = TestApp::new().await;
    let token = app.token_for(role).await;

    let response = app.request(Method::GET, uri, None, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK, "{role} on {uri}");
}

#[tokio::test]
async fn device_edits_need_a_floor_role() {
    let app = TestApp::new().await;
    let painter = app.token_for(UserRole::PaintTechnician).await;
    let id = uuid::Uuid::new_v4();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/devices/{id}/rack-location"),
            Some(json!({ "rack_location": "R-01" })),
            Some(&painter),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Reads on the same path stay open to any signed-in user.
    let response = app
        .request(Method::GET, &format!("/api/v1/devices/{id}"), None, Some(&painter))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_and_health_are_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["database"]["status"], "up");
}

#[tokio::test]
async fn login_issues_a_token_that_opens_the_role_gate() {
    let app = TestApp::new().await;
    let (user, _) = app.user_with_role(UserRole::QcEngineer).await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = data(response).await;
    assert_eq!(token["token_type"], "Bearer");
    assert_eq!(token["role"], "QC_ENGINEER");
    let access = token["access_token"].as_str().unwrap().to_string();

    let me = app.request(Method::GET, "/auth/me", None, Some(&access)).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(data(me).await["email"], user.email);

    let bad = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": user.email, "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_user_cannot_log_in() {
    let app = TestApp::new().await;
    let admin = app.token_for(UserRole::Admin).await;
    let (user, _) = app.user_with_role(UserRole::L2Engineer).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/users/{}/deactivate", user.id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["active"], false);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Unauthorized: Account is disabled");
}

#[tokio::test]
async fn admin_creates_users_and_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    let admin = app.token_for(UserRole::Admin).await;
    let payload = json!({
        "email": "Paint.Bay@refurb.test",
        "name": "Paint bay 2",
        "password": "spray-booth-22",
        "role": "PAINT_TECHNICIAN"
    });

    let response = app
        .request(Method::POST, "/api/v1/users", Some(payload.clone()), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = data(response).await;
    assert_eq!(created["email"], "paint.bay@refurb.test");
    assert!(created.get("password_hash").is_none());

    let response = app
        .request(Method::POST, "/api/v1/users", Some(payload), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
