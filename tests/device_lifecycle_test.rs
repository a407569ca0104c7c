//! A device walked through every workstation over HTTP.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{data, response_bytes, response_json, TestApp};
use refurb_ops::entities::UserRole;
use serde_json::{json, Value};

struct Floor {
    app: TestApp,
    inward: String,
    inspector: String,
    engineer: String,
    engineer_id: String,
    painter: String,
    qc: String,
    spares: String,
    dispatch: String,
    manager: String,
}

impl Floor {
    async fn new() -> Self {
        let app = TestApp::new().await;
        let (engineer_user, engineer) = app.user_with_role(UserRole::L2Engineer).await;
        Self {
            inward: app.token_for(UserRole::InwardExecutive).await,
            inspector: app.token_for(UserRole::InspectionEngineer).await,
            engineer,
            engineer_id: engineer_user.id.to_string(),
            painter: app.token_for(UserRole::PaintTechnician).await,
            qc: app.token_for(UserRole::QcEngineer).await,
            spares: app.token_for(UserRole::SparesManager).await,
            dispatch: app.token_for(UserRole::DispatchExecutive).await,
            manager: app.token_for(UserRole::WarehouseManager).await,
            app,
        }
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>, token: &str) -> Value {
        let response = self.app.request(method.clone(), uri, body, Some(token)).await;
        let status = response.status();
        if !status.is_success() {
            let body = response_json(response).await;
            panic!("{method} {uri} failed with {status}: {body}");
        }
        data(response).await
    }

    async fn receive(&self, barcode: &str) -> Value {
        let batch = self
            .call(
                Method::POST,
                "/api/v1/inward",
                Some(json!({
                    "inward_type": "RENTAL_RETURN",
                    "customer_name": "Initech",
                    "rental_reference": format!("RA-{barcode}"),
                    "devices": [{
                        "barcode": barcode,
                        "category": "LAPTOP",
                        "brand": "Lenovo",
                        "model": "ThinkPad T480",
                        "serial_number": format!("PF-{barcode}"),
                        "ram": "16GB"
                    }]
                })),
                &self.inward,
            )
            .await;
        batch["devices"][0].clone()
    }

    async fn device(&self, id: &str) -> Value {
        self.call(Method::GET, &format!("/api/v1/devices/{id}"), None, &self.qc)
            .await
    }
}

#[tokio::test]
async fn device_moves_from_inward_to_dispatch() {
    let floor = Floor::new().await;

    floor
        .call(
            Method::POST,
            "/api/v1/spares",
            Some(json!({
                "part_code": "KB-T480-US",
                "name": "Keyboard US (T480)",
                "initial_stock": 3,
                "min_stock_level": 1
            })),
            &floor.spares,
        )
        .await;

    let device = floor.receive("LT-1001").await;
    let device_id = device["id"].as_str().unwrap().to_string();
    assert_eq!(device["status"], "PENDING_INSPECTION");

    let scanned = floor
        .call(Method::GET, "/api/v1/devices/barcode/LT-1001", None, &floor.painter)
        .await;
    assert_eq!(scanned["id"], device_id.as_str());

    let inspection = floor
        .call(
            Method::POST,
            &format!("/api/v1/inspections/{device_id}"),
            Some(json!({
                "checklist": { "keyboard": false, "display": true, "battery": true },
                "spares_required": [{ "part_code": "kb-t480-us", "quantity": 1 }],
                "paint_panels": ["TOP_COVER", "PALMREST"],
                "notes": "sticky keys, scuffed lid"
            })),
            &floor.inspector,
        )
        .await;
    assert_eq!(inspection["device"]["status"], "READY_FOR_REPAIR");
    assert_eq!(inspection["repair_job"]["spares_issued"], true);
    assert_eq!(inspection["paint_panels"].as_array().unwrap().len(), 2);
    let job_id = inspection["repair_job"]["id"].as_str().unwrap().to_string();

    let part = floor
        .call(Method::GET, "/api/v1/spares?search=KB-T480", None, &floor.spares)
        .await;
    assert_eq!(part["items"][0]["current_stock"], 2);

    // Panels go through the paint shop while the board is on the bench.
    let panels: Vec<String> = inspection["paint_panels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    for panel in &panels {
        floor
            .call(Method::POST, &format!("/api/v1/paint/panels/{panel}/start"), None, &floor.painter)
            .await;
        floor
            .call(Method::POST, &format!("/api/v1/paint/panels/{panel}/ready"), None, &floor.painter)
            .await;
    }

    floor
        .call(
            Method::POST,
            &format!("/api/v1/repairs/{job_id}/assign"),
            Some(json!({ "engineer_id": floor.engineer_id, "tat_hours": 24 })),
            &floor.manager,
        )
        .await;
    floor
        .call(Method::POST, &format!("/api/v1/repairs/{job_id}/start"), None, &floor.engineer)
        .await;
    assert_eq!(floor.device(&device_id).await["status"], "UNDER_REPAIR");

    let collected = floor
        .call(
            Method::POST,
            &format!("/api/v1/paint/devices/{device_id}/collect"),
            None,
            &floor.painter,
        )
        .await;
    assert_eq!(collected["device"]["status"], "UNDER_REPAIR");
    assert_eq!(collected["device"]["paint_completed"], true);

    floor
        .call(
            Method::POST,
            &format!("/api/v1/repairs/{job_id}/complete"),
            Some(json!({ "repair_notes": "keyboard replaced" })),
            &floor.engineer,
        )
        .await;
    assert_eq!(floor.device(&device_id).await["status"], "AWAITING_QC");

    let qc = floor
        .call(
            Method::POST,
            &format!("/api/v1/qc/{device_id}"),
            Some(json!({
                "checklist": { "keyboard": true, "display": true },
                "result": "PASSED",
                "final_grade": "A"
            })),
            &floor.qc,
        )
        .await;
    assert_eq!(qc["device"]["status"], "READY_FOR_STOCK");
    assert_eq!(qc["device"]["grade"], "A");

    floor
        .call(
            Method::PUT,
            &format!("/api/v1/devices/{device_id}/rack-location"),
            Some(json!({ "rack_location": "R-04-B" })),
            &floor.manager,
        )
        .await;

    let outward = floor
        .call(
            Method::POST,
            "/api/v1/outward",
            Some(json!({
                "outward_type": "SALES",
                "customer_name": "Acme Schools",
                "reference_number": "INV-2041",
                "device_ids": [device_id]
            })),
            &floor.dispatch,
        )
        .await;
    assert!(outward["outward_number"].as_str().unwrap().starts_with("OUT-"));
    assert_eq!(outward["devices"][0]["status"], "STOCK_OUT_SOLD");
    assert!(outward["devices"][0]["rack_location"].is_null());
    let outward_id = outward["id"].as_str().unwrap().to_string();

    let gate_pass = floor
        .app
        .request(
            Method::GET,
            &format!("/api/v1/outward/{outward_id}/gate-pass"),
            None,
            Some(&floor.dispatch),
        )
        .await;
    assert_eq!(gate_pass.status(), StatusCode::OK);
    let html = String::from_utf8(response_bytes(gate_pass).await).unwrap();
    assert!(html.contains("LT-1001"));
    assert!(html.contains("Acme Schools"));

    let history = floor
        .call(
            Method::GET,
            &format!("/api/v1/devices/{device_id}/history"),
            None,
            &floor.qc,
        )
        .await;
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"inspection"));
    assert!(actions.contains(&"qc"));
    assert!(actions.contains(&"outward"));

    let export = floor
        .app
        .request(
            Method::GET,
            "/api/v1/exports/outward-register.csv",
            None,
            Some(&floor.manager),
        )
        .await;
    assert_eq!(export.status(), StatusCode::OK);
    assert!(export.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let csv = String::from_utf8(response_bytes(export).await).unwrap();
    assert!(csv.contains("INV-2041"));
    assert!(csv.contains("LT-1001"));

    let dashboard = floor
        .call(Method::GET, "/api/v1/reports/dashboard", None, &floor.manager)
        .await;
    assert_eq!(dashboard["total_devices"], 1);
    assert_eq!(dashboard["open_repair_jobs"], 0);
}

#[tokio::test]
async fn short_spares_park_the_device_until_stock_arrives() {
    let floor = Floor::new().await;
    let part = floor
        .call(
            Method::POST,
            "/api/v1/spares",
            Some(json!({ "part_code": "LCD-14-FHD", "name": "14in FHD panel" })),
            &floor.spares,
        )
        .await;
    let part_id = part["id"].as_str().unwrap().to_string();

    let device = floor.receive("LT-2002").await;
    let device_id = device["id"].as_str().unwrap().to_string();

    let inspection = floor
        .call(
            Method::POST,
            &format!("/api/v1/inspections/{device_id}"),
            Some(json!({
                "reported_issues": ["cracked display"],
                "spares_required": [{ "part_code": "LCD-14-FHD", "quantity": 1 }]
            })),
            &floor.inspector,
        )
        .await;
    assert_eq!(inspection["device"]["status"], "WAITING_FOR_SPARES");
    let job_id = inspection["repair_job"]["id"].as_str().unwrap().to_string();

    let retry = floor
        .app
        .request(
            Method::POST,
            &format!("/api/v1/repairs/{job_id}/issue-spares"),
            None,
            Some(&floor.engineer),
        )
        .await;
    assert_eq!(retry.status(), StatusCode::UNPROCESSABLE_ENTITY);

    floor
        .call(
            Method::POST,
            &format!("/api/v1/spares/{part_id}/receive"),
            Some(json!({ "quantity": 2, "notes": "PO-88" })),
            &floor.spares,
        )
        .await;
    let job = floor
        .call(
            Method::POST,
            &format!("/api/v1/repairs/{job_id}/issue-spares"),
            None,
            &floor.engineer,
        )
        .await;
    assert_eq!(job["status"], "READY_FOR_REPAIR");
    assert_eq!(floor.device(&device_id).await["status"], "READY_FOR_REPAIR");

    let ledger = floor
        .call(
            Method::GET,
            &format!("/api/v1/spares/{part_id}/transactions"),
            None,
            &floor.spares,
        )
        .await;
    assert_eq!(ledger["total"], 2);
}

#[tokio::test]
async fn qc_is_refused_before_the_device_reaches_qc() {
    let floor = Floor::new().await;
    let device = floor.receive("LT-3003").await;
    let device_id = device["id"].as_str().unwrap();

    let response = floor
        .app
        .request(
            Method::POST,
            &format!("/api/v1/qc/{device_id}"),
            Some(json!({ "result": "PASSED", "final_grade": "B" })),
            Some(&floor.qc),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("PENDING_INSPECTION"));
}

#[tokio::test]
async fn qc_rejects_grades_outside_a_to_d() {
    let floor = Floor::new().await;
    let device = floor.receive("LT-3103").await;
    let device_id = device["id"].as_str().unwrap().to_string();

    let inspection = floor
        .call(
            Method::POST,
            &format!("/api/v1/inspections/{device_id}"),
            Some(json!({ "checklist": { "keyboard": true, "display": true } })),
            &floor.inspector,
        )
        .await;
    assert_eq!(inspection["device"]["status"], "AWAITING_QC");

    let response = floor
        .app
        .request(
            Method::POST,
            &format!("/api/v1/qc/{device_id}"),
            Some(json!({ "result": "PASSED", "final_grade": "E" })),
            Some(&floor.qc),
        )
        .await;
    assert!(response.status().is_client_error());

    let device = floor.device(&device_id).await;
    assert_eq!(device["status"], "AWAITING_QC");
    assert!(device["grade"].is_null());
}

#[tokio::test]
async fn duplicate_barcode_is_a_conflict() {
    let floor = Floor::new().await;
    floor.receive("LT-4004").await;

    let response = floor
        .app
        .request(
            Method::POST,
            "/api/v1/inward",
            Some(json!({
                "inward_type": "RENTAL_RETURN",
                "customer_name": "Initech",
                "rental_reference": "RA-again",
                "devices": [{
                    "barcode": "LT-4004",
                    "category": "LAPTOP",
                    "brand": "Lenovo",
                    "model": "ThinkPad T480"
                }]
            })),
            Some(&floor.inward),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn stock_cannot_be_adjusted_below_zero() {
    let floor = Floor::new().await;
    let part = floor
        .call(
            Method::POST,
            "/api/v1/spares",
            Some(json!({ "part_code": "SSD-256", "name": "256GB NVMe", "initial_stock": 1 })),
            &floor.spares,
        )
        .await;
    let part_id = part["id"].as_str().unwrap();

    let response = floor
        .app
        .request(
            Method::POST,
            &format!("/api/v1/spares/{part_id}/adjust"),
            Some(json!({ "delta": -2, "reason": "count" })),
            Some(&floor.spares),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let part = floor
        .call(Method::GET, &format!("/api/v1/spares/{part_id}"), None, &floor.spares)
        .await;
    assert_eq!(part["current_stock"], 1);
}

#[tokio::test]
async fn attachments_upload_list_download_and_delete() {
    let floor = Floor::new().await;
    let device = floor.receive("LT-5005").await;
    let device_id = device["id"].as_str().unwrap();
    let uri = format!("/api/v1/devices/{device_id}/attachments");

    let boundary = "refurb-boundary";
    let png: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-an-image";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"lid.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", floor.inspector))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = floor.app.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let attachment = data(response).await;
    assert_eq!(attachment["file_name"], "lid.png");
    let attachment_id = attachment["id"].as_str().unwrap().to_string();

    let listed = floor.call(Method::GET, &uri, None, &floor.qc).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let download = floor
        .app
        .request(
            Method::GET,
            &format!("{uri}/{attachment_id}"),
            None,
            Some(&floor.qc),
        )
        .await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response_bytes(download).await, png);

    let deleted = floor
        .app
        .request(
            Method::DELETE,
            &format!("{uri}/{attachment_id}"),
            None,
            Some(&floor.manager),
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let listed = floor.call(Method::GET, &uri, None, &floor.qc).await;
    assert!(listed.as_array().unwrap().is_empty());
}
