use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::time::timeout;
use tower::ServiceExt;

use school_fleet::config::environment::{EnvironmentConfig, TelemetryMode};
use school_fleet::{create_router, AppState};

struct TestApp {
    router: Router,
    state: AppState,
}

struct TestResponse {
    status: StatusCode,
    body: Value,
}

impl TestResponse {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn json(&self) -> &Value {
        &self.body
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    async fn get(&self, uri: &str) -> TestResponse {
        self.send("GET", uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send("POST", uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.send("PUT", uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> TestResponse {
        self.send("DELETE", uri, None).await
    }

    async fn register(&self, registration: &str, capacity: i64) -> String {
        let response = self
            .post(
                "/api/vehicles",
                json!({
                    "registration_number": registration,
                    "capacity": capacity,
                    "driver_name": "Anil Sharma",
                    "driver_phone": "+91 98100 12345"
                }),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.json());
        response.json()["data"]["id"].as_str().unwrap().to_string()
    }
}

fn create_test_app() -> TestApp {
    let config = EnvironmentConfig {
        telemetry_mode: TelemetryMode::Push,
        ..EnvironmentConfig::default()
    };
    let state = AppState::new(config);
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let response = app.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json()["status"], "ok");
}

#[tokio::test]
async fn test_vehicle_lifecycle() {
    let app = create_test_app();
    let id = app.register("DL-1PC-0101", 40).await;

    let duplicate = app
        .post(
            "/api/vehicles",
            json!({
                "registration_number": "dl-1pc-0101",
                "capacity": 30,
                "driver_name": "Other",
                "driver_phone": "9999999999"
            }),
        )
        .await;
    assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
    assert_eq!(duplicate.json()["code"], "CONFLICT");

    let invalid = app
        .post(
            "/api/vehicles",
            json!({ "registration_number": "DL-1PC-0102", "capacity": 0, "driver_name": "X", "driver_phone": "9999999999" }),
        )
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json()["code"], "VALIDATION_ERROR");

    let response = app
        .put(&format!("/api/vehicles/{}/status", id), json!({ "status": "maintenance" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json()["data"]["status"], "maintenance");

    let response = app
        .put(&format!("/api/vehicles/{}/status", id), json!({ "status": "inactive" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json()["code"], "INVALID_STATE_TRANSITION");

    let listed = app.get("/api/vehicles?status=maintenance").await;
    assert_eq!(listed.json()["data"].as_array().unwrap().len(), 1);
    let listed = app.get("/api/vehicles?status=active").await;
    assert!(listed.json()["data"].as_array().unwrap().is_empty());

    let response = app.delete(&format!("/api/vehicles/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let response = app.get(&format!("/api/vehicles/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_route_capacity_over_http() {
    let app = create_test_app();
    let vehicle_id = app.register("DL-1PC-0201", 40).await;

    let created = app
        .post(
            "/api/routes",
            json!({
                "name": "Sector 21 pickup",
                "stops": [
                    { "name": "Block A", "latitude": 28.55, "longitude": 77.05, "scheduled_time": "07:00:00", "student_count": 25 },
                    { "name": "Block C", "latitude": 28.56, "longitude": 77.06, "scheduled_time": "07:15:00", "student_count": 20 }
                ],
                "trip_kind": "pickup"
            }),
        )
        .await;
    assert_eq!(created.status_code(), StatusCode::OK);
    let route_id = created.json()["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .put(&format!("/api/routes/{}/vehicle", route_id), json!({ "vehicle_id": vehicle_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["code"], "CAPACITY_EXCEEDED");

    let response = app.delete(&format!("/api/routes/{}/stops/1", route_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .put(&format!("/api/routes/{}/vehicle", route_id), json!({ "vehicle_id": vehicle_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let by_vehicle = app.get(&format!("/api/routes/by-vehicle/{}", vehicle_id)).await;
    assert_eq!(by_vehicle.json()["data"][0]["id"], route_id.as_str());

    // Vehículo asignado a una ruta activa: no se puede eliminar
    let response = app.delete(&format!("/api/vehicles/{}", vehicle_id)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_maintenance_and_alerts_over_http() {
    let app = create_test_app();
    let vehicle_id = app.register("DL-1PC-0301", 30).await;
    let now = Utc::now();

    let invalid = app
        .post(
            &format!("/api/maintenance/vehicles/{}", vehicle_id),
            json!({
                "kind": "regular",
                "description": "Brake inspection",
                "cost": "1500",
                "performed_at": now,
                "next_due_at": now - Duration::days(1)
            }),
        )
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

    let scheduled = app
        .post(
            &format!("/api/maintenance/vehicles/{}", vehicle_id),
            json!({
                "kind": "regular",
                "description": "Brake inspection",
                "cost": "1500.00",
                "performed_at": now - Duration::days(90),
                "next_due_at": now - Duration::days(1)
            }),
        )
        .await;
    assert_eq!(scheduled.status_code(), StatusCode::OK, "{}", scheduled.json());
    let record_id = scheduled.json()["data"]["id"].as_str().unwrap().to_string();

    let classification = app.get("/api/maintenance/classification").await;
    assert_eq!(classification.json()["data"]["overdue"][0]["id"], record_id.as_str());

    // Barrido de mantenimiento invocado directamente
    let c = app.state.scheduler.classify(now).await.unwrap();
    app.state.dispatcher.on_classification(&c, now).await.unwrap();

    let alerts = app.get("/api/alerts").await;
    let pending = alerts.json()["data"].as_array().unwrap().clone();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["severity"], "critical");
    assert_eq!(pending[0]["vehicle_id"], vehicle_id.as_str());

    let alert_id = pending[0]["id"].as_str().unwrap();
    let ack = app
        .post(&format!("/api/alerts/{}/acknowledge", alert_id), json!({}))
        .await;
    assert_eq!(ack.status_code(), StatusCode::OK);
    assert!(app.get("/api/alerts").await.json()["data"].as_array().unwrap().is_empty());

    let done = app
        .post(&format!("/api/maintenance/records/{}/complete", record_id), json!({ "actual_cost": "1750" }))
        .await;
    assert_eq!(done.status_code(), StatusCode::OK);
    let again = app
        .post(&format!("/api/maintenance/records/{}/complete", record_id), json!({}))
        .await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);

    let overview = app.get("/api/overview").await;
    assert_eq!(overview.json()["data"]["total_vehicles"], 1);
    assert_eq!(overview.json()["data"]["overdue_maintenance"], 0);
}

#[tokio::test]
async fn test_push_telemetry_and_locations() {
    let app = create_test_app();
    let vehicle_id = app.register("DL-1PC-0401", 30).await;
    let now = Utc::now();

    let response = app
        .post(
            "/api/tracking/telemetry",
            json!({
                "vehicle_id": vehicle_id,
                "latitude": 28.61,
                "longitude": 77.21,
                "speed_kmh": 32.5,
                "motion": "moving",
                "timestamp": now
            }),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let stale = app
        .post(
            "/api/tracking/telemetry",
            json!({
                "vehicle_id": vehicle_id,
                "latitude": 28.60,
                "longitude": 77.20,
                "speed_kmh": 10.0,
                "motion": "moving",
                "timestamp": now - Duration::seconds(30)
            }),
        )
        .await;
    assert_eq!(stale.status_code(), StatusCode::CONFLICT);
    assert_eq!(stale.json()["code"], "STALE_TELEMETRY");

    let ahead = app
        .post(
            "/api/tracking/telemetry",
            json!({
                "vehicle_id": vehicle_id,
                "latitude": 28.62,
                "longitude": 77.22,
                "speed_kmh": 30.0,
                "motion": "moving",
                "timestamp": now + Duration::days(365)
            }),
        )
        .await;
    assert_eq!(ahead.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(ahead.json()["code"], "VALIDATION_ERROR");

    let missing = app.get(&format!("/api/tracking/locations/{}", vehicle_id)).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    app.state.feed.tick_at(now).await.unwrap();

    let location = app.get(&format!("/api/tracking/locations/{}", vehicle_id)).await;
    assert_eq!(location.status_code(), StatusCode::OK);
    assert_eq!(location.json()["data"]["status"], "moving");
    assert_eq!(app.get("/api/tracking/locations").await.json()["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_location_stream_ends_on_shutdown() {
    let app = create_test_app();
    let vehicle_id = app.register("DL-1PC-0402", 30).await;
    let now = Utc::now();

    let pushed = app
        .post(
            "/api/tracking/telemetry",
            json!({
                "vehicle_id": vehicle_id,
                "latitude": 28.61,
                "longitude": 77.21,
                "speed_kmh": 25.0,
                "motion": "moving",
                "timestamp": now
            }),
        )
        .await;
    assert_eq!(pushed.status_code(), StatusCode::OK);
    app.state.feed.tick_at(now).await.unwrap();

    let request = Request::builder()
        .uri("/api/tracking/stream")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"), "{}", content_type);

    // Primer evento: el snapshot vigente
    let mut body = response.into_body().into_data_stream();
    let first = timeout(std::time::Duration::from_secs(5), body.next())
        .await
        .expect("first event")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("event: locations"), "{}", text);
    assert!(text.contains(&vehicle_id), "{}", text);

    // Con el apagado iniciado el stream termina
    app.state.begin_shutdown();
    let drained = timeout(std::time::Duration::from_secs(5), async {
        while let Some(chunk) = body.next().await {
            chunk.unwrap();
        }
    })
    .await;
    assert!(drained.is_ok(), "stream still open after shutdown");
}
