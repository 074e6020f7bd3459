/*!
 * End-to-end HTTP tests against a real Postgres-backed router.
 *
 * All tests here are `#[ignore]`-gated: they require `TEST_DATABASE_URL` to
 * point at a disposable Postgres database with migrations applied by
 * `TestApp::new`.
 */

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

mod test_utils;
use test_utils::{future_date, seed_barber, seed_service, TestApp};

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[ignore]
async fn books_a_scheduled_appointment_successfully() {
    let harness = TestApp::new().await;
    let barber_id = seed_barber(&harness.pool, "Marco").await;
    let service_id = seed_service(&harness.pool, "Haircut", 30, 2500).await;
    let date = future_date();

    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/book")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "barber_id": barber_id,
                        "service_date": date,
                        "kind": "scheduled",
                        "start_time": "10:00",
                        "service_ids": [service_id],
                        "addon_ids": [],
                        "priority": "normal",
                        "notes": "",
                        "idempotency_key": "test-key-1"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["kind"], "scheduled");
    assert_eq!(json["start_time"], "10:00");
    assert_eq!(json["version"], 1);
}

#[tokio::test]
#[ignore]
async fn repeated_idempotency_key_returns_the_same_booking() {
    let harness = TestApp::new().await;
    let barber_id = seed_barber(&harness.pool, "Marco").await;
    let service_id = seed_service(&harness.pool, "Haircut", 30, 2500).await;
    let date = future_date();

    let body = json!({
        "barber_id": barber_id,
        "service_date": date,
        "kind": "scheduled",
        "start_time": "09:00",
        "service_ids": [service_id],
        "addon_ids": [],
        "priority": "normal",
        "notes": "",
        "idempotency_key": "same-key"
    });

    let first = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/book")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_json = body_json(first.into_body()).await;

    let second = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/book")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CREATED);
    let second_json = body_json(second.into_body()).await;

    assert_eq!(first_json["appointment_id"], second_json["appointment_id"]);
}

#[tokio::test]
#[ignore]
async fn overlapping_scheduled_booking_returns_conflict() {
    let harness = TestApp::new().await;
    let barber_id = seed_barber(&harness.pool, "Marco").await;
    let service_id = seed_service(&harness.pool, "Haircut", 30, 2500).await;
    let date = future_date();

    let book = |key: &str, start: &str| {
        let body = json!({
            "barber_id": barber_id,
            "service_date": date,
            "kind": "scheduled",
            "start_time": start,
            "service_ids": [service_id],
            "addon_ids": [],
            "priority": "normal",
            "notes": "",
            "idempotency_key": key
        });
        Request::builder()
            .method("POST")
            .uri("/book")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let first = harness.app.clone().oneshot(book("key-a", "10:00")).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    // Starts 15 minutes into the first appointment's 30-minute block.
    let second = harness.app.clone().oneshot(book("key-b", "10:15")).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let json = body_json(second.into_body()).await;
    assert_eq!(json["error"], "SlotNotAvailable");
}

#[tokio::test]
#[ignore]
async fn queue_booking_receives_position_one_when_empty() {
    let harness = TestApp::new().await;
    let barber_id = seed_barber(&harness.pool, "Marco").await;
    let service_id = seed_service(&harness.pool, "Haircut", 30, 2500).await;
    let date = future_date();

    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/book")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "barber_id": barber_id,
                        "service_date": date,
                        "kind": "queue",
                        "service_ids": [service_id],
                        "addon_ids": [],
                        "priority": "normal",
                        "notes": "",
                        "idempotency_key": "queue-key-1"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["kind"], "queue");
    assert_eq!(json["queue_position"], 1);
}

#[tokio::test]
#[ignore]
async fn urgent_queue_booking_jumps_to_the_front() {
    let harness = TestApp::new().await;
    let barber_id = seed_barber(&harness.pool, "Marco").await;
    let service_id = seed_service(&harness.pool, "Haircut", 30, 2500).await;
    let date = future_date();

    let enqueue = |key: &str, priority: &str| {
        let body = json!({
            "barber_id": barber_id,
            "service_date": date,
            "kind": "queue",
            "service_ids": [service_id],
            "addon_ids": [],
            "priority": priority,
            "notes": "",
            "idempotency_key": key
        });
        Request::builder()
            .method("POST")
            .uri("/book")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let normal = harness.app.clone().oneshot(enqueue("normal-1", "normal")).await.unwrap();
    assert_eq!(normal.status(), StatusCode::CREATED);
    let normal_json = body_json(normal.into_body()).await;
    assert_eq!(normal_json["queue_position"], 1);

    let urgent = harness.app.clone().oneshot(enqueue("urgent-1", "urgent")).await.unwrap();
    assert_eq!(urgent.status(), StatusCode::CREATED);
    let urgent_json = body_json(urgent.into_body()).await;
    assert_eq!(urgent_json["queue_position"], 1);
}

#[tokio::test]
#[ignore]
async fn cancel_with_stale_version_returns_conflict() {
    let harness = TestApp::new().await;
    let barber_id = seed_barber(&harness.pool, "Marco").await;
    let service_id = seed_service(&harness.pool, "Haircut", 30, 2500).await;
    let date = future_date();

    let booked = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/book")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "barber_id": barber_id,
                        "service_date": date,
                        "kind": "scheduled",
                        "start_time": "11:00",
                        "service_ids": [service_id],
                        "addon_ids": [],
                        "priority": "normal",
                        "notes": "",
                        "idempotency_key": "cancel-key"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let booked_json = body_json(booked.into_body()).await;
    let appointment_id = booked_json["appointment_id"].as_str().unwrap();

    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/cancel/{appointment_id}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "expected_version": 99 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["error"], "VersionConflict");
}

#[tokio::test]
#[ignore]
async fn health_endpoint_reports_database_connectivity() {
    let harness = TestApp::new().await;

    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "connected");
}
