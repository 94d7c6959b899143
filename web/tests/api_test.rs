//! Integration tests for the HTTP API over in-memory collaborators.
//!
//! Each test boots the full router against the in-memory store, catalog,
//! and directory, then drives it through HTTP the way a client would.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use stagepass_core::{BookingId, Money};
use stagepass_engine::Environment;
use stagepass_testing::fixtures::EventBuilder;
use stagepass_testing::init_tracing;
use stagepass_testing::mocks::{
    test_clock, InMemoryBookingStore, InMemoryEventCatalog, InMemoryUserDirectory,
    RecordingGateway, RecordingNotifier,
};
use stagepass_web::{build_router, AppState};
use std::sync::Arc;
use uuid::Uuid;

struct TestApp {
    server: TestServer,
    store: Arc<InMemoryBookingStore>,
    catalog: Arc<InMemoryEventCatalog>,
    directory: Arc<InMemoryUserDirectory>,
    gateway: Arc<RecordingGateway>,
}

#[allow(clippy::unwrap_used)]
fn spawn_app() -> TestApp {
    init_tracing();

    let store = Arc::new(InMemoryBookingStore::new());
    let catalog = Arc::new(InMemoryEventCatalog::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let gateway = Arc::new(RecordingGateway::succeeding());
    let notifier = Arc::new(RecordingNotifier::new());

    let env = Environment::new(
        store.clone(),
        catalog.clone(),
        directory.clone(),
        gateway.clone(),
        notifier,
        Arc::new(test_clock()),
    );
    let server = TestServer::new(build_router(AppState::new(env))).unwrap();

    TestApp {
        server,
        store,
        catalog,
        directory,
        gateway,
    }
}

impl TestApp {
    /// Seeds a flat-seating event and an attendee, for tests that don't
    /// care about plan shape.
    fn seed_flat_event(&self, price_cents: u64, capacity: u32) -> (Uuid, Uuid) {
        let event = EventBuilder::new()
            .days_until(10)
            .flat(price_cents, capacity)
            .build();
        self.catalog.put(event.clone());
        let user = self.directory.add_attendee();
        (*event.id.as_uuid(), *user.as_uuid())
    }

    async fn reserve(&self, event_id: Uuid, user_id: Uuid, quantity: u32) -> Value {
        let response = self
            .server
            .post("/api/reservations")
            .json(&json!({
                "event_id": event_id,
                "user_id": user_id,
                "quantity": quantity,
                "payment_reference": "pay_test"
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()
    }
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn health_endpoint_answers() {
    let app = spawn_app();

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn reserving_seats_returns_a_ticket_and_barcode() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(2500, 100);

    let body = app.reserve(event_id, user_id, 2).await;

    assert_eq!(body["event_id"], event_id.to_string());
    assert_eq!(body["user_id"], user_id.to_string());
    assert_eq!(body["total_quantity"], 2);
    assert_eq!(body["total_amount_cents"], 5000);
    assert!(body["ticket_id"].as_str().unwrap().len() >= 22);
    assert!(body["proof"].as_str().unwrap().len() > 40);
    assert!(body["barcode_svg"].as_str().unwrap().contains("<svg"));
    assert!(body["lines"][0]["category"].is_null());

    let availability = app
        .server
        .get(&format!("/api/events/{event_id}/availability"))
        .await
        .json::<Value>();
    assert_eq!(availability["pools"][0]["reserved"], 2);
    assert_eq!(availability["pools"][0]["available"], 98);
    assert_eq!(availability["total_available"], 98);
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn categorized_reservations_price_each_line() {
    let app = spawn_app();
    let event = EventBuilder::new()
        .days_until(10)
        .categories(&[("vip", 10000, 5), ("general", 2500, 50)])
        .build();
    app.catalog.put(event.clone());
    let user = app.directory.add_attendee();

    let response = app
        .server
        .post("/api/reservations")
        .json(&json!({
            "event_id": event.id.as_uuid(),
            "user_id": user.as_uuid(),
            "categories": [
                {"category": "vip", "quantity": 1},
                {"category": "general", "quantity": 3}
            ]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["total_quantity"], 4);
    assert_eq!(body["total_amount_cents"], 17500);
    assert_eq!(body["lines"][0]["category"], "vip");
    assert_eq!(body["lines"][0]["subtotal_cents"], 10000);
    assert_eq!(body["lines"][1]["category"], "general");
    assert_eq!(body["lines"][1]["subtotal_cents"], 7500);
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn a_request_with_both_seat_shapes_is_rejected() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);

    let response = app
        .server
        .post("/api/reservations")
        .json(&json!({
            "event_id": event_id,
            "user_id": user_id,
            "quantity": 1,
            "categories": [{"category": "vip", "quantity": 1}]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn a_second_reservation_by_the_same_user_conflicts() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);
    app.reserve(event_id, user_id, 1).await;

    let response = app
        .server
        .post("/api/reservations")
        .json(&json!({
            "event_id": event_id,
            "user_id": user_id,
            "quantity": 1
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "DUPLICATE_RESERVATION");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn overselling_reports_inventory_exceeded() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 1);

    let response = app
        .server
        .post("/api/reservations")
        .json(&json!({
            "event_id": event_id,
            "user_id": user_id,
            "quantity": 2
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "INVENTORY_EXCEEDED");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn out_of_range_quantities_fail_validation() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 100);

    let response = app
        .server
        .post("/api/reservations")
        .json(&json!({
            "event_id": event_id,
            "user_id": user_id,
            "quantity": 11
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn a_proof_admits_once_then_conflicts() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);
    let reservation = app.reserve(event_id, user_id, 2).await;
    let proof = reservation["proof"].as_str().unwrap();

    let first = app
        .server
        .post("/api/tickets/verify")
        .json(&json!({"proof": proof, "event_id": event_id}))
        .await;
    assert_eq!(first.status_code(), StatusCode::OK);
    let summary = first.json::<Value>();
    assert_eq!(summary["booking_id"], reservation["booking_id"]);
    assert_eq!(summary["total_quantity"], 2);

    let second = app
        .server
        .post("/api/tickets/verify")
        .json(&json!({"proof": proof, "event_id": event_id}))
        .await;
    assert_eq!(second.status_code(), StatusCode::CONFLICT);
    assert_eq!(second.json::<Value>()["code"], "TICKET_ALREADY_USED");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn a_proof_scanned_at_the_wrong_event_is_rejected_without_consuming_it() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);
    let other_event = EventBuilder::new().days_until(5).flat(500, 10).build();
    app.catalog.put(other_event.clone());

    let reservation = app.reserve(event_id, user_id, 1).await;
    let proof = reservation["proof"].as_str().unwrap();

    let wrong_gate = app
        .server
        .post("/api/tickets/verify")
        .json(&json!({"proof": proof, "event_id": other_event.id.as_uuid()}))
        .await;
    assert_eq!(wrong_gate.status_code(), StatusCode::CONFLICT);
    assert_eq!(wrong_gate.json::<Value>()["code"], "EVENT_MISMATCH");

    let right_gate = app
        .server
        .post("/api/tickets/verify")
        .json(&json!({"proof": proof, "event_id": event_id}))
        .await;
    assert_eq!(right_gate.status_code(), StatusCode::OK);
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn garbage_proofs_are_bad_requests() {
    let app = spawn_app();
    let (event_id, _) = app.seed_flat_event(1000, 10);

    let response = app
        .server
        .post("/api/tickets/verify")
        .json(&json!({"proof": "not-a-proof", "event_id": event_id}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "MALFORMED_PROOF");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn an_early_cancellation_refunds_in_full() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);
    let reservation = app.reserve(event_id, user_id, 2).await;
    let booking_id = reservation["booking_id"].as_str().unwrap();

    let response = app
        .server
        .post(&format!("/api/bookings/{booking_id}/cancel"))
        .json(&json!({"user_id": user_id, "reason": "plans changed"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["refund"]["tier"], "early");
    assert_eq!(body["refund"]["percentage"], 100);
    assert_eq!(body["refund"]["amount_cents"], 2000);
    assert_eq!(body["refund_status"], "processed");
    assert!(body["refund_reference"].as_str().is_some());

    let refunds = app.gateway.refunds();
    assert_eq!(refunds, vec![("pay_test".to_string(), Money::from_cents(2000))]);

    // Seats go straight back on sale
    let availability = app
        .server
        .get(&format!("/api/events/{event_id}/availability"))
        .await
        .json::<Value>();
    assert_eq!(availability["total_available"], 10);
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn strangers_cannot_cancel_someone_elses_booking() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);
    let reservation = app.reserve(event_id, user_id, 1).await;
    let booking_id = reservation["booking_id"].as_str().unwrap();
    let stranger = app.directory.add_attendee();

    let response = app
        .server
        .post(&format!("/api/bookings/{booking_id}/cancel"))
        .json(&json!({"user_id": stranger.as_uuid()}))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "FORBIDDEN");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn cancelling_twice_reports_already_cancelled() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);
    let reservation = app.reserve(event_id, user_id, 1).await;
    let booking_id = reservation["booking_id"].as_str().unwrap();

    app.server
        .post(&format!("/api/bookings/{booking_id}/cancel"))
        .json(&json!({"user_id": user_id}))
        .await;
    let second = app
        .server
        .post(&format!("/api/bookings/{booking_id}/cancel"))
        .json(&json!({"user_id": user_id}))
        .await;

    assert_eq!(second.status_code(), StatusCode::CONFLICT);
    assert_eq!(second.json::<Value>()["code"], "ALREADY_CANCELLED");
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn refund_quote_and_status_read_without_mutating() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(500, 10);
    let reservation = app.reserve(event_id, user_id, 1).await;
    let booking_id = reservation["booking_id"].as_str().unwrap();

    let quote = app
        .server
        .get(&format!(
            "/api/bookings/{booking_id}/refund-quote?user_id={user_id}"
        ))
        .await;
    assert_eq!(quote.status_code(), StatusCode::OK);
    let quote = quote.json::<Value>();
    assert_eq!(quote["percentage"], 100);
    assert_eq!(quote["amount_cents"], 500);

    let before = app
        .server
        .get(&format!(
            "/api/bookings/{booking_id}/refund-status?user_id={user_id}"
        ))
        .await
        .json::<Value>();
    assert_eq!(before["status"], "none");
    assert!(before["amount_cents"].is_null());

    app.server
        .post(&format!("/api/bookings/{booking_id}/cancel"))
        .json(&json!({"user_id": user_id}))
        .await;

    let after = app
        .server
        .get(&format!(
            "/api/bookings/{booking_id}/refund-status?user_id={user_id}"
        ))
        .await
        .json::<Value>();
    assert_eq!(after["status"], "processed");
    assert_eq!(after["amount_cents"], 500);
    assert!(after["reference"].as_str().is_some());
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn booking_lookup_shows_the_holder_their_booking() {
    let app = spawn_app();
    let (event_id, user_id) = app.seed_flat_event(1000, 10);
    let reservation = app.reserve(event_id, user_id, 2).await;
    let booking_id = reservation["booking_id"].as_str().unwrap();

    let response = app
        .server
        .get(&format!("/api/bookings/{booking_id}?user_id={user_id}"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["id"], reservation["booking_id"]);
    assert_eq!(body["ticket_id"], reservation["ticket_id"]);
    assert_eq!(body["verified"], false);
    assert_eq!(body["cancelled"], false);
    assert_eq!(body["refund_status"], "none");

    let stranger = app.directory.add_attendee();
    let forbidden = app
        .server
        .get(&format!(
            "/api/bookings/{booking_id}?user_id={}",
            stranger.as_uuid()
        ))
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn bulk_event_cancellation_is_organizer_only_and_defers_refunds() {
    let app = spawn_app();
    let organizer = app.directory.add_organizer();
    let event = EventBuilder::new()
        .days_until(10)
        .flat(1000, 100)
        .organizer(organizer)
        .build();
    app.catalog.put(event.clone());
    let event_id = *event.id.as_uuid();

    let mut booking_ids = Vec::new();
    for _ in 0..3 {
        let user = app.directory.add_attendee();
        let reservation = app.reserve(event_id, *user.as_uuid(), 2).await;
        booking_ids.push(reservation["booking_id"].as_str().unwrap().to_string());
    }

    let attendee = app.directory.add_attendee();
    let forbidden = app
        .server
        .post(&format!("/api/events/{event_id}/cancel-bookings"))
        .json(&json!({"requested_by": attendee.as_uuid()}))
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .post(&format!("/api/events/{event_id}/cancel-bookings"))
        .json(&json!({"requested_by": organizer.as_uuid(), "reason": "venue flooded"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["bookings_cancelled"], 3);

    // No synchronous gateway traffic; every refund is left pending
    assert!(app.gateway.refunds().is_empty());
    for booking_id in &booking_ids {
        let stored = app
            .store
            .booking(BookingId::from_uuid(booking_id.parse().unwrap()))
            .unwrap();
        assert!(stored.cancelled_by_event);
        assert_eq!(stored.refund_status.as_str(), "pending");
    }

    let availability = app
        .server
        .get(&format!("/api/events/{event_id}/availability"))
        .await
        .json::<Value>();
    assert_eq!(availability["total_available"], 100);
}

#[allow(clippy::unwrap_used)]
#[tokio::test]
async fn availability_for_an_unknown_event_is_not_found() {
    let app = spawn_app();

    let response = app
        .server
        .get(&format!("/api/events/{}/availability", Uuid::new_v4()))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}
