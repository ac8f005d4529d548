use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use courier_dispatch::api::rest::router;
use courier_dispatch::models::timestamp;
use courier_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(64)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Two bikes in regions 1-3 working 11:00-12:00 and a mix of orders, only
/// 10 and 11 fit either of them.
async fn seeded() -> axum::Router {
    let app = setup();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/couriers",
            json!([
                { "courier_id": 1, "courier_type": "bike", "regions": [1, 2, 3], "working_hours": ["11:00-12:00"] },
                { "courier_id": 2, "courier_type": "bike", "regions": [1, 2, 3], "working_hours": ["11:00-12:00"] }
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/orders",
            json!([
                { "order_id": 10, "weight": 14, "region": 1, "delivery_hours": ["11:00-13:00"] },
                { "order_id": 11, "weight": 14, "region": 1, "delivery_hours": ["11:00-13:00"] },
                { "order_id": 20, "weight": 16, "region": 3, "delivery_hours": ["11:30-18:00"] },
                { "order_id": 30, "weight": 14, "region": 30, "delivery_hours": ["11:30-18:00"] },
                { "order_id": 40, "weight": 14, "region": 1, "delivery_hours": ["13:00-14:00"] }
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    app
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let (status, body) = send(&app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["orders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = seeded().await;
    send(&app, json_request("POST", "/orders/assign", json!({ "courier_id": 1 }))).await;

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_assigned_total 2"));
    assert!(body.contains("unassigned_orders 3"));
}

#[tokio::test]
async fn create_couriers_returns_ids() {
    let app = setup();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/couriers",
            json!([
                { "courier_id": 6, "courier_type": "foot", "regions": [1, 12, 22], "working_hours": ["11:35-14:05", "09:00-11:00"] },
                { "courier_id": 5, "courier_type": "bike", "regions": [22], "working_hours": ["09:00-18:00"] },
                { "courier_id": 4, "courier_type": "car", "regions": [12, 22, 23, 33], "working_hours": [] }
            ]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "couriers": [{ "id": 6 }, { "id": 5 }, { "id": 4 }] }));

    let (status, courier) = send(&app, get_request("/couriers/6")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courier["courier_type"], "foot");
    assert_eq!(courier["regions"], json!([1, 12, 22]));
    assert_eq!(courier["working_hours"], json!(["11:35-14:05", "09:00-11:00"]));
    assert_eq!(courier["earnings"], 0);
    assert!(courier.get("rating").is_none());
}

#[tokio::test]
async fn invalid_couriers_reject_whole_import() {
    let app = setup();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/couriers",
            json!([
                { "courier_id": 0, "courier_type": "foot", "regions": [1], "working_hours": [] },
                { "courier_id": 6, "courier_type": "bike", "regions": [22], "working_hours": ["09:00-18:00", 23] },
                { "courier_id": 5, "courier_type": "bike", "regions": ["qwe", 1], "working_hours": ["09:00-18:00"] },
                { "courier_id": 4, "courier_type": "feet", "regions": [12], "working_hours": [] },
                { "courier_id": 3, "courier_type": "car", "regions": [12], "working_hours": [] }
            ]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["validation_error"]["couriers"].as_array().unwrap().len(), 4);

    let (status, _) = send(&app, get_request("/couriers/3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_order_ids_are_rejected() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/orders",
            json!([
                { "order_id": 1, "weight": 0.11, "region": 12, "delivery_hours": ["09:00-18:00"] },
                { "order_id": 10, "weight": 1, "region": 1, "delivery_hours": ["09:00-18:00"] }
            ]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["validation_error"]["orders"][0]["id"], 10);

    let (status, _) = send(&app, get_request("/orders/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assign_is_idempotent_while_batch_is_open() {
    let app = seeded().await;
    let request = || json_request("POST", "/orders/assign", json!({ "courier_id": 1 }));

    let (status, first) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["orders"], json!([{ "id": 10 }, { "id": 11 }]));
    let assign_time = first["assign_time"].as_str().unwrap();
    assert!(timestamp::parse(assign_time).is_ok());

    let (_, second) = send(&app, request()).await;
    assert_eq!(first, second);

    let (_, order) = send(&app, get_request("/orders/10")).await;
    assert_eq!(order["courier_id"], 1);
    assert_eq!(order["assign_time"], assign_time);
}

#[tokio::test]
async fn empty_batch_has_no_assign_time() {
    let app = seeded().await;
    send(&app, json_request("POST", "/orders/assign", json!({ "courier_id": 1 }))).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/orders/assign", json!({ "courier_id": 2 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "orders": [] }));
}

#[tokio::test]
async fn assign_unknown_courier_returns_404() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        json_request("POST", "/orders/assign", json!({ "courier_id": 99 })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn assign_rejects_unknown_fields() {
    let app = seeded().await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/orders/assign",
            json!({ "courier_id": 1, "priority": "high" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
    assert!(body["error"].as_str().unwrap().contains("priority"));

    let (_, order) = send(&app, get_request("/orders/10")).await;
    assert!(order["courier_id"].is_null());
}

#[tokio::test]
async fn malformed_bodies_get_structured_errors() {
    let app = seeded().await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 1, "order_id": "ten", "complete_time": "2021-01-10T10:33:01.42Z" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");

    let (status, body) = send(
        &app,
        json_request("POST", "/couriers", json!({ "courier_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn complete_then_stats_reports_rating() {
    let app = seeded().await;
    let (_, batch) = send(
        &app,
        json_request("POST", "/orders/assign", json!({ "courier_id": 1 })),
    )
    .await;
    let assigned_at = timestamp::parse(batch["assign_time"].as_str().unwrap()).unwrap();

    let (_, before) = send(&app, get_request("/couriers/1")).await;
    assert_eq!(before["earnings"], 2 * 500 * 5);
    assert!(before.get("rating").is_none());

    let complete_time = timestamp::format(&(assigned_at + Duration::minutes(10)));
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 1, "order_id": 10, "complete_time": complete_time }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "order_id": 10 }));

    let (_, after) = send(&app, get_request("/couriers/1")).await;
    assert_eq!(after["earnings"], before["earnings"]);
    assert_eq!(after["rating"], 4.17);
}

#[tokio::test]
async fn complete_failures_map_to_kinds() {
    let app = seeded().await;
    send(&app, json_request("POST", "/orders/assign", json!({ "courier_id": 1 }))).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 2, "order_id": 10, "complete_time": "2021-01-10T10:33:01.42Z" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 1, "order_id": 10, "complete_time": "10:33 yesterday" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_timestamp");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 1, "order_id": 77, "complete_time": "2021-01-10T10:33:01.42Z" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn narrowing_regions_returns_orders_to_pool() {
    let app = seeded().await;
    send(&app, json_request("POST", "/orders/assign", json!({ "courier_id": 1 }))).await;

    let (status, courier) = send(
        &app,
        json_request("PATCH", "/couriers/1", json!({ "regions": [2, 3] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        courier,
        json!({
            "courier_id": 1,
            "courier_type": "bike",
            "regions": [2, 3],
            "working_hours": ["11:00-12:00"]
        })
    );

    let (_, order) = send(&app, get_request("/orders/10")).await;
    assert!(order["courier_id"].is_null());
    assert!(order["assign_time"].is_null());

    let (_, batch) = send(
        &app,
        json_request("POST", "/orders/assign", json!({ "courier_id": 2 })),
    )
    .await;
    assert_eq!(batch["orders"], json!([{ "id": 10 }, { "id": 11 }]));
}

#[tokio::test]
async fn patch_rejects_id_change_and_unknown_courier() {
    let app = seeded().await;

    let (status, body) = send(
        &app,
        json_request("PATCH", "/couriers/1", json!({ "courier_id": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");

    let (status, _) = send(
        &app,
        json_request("PATCH", "/couriers/42", json!({ "regions": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
