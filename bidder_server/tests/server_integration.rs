//! Integration tests for the HTTP gateway.
//!
//! Drives the router against an in-memory ledger and checks binding,
//! status mapping and response bodies.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bidder::Ledger;
use bidder_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For `oneshot` method

/// Helper to create a test router over a fresh in-memory ledger
fn create_test_server() -> axum::Router {
    create_router(AppState::new(Ledger::in_memory(), None))
}

/// Send a GET request and return status and JSON body
async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Send a POST request with a JSON body
async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_unusable_request_id_is_replaced() {
    let app = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "not a usable id")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let echoed = response.headers().get(REQUEST_ID_HEADER).unwrap();
    assert_ne!(echoed, "not a usable id");
    assert_eq!(echoed.len(), 36);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "req-42"
    );
}

// ============================================================================
// Player Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_fund_take_balance() {
    let app = create_test_server();

    let (status, body) = get(&app, "/fund?playerId=P1&points=300").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"playerId": "P1", "balance": 300}));

    let (status, body) = get(&app, "/take?playerId=P1&points=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 200);

    let (status, body) = get(&app, "/balance?playerId=P1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"playerId": "P1", "balance": 200}));
}

#[tokio::test]
async fn test_take_error_statuses() {
    let app = create_test_server();
    get(&app, "/fund?playerId=P1&points=50").await;

    let (status, body) = get(&app, "/take?playerId=P1&points=51").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "insufficientFunds");

    let (status, body) = get(&app, "/take?playerId=ghost&points=1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "notFoundError");

    let (status, _) = get(&app, "/balance?playerId=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_queries_are_bad_requests() {
    let app = create_test_server();

    for uri in [
        "/fund?playerId=P1",
        "/fund?playerId=P1&points=lots",
        "/take?points=10",
        "/announceTournament?tournamentId=x&deposit=10",
        "/joinTournament?playerId=P1",
        "/joinTournament?tournamentId=1.5&playerId=P1",
        "/balance",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["kind"], "validationError", "{uri}");
    }

    let (status, _) = get(&app, "/fund?playerId=P1&points=-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Tournament Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_backed_tournament_flow() {
    let app = create_test_server();

    get(&app, "/fund?playerId=P1&points=300").await;
    get(&app, "/fund?playerId=P2&points=300").await;
    get(&app, "/fund?playerId=P3&points=300").await;
    get(&app, "/fund?playerId=P4&points=500").await;
    get(&app, "/fund?playerId=P5&points=1000").await;

    let (status, body) = get(&app, "/announceTournament?tournamentId=1&deposit=1000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deposit"], 1000);
    assert_eq!(body["finished"], false);
    assert_eq!(body["state"], "announced");

    let (status, body) = get(
        &app,
        "/joinTournament?tournamentId=1&playerId=P5",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stake"], 1000);

    let (status, body) = get(
        &app,
        "/joinTournament?tournamentId=1&playerId=P1&backerId=P2&backerId=P3&backerId=P4",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stake"], 250);
    assert_eq!(body["members"], 4);

    let (status, body) = get(&app, "/attendances?tournamentId=1").await;
    assert_eq!(status, StatusCode::OK);
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["playerId"], "P1");
    assert_eq!(groups[0]["backers"], json!(["P2", "P3", "P4"]));

    let (status, body) = post_json(
        &app,
        "/resultTournament",
        json!({"tournamentId": 1, "winners": [{"playerId": "P1", "prize": 2000}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unallocated"], 0);

    for (player, expected) in [("P1", 550), ("P2", 550), ("P3", 550), ("P4", 750), ("P5", 0)] {
        let (_, body) = get(&app, &format!("/balance?playerId={player}")).await;
        assert_eq!(body["balance"], expected, "{player}");
    }

    let (status, body) = get(&app, "/tournament?tournamentId=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["finished"], true);
    assert_eq!(body["state"], "finished");
    assert!(body["finishedAt"].is_string());
}

#[tokio::test]
async fn test_non_positive_tournament_ids_are_bad_requests() {
    let app = create_test_server();

    for uri in [
        "/tournament?tournamentId=0",
        "/attendances?tournamentId=-3",
        "/announceTournament?tournamentId=0&deposit=10",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["kind"], "validationError", "{uri}");
    }
}

#[tokio::test]
async fn test_conflicts_map_to_409() {
    let app = create_test_server();
    get(&app, "/fund?playerId=P1&points=1000").await;

    get(&app, "/announceTournament?tournamentId=1&deposit=100").await;
    let (status, body) = get(&app, "/announceTournament?tournamentId=1&deposit=100").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflictError");

    get(&app, "/joinTournament?tournamentId=1&playerId=P1").await;
    let (status, _) = get(&app, "/joinTournament?tournamentId=1&playerId=P1").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let result = json!({"tournamentId": 1, "winners": [{"playerId": "P1", "prize": 10}]});
    let (status, _) = post_json(&app, "/resultTournament", result.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&app, "/resultTournament", result).await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(get(&app, "/balance?playerId=P1").await.1["balance"], 910);
}

#[tokio::test]
async fn test_result_tournament_validation() {
    let app = create_test_server();
    get(&app, "/announceTournament?tournamentId=1&deposit=0").await;

    let (status, _) = post_json(&app, "/resultTournament", json!({"tournamentId": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/resultTournament",
        json!({"tournamentId": 1, "winners": []}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/resultTournament",
        json!({"tournamentId": 1, "winners": [{"playerId": "nobody", "prize": 5}]}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &app,
        "/resultTournament",
        json!({"tournamentId": 9, "winners": [{"playerId": "P1", "prize": 5}]}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_wipes_state() {
    let app = create_test_server();
    get(&app, "/fund?playerId=P1&points=1000").await;
    get(&app, "/announceTournament?tournamentId=1&deposit=100").await;

    let (status, body) = get(&app, "/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["result"].is_string());

    let (status, _) = get(&app, "/balance?playerId=P1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, "/tournament?tournamentId=1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_carries_caller_request_id() {
    let app = create_test_server();
    get(&app, "/fund?playerId=P1&points=10").await;

    let request = Request::builder()
        .uri("/reset")
        .header(REQUEST_ID_HEADER, "ops-wipe-7")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "ops-wipe-7"
    );
    assert_eq!(get(&app, "/balance?playerId=P1").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reset_racing_joins_over_http() {
    let app = create_test_server();
    for i in 0..8 {
        get(&app, &format!("/fund?playerId=P{i}&points=100")).await;
    }
    get(&app, "/announceTournament?tournamentId=1&deposit=100").await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let app = app.clone();
        tasks.spawn(async move {
            let uri = if i == 4 {
                "/reset".to_string()
            } else {
                format!("/joinTournament?tournamentId=1&playerId=P{i}")
            };
            get(&app, &uri).await.0
        });
    }
    while let Some(status) = tasks.join_next().await {
        let status = status.unwrap();
        assert!(
            status == StatusCode::OK || status == StatusCode::NOT_FOUND,
            "{status}"
        );
    }

    assert_eq!(get(&app, "/tournament?tournamentId=1").await.0, StatusCode::NOT_FOUND);
    for i in 0..8 {
        let (status, _) = get(&app, &format!("/balance?playerId=P{i}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "P{i}");
    }
}
