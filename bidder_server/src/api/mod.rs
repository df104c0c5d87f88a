//! HTTP API for the ledger.
//!
//! Query-string endpoints for the player and tournament commands, a JSON
//! endpoint for tournament results, and a health check.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /fund?playerId&points                            - Fund a player
//! GET  /take?playerId&points                            - Take points from a player
//! GET  /announceTournament?tournamentId&deposit         - Announce a tournament
//! GET  /joinTournament?tournamentId&playerId&backerId…  - Join, optionally backed
//! POST /resultTournament                                - Finish and pay prizes
//! GET  /balance?playerId                                - Player balance
//! GET  /tournament?tournamentId                         - Tournament state
//! GET  /attendances?tournamentId                        - Entrant groups
//! GET  /reset                                           - Wipe all ledger state
//! GET  /health                                          - Health check
//! ```
//!
//! Ledger error kinds map onto status codes: validation and insufficient
//! funds `400`, missing rows `404`, conflicts `409`, store failures `500`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bidder::Ledger;
//! use bidder_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_router(AppState::new(Ledger::in_memory(), None));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ledger;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use bidder::{Ledger, db::Database};
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; both fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    /// Present when the ledger runs on PostgreSQL
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(ledger: Ledger, database: Option<Database>) -> Self {
        Self { ledger, database }
    }
}

/// Create the API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/fund", get(ledger::fund))
        .route("/take", get(ledger::take))
        .route("/announceTournament", get(ledger::announce_tournament))
        .route("/joinTournament", get(ledger::join_tournament))
        .route("/resultTournament", post(ledger::result_tournament))
        .route("/balance", get(ledger::balance))
        .route("/tournament", get(ledger::tournament))
        .route("/attendances", get(ledger::attendances))
        .route("/reset", get(ledger::reset))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store is reachable, `503 Service Unavailable`
/// otherwise. The in-memory store is always reachable.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":"postgres","database":true,"timestamp":"2026-01-05T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (store, healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "database": healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
