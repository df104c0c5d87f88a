//! Ledger API handlers.
//!
//! One handler per ledger command. Query strings and JSON bodies are bound
//! here; anything malformed is answered with `400 Bad Request` before the
//! ledger is called.
//!
//! # Examples
//!
//! ```bash
//! curl "http://localhost:8080/fund?playerId=P1&points=300"
//! curl "http://localhost:8080/joinTournament?tournamentId=1&playerId=P1&backerId=P2&backerId=P3"
//! curl -X POST http://localhost:8080/resultTournament \
//!   -H "Content-Type: application/json" \
//!   -d '{"tournamentId": 1, "winners": [{"playerId": "P1", "prize": 2000}]}'
//! ```

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use bidder::{
    attendance::{Attendance, JoinReceipt, JoinRequest},
    player::Player,
    tournament::{FinishReceipt, ResultRequest, Tournament, TournamentId, TournamentState},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use super::request_id::RequestId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsParams {
    pub player_id: String,
    pub points: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceParams {
    pub tournament_id: TournamentId,
    pub deposit: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerParams {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentParams {
    pub tournament_id: TournamentId,
}

/// Tournament as returned by the API, with its lifecycle state spelled out
#[derive(Debug, Serialize)]
pub struct TournamentView {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub state: TournamentState,
}

impl From<Tournament> for TournamentView {
    fn from(tournament: Tournament) -> Self {
        Self {
            state: tournament.state(),
            tournament,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub result: &'static str,
}

/// Bind the join query string.
///
/// `backerId` may repeat; backers keep the order they were given in.
fn bind_join(pairs: Vec<(String, String)>) -> Result<JoinRequest, ApiError> {
    let mut tournament_id = None;
    let mut player_id = None;
    let mut backers = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "tournamentId" => {
                let id = value.parse::<TournamentId>().map_err(|e| {
                    ApiError::BadRequest(format!("Invalid tournamentId '{value}': {e}"))
                })?;
                tournament_id = Some(id);
            }
            "playerId" => player_id = Some(value),
            "backerId" => backers.push(value),
            _ => {}
        }
    }

    Ok(JoinRequest {
        tournament_id: tournament_id
            .ok_or_else(|| ApiError::BadRequest("Missing field `tournamentId`".to_string()))?,
        player_id: player_id
            .ok_or_else(|| ApiError::BadRequest("Missing field `playerId`".to_string()))?,
        backers,
    })
}

/// Add points to a player, creating the account on first funding.
///
/// `GET /fund?playerId=P1&points=300`
///
/// # Response
///
/// Returns `200 OK` with the player's new balance:
/// ```json
/// {"playerId": "P1", "balance": 300}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing/invalid parameters, negative points, overflow
pub async fn fund(
    State(state): State<AppState>,
    query: Result<Query<PointsParams>, QueryRejection>,
) -> Result<Json<Player>, ApiError> {
    let Query(params) = query?;
    let balance = state.ledger.fund(&params.player_id, params.points).await?;

    Ok(Json(Player {
        player_id: params.player_id,
        balance,
    }))
}

/// Take points from a player.
///
/// `GET /take?playerId=P1&points=100`
///
/// # Errors
///
/// - `400 Bad Request`: Invalid parameters or insufficient funds
/// - `404 Not Found`: No such player
pub async fn take(
    State(state): State<AppState>,
    query: Result<Query<PointsParams>, QueryRejection>,
) -> Result<Json<Player>, ApiError> {
    let Query(params) = query?;
    let balance = state.ledger.take(&params.player_id, params.points).await?;

    Ok(Json(Player {
        player_id: params.player_id,
        balance,
    }))
}

/// Announce a tournament.
///
/// `GET /announceTournament?tournamentId=1&deposit=1000`
///
/// # Errors
///
/// - `400 Bad Request`: Invalid id or negative deposit
/// - `409 Conflict`: Tournament id already announced
pub async fn announce_tournament(
    State(state): State<AppState>,
    query: Result<Query<AnnounceParams>, QueryRejection>,
) -> Result<Json<TournamentView>, ApiError> {
    let Query(params) = query?;
    let tournament = state
        .ledger
        .announce_tournament(params.tournament_id, params.deposit)
        .await?;

    Ok(Json(tournament.into()))
}

/// Join a tournament, optionally backed by other players.
///
/// `GET /joinTournament?tournamentId=1&playerId=P1&backerId=P2&backerId=P3`
///
/// # Response
///
/// Returns `200 OK` with the stake debited from each member:
/// ```json
/// {"tournamentId": 1, "playerId": "P1", "stake": 333, "members": 3, "unallocated": 1}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid parameters, duplicate members, insufficient funds
/// - `404 Not Found`: Tournament or a group member does not exist
/// - `409 Conflict`: Already joined or tournament finished
pub async fn join_tournament(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<JoinReceipt>, ApiError> {
    let Query(pairs) = query?;
    let request = bind_join(pairs)?;

    let receipt = state
        .ledger
        .join_tournament(request.tournament_id, &request.player_id, &request.backers)
        .await?;

    Ok(Json(receipt))
}

/// Submit the result of a tournament and pay out prizes.
///
/// `POST /resultTournament` with body
/// `{"tournamentId": 1, "winners": [{"playerId": "P1", "prize": 2000}]}`
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, no winners, duplicate winners, negative prize
/// - `404 Not Found`: Tournament absent or a winner never joined it
/// - `409 Conflict`: Tournament already finished
pub async fn result_tournament(
    State(state): State<AppState>,
    body: Result<Json<ResultRequest>, JsonRejection>,
) -> Result<Json<FinishReceipt>, ApiError> {
    let Json(request) = body?;
    let receipt = state
        .ledger
        .result_tournament(request.tournament_id, &request.winners)
        .await?;

    Ok(Json(receipt))
}

/// Current balance of a player.
///
/// `GET /balance?playerId=P1`
pub async fn balance(
    State(state): State<AppState>,
    query: Result<Query<PlayerParams>, QueryRejection>,
) -> Result<Json<Player>, ApiError> {
    let Query(params) = query?;
    Ok(Json(state.ledger.balance(&params.player_id).await?))
}

/// Look up a tournament.
///
/// `GET /tournament?tournamentId=1`
///
/// ```json
/// {"id": 1, "deposit": 1000, "finished": false, "finishedAt": null, "state": "announced"}
/// ```
pub async fn tournament(
    State(state): State<AppState>,
    query: Result<Query<TournamentParams>, QueryRejection>,
) -> Result<Json<TournamentView>, ApiError> {
    let Query(params) = query?;
    Ok(Json(state.ledger.tournament(params.tournament_id).await?.into()))
}

/// Entrant groups of a tournament.
///
/// `GET /attendances?tournamentId=1`
pub async fn attendances(
    State(state): State<AppState>,
    query: Result<Query<TournamentParams>, QueryRejection>,
) -> Result<Json<Vec<Attendance>>, ApiError> {
    let Query(params) = query?;
    Ok(Json(state.ledger.attendances(params.tournament_id).await?))
}

/// Wipe all ledger state.
///
/// `GET /reset`
pub async fn reset(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<Json<ResetResponse>, ApiError> {
    state.ledger.reset().await?;
    tracing::warn!(request_id = %request_id.as_str(), "Ledger reset through the API");

    Ok(Json(ResetResponse {
        result: "Ledger is in a clean state",
    }))
}
