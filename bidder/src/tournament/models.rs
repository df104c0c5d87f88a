//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TournamentState {
    /// Accepting entrants
    Announced,
    /// Prizes paid out, terminal
    Finished,
}

/// Tournament model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub deposit: i64,
    pub finished: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// A freshly announced tournament
    pub fn announced(id: TournamentId, deposit: i64) -> Self {
        Self {
            id,
            deposit,
            finished: false,
            finished_at: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TournamentState {
        if self.finished {
            TournamentState::Finished
        } else {
            TournamentState::Announced
        }
    }
}

/// A winner entry in a tournament result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub player_id: String,
    pub prize: i64,
}

impl Winner {
    pub fn new(player_id: impl Into<String>, prize: i64) -> Self {
        Self {
            player_id: player_id.into(),
            prize,
        }
    }
}

/// Tournament result submitted to finish a tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRequest {
    pub tournament_id: TournamentId,
    pub winners: Vec<Winner>,
}

/// Points credited to one player by a finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    pub player_id: String,
    pub amount: i64,
}

/// Outcome of a successful finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishReceipt {
    pub tournament_id: TournamentId,
    /// One entry per credited player, ordered by player id
    pub credits: Vec<Credit>,
    /// Sum of prize remainders left unallocated by integer division
    pub unallocated: i64,
}
