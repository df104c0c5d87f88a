//! Ledger error types.

use crate::tournament::TournamentId;
use thiserror::Error;

/// Coarse error taxonomy handed to the gateway.
///
/// The core never speaks in transport codes; a gateway maps each kind to
/// whatever its protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, out-of-range or duplicate input
    Validation,
    /// A referenced player, tournament or attendance is absent
    NotFound,
    /// The command collides with existing state (already exists/joined/finished)
    Conflict,
    /// A debit would drive a balance negative
    InsufficientFunds,
    /// Store unavailable or unexpected failure
    Internal,
}

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Player id is empty
    #[error("Player id must not be empty")]
    InvalidPlayerId,

    /// Points amount is negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Tournament id is not a positive number
    #[error("Invalid tournament id: {0}")]
    InvalidTournamentId(TournamentId),

    /// Entrant and backers are not pairwise distinct
    #[error("Every player in a group must be unique: {0} appears twice")]
    DuplicateGroupMember(String),

    /// A winner is listed more than once
    #[error("Winner {0} is listed more than once")]
    DuplicateWinner(String),

    /// Result submitted without winners
    #[error("Winners list must not be empty")]
    NoWinners,

    /// Crediting would overflow the balance
    #[error("Balance overflow for player {0}")]
    BalanceOverflow(String),

    /// Player not found
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    /// Some members of a join group have no account
    #[error("Not every player could be retrieved, missing: {}", .0.join(", "))]
    IncompletePlayers(Vec<String>),

    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Player never joined the tournament
    #[error("Player {player_id} did not join tournament {tournament_id}")]
    AttendanceNotFound {
        tournament_id: TournamentId,
        player_id: String,
    },

    /// Tournament id already taken
    #[error("Tournament {0} already exists")]
    TournamentExists(TournamentId),

    /// Entrant already joined this tournament
    #[error("Player {player_id} already joined tournament {tournament_id}")]
    AlreadyJoined {
        tournament_id: TournamentId,
        player_id: String,
    },

    /// Tournament is finished
    #[error("Tournament {0} is already finished")]
    AlreadyFinished(TournamentId),

    /// Insufficient balance
    #[error("Insufficient funds for player {player_id}: available {available}, required {required}")]
    InsufficientFunds {
        player_id: String,
        available: i64,
        required: i64,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store failure outside the database driver
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Classify the error into the gateway-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidPlayerId
            | LedgerError::InvalidAmount(_)
            | LedgerError::InvalidTournamentId(_)
            | LedgerError::DuplicateGroupMember(_)
            | LedgerError::DuplicateWinner(_)
            | LedgerError::NoWinners
            | LedgerError::BalanceOverflow(_) => ErrorKind::Validation,
            LedgerError::PlayerNotFound(_)
            | LedgerError::IncompletePlayers(_)
            | LedgerError::TournamentNotFound(_)
            | LedgerError::AttendanceNotFound { .. } => ErrorKind::NotFound,
            LedgerError::TournamentExists(_)
            | LedgerError::AlreadyJoined { .. }
            | LedgerError::AlreadyFinished(_) => ErrorKind::Conflict,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::Database(_) | LedgerError::Migration(_) | LedgerError::Store(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Get a client-safe error message that doesn't leak store internals
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
