//! Attendance data models.

use crate::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entrant's stake-sharing group in a tournament
///
/// Created once at join time and never modified afterwards. The backers are
/// kept in the order they were submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub tournament_id: TournamentId,
    pub player_id: String,
    pub backers: Vec<String>,
    /// Points debited from each member of the group
    pub stake: i64,
    pub joined_at: DateTime<Utc>,
}

impl Attendance {
    /// Entrant followed by backers
    pub fn members(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.player_id.as_str()).chain(self.backers.iter().map(String::as_str))
    }

    /// Size of the group, entrant included
    pub fn group_size(&self) -> usize {
        self.backers.len() + 1
    }
}

/// Join request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub tournament_id: TournamentId,
    pub player_id: String,
    #[serde(default)]
    pub backers: Vec<String>,
}

/// Outcome of a successful join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReceipt {
    pub tournament_id: TournamentId,
    pub player_id: String,
    /// Points debited from each member
    pub stake: i64,
    /// Entrant plus backers
    pub members: usize,
    /// Part of the deposit not collected because of integer division
    pub unallocated: i64,
}
