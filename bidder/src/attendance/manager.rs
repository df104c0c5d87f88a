//! Attendance manager: joining tournaments and collecting stakes.

use super::models::{Attendance, JoinReceipt};
use crate::errors::{LedgerError, LedgerResult};
use crate::shares::{split_evenly, stake_group};
use crate::store::LedgerStore;
use crate::tournament::TournamentId;
use crate::tournament::manager::validate_tournament_id;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

/// Attendance manager
#[derive(Clone)]
pub struct AttendanceManager {
    store: Arc<dyn LedgerStore>,
}

impl AttendanceManager {
    /// Create a new attendance manager
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Join a tournament, optionally backed by other players
    ///
    /// The tournament deposit is split evenly across the entrant and the
    /// backers and debited from each of them. The tournament row, the
    /// attendance slot and every member's account stay locked until the
    /// transaction commits, so only one join per `(tournament, entrant)` can
    /// ever succeed and no member's balance goes negative.
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Tournament to join
    /// * `player_id` - Entrant
    /// * `backers` - Players sharing the entrant's stake and winnings
    ///
    /// # Returns
    ///
    /// * `LedgerResult<JoinReceipt>` - Stake debited per member or error
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidPlayerId` / `DuplicateGroupMember` - Bad group
    /// * `LedgerError::TournamentNotFound` - No such tournament
    /// * `LedgerError::AlreadyFinished` - Tournament is over
    /// * `LedgerError::AlreadyJoined` - Entrant already joined
    /// * `LedgerError::IncompletePlayers` - Some members have no account
    /// * `LedgerError::InsufficientFunds` - A member cannot cover the stake
    pub async fn join(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
        backers: &[String],
    ) -> LedgerResult<JoinReceipt> {
        validate_tournament_id(tournament_id)?;
        let group = stake_group(player_id, backers)?;

        let mut tx = self.store.begin().await?;

        let tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or(LedgerError::TournamentNotFound(tournament_id))?;

        if tournament.finished {
            return Err(LedgerError::AlreadyFinished(tournament_id));
        }

        if tx.lock_attendance(tournament_id, player_id).await?.is_some() {
            return Err(LedgerError::AlreadyJoined {
                tournament_id,
                player_id: player_id.to_string(),
            });
        }

        let players: HashMap<String, i64> = tx
            .lock_players(&group)
            .await?
            .into_iter()
            .map(|p| (p.player_id, p.balance))
            .collect();

        if players.len() != group.len() {
            let missing = group
                .iter()
                .filter(|id| !players.contains_key(*id))
                .cloned()
                .collect();
            return Err(LedgerError::IncompletePlayers(missing));
        }

        let split = split_evenly(tournament.deposit, group.len());

        for member in &group {
            let balance = players[member];
            if balance < split.per_member {
                log::debug!(
                    "Rejected join of {player_id} to tournament {tournament_id}: {member} holds {balance}, stake {}",
                    split.per_member
                );
                return Err(LedgerError::InsufficientFunds {
                    player_id: member.clone(),
                    available: balance,
                    required: split.per_member,
                });
            }
        }

        for member in &group {
            tx.set_balance(member, players[member] - split.per_member)
                .await?;
        }

        let attendance = Attendance {
            tournament_id,
            player_id: player_id.to_string(),
            backers: backers.to_vec(),
            stake: split.per_member,
            joined_at: Utc::now(),
        };
        tx.insert_attendance(&attendance).await?;
        tx.commit().await?;

        log::info!(
            "Player {player_id} joined tournament {tournament_id} with {} backer(s), stake {} each",
            backers.len(),
            split.per_member
        );

        Ok(JoinReceipt {
            tournament_id,
            player_id: player_id.to_string(),
            stake: split.per_member,
            members: split.members,
            unallocated: split.unallocated,
        })
    }

    /// List the entrant groups of a tournament
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidTournamentId` - Id is not positive
    /// * `LedgerError::TournamentNotFound` - No such tournament
    pub async fn list_attendances(
        &self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Vec<Attendance>> {
        validate_tournament_id(tournament_id)?;

        let mut tx = self.store.begin().await?;

        if tx.find_tournament(tournament_id).await?.is_none() {
            return Err(LedgerError::TournamentNotFound(tournament_id));
        }

        let attendances = tx.list_attendances(tournament_id).await?;
        tx.commit().await?;

        Ok(attendances)
    }
}
