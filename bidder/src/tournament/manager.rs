//! Tournament manager for announcing tournaments and paying out results.

use super::models::{Credit, FinishReceipt, Tournament, TournamentId, Winner};
use crate::errors::{LedgerError, LedgerResult};
use crate::shares::split_evenly;
use crate::store::LedgerStore;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Reject ids that are not positive
pub(crate) fn validate_tournament_id(tournament_id: TournamentId) -> LedgerResult<()> {
    if tournament_id <= 0 {
        return Err(LedgerError::InvalidTournamentId(tournament_id));
    }
    Ok(())
}

fn validate_winners(winners: &[Winner]) -> LedgerResult<()> {
    if winners.is_empty() {
        return Err(LedgerError::NoWinners);
    }

    let mut seen = HashSet::with_capacity(winners.len());
    for winner in winners {
        if winner.player_id.is_empty() {
            return Err(LedgerError::InvalidPlayerId);
        }
        if winner.prize < 0 {
            return Err(LedgerError::InvalidAmount(winner.prize));
        }
        if !seen.insert(winner.player_id.as_str()) {
            return Err(LedgerError::DuplicateWinner(winner.player_id.clone()));
        }
    }

    Ok(())
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn LedgerStore>,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Announce a new tournament
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Positive tournament id chosen by the caller
    /// * `deposit` - Points each entrant group pays to join
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidTournamentId` - Id is not positive
    /// * `LedgerError::InvalidAmount` - Negative deposit
    /// * `LedgerError::TournamentExists` - Id already announced
    pub async fn announce(
        &self,
        tournament_id: TournamentId,
        deposit: i64,
    ) -> LedgerResult<Tournament> {
        validate_tournament_id(tournament_id)?;
        if deposit < 0 {
            return Err(LedgerError::InvalidAmount(deposit));
        }

        let mut tx = self.store.begin().await?;
        if !tx.insert_tournament(tournament_id, deposit).await? {
            return Err(LedgerError::TournamentExists(tournament_id));
        }
        tx.commit().await?;

        log::info!("Announced tournament {tournament_id} with deposit {deposit}");
        Ok(Tournament::announced(tournament_id, deposit))
    }

    /// Finish a tournament and pay every winner's prize to its group
    ///
    /// Each prize is split evenly across the winner and the backers recorded
    /// when that winner joined. All credits and the finished flag commit
    /// together; any failure leaves the ledger untouched.
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Tournament ID
    /// * `winners` - Winning entrants with their prizes
    ///
    /// # Returns
    ///
    /// * `LedgerResult<FinishReceipt>` - Credited amounts per player
    ///
    /// # Errors
    ///
    /// * `LedgerError::NoWinners`, `InvalidPlayerId`, `InvalidAmount`,
    ///   `DuplicateWinner` - Malformed result
    /// * `LedgerError::TournamentNotFound` - No such tournament
    /// * `LedgerError::AlreadyFinished` - Tournament was finished before
    /// * `LedgerError::AttendanceNotFound` - A winner never joined
    pub async fn finish(
        &self,
        tournament_id: TournamentId,
        winners: &[Winner],
    ) -> LedgerResult<FinishReceipt> {
        validate_tournament_id(tournament_id)?;
        validate_winners(winners)?;

        let mut tx = self.store.begin().await?;

        let tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or(LedgerError::TournamentNotFound(tournament_id))?;

        if tournament.finished {
            return Err(LedgerError::AlreadyFinished(tournament_id));
        }

        let mut credits: BTreeMap<String, i64> = BTreeMap::new();
        let mut unallocated = 0i64;

        for winner in winners {
            // Attendances never change after join, no lock needed.
            let attendance = tx
                .find_attendance(tournament_id, &winner.player_id)
                .await?
                .ok_or_else(|| LedgerError::AttendanceNotFound {
                    tournament_id,
                    player_id: winner.player_id.clone(),
                })?;

            let split = split_evenly(winner.prize, attendance.group_size());
            unallocated = unallocated.saturating_add(split.unallocated);

            for member in attendance.members() {
                let credit = credits.entry(member.to_string()).or_insert(0);
                *credit = credit
                    .checked_add(split.per_member)
                    .ok_or_else(|| LedgerError::BalanceOverflow(member.to_string()))?;
            }
        }

        let player_ids: Vec<String> = credits.keys().cloned().collect();
        let players = tx.lock_players(&player_ids).await?;
        if players.len() != player_ids.len() {
            let found: HashSet<&str> = players.iter().map(|p| p.player_id.as_str()).collect();
            let missing = player_ids
                .iter()
                .find(|id| !found.contains(id.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(LedgerError::PlayerNotFound(missing));
        }

        for player in &players {
            let amount = credits[&player.player_id];
            let balance = player
                .balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::BalanceOverflow(player.player_id.clone()))?;
            tx.set_balance(&player.player_id, balance).await?;
        }

        tx.mark_finished(tournament_id).await?;
        tx.commit().await?;

        log::info!(
            "Finished tournament {tournament_id}: {} winner(s), {} player(s) credited, {unallocated} points unallocated",
            winners.len(),
            credits.len()
        );

        Ok(FinishReceipt {
            tournament_id,
            credits: credits
                .into_iter()
                .map(|(player_id, amount)| Credit { player_id, amount })
                .collect(),
            unallocated,
        })
    }

    /// Get a tournament
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidTournamentId` - Id is not positive
    /// * `LedgerError::TournamentNotFound` - No such tournament
    pub async fn find_tournament(&self, tournament_id: TournamentId) -> LedgerResult<Tournament> {
        validate_tournament_id(tournament_id)?;

        let mut tx = self.store.begin().await?;
        let tournament = tx
            .find_tournament(tournament_id)
            .await?
            .ok_or(LedgerError::TournamentNotFound(tournament_id))?;
        tx.commit().await?;

        Ok(tournament)
    }
}
