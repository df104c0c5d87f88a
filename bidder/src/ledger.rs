//! Command surface of the ledger.
//!
//! [`Ledger`] bundles the player, tournament and attendance managers over one
//! shared store and exposes the commands a gateway calls. Every command runs
//! as exactly one store transaction.

use crate::attendance::{Attendance, AttendanceManager, JoinReceipt};
use crate::errors::LedgerResult;
use crate::player::{Player, PlayerManager};
use crate::store::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use crate::tournament::{FinishReceipt, Tournament, TournamentId, TournamentManager, Winner};
use sqlx::PgPool;
use std::sync::Arc;

/// Points ledger
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    players: PlayerManager,
    tournaments: TournamentManager,
    attendance: AttendanceManager,
}

impl Ledger {
    /// Create a ledger over an injected store
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            players: PlayerManager::new(store.clone()),
            tournaments: TournamentManager::new(store.clone()),
            attendance: AttendanceManager::new(store.clone()),
            store,
        }
    }

    /// Ledger backed by PostgreSQL
    pub fn postgres(pool: Arc<PgPool>) -> Self {
        Self::new(Arc::new(PgLedgerStore::new(pool)))
    }

    /// Ledger kept in process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedgerStore::new()))
    }

    /// Add points to a player, creating it if needed
    pub async fn fund(&self, player_id: &str, points: i64) -> LedgerResult<i64> {
        self.players.fund(player_id, points).await
    }

    /// Take points from a player
    pub async fn take(&self, player_id: &str, points: i64) -> LedgerResult<i64> {
        self.players.take(player_id, points).await
    }

    /// Announce a tournament
    pub async fn announce_tournament(
        &self,
        tournament_id: TournamentId,
        deposit: i64,
    ) -> LedgerResult<Tournament> {
        self.tournaments.announce(tournament_id, deposit).await
    }

    /// Join a tournament with optional backers
    pub async fn join_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
        backers: &[String],
    ) -> LedgerResult<JoinReceipt> {
        self.attendance.join(tournament_id, player_id, backers).await
    }

    /// Submit a tournament result and pay out prizes
    pub async fn result_tournament(
        &self,
        tournament_id: TournamentId,
        winners: &[Winner],
    ) -> LedgerResult<FinishReceipt> {
        self.tournaments.finish(tournament_id, winners).await
    }

    /// Current balance of a player
    pub async fn balance(&self, player_id: &str) -> LedgerResult<Player> {
        self.players.find_player(player_id).await
    }

    /// Look up a tournament
    pub async fn tournament(&self, tournament_id: TournamentId) -> LedgerResult<Tournament> {
        self.tournaments.find_tournament(tournament_id).await
    }

    /// Entrant groups of a tournament
    pub async fn attendances(&self, tournament_id: TournamentId) -> LedgerResult<Vec<Attendance>> {
        self.attendance.list_attendances(tournament_id).await
    }

    /// Wipe every player, tournament and attendance in one transaction.
    ///
    /// Waits for in-flight commands to finish and holds off new ones until
    /// the wipe is committed.
    pub async fn reset(&self) -> LedgerResult<()> {
        let mut tx = self.store.begin_exclusive().await?;
        tx.clear().await?;
        tx.commit().await?;

        log::warn!("Ledger reset: all players, tournaments and attendances removed");
        Ok(())
    }
}
