//! Ledger store abstraction.
//!
//! The managers never talk to a database directly. They open a transaction
//! on an injected [`LedgerStore`] and drive it through the row-level
//! operations of [`LedgerTx`]. Every `lock_*` call takes an exclusive lock on
//! the row that lives until the transaction commits or is dropped; dropping
//! an uncommitted transaction rolls it back.
//!
//! Locks are always taken in the same global order:
//! tournament row, then attendance row, then player rows by ascending id.
//! A reset bypasses the row locks and instead runs in an exclusive
//! transaction that excludes every other one.
//!
//! Two bindings exist:
//! - [`PgLedgerStore`]: PostgreSQL through sqlx, `SELECT ... FOR UPDATE`
//! - [`MemoryLedgerStore`]: in-process, per-row async mutexes

use async_trait::async_trait;

use crate::attendance::Attendance;
use crate::errors::LedgerResult;
use crate::player::Player;
use crate::tournament::{Tournament, TournamentId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Transaction provider
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>>;

    /// Open a transaction that runs alone.
    ///
    /// It waits until every open transaction has finished, and no other
    /// transaction makes progress until it commits or is dropped. Only an
    /// exclusive transaction may `clear` the store.
    async fn begin_exclusive(&self) -> LedgerResult<Box<dyn LedgerTx>>;
}

/// A single store transaction
#[async_trait]
pub trait LedgerTx: Send {
    /// Create the player with `amount` or add `amount` to its balance.
    /// Returns the new balance.
    async fn credit_player(&mut self, player_id: &str, amount: i64) -> LedgerResult<i64>;

    /// Read a player without locking it
    async fn find_player(&mut self, player_id: &str) -> LedgerResult<Option<Player>>;

    /// Lock a player row
    async fn lock_player(&mut self, player_id: &str) -> LedgerResult<Option<Player>>;

    /// Lock several player rows in ascending id order, returning those that exist
    async fn lock_players(&mut self, player_ids: &[String]) -> LedgerResult<Vec<Player>>;

    /// Overwrite the balance of a locked player row
    async fn set_balance(&mut self, player_id: &str, balance: i64) -> LedgerResult<()>;

    /// Insert a new unfinished tournament. Returns `false` if the id is taken.
    async fn insert_tournament(&mut self, tournament_id: TournamentId, deposit: i64)
    -> LedgerResult<bool>;

    /// Read a tournament without locking it
    async fn find_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Option<Tournament>>;

    /// Lock a tournament row
    async fn lock_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Option<Tournament>>;

    /// Flip a locked tournament to finished
    async fn mark_finished(&mut self, tournament_id: TournamentId) -> LedgerResult<()>;

    /// Read an attendance without locking it
    async fn find_attendance(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Option<Attendance>>;

    /// Lock the attendance slot of `(tournament_id, player_id)`
    async fn lock_attendance(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Option<Attendance>>;

    /// All attendances of a tournament, ordered by entrant id
    async fn list_attendances(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Vec<Attendance>>;

    /// Record an attendance together with its ordered backers
    async fn insert_attendance(&mut self, attendance: &Attendance) -> LedgerResult<()>;

    /// Delete every player, tournament and attendance.
    /// Fails on a transaction not opened with `begin_exclusive`.
    async fn clear(&mut self) -> LedgerResult<()>;

    /// Commit the transaction and release its locks
    async fn commit(self: Box<Self>) -> LedgerResult<()>;
}
