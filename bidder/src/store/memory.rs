//! In-process ledger store.
//!
//! Each row (player, tournament, attendance slot) has its own async mutex.
//! A transaction keeps the owned guard of every row it locked until it is
//! committed or dropped, so two transactions touching the same row serialize
//! while disjoint ones run in parallel. Writes are staged inside the
//! transaction and only become visible when `commit` applies them; a dropped
//! transaction simply discards them.
//!
//! On top of the row locks sits a store-wide admission gate. Ordinary
//! transactions enter it shared; a reset enters it exclusively, so it waits
//! for every open transaction to finish and no transaction starts until the
//! reset has committed or been dropped.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{
    Mutex as RowMutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock,
};

use super::{LedgerStore, LedgerTx};
use crate::attendance::Attendance;
use crate::errors::{LedgerError, LedgerResult};
use crate::player::Player;
use crate::tournament::{Tournament, TournamentId};

/// Lockable row identity. The derived ordering matches the global lock order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum RowKey {
    Tournament(TournamentId),
    Attendance(TournamentId, String),
    Player(String),
}

#[derive(Debug, Default)]
struct Tables {
    players: BTreeMap<String, i64>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    attendances: BTreeMap<(TournamentId, String), Attendance>,
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<RowMutex<()>>>>,
    gate: Arc<RwLock<()>>,
}

/// How a transaction was let through the admission gate
enum Admission {
    Concurrent { _permit: OwnedRwLockReadGuard<()> },
    Exclusive { _permit: OwnedRwLockWriteGuard<()> },
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Store("memory store mutex poisoned".to_string())
}

/// Ledger store kept entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    shared: Arc<Shared>,
}

impl MemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, admission: Admission) -> Box<dyn LedgerTx> {
        Box::new(MemoryLedgerTx {
            shared: self.shared.clone(),
            admission,
            held: HashMap::new(),
            staged: Tables::default(),
            cleared: false,
        })
    }

    /// Number of row locks currently tracked
    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.shared.row_locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let _permit = self.shared.gate.clone().read_owned().await;
        Ok(self.open(Admission::Concurrent { _permit }))
    }

    async fn begin_exclusive(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let _permit = self.shared.gate.clone().write_owned().await;
        Ok(self.open(Admission::Exclusive { _permit }))
    }
}

/// Transaction on the in-process store
pub struct MemoryLedgerTx {
    shared: Arc<Shared>,
    // Released after the row locks: fields drop once `Drop::drop` has run.
    admission: Admission,
    held: HashMap<RowKey, OwnedMutexGuard<()>>,
    staged: Tables,
    cleared: bool,
}

impl MemoryLedgerTx {
    fn committed(&self) -> LedgerResult<MutexGuard<'_, Tables>> {
        self.shared.tables.lock().map_err(poisoned)
    }

    /// Take the exclusive lock of a row, unless this transaction already holds it
    async fn acquire(&mut self, key: RowKey) -> LedgerResult<()> {
        if self.held.contains_key(&key) {
            return Ok(());
        }

        let row_lock = {
            let mut row_locks = self.shared.row_locks.lock().map_err(poisoned)?;
            row_locks.entry(key.clone()).or_default().clone()
        };

        let guard = row_lock.lock_owned().await;
        self.held.insert(key, guard);
        Ok(())
    }

    fn read_player(&self, player_id: &str) -> LedgerResult<Option<Player>> {
        let balance = match self.staged.players.get(player_id) {
            Some(balance) => Some(*balance),
            None if self.cleared => None,
            None => self.committed()?.players.get(player_id).copied(),
        };

        Ok(balance.map(|balance| Player {
            player_id: player_id.to_string(),
            balance,
        }))
    }

    fn read_tournament(&self, tournament_id: TournamentId) -> LedgerResult<Option<Tournament>> {
        match self.staged.tournaments.get(&tournament_id) {
            Some(tournament) => Ok(Some(tournament.clone())),
            None if self.cleared => Ok(None),
            None => Ok(self.committed()?.tournaments.get(&tournament_id).cloned()),
        }
    }

    fn read_attendance(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Option<Attendance>> {
        let key = (tournament_id, player_id.to_string());
        match self.staged.attendances.get(&key) {
            Some(attendance) => Ok(Some(attendance.clone())),
            None if self.cleared => Ok(None),
            None => Ok(self.committed()?.attendances.get(&key).cloned()),
        }
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn credit_player(&mut self, player_id: &str, amount: i64) -> LedgerResult<i64> {
        self.acquire(RowKey::Player(player_id.to_string())).await?;

        let balance = match self.read_player(player_id)? {
            Some(player) => player
                .balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::BalanceOverflow(player_id.to_string()))?,
            None => amount,
        };

        self.staged.players.insert(player_id.to_string(), balance);
        Ok(balance)
    }

    async fn find_player(&mut self, player_id: &str) -> LedgerResult<Option<Player>> {
        self.read_player(player_id)
    }

    async fn lock_player(&mut self, player_id: &str) -> LedgerResult<Option<Player>> {
        self.acquire(RowKey::Player(player_id.to_string())).await?;
        self.read_player(player_id)
    }

    async fn lock_players(&mut self, player_ids: &[String]) -> LedgerResult<Vec<Player>> {
        let mut ordered = player_ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut players = Vec::with_capacity(ordered.len());
        for player_id in ordered {
            self.acquire(RowKey::Player(player_id.clone())).await?;
            if let Some(player) = self.read_player(&player_id)? {
                players.push(player);
            }
        }

        Ok(players)
    }

    async fn set_balance(&mut self, player_id: &str, balance: i64) -> LedgerResult<()> {
        debug_assert!(self.held.contains_key(&RowKey::Player(player_id.to_string())));

        if self.read_player(player_id)?.is_none() {
            return Err(LedgerError::PlayerNotFound(player_id.to_string()));
        }

        self.staged.players.insert(player_id.to_string(), balance);
        Ok(())
    }

    async fn insert_tournament(
        &mut self,
        tournament_id: TournamentId,
        deposit: i64,
    ) -> LedgerResult<bool> {
        self.acquire(RowKey::Tournament(tournament_id)).await?;

        if self.read_tournament(tournament_id)?.is_some() {
            return Ok(false);
        }

        self.staged
            .tournaments
            .insert(tournament_id, Tournament::announced(tournament_id, deposit));
        Ok(true)
    }

    async fn find_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Option<Tournament>> {
        self.read_tournament(tournament_id)
    }

    async fn lock_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Option<Tournament>> {
        self.acquire(RowKey::Tournament(tournament_id)).await?;
        self.read_tournament(tournament_id)
    }

    async fn mark_finished(&mut self, tournament_id: TournamentId) -> LedgerResult<()> {
        let mut tournament = self
            .read_tournament(tournament_id)?
            .ok_or(LedgerError::TournamentNotFound(tournament_id))?;

        tournament.finished = true;
        tournament.finished_at = Some(Utc::now());
        self.staged.tournaments.insert(tournament_id, tournament);
        Ok(())
    }

    async fn find_attendance(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Option<Attendance>> {
        self.read_attendance(tournament_id, player_id)
    }

    async fn lock_attendance(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Option<Attendance>> {
        self.acquire(RowKey::Attendance(tournament_id, player_id.to_string()))
            .await?;
        self.read_attendance(tournament_id, player_id)
    }

    async fn list_attendances(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Vec<Attendance>> {
        let mut merged: BTreeMap<String, Attendance> = BTreeMap::new();

        if !self.cleared {
            let tables = self.committed()?;
            for ((id, player_id), attendance) in tables.attendances.iter() {
                if *id == tournament_id {
                    merged.insert(player_id.clone(), attendance.clone());
                }
            }
        }

        for ((id, player_id), attendance) in self.staged.attendances.iter() {
            if *id == tournament_id {
                merged.insert(player_id.clone(), attendance.clone());
            }
        }

        Ok(merged.into_values().collect())
    }

    async fn insert_attendance(&mut self, attendance: &Attendance) -> LedgerResult<()> {
        self.acquire(RowKey::Attendance(
            attendance.tournament_id,
            attendance.player_id.clone(),
        ))
        .await?;

        if self
            .read_attendance(attendance.tournament_id, &attendance.player_id)?
            .is_some()
        {
            return Err(LedgerError::AlreadyJoined {
                tournament_id: attendance.tournament_id,
                player_id: attendance.player_id.clone(),
            });
        }

        self.staged.attendances.insert(
            (attendance.tournament_id, attendance.player_id.clone()),
            attendance.clone(),
        );
        Ok(())
    }

    async fn clear(&mut self) -> LedgerResult<()> {
        // Rows committed by a concurrent transaction would survive the wipe.
        if !matches!(self.admission, Admission::Exclusive { .. }) {
            return Err(LedgerError::Store(
                "clear requires an exclusive transaction".to_string(),
            ));
        }

        self.staged = Tables::default();
        self.cleared = true;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        let mut this = *self;
        let staged = std::mem::take(&mut this.staged);

        {
            let mut tables = this.committed()?;
            if this.cleared {
                *tables = Tables::default();
            }
            tables.players.extend(staged.players);
            tables.tournaments.extend(staged.tournaments);
            tables.attendances.extend(staged.attendances);
        }

        // Row locks are released when `this` drops, after the writes landed.
        Ok(())
    }
}

impl Drop for MemoryLedgerTx {
    fn drop(&mut self) {
        let keys: Vec<RowKey> = self.held.keys().cloned().collect();
        self.held.clear();

        // Forget locks nobody else is holding or waiting on.
        if let Ok(mut row_locks) = self.shared.row_locks.lock() {
            for key in keys {
                if row_locks
                    .get(&key)
                    .is_some_and(|row_lock| Arc::strong_count(row_lock) == 1)
                {
                    row_locks.remove(&key);
                }
            }
        }
    }
}
