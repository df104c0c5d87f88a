//! PostgreSQL ledger store.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{LedgerStore, LedgerTx};
use crate::attendance::Attendance;
use crate::errors::{LedgerError, LedgerResult};
use crate::player::Player;
use crate::tournament::{Tournament, TournamentId};

/// Ledger store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: Arc<PgPool>,
}

impl PgLedgerStore {
    /// Create a new store
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool with the ledger schema migrated
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx, exclusive: false }))
    }

    async fn begin_exclusive(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let mut tx = self.pool.begin().await?;

        // Listed in lock order, so a reset queues behind in-flight commands
        // instead of deadlocking with them.
        sqlx::query(
            "LOCK TABLE tournaments, tournament_attendees, attendance_backers, players
             IN ACCESS EXCLUSIVE MODE",
        )
        .execute(&mut *tx)
        .await?;

        Ok(Box::new(PgLedgerTx { tx, exclusive: true }))
    }
}

/// Transaction on the PostgreSQL store
///
/// Dropping it without calling `commit` rolls back and releases every
/// `FOR UPDATE` lock taken through it.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
    exclusive: bool,
}

fn player_from_row(row: &PgRow) -> Player {
    Player {
        player_id: row.get("player_id"),
        balance: row.get("balance"),
    }
}

fn tournament_from_row(row: &PgRow) -> Tournament {
    Tournament {
        id: row.get("id"),
        deposit: row.get("deposit"),
        finished: row.get("finished"),
        finished_at: row.get::<Option<DateTime<Utc>>, _>("finished_at"),
    }
}

fn attendance_from_row(row: &PgRow, backers: Vec<String>) -> Attendance {
    Attendance {
        tournament_id: row.get("tournament_id"),
        player_id: row.get("player_id"),
        backers,
        stake: row.get("stake"),
        joined_at: row.get("joined_at"),
    }
}

impl PgLedgerTx {
    async fn load_backers(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT backer_id
            FROM attendance_backers
            WHERE tournament_id = $1 AND player_id = $2
            ORDER BY position
            "#,
        )
        .bind(tournament_id)
        .bind(player_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(|row| row.get("backer_id")).collect())
    }

    async fn attendance(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
        for_update: bool,
    ) -> LedgerResult<Option<Attendance>> {
        let query = if for_update {
            "SELECT tournament_id, player_id, stake, joined_at
             FROM tournament_attendees
             WHERE tournament_id = $1 AND player_id = $2
             FOR UPDATE"
        } else {
            "SELECT tournament_id, player_id, stake, joined_at
             FROM tournament_attendees
             WHERE tournament_id = $1 AND player_id = $2"
        };

        let row = sqlx::query(query)
            .bind(tournament_id)
            .bind(player_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => {
                let backers = self.load_backers(tournament_id, player_id).await?;
                Ok(Some(attendance_from_row(&row, backers)))
            }
            None => Ok(None),
        }
    }

    async fn tournament(
        &mut self,
        tournament_id: TournamentId,
        for_update: bool,
    ) -> LedgerResult<Option<Tournament>> {
        let query = if for_update {
            "SELECT id, deposit, finished, finished_at FROM tournaments WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, deposit, finished, finished_at FROM tournaments WHERE id = $1"
        };

        let row = sqlx::query(query)
            .bind(tournament_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn credit_player(&mut self, player_id: &str, amount: i64) -> LedgerResult<i64> {
        // The conflict branch only updates when the sum fits in a BIGINT;
        // otherwise no row comes back.
        let row = sqlx::query(
            "INSERT INTO players (player_id, balance)
             VALUES ($1, $2)
             ON CONFLICT (player_id)
             DO UPDATE SET
                balance = players.balance + EXCLUDED.balance,
                updated_at = NOW()
             WHERE players.balance <= $3 - EXCLUDED.balance
             RETURNING balance",
        )
        .bind(player_id)
        .bind(amount)
        .bind(i64::MAX)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| LedgerError::BalanceOverflow(player_id.to_string()))?;

        Ok(row.get("balance"))
    }

    async fn find_player(&mut self, player_id: &str) -> LedgerResult<Option<Player>> {
        let row = sqlx::query("SELECT player_id, balance FROM players WHERE player_id = $1")
            .bind(player_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.as_ref().map(player_from_row))
    }

    async fn lock_player(&mut self, player_id: &str) -> LedgerResult<Option<Player>> {
        let row = sqlx::query(
            "SELECT player_id, balance FROM players WHERE player_id = $1 FOR UPDATE",
        )
        .bind(player_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(player_from_row))
    }

    async fn lock_players(&mut self, player_ids: &[String]) -> LedgerResult<Vec<Player>> {
        let rows = sqlx::query(
            "SELECT player_id, balance
             FROM players
             WHERE player_id = ANY($1)
             ORDER BY player_id
             FOR UPDATE",
        )
        .bind(player_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(player_from_row).collect())
    }

    async fn set_balance(&mut self, player_id: &str, balance: i64) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE players SET balance = $1, updated_at = NOW() WHERE player_id = $2",
        )
        .bind(balance)
        .bind(player_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::PlayerNotFound(player_id.to_string()));
        }

        Ok(())
    }

    async fn insert_tournament(
        &mut self,
        tournament_id: TournamentId,
        deposit: i64,
    ) -> LedgerResult<bool> {
        // A concurrent insert of the same id blocks here until it commits or
        // rolls back, then DO NOTHING applies.
        let row = sqlx::query(
            "INSERT INTO tournaments (id, deposit, finished)
             VALUES ($1, $2, FALSE)
             ON CONFLICT (id) DO NOTHING
             RETURNING id",
        )
        .bind(tournament_id)
        .bind(deposit)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.is_some())
    }

    async fn find_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Option<Tournament>> {
        self.tournament(tournament_id, false).await
    }

    async fn lock_tournament(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Option<Tournament>> {
        self.tournament(tournament_id, true).await
    }

    async fn mark_finished(&mut self, tournament_id: TournamentId) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE tournaments SET finished = TRUE, finished_at = $2 WHERE id = $1",
        )
        .bind(tournament_id)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::TournamentNotFound(tournament_id));
        }

        Ok(())
    }

    async fn find_attendance(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Option<Attendance>> {
        self.attendance(tournament_id, player_id, false).await
    }

    async fn lock_attendance(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> LedgerResult<Option<Attendance>> {
        self.attendance(tournament_id, player_id, true).await
    }

    async fn list_attendances(
        &mut self,
        tournament_id: TournamentId,
    ) -> LedgerResult<Vec<Attendance>> {
        let rows = sqlx::query(
            r#"
            SELECT tournament_id, player_id, stake, joined_at
            FROM tournament_attendees
            WHERE tournament_id = $1
            ORDER BY player_id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let backer_rows = sqlx::query(
            r#"
            SELECT player_id, backer_id
            FROM attendance_backers
            WHERE tournament_id = $1
            ORDER BY player_id, position
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut backers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in &backer_rows {
            backers
                .entry(row.get("player_id"))
                .or_default()
                .push(row.get("backer_id"));
        }

        Ok(rows
            .iter()
            .map(|row| {
                let player_id: String = row.get("player_id");
                let group = backers.remove(&player_id).unwrap_or_default();
                attendance_from_row(row, group)
            })
            .collect())
    }

    async fn insert_attendance(&mut self, attendance: &Attendance) -> LedgerResult<()> {
        let inserted = sqlx::query(
            "INSERT INTO tournament_attendees (tournament_id, player_id, stake, joined_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(attendance.tournament_id)
        .bind(&attendance.player_id)
        .bind(attendance.stake)
        .bind(attendance.joined_at)
        .execute(&mut *self.tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(LedgerError::AlreadyJoined {
                    tournament_id: attendance.tournament_id,
                    player_id: attendance.player_id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        for (position, backer_id) in attendance.backers.iter().enumerate() {
            sqlx::query(
                "INSERT INTO attendance_backers (tournament_id, player_id, backer_id, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(attendance.tournament_id)
            .bind(&attendance.player_id)
            .bind(backer_id)
            .bind(position as i32)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn clear(&mut self) -> LedgerResult<()> {
        if !self.exclusive {
            return Err(LedgerError::Store(
                "clear requires an exclusive transaction".to_string(),
            ));
        }

        for query in [
            "DELETE FROM attendance_backers",
            "DELETE FROM tournament_attendees",
            "DELETE FROM tournaments",
            "DELETE FROM players",
        ] {
            sqlx::query(query).execute(&mut *self.tx).await?;
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        let PgLedgerTx { tx, .. } = *self;
        tx.commit().await?;
        Ok(())
    }
}
