//! PostgreSQL connection handling.
//!
//! [`Database`] owns the pool the PostgreSQL ledger store runs on, applies the
//! ledger schema and hands out [`Ledger`]s bound to it.

use sqlx::PgPool;
use std::sync::Arc;

use crate::errors::LedgerResult;
use crate::ledger::Ledger;

pub mod config;

pub use config::DatabaseConfig;

/// Pooled connection to the ledger database
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Open the pool and check that the database answers
    ///
    /// # Errors
    ///
    /// * `LedgerError::Database` - Unreachable server or bad credentials
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bidder::db::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> bidder::LedgerResult<()> {
    /// let db = Database::connect(&DatabaseConfig::development()).await?;
    /// db.migrate().await?;
    /// let ledger = db.ledger();
    /// ledger.fund("P1", 300).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> LedgerResult<Self> {
        let pool = config
            .pool_options()
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Ledger database pool ready ({}..{} connections)",
            config.min_connections,
            config.max_connections
        );

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// A ledger running its transactions on this pool
    pub fn ledger(&self) -> Ledger {
        Ledger::postgres(self.pool.clone())
    }

    /// Bring the ledger schema up to date
    pub async fn migrate(&self) -> LedgerResult<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        log::info!("Ledger schema is up to date");
        Ok(())
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Wait for checked-out connections and close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
