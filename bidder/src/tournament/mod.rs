//! Tournaments: announcement and result settlement.
//!
//! A tournament starts `Announced` and moves to `Finished` exactly once, when
//! its result is submitted. Entrants can only join while it is announced.
//!
//! ## Example
//!
//! ```no_run
//! use bidder::store::{LedgerStore, MemoryLedgerStore};
//! use bidder::tournament::{TournamentManager, Winner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
//!     let tournaments = TournamentManager::new(store);
//!
//!     tournaments.announce(1, 500).await?;
//!     let receipt = tournaments.finish(1, &[Winner::new("P1", 1000)]).await?;
//!     println!("Credited {} player(s)", receipt.credits.len());
//!
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::TournamentManager;
pub use models::{
    Credit, FinishReceipt, ResultRequest, Tournament, TournamentId, TournamentState, Winner,
};
