//! # Bidder
//!
//! A points-based wagering ledger. Players hold a balance, can be funded or
//! debited, stake points to enter tournaments (alone or backed by other
//! players), and finished tournaments pay prizes to winners and their backers.
//!
//! Every command runs as one atomic transaction against an injected
//! [`store::LedgerStore`]. Correctness under concurrent access comes from
//! exclusive row locks held for the life of that transaction, never from
//! retries.
//!
//! ## Core Modules
//!
//! - [`player`]: Account funding, debiting and lookup
//! - [`tournament`]: Announcement and prize distribution
//! - [`attendance`]: Joining tournaments with backers, stake collection
//! - [`store`]: Transaction/row-lock abstraction with PostgreSQL and in-memory bindings
//! - [`ledger`]: The command surface a gateway calls
//!
//! ## Example
//!
//! ```
//! use bidder::Ledger;
//! use bidder::tournament::Winner;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let ledger = Ledger::in_memory();
//!
//! ledger.fund("P1", 1500).await.unwrap();
//! ledger.fund("P2", 1000).await.unwrap();
//! ledger.announce_tournament(1, 500).await.unwrap();
//! ledger.join_tournament(1, "P1", &["P2".to_string()]).await.unwrap();
//! ledger.result_tournament(1, &[Winner::new("P1", 1000)]).await.unwrap();
//!
//! assert_eq!(ledger.balance("P1").await.unwrap().balance, 1750);
//! assert_eq!(ledger.balance("P2").await.unwrap().balance, 1250);
//! # });
//! # }
//! ```

pub mod attendance;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod player;
pub mod shares;
pub mod store;
pub mod tournament;

pub use errors::{ErrorKind, LedgerError, LedgerResult};
pub use ledger::Ledger;
