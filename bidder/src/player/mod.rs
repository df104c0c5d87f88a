//! Player accounts: points balances that can be funded, debited and looked up.
//!
//! An account is created implicitly by its first funding and its balance
//! never drops below zero.

pub mod manager;
pub mod models;

pub use manager::PlayerManager;
pub use models::Player;
