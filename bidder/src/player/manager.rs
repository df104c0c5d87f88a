//! Player account manager: funding, debiting and balance lookup.

use super::models::Player;
use crate::errors::{LedgerError, LedgerResult};
use crate::store::LedgerStore;
use std::sync::Arc;

/// Player account manager
#[derive(Clone)]
pub struct PlayerManager {
    store: Arc<dyn LedgerStore>,
}

fn validate_player_id(player_id: &str) -> LedgerResult<()> {
    if player_id.is_empty() {
        return Err(LedgerError::InvalidPlayerId);
    }
    Ok(())
}

fn validate_amount(amount: i64) -> LedgerResult<()> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

impl PlayerManager {
    /// Create a new player manager
    ///
    /// # Arguments
    ///
    /// * `store` - Ledger store every operation runs a transaction against
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Add points to a player, creating the account on first funding
    ///
    /// # Arguments
    ///
    /// * `player_id` - Player ID
    /// * `amount` - Points to add
    ///
    /// # Returns
    ///
    /// * `LedgerResult<i64>` - New balance or error
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidPlayerId` - Empty player id
    /// * `LedgerError::InvalidAmount` - Negative amount
    /// * `LedgerError::BalanceOverflow` - Balance would not fit in an `i64`
    pub async fn fund(&self, player_id: &str, amount: i64) -> LedgerResult<i64> {
        validate_player_id(player_id)?;
        validate_amount(amount)?;

        let mut tx = self.store.begin().await?;
        let balance = tx.credit_player(player_id, amount).await?;
        tx.commit().await?;

        log::info!("Funded player {player_id} with {amount} points, balance {balance}");
        Ok(balance)
    }

    /// Take points from an existing player
    ///
    /// The player row stays locked from the balance check until commit, so
    /// concurrent takes on one account never debit more than it held.
    ///
    /// # Arguments
    ///
    /// * `player_id` - Player ID
    /// * `amount` - Points to take
    ///
    /// # Returns
    ///
    /// * `LedgerResult<i64>` - New balance or error
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidPlayerId` - Empty player id
    /// * `LedgerError::InvalidAmount` - Negative amount
    /// * `LedgerError::PlayerNotFound` - No such player
    /// * `LedgerError::InsufficientFunds` - Balance smaller than `amount`
    pub async fn take(&self, player_id: &str, amount: i64) -> LedgerResult<i64> {
        validate_player_id(player_id)?;
        validate_amount(amount)?;

        let mut tx = self.store.begin().await?;

        let player = tx
            .lock_player(player_id)
            .await?
            .ok_or_else(|| LedgerError::PlayerNotFound(player_id.to_string()))?;

        if player.balance < amount {
            log::debug!(
                "Rejected take of {amount} from player {player_id}: balance {}",
                player.balance
            );
            return Err(LedgerError::InsufficientFunds {
                player_id: player_id.to_string(),
                available: player.balance,
                required: amount,
            });
        }

        let balance = player.balance - amount;
        tx.set_balance(player_id, balance).await?;
        tx.commit().await?;

        log::info!("Took {amount} points from player {player_id}, balance {balance}");
        Ok(balance)
    }

    /// Get a player's balance
    ///
    /// # Errors
    ///
    /// * `LedgerError::PlayerNotFound` - No such player
    pub async fn find_player(&self, player_id: &str) -> LedgerResult<Player> {
        let mut tx = self.store.begin().await?;
        let player = tx
            .find_player(player_id)
            .await?
            .ok_or_else(|| LedgerError::PlayerNotFound(player_id.to_string()))?;
        tx.commit().await?;

        Ok(player)
    }
}
