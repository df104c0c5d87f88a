//! Player account models.

use serde::{Deserialize, Serialize};

/// Player account: a points balance keyed by an opaque player id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub player_id: String,
    pub balance: i64,
}
