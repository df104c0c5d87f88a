//! Even splitting of stakes and prizes across a stake-sharing group.
//!
//! Both the deposit collected at join time and a winner's prize are divided
//! with integer division. The remainder is never allocated to anyone; it is
//! returned so callers can report it.

use crate::errors::{LedgerError, LedgerResult};
use std::collections::HashSet;

/// Result of splitting an amount over a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// Amount each member receives or pays
    pub per_member: i64,
    /// Number of members the amount was split across
    pub members: usize,
    /// Part of the amount left unallocated by integer division
    pub unallocated: i64,
}

/// Split `amount` evenly over `members` members.
///
/// `amount` must be non-negative and `members` non-zero; both are guaranteed
/// by the callers (validated deposits/prizes and a group that always contains
/// the entrant).
pub fn split_evenly(amount: i64, members: usize) -> Split {
    debug_assert!(amount >= 0);
    debug_assert!(members > 0);

    let divisor = members as i64;
    Split {
        per_member: amount / divisor,
        members,
        unallocated: amount % divisor,
    }
}

/// Build the stake-sharing group `{entrant} ∪ backers`, entrant first.
///
/// # Errors
///
/// * `LedgerError::InvalidPlayerId` - Entrant or a backer id is empty
/// * `LedgerError::DuplicateGroupMember` - Ids are not pairwise distinct
pub fn stake_group(entrant: &str, backers: &[String]) -> LedgerResult<Vec<String>> {
    if entrant.is_empty() || backers.iter().any(|b| b.is_empty()) {
        return Err(LedgerError::InvalidPlayerId);
    }

    let mut seen = HashSet::with_capacity(backers.len() + 1);
    let mut group = Vec::with_capacity(backers.len() + 1);
    for id in std::iter::once(entrant).chain(backers.iter().map(String::as_str)) {
        if !seen.insert(id) {
            return Err(LedgerError::DuplicateGroupMember(id.to_string()));
        }
        group.push(id.to_string());
    }

    Ok(group)
}
