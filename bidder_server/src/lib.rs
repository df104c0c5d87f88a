//! HTTP gateway for the bidder points ledger.
//!
//! Binds query strings and JSON bodies to ledger commands and maps ledger
//! error kinds onto HTTP status codes.

pub mod api;
pub mod config;
pub mod logging;
