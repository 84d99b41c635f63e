//! Hunty scavenger-hunt backend.
//!
//! Wallet-driven Soroban transactions for hunt actions, a cached and retried
//! registration status check, and a SQLite-backed local hunt/clue store,
//! exposed through a small Axum REST API.

pub mod actions;
pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod hunts;
pub mod ledger;
pub mod registration;
pub mod retry;
pub mod rpc;
pub mod store;
pub mod strkey;
pub mod validation;
pub mod wallet;
pub mod xdr;
