//! Credit Vault Contracts
//!
//! Over-collateralized credit issuance on Casper with per-asset compounding
//! interest and liquidation.
//!
//! ## Architecture
//!
//! - **Registry**: Collateral configurations, the per-asset interest index,
//!   delayed config changes and the protocol address book
//! - **Vault**: Loan ledger for one collateral family (open, top up, repay,
//!   withdraw, liquidate)
//! - **CreditToken**: CEP-18 credit token minted against collateral
//! - **Treasury**: Origination fees and interest revenue
//! - **OracleAdapter**: Per-asset USD prices with staleness and deviation checks
//!
//! ## Debt accounting
//!
//! Loans record debt in index units. Real debt is `indexed_debt * index`, where
//! the index compounds once every 180 seconds at the asset's
//! `interest_per_period`. Pure math lives in `interest`, `ledger` and
//! `liquidation_engine` so it can be tested without a host.

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod interfaces;
pub mod interest;
pub mod ledger;
pub mod liquidation_engine;

// Contract modules
pub mod registry;
pub mod vault;
pub mod credit_token;
pub mod treasury;
pub mod oracle_adapter;
