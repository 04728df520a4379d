//! Shared interfaces for the credit vault protocol.
//!
//! Collaborators the vault consumes are reached through these narrow
//! contract interfaces, so any contract exposing the same entry points can be
//! wired in through the registry address book.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::types::{CollateralFamily, Loan};

/// USD price and market status per asset
#[odra::external_contract]
pub trait PriceFeed {
    /// USD value (1e18 scale) of `unit_qty` of the asset
    fn price(&self, asset_code: String, unit_qty: U256) -> U256;
    /// Whether the market is suspended or circuit-broken
    fn is_suspended(&self, asset_code: String) -> bool;
}

/// Credit token entry points used by vaults
#[odra::external_contract]
pub trait CreditMinter {
    fn mint(&mut self, to: Address, amount: U256);
    fn burn_with_allowance(&mut self, from: Address, amount: U256);
    fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool;
}

/// CEP-18 interface for collateral tokens
#[odra::external_contract]
pub trait Cep18Token {
    fn transfer(&mut self, recipient: Address, amount: U256) -> bool;
    fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool;
    fn balance_of(&self, account: Address) -> U256;
}

/// Revenue bookkeeping on the treasury
#[odra::external_contract]
pub trait FeeSink {
    fn record_borrowing_fee(&mut self, amount: U256);
    fn record_interest_fee(&mut self, amount: U256);
}

/// Loan query result
#[odra::odra_type]
pub struct LoanInfo {
    /// Raw ledger entry
    pub loan: Loan,
    /// Real debt at the projected (fully caught-up) index
    pub real_debt: U256,
    /// Current USD value of the posted collateral
    pub collateral_value: U256,
    /// Collateral ratio, 1e18 scale; `U256::MAX` without debt
    pub collateral_ratio: U256,
}

/// Vault status information
#[odra::odra_type]
pub struct VaultStatus {
    /// Family served by the vault
    pub family: CollateralFamily,
    /// Whether the vault is paused
    pub is_paused: bool,
    /// Number of liquidations processed
    pub total_liquidations: u64,
    /// Total debt written off
    pub total_bad_debt: U256,
}
