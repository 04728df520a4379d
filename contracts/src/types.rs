//! Common types used across the credit vault protocol.

use odra::prelude::*;
use odra::casper_types::U256;

/// Fixed-point scale shared by prices, margins, fees and the interest index (1e18 = 1.0)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Length of one interest compounding period in seconds
pub const PERIOD_SECONDS: u64 = 180;

/// Length of one daily-issuance bucket in seconds
pub const ONE_DAY_SECONDS: u64 = 86_400;

/// Remaining debt below this value (0.001 credit units) is forgiven instead of kept
pub const DUST_THRESHOLD: u128 = 1_000_000_000_000_000;

/// Smallest loan a vault will originate (100 credit units)
pub const MIN_LOAN_VALUE: u128 = 100 * SCALE;

/// Ceiling for the open-loan fee (10%)
pub const MAX_OPEN_LOAN_FEE: u128 = SCALE / 10;

/// `U256` representation of 1.0 in fixed point
pub fn one() -> U256 {
    U256::from(SCALE)
}

/// Collateral family served by a vault instance
#[odra::odra_type]
#[derive(Copy, PartialOrd, Ord)]
pub enum CollateralFamily {
    /// External synthetic assets (CEP-18)
    Synthetic,
    /// Yield-bearing liquidity pool shares (CEP-18)
    LiquidityShare,
}

/// Which collateral ratio a partially repaid loan must still satisfy
#[odra::odra_type]
#[derive(Copy)]
pub enum MarginKind {
    /// Origination margin (`open_margin`)
    Opening,
    /// Critical margin (`liq_margin`)
    Liquidation,
}

/// Per-asset collateral configuration and interest index
#[odra::odra_type]
pub struct CollateralConfig {
    /// Asset code used by the price feed and as the registry key
    pub asset_code: String,
    /// Collateral token contract
    pub token: Address,
    /// Family of vault allowed to accept this asset
    pub family: CollateralFamily,
    /// Minimum collateral ratio to originate or increase debt
    pub open_margin: U256,
    /// Collateral ratio under which the loan can be liquidated
    pub liq_margin: U256,
    /// Growth factor applied to the index once per period
    pub interest_per_period: U256,
    /// Accumulated interest index, starts at 1.0
    pub index_price: U256,
    /// Time of the last applied period, seconds, multiple of `PERIOD_SECONDS`
    pub last_index_time: u64,
    /// Fraction of seized collateral value the liquidator pays
    pub liquidation_bonus_factor: U256,
    /// Paused assets are rejected by vaults
    pub is_paused: bool,
}

/// Risk parameters that a queued change replaces
#[odra::odra_type]
pub struct RiskParams {
    pub open_margin: U256,
    pub liq_margin: U256,
    pub interest_per_period: U256,
    pub liquidation_bonus_factor: U256,
}

/// Queued replacement of an asset's risk parameters
#[odra::odra_type]
pub struct PendingConfigChange {
    /// New parameters
    pub params: RiskParams,
    /// Earliest time (seconds) the change can be applied
    pub eta: u64,
}

/// Loan ledger entry, one per (asset, borrower)
#[odra::odra_type]
#[derive(Default)]
pub struct Loan {
    /// Collateral held by the vault for this loan
    pub collateral_quantity: U256,
    /// Face value of originated debt, decreases only on repayment
    pub principal: U256,
    /// Debt expressed in index units
    pub indexed_debt: U256,
}

impl Loan {
    /// Loan with nothing posted and nothing owed
    pub fn is_empty(&self) -> bool {
        self.collateral_quantity.is_zero() && self.principal.is_zero() && self.indexed_debt.is_zero()
    }

    /// Whether the loan carries any debt
    pub fn has_debt(&self) -> bool {
        !self.indexed_debt.is_zero()
    }
}

/// Unique loan identifier within a vault
#[odra::odra_type]
pub struct LoanKey {
    /// Collateral asset code
    pub asset_code: String,
    /// Borrower address
    pub borrower: Address,
}

/// Rolling day-bucketed issuance counter
#[odra::odra_type]
#[derive(Default)]
pub struct DailyIssuance {
    /// Start of the current bucket, seconds
    pub day_start: u64,
    /// Principal originated in the current bucket
    pub issued: U256,
}
