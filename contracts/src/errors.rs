//! Protocol error definitions.

use odra::prelude::*;

/// Credit vault protocol errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CdpError {
    // Loan errors (1xx)
    LoanNotFound = 100,
    MarginNotMet = 101,
    BelowLiquidationMargin = 102,
    InsufficientCollateral = 103,
    RepayExceedsDebt = 104,
    LoanTooSmall = 105,
    DailyMaxExceeded = 106,
    ZeroAmount = 107,

    // Market errors (2xx)
    MarketSuspended = 200,
    PriceUnavailable = 201,

    // Pause errors (3xx)
    VaultPaused = 300,

    // Access control errors (4xx)
    Unauthorized = 400,
    UnauthorizedProtocol = 401,

    // Token errors (5xx)
    TokenTransferFailed = 500,
    InsufficientAllowance = 501,
    InsufficientTokenBalance = 502,
    SupplyCapExceeded = 503,

    // Liquidation errors (7xx)
    NotLiquidatable = 700,
    SelfLiquidation = 701,

    // Configuration errors (9xx)
    InvalidConfig = 900,
    UnsupportedCollateral = 902,
    CollateralAlreadyExists = 903,
    InvalidMargins = 904,
    InvalidInterestRate = 905,
    InvalidBonusFactor = 906,
    FeeTooHigh = 907,
    NoPendingChange = 908,
    ChangeNotReady = 909,
    AddressNotSet = 910,

    // Index errors (10xx)
    CycleCountTooHigh = 1000,
}

impl CdpError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Loan
            CdpError::LoanNotFound => "Loan not found",
            CdpError::MarginNotMet => "Minimum opening margin not met",
            CdpError::BelowLiquidationMargin => "Resulting ratio below liquidation margin",
            CdpError::InsufficientCollateral => "Requested more collateral than posted",
            CdpError::RepayExceedsDebt => "Repay amount exceeds loan debt",
            CdpError::LoanTooSmall => "Loan requested too small",
            CdpError::DailyMaxExceeded => "Daily issuance limit reached",
            CdpError::ZeroAmount => "Amount must be non-zero",

            // Market
            CdpError::MarketSuspended => "Market suspended or circuit broken",
            CdpError::PriceUnavailable => "Price unavailable",

            // Pause
            CdpError::VaultPaused => "Operation blocked: vault paused",

            // Access control
            CdpError::Unauthorized => "Unauthorized: caller is not admin",
            CdpError::UnauthorizedProtocol => "Unauthorized: caller is not protocol contract",

            // Token
            CdpError::TokenTransferFailed => "Token transfer failed",
            CdpError::InsufficientAllowance => "Insufficient token allowance",
            CdpError::InsufficientTokenBalance => "Insufficient token balance",
            CdpError::SupplyCapExceeded => "Token supply cap exceeded",

            // Liquidation
            CdpError::NotLiquidatable => "Loan is not liquidatable",
            CdpError::SelfLiquidation => "Borrower cannot liquidate own loan",

            // Config
            CdpError::InvalidConfig => "Invalid configuration parameter",
            CdpError::UnsupportedCollateral => "Collateral not supported",
            CdpError::CollateralAlreadyExists => "Collateral already registered",
            CdpError::InvalidMargins => "Margins must satisfy 1.0 < liq < open",
            CdpError::InvalidInterestRate => "Interest per period must exceed 1.0",
            CdpError::InvalidBonusFactor => "Liquidation bonus factor must be in (0, 1.0]",
            CdpError::FeeTooHigh => "Open loan fee above 10%",
            CdpError::NoPendingChange => "No queued change for collateral",
            CdpError::ChangeNotReady => "Queued change delay has not elapsed",
            CdpError::AddressNotSet => "Protocol address not configured",

            // Index
            CdpError::CycleCountTooHigh => "Cycle count too high",
        }
    }
}

impl core::fmt::Display for CdpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<CdpError> for OdraError {
    fn from(error: CdpError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}
