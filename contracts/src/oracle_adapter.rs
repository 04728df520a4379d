//! Oracle Adapter Contract
//!
//! Per-asset USD price feed consumed by vaults. Implements:
//! - Price updates from authorized feeders
//! - Freshness checks (a stale price suspends the market)
//! - Deviation circuit breaker against the last good price
//! - Manual market suspension by the registry admin

use odra::prelude::*;
use odra::casper_types::U256;
use odra::ContractRef;
use crate::errors::CdpError;
use crate::registry::RegistryContractRef;
use crate::types::one;

/// Default maximum price age in seconds (1 hour)
const DEFAULT_MAX_PRICE_AGE_SECONDS: u64 = 3600;

/// Default maximum deviation in basis points (5% = 500 bps)
const DEFAULT_MAX_DEVIATION_BPS: u32 = 500;

const BPS_SCALE: u32 = 10_000;

/// Oracle configuration
#[odra::odra_type]
pub struct OracleConfig {
    /// Maximum price age in seconds before the market counts as suspended
    pub max_price_age_seconds: u64,
    /// Maximum move from the last good price, in bps; 0 disables the check
    pub max_deviation_bps: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_price_age_seconds: DEFAULT_MAX_PRICE_AGE_SECONDS,
            max_deviation_bps: DEFAULT_MAX_DEVIATION_BPS,
        }
    }
}

/// Status of an asset's cached price
#[odra::odra_type]
#[derive(Copy)]
pub enum PriceStatus {
    Ok,
    /// Last update moved too far from the last good price
    Deviation,
}

/// Cached price data for an asset
#[odra::odra_type]
pub struct CachedPrice {
    /// USD per 1.0 unit, 1e18 scale
    pub price: U256,
    /// Seconds
    pub timestamp: u64,
    pub status: PriceStatus,
}

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;

    #[odra::event]
    pub struct PriceUpdated {
        pub asset_code: String,
        pub price: U256,
        pub timestamp: u64,
    }

    #[odra::event]
    pub struct PriceRejected {
        pub asset_code: String,
        pub price: U256,
        pub last_good_price: U256,
    }

    #[odra::event]
    pub struct MarketSuspensionChanged {
        pub asset_code: String,
        pub suspended: bool,
    }
}

#[odra::module(events = [
    events::PriceUpdated,
    events::PriceRejected,
    events::MarketSuspensionChanged
])]
pub struct OracleAdapter {
    /// Registry contract address (admin authority)
    registry: Var<Address>,
    config: Var<OracleConfig>,
    /// Authorized price feeders
    feeders: Mapping<Address, bool>,
    prices: Mapping<String, CachedPrice>,
    /// Manually suspended markets
    suspended: Mapping<String, bool>,
}

#[odra::module]
impl OracleAdapter {
    pub fn init(&mut self, registry: Address, max_price_age_seconds: u64, max_deviation_bps: u32) {
        self.registry.set(registry);
        self.config.set(OracleConfig {
            max_price_age_seconds,
            max_deviation_bps,
        });
    }

    // ========== Price Feed ==========

    /// USD value (1e18 scale) of `unit_qty` of the asset
    pub fn price(&self, asset_code: String, unit_qty: U256) -> U256 {
        match self.prices.get(&asset_code) {
            Some(cached) => cached.price * unit_qty / one(),
            None => self.env().revert(CdpError::PriceUnavailable),
        }
    }

    /// Whether trading on the asset is halted.
    ///
    /// True when suspended manually, when the circuit breaker tripped, or when
    /// the cached price is older than `max_price_age_seconds`.
    pub fn is_suspended(&self, asset_code: String) -> bool {
        if self.suspended.get_or_default(&asset_code) {
            return true;
        }
        match self.prices.get(&asset_code) {
            Some(cached) => {
                let config = self.get_config();
                let age = self.now_secs().saturating_sub(cached.timestamp);
                cached.status != PriceStatus::Ok || age > config.max_price_age_seconds
            }
            None => false,
        }
    }

    /// Cached price data for an asset
    pub fn get_price_data(&self, asset_code: String) -> Option<CachedPrice> {
        self.prices.get(&asset_code)
    }

    // ========== Price Updates ==========

    /// Post a new price (feeders only).
    ///
    /// A move beyond `max_deviation_bps` is not accepted: the last good price is
    /// kept and the market stays suspended until a price inside the band, or an
    /// admin `reset_price`, arrives.
    pub fn update_price(&mut self, asset_code: String, price: U256) {
        self.require_feeder();
        if price.is_zero() {
            self.env().revert(CdpError::PriceUnavailable);
        }

        let config = self.get_config();
        let now = self.now_secs();
        if let Some(mut cached) = self.prices.get(&asset_code) {
            if exceeds_deviation(price, cached.price, config.max_deviation_bps) {
                cached.status = PriceStatus::Deviation;
                self.prices.set(&asset_code, cached.clone());
                self.env().emit_event(events::PriceRejected {
                    asset_code,
                    price,
                    last_good_price: cached.price,
                });
                return;
            }
        }

        self.store_price(asset_code, price, now);
    }

    /// Force a price past the circuit breaker (admin only)
    pub fn reset_price(&mut self, asset_code: String, price: U256) {
        self.require_registry_admin();
        if price.is_zero() {
            self.env().revert(CdpError::PriceUnavailable);
        }
        let now = self.now_secs();
        self.store_price(asset_code, price, now);
    }

    // ========== Admin ==========

    pub fn set_suspended(&mut self, asset_code: String, suspended: bool) {
        self.require_registry_admin();
        self.suspended.set(&asset_code, suspended);
        self.env()
            .emit_event(events::MarketSuspensionChanged { asset_code, suspended });
    }

    pub fn add_feeder(&mut self, feeder: Address) {
        self.require_registry_admin();
        self.feeders.set(&feeder, true);
    }

    pub fn remove_feeder(&mut self, feeder: Address) {
        self.require_registry_admin();
        self.feeders.set(&feeder, false);
    }

    pub fn is_feeder(&self, account: Address) -> bool {
        self.feeders.get_or_default(&account)
    }

    pub fn set_config(&mut self, config: OracleConfig) {
        self.require_registry_admin();
        self.config.set(config);
    }

    pub fn get_config(&self) -> OracleConfig {
        self.config.get().unwrap_or_default()
    }

    // ========== Internal ==========

    fn store_price(&mut self, asset_code: String, price: U256, timestamp: u64) {
        self.prices.set(
            &asset_code,
            CachedPrice {
                price,
                timestamp,
                status: PriceStatus::Ok,
            },
        );
        self.env().emit_event(events::PriceUpdated {
            asset_code,
            price,
            timestamp,
        });
    }

    fn require_feeder(&self) {
        if !self.is_feeder(self.env().caller()) {
            self.env().revert(CdpError::Unauthorized);
        }
    }

    fn require_registry_admin(&self) {
        let registry = match self.registry.get() {
            Some(addr) => addr,
            None => self.env().revert(CdpError::AddressNotSet),
        };
        let caller = self.env().caller();
        if !RegistryContractRef::new(self.env(), registry).is_admin(caller) {
            self.env().revert(CdpError::Unauthorized);
        }
    }

    fn now_secs(&self) -> u64 {
        self.env().get_block_time() / 1_000
    }
}

/// Deviation between a new price and a reference, in bps
fn deviation_bps(new_price: U256, reference_price: U256) -> U256 {
    if reference_price.is_zero() {
        return U256::zero();
    }
    let diff = if new_price > reference_price {
        new_price - reference_price
    } else {
        reference_price - new_price
    };
    diff * U256::from(BPS_SCALE) / reference_price
}

fn exceeds_deviation(new_price: U256, reference_price: U256, max_deviation_bps: u32) -> bool {
    max_deviation_bps != 0 && deviation_bps(new_price, reference_price) > U256::from(max_deviation_bps)
}
