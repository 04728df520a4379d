//! Registry contract: collateral configuration, interest index and protocol address book.

use odra::prelude::*;
use odra::casper_types::{Key, U256};
use crate::errors::CdpError;
use crate::liquidation_engine::bonus_restores_margin;
use crate::interest::{advance_index, align_to_period, owed_cycles, validate_interest_per_period};
use crate::types::{
    one, CollateralConfig, CollateralFamily, PendingConfigChange, RiskParams, PERIOD_SECONDS,
};

/// Default delay between queueing and applying a collateral change (3 days)
const DEFAULT_CONFIG_CHANGE_DELAY: u64 = 259_200;
/// Bounds for the config change delay
const MIN_CONFIG_CHANGE_DELAY: u64 = 3_600;
const MAX_CONFIG_CHANGE_DELAY: u64 = 604_800;

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;
    use crate::types::CollateralFamily;

    #[odra::event]
    pub struct CollateralAdded {
        pub asset_code: String,
        pub token: Address,
        pub family: CollateralFamily,
        pub open_margin: U256,
        pub liq_margin: U256,
        pub interest_per_period: U256,
        pub liquidation_bonus_factor: U256,
    }

    #[odra::event]
    pub struct ConfigChangeQueued {
        pub asset_code: String,
        pub open_margin: U256,
        pub liq_margin: U256,
        pub interest_per_period: U256,
        pub liquidation_bonus_factor: U256,
        pub eta: u64,
    }

    #[odra::event]
    pub struct ConfigChangeApplied {
        pub asset_code: String,
        pub index_price: U256,
        pub last_index_time: u64,
    }

    #[odra::event]
    pub struct ConfigChangeCancelled {
        pub asset_code: String,
    }

    #[odra::event]
    pub struct IndexRefreshed {
        pub asset_code: String,
        pub cycles: u64,
        pub index_price: U256,
        pub last_index_time: u64,
    }

    #[odra::event]
    pub struct CollateralPaused {
        pub asset_code: String,
    }

    #[odra::event]
    pub struct CollateralUnpaused {
        pub asset_code: String,
    }
}

/// Registry contract for collateral configuration and the interest index
#[odra::module(events = [
    events::CollateralAdded,
    events::ConfigChangeQueued,
    events::ConfigChangeApplied,
    events::ConfigChangeCancelled,
    events::IndexRefreshed,
    events::CollateralPaused,
    events::CollateralUnpaused
])]
pub struct Registry {
    /// Protocol admin address
    admin: Var<Address>,
    /// Credit token contract address
    credit_token: Var<Option<Address>>,
    /// Treasury contract address
    treasury: Var<Option<Address>>,
    /// Price feed contract address
    price_feed: Var<Option<Address>>,
    /// Vault for synthetic asset collateral
    vault_synthetic: Var<Option<Address>>,
    /// Vault for liquidity share collateral
    vault_liquidity_share: Var<Option<Address>>,
    /// Collateral configurations by asset code
    collateral_configs: Mapping<String, CollateralConfig>,
    /// Queued config replacements by asset code
    pending_changes: Mapping<String, Option<PendingConfigChange>>,
    /// Number of registered assets
    collateral_count: Var<u32>,
    /// Registered asset codes by registration order
    collateral_codes: Mapping<u32, String>,
    /// Delay between queueing and applying a change, seconds
    config_change_delay: Var<u64>,
}

#[odra::module]
impl Registry {
    /// Initialize the registry.
    /// Uses Key instead of Address to allow deployment via casper-client.
    pub fn init(&mut self, admin: Key, config_change_delay: u64) {
        let admin_addr = match Address::try_from(admin) {
            Ok(addr) => addr,
            Err(_) => self.env().revert(CdpError::InvalidConfig),
        };
        self.admin.set(admin_addr);
        self.set_delay_checked(config_change_delay);
        self.collateral_count.set(0);
    }

    // ========== Address Book (admin only) ==========

    /// Set the credit token contract address
    pub fn set_credit_token(&mut self, credit_token: Address) {
        self.require_admin();
        self.credit_token.set(Some(credit_token));
    }

    /// Set the treasury contract address
    pub fn set_treasury(&mut self, treasury: Address) {
        self.require_admin();
        self.treasury.set(Some(treasury));
    }

    /// Set the price feed contract address
    pub fn set_price_feed(&mut self, price_feed: Address) {
        self.require_admin();
        self.price_feed.set(Some(price_feed));
    }

    /// Register the vault serving a collateral family
    pub fn set_vault(&mut self, family: CollateralFamily, vault: Address) {
        self.require_admin();
        match family {
            CollateralFamily::Synthetic => self.vault_synthetic.set(Some(vault)),
            CollateralFamily::LiquidityShare => self.vault_liquidity_share.set(Some(vault)),
        }
    }

    /// Transfer admin to new address
    pub fn transfer_admin(&mut self, new_admin: Address) {
        self.require_admin();
        self.admin.set(new_admin);
    }

    /// Update the config change delay, bounded to [1 hour, 7 days]
    pub fn set_config_change_delay(&mut self, delay_seconds: u64) {
        self.require_admin();
        self.set_delay_checked(delay_seconds);
    }

    // ========== Collateral Configuration ==========

    /// Register a new collateral type with its index starting at 1.0
    #[allow(clippy::too_many_arguments)]
    pub fn add_collateral_type(
        &mut self,
        asset_code: String,
        token: Address,
        family: CollateralFamily,
        open_margin: U256,
        liq_margin: U256,
        interest_per_period: U256,
        liquidation_bonus_factor: U256,
    ) {
        self.require_admin();
        if self.collateral_configs.get(&asset_code).is_some() {
            self.env().revert(CdpError::CollateralAlreadyExists);
        }
        let params = RiskParams {
            open_margin,
            liq_margin,
            interest_per_period,
            liquidation_bonus_factor,
        };
        self.validate_params(&params);

        let config = CollateralConfig {
            asset_code: asset_code.clone(),
            token,
            family,
            open_margin,
            liq_margin,
            interest_per_period,
            index_price: one(),
            last_index_time: align_to_period(self.now_secs()),
            liquidation_bonus_factor,
            is_paused: false,
        };
        self.collateral_configs.set(&asset_code, config);

        let count = self.collateral_count.get().unwrap_or(0);
        self.collateral_codes.set(&count, asset_code.clone());
        self.collateral_count.set(count + 1);

        self.env().emit_event(events::CollateralAdded {
            asset_code,
            token,
            family,
            open_margin,
            liq_margin,
            interest_per_period,
            liquidation_bonus_factor,
        });
    }

    /// Queue a replacement of an asset's risk parameters
    pub fn queue_config_change(
        &mut self,
        asset_code: String,
        open_margin: U256,
        liq_margin: U256,
        interest_per_period: U256,
        liquidation_bonus_factor: U256,
    ) {
        self.require_admin();
        self.load_config(&asset_code);

        let params = RiskParams {
            open_margin,
            liq_margin,
            interest_per_period,
            liquidation_bonus_factor,
        };
        self.validate_params(&params);

        let eta = self.now_secs() + self.get_config_change_delay();
        self.pending_changes
            .set(&asset_code, Some(PendingConfigChange { params, eta }));

        self.env().emit_event(events::ConfigChangeQueued {
            asset_code,
            open_margin,
            liq_margin,
            interest_per_period,
            liquidation_bonus_factor,
            eta,
        });
    }

    /// Apply a queued change once its delay has elapsed.
    ///
    /// All owed periods are compounded at the old rate first.
    pub fn apply_queued_change(&mut self, asset_code: String) {
        let pending = match self.pending_changes.get(&asset_code).flatten() {
            Some(p) => p,
            None => self.env().revert(CdpError::NoPendingChange),
        };
        let now = self.now_secs();
        if now < pending.eta {
            self.env().revert(CdpError::ChangeNotReady);
        }

        let config = apply_change(&self.load_config(&asset_code), &pending.params, now);

        self.collateral_configs.set(&asset_code, config.clone());
        self.pending_changes.set(&asset_code, None);

        self.env().emit_event(events::ConfigChangeApplied {
            asset_code,
            index_price: config.index_price,
            last_index_time: config.last_index_time,
        });
    }

    /// Drop a queued change
    pub fn cancel_queued_change(&mut self, asset_code: String) {
        self.require_admin();
        if self.pending_changes.get(&asset_code).flatten().is_none() {
            self.env().revert(CdpError::NoPendingChange);
        }
        self.pending_changes.set(&asset_code, None);
        self.env().emit_event(events::ConfigChangeCancelled { asset_code });
    }

    /// Pause a collateral type; vaults treat it as unsupported
    pub fn pause_collateral(&mut self, asset_code: String) {
        self.require_admin();
        let mut config = self.load_config(&asset_code);
        config.is_paused = true;
        self.collateral_configs.set(&asset_code, config);
        self.env().emit_event(events::CollateralPaused { asset_code });
    }

    /// Resume a paused collateral type
    pub fn unpause_collateral(&mut self, asset_code: String) {
        self.require_admin();
        let mut config = self.load_config(&asset_code);
        config.is_paused = false;
        self.collateral_configs.set(&asset_code, config);
        self.env().emit_event(events::CollateralUnpaused { asset_code });
    }

    // ========== Interest Index ==========

    /// Apply up to the owed number of periods to an asset's index.
    ///
    /// A call inside the current period is a no-op. Callable by anyone.
    pub fn refresh_index(&mut self, asset_code: String, cycles: u64) {
        let mut config = self.load_config(&asset_code);
        let now = self.now_secs();
        if now < config.last_index_time + PERIOD_SECONDS {
            return;
        }

        let owed = owed_cycles(config.last_index_time, now);
        if cycles > owed {
            self.env().revert(CdpError::CycleCountTooHigh);
        }
        if cycles == 0 {
            return;
        }

        self.apply_cycles(&mut config, cycles);
    }

    /// Apply every owed period and return the resulting index.
    ///
    /// Used by vaults before reading debt. Callable by anyone.
    pub fn catch_up_index(&mut self, asset_code: String) -> U256 {
        let mut config = self.load_config(&asset_code);
        let owed = owed_cycles(config.last_index_time, self.now_secs());
        if owed > 0 {
            self.apply_cycles(&mut config, owed);
        }
        config.index_price
    }

    /// Stored index, without applying owed periods
    pub fn get_index_price(&self, asset_code: String) -> U256 {
        self.load_config(&asset_code).index_price
    }

    /// Index after applying every owed period, without writing it
    pub fn projected_index_price(&self, asset_code: String) -> U256 {
        let config = self.load_config(&asset_code);
        let cycles = owed_cycles(config.last_index_time, self.now_secs());
        advance_index(
            config.index_price,
            config.interest_per_period,
            config.last_index_time,
            cycles,
        )
        .index_price
    }

    /// Number of whole periods owed on an asset's index
    pub fn owed_cycles(&self, asset_code: String) -> u64 {
        let config = self.load_config(&asset_code);
        owed_cycles(config.last_index_time, self.now_secs())
    }

    // ========== View Functions ==========

    /// Get collateral config by asset code
    pub fn get_collateral_config(&self, asset_code: String) -> Option<CollateralConfig> {
        self.collateral_configs.get(&asset_code)
    }

    /// Whether an asset is registered and not paused
    pub fn is_supported(&self, asset_code: String) -> bool {
        self.collateral_configs
            .get(&asset_code)
            .map_or(false, |config| !config.is_paused)
    }

    /// Get the queued change for an asset, if any
    pub fn get_pending_change(&self, asset_code: String) -> Option<PendingConfigChange> {
        self.pending_changes.get(&asset_code).flatten()
    }

    /// Number of registered assets
    pub fn get_collateral_count(&self) -> u32 {
        self.collateral_count.get().unwrap_or(0)
    }

    /// Asset code at a registration index (0-based)
    pub fn get_collateral_code_at(&self, index: u32) -> Option<String> {
        self.collateral_codes.get(&index)
    }

    /// Get the config change delay in seconds
    pub fn get_config_change_delay(&self) -> u64 {
        self.config_change_delay
            .get()
            .unwrap_or(DEFAULT_CONFIG_CHANGE_DELAY)
    }

    /// Get the admin address
    pub fn get_admin(&self) -> Option<Address> {
        self.admin.get()
    }

    /// Get the credit token address
    pub fn get_credit_token(&self) -> Option<Address> {
        self.credit_token.get().flatten()
    }

    /// Get the treasury address
    pub fn get_treasury(&self) -> Option<Address> {
        self.treasury.get().flatten()
    }

    /// Get the price feed address
    pub fn get_price_feed(&self) -> Option<Address> {
        self.price_feed.get().flatten()
    }

    /// Get the vault serving a collateral family
    pub fn get_vault(&self, family: CollateralFamily) -> Option<Address> {
        match family {
            CollateralFamily::Synthetic => self.vault_synthetic.get().flatten(),
            CollateralFamily::LiquidityShare => self.vault_liquidity_share.get().flatten(),
        }
    }

    /// Check if caller is admin
    pub fn is_admin(&self, caller: Address) -> bool {
        self.admin.get().map_or(false, |admin| admin == caller)
    }

    // ========== Internal helpers ==========

    fn require_admin(&self) {
        let caller = self.env().caller();
        if !self.is_admin(caller) {
            self.env().revert(CdpError::Unauthorized);
        }
    }

    fn load_config(&self, asset_code: &String) -> CollateralConfig {
        match self.collateral_configs.get(asset_code) {
            Some(config) => config,
            None => self.env().revert(CdpError::UnsupportedCollateral),
        }
    }

    fn apply_cycles(&mut self, config: &mut CollateralConfig, cycles: u64) {
        let update = advance_index(
            config.index_price,
            config.interest_per_period,
            config.last_index_time,
            cycles,
        );
        config.index_price = update.index_price;
        config.last_index_time = update.last_index_time;
        self.collateral_configs.set(&config.asset_code, config.clone());

        self.env().emit_event(events::IndexRefreshed {
            asset_code: config.asset_code.clone(),
            cycles,
            index_price: config.index_price,
            last_index_time: config.last_index_time,
        });
    }

    fn validate_params(&self, params: &RiskParams) {
        if let Err(err) = validate_risk_params(params) {
            self.env().revert(err);
        }
    }

    fn set_delay_checked(&mut self, delay_seconds: u64) {
        if !(MIN_CONFIG_CHANGE_DELAY..=MAX_CONFIG_CHANGE_DELAY).contains(&delay_seconds) {
            self.env().revert(CdpError::InvalidConfig);
        }
        self.config_change_delay.set(delay_seconds);
    }

    fn now_secs(&self) -> u64 {
        self.env().get_block_time() / 1_000
    }
}

/// Check margins, rate and bonus factor of a collateral type.
///
/// The bonus factor must exceed `1 / liq_margin`, otherwise seizing collateral
/// at the discount never moves a loan back towards the margin.
pub fn validate_risk_params(params: &RiskParams) -> Result<(), CdpError> {
    if params.liq_margin <= one() || params.open_margin <= params.liq_margin {
        return Err(CdpError::InvalidMargins);
    }
    if !validate_interest_per_period(params.interest_per_period) {
        return Err(CdpError::InvalidInterestRate);
    }
    let bonus = params.liquidation_bonus_factor;
    if bonus.is_zero() || bonus > one() || !bonus_restores_margin(params.liq_margin, bonus) {
        return Err(CdpError::InvalidBonusFactor);
    }
    Ok(())
}

/// Config after applying `params` at `now`: owed periods compound at the old rate first
pub fn apply_change(config: &CollateralConfig, params: &RiskParams, now: u64) -> CollateralConfig {
    let cycles = owed_cycles(config.last_index_time, now);
    let update = advance_index(
        config.index_price,
        config.interest_per_period,
        config.last_index_time,
        cycles,
    );
    CollateralConfig {
        index_price: update.index_price,
        last_index_time: update.last_index_time,
        open_margin: params.open_margin,
        liq_margin: params.liq_margin,
        interest_per_period: params.interest_per_period,
        liquidation_bonus_factor: params.liquidation_bonus_factor,
        ..config.clone()
    }
}
