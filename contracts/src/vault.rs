//! Collateral vault for one collateral family.
//!
//! Holds the loan ledger keyed by (asset, borrower). Debt is tracked in index
//! units against the registry's per-asset interest index; the vault catches the
//! index up before every operation that reads debt. Ledger state is always
//! written before any token call.

use odra::prelude::*;
use odra::casper_types::U256;
use odra::ContractRef;
use crate::errors::CdpError;
use crate::interfaces::{
    Cep18TokenContractRef, CreditMinterContractRef, FeeSinkContractRef, LoanInfo,
    PriceFeedContractRef, VaultStatus,
};
use crate::ledger::{self, meets_ratio, real_debt};
use crate::liquidation_engine::{self, plan_liquidation};
use crate::registry::RegistryContractRef;
use crate::types::{
    one, CollateralConfig, CollateralFamily, DailyIssuance, Loan, LoanKey, MarginKind,
    MAX_OPEN_LOAN_FEE, MIN_LOAN_VALUE, ONE_DAY_SECONDS, SCALE,
};

/// Margin a loan must still satisfy after a partial repayment or withdrawal
pub const REMAINING_DEBT_MARGIN: MarginKind = MarginKind::Opening;

/// Default daily issuance ceiling (1,000,000 credit units)
const DEFAULT_DAILY_MAX: u128 = 1_000_000 * SCALE;

/// Default open-loan fee (1%)
const DEFAULT_OPEN_LOAN_FEE: u128 = SCALE / 100;

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;

    #[odra::event]
    pub struct OpenOrIncreaseLoan {
        pub asset_code: String,
        pub borrower: Address,
        pub collateral_added: U256,
        pub debt_added: U256,
        pub fee: U256,
        pub collateral_quantity: U256,
        pub principal: U256,
    }

    #[odra::event]
    pub struct IncreaseCollateral {
        pub asset_code: String,
        pub borrower: Address,
        pub collateral_added: U256,
        pub collateral_quantity: U256,
    }

    #[odra::event]
    pub struct ClosedLoan {
        pub asset_code: String,
        pub borrower: Address,
        pub collateral_returned: U256,
        pub principal_repaid: U256,
        pub interest_repaid: U256,
        pub forgiven: U256,
        pub collateral_quantity: U256,
        pub principal: U256,
    }

    #[odra::event]
    pub struct Liquidation {
        pub asset_code: String,
        pub borrower: Address,
        pub liquidator: Address,
        pub collateral_seized: U256,
        pub credit_paid: U256,
        pub principal_repaid: U256,
        pub interest_repaid: U256,
        pub full_seizure: bool,
    }

    #[odra::event]
    pub struct BadDebtCleared {
        pub asset_code: String,
        pub borrower: Address,
        pub liquidator: Address,
        pub written_off: U256,
    }

    #[odra::event]
    pub struct DailyMaxChanged {
        pub old_value: U256,
        pub new_value: U256,
    }

    #[odra::event]
    pub struct OpenLoanFeeChanged {
        pub old_value: U256,
        pub new_value: U256,
    }

    #[odra::event]
    pub struct VaultPaused {
        pub by: Address,
    }

    #[odra::event]
    pub struct VaultUnpaused {
        pub by: Address,
    }
}

/// Collateral and index state loaded for one operation
struct Market {
    config: CollateralConfig,
    index_price: U256,
    price_feed: Address,
}

#[odra::module(events = [
    events::OpenOrIncreaseLoan,
    events::IncreaseCollateral,
    events::ClosedLoan,
    events::Liquidation,
    events::BadDebtCleared,
    events::DailyMaxChanged,
    events::OpenLoanFeeChanged,
    events::VaultPaused,
    events::VaultUnpaused
])]
pub struct Vault {
    /// Registry contract address
    registry: Var<Address>,
    /// Collateral family this vault accepts
    family: Var<CollateralFamily>,
    /// Loan ledger
    loans: Mapping<LoanKey, Loan>,
    daily_issuance: Var<DailyIssuance>,
    /// Ceiling on debt originated per day bucket
    daily_max: Var<U256>,
    /// Share of originated debt minted to the treasury
    open_loan_fee: Var<U256>,
    paused: Var<bool>,
    total_liquidations: Var<u64>,
    /// Debt written off by full seizures
    total_bad_debt: Var<U256>,
}

#[odra::module]
impl Vault {
    pub fn init(&mut self, registry: Address, family: CollateralFamily) {
        self.registry.set(registry);
        self.family.set(family);
        self.daily_issuance.set(DailyIssuance {
            day_start: self.now_secs(),
            issued: U256::zero(),
        });
        self.daily_max.set(U256::from(DEFAULT_DAILY_MAX));
        self.open_loan_fee.set(U256::from(DEFAULT_OPEN_LOAN_FEE));
        self.paused.set(false);
        self.total_liquidations.set(0);
        self.total_bad_debt.set(U256::zero());
    }

    // ========== Loan Operations ==========

    /// Open a loan or add collateral and debt to the caller's existing loan.
    ///
    /// The minted debt is split between the borrower and the treasury by the
    /// open-loan fee. The resulting loan must satisfy `open_margin`.
    pub fn open_loan(&mut self, asset_code: String, add_collateral: U256, add_debt: U256) {
        self.require_not_paused();
        if add_collateral.is_zero() && add_debt.is_zero() {
            self.env().revert(CdpError::ZeroAmount);
        }

        let borrower = self.env().caller();
        let market = self.load_market(&asset_code);
        let key = LoanKey {
            asset_code: asset_code.clone(),
            borrower,
        };
        let loan = self.loans.get_or_default(&key);

        if add_debt.is_zero() && !loan.has_debt() {
            self.env().revert(CdpError::LoanTooSmall);
        }
        if !add_debt.is_zero() {
            self.consume_daily_issuance(add_debt);
        }

        let origination = ledger::originate(
            &loan,
            add_collateral,
            add_debt,
            market.index_price,
            self.get_open_loan_fee(),
        );
        let next = origination.loan;
        let debt = real_debt(next.indexed_debt, market.index_price);
        if !add_debt.is_zero() && debt < U256::from(MIN_LOAN_VALUE) {
            self.env().revert(CdpError::LoanTooSmall);
        }

        let value = self.value_of(&market, &asset_code, next.collateral_quantity);
        if !meets_ratio(value, debt, market.config.open_margin) {
            self.env().revert(CdpError::MarginNotMet);
        }

        self.loans.set(&key, next.clone());

        if !add_collateral.is_zero() {
            self.pull_collateral(market.config.token, borrower, add_collateral);
        }
        if !origination.borrower_amount.is_zero() {
            self.credit_token().mint(borrower, origination.borrower_amount);
        }
        if !origination.fee.is_zero() {
            let treasury = self.require_address(self.registry().get_treasury());
            self.credit_token().mint(treasury, origination.fee);
            FeeSinkContractRef::new(self.env(), treasury).record_borrowing_fee(origination.fee);
        }

        self.env().emit_event(events::OpenOrIncreaseLoan {
            asset_code,
            borrower,
            collateral_added: add_collateral,
            debt_added: add_debt,
            fee: origination.fee,
            collateral_quantity: next.collateral_quantity,
            principal: next.principal,
        });
    }

    /// Post more collateral to an open loan without borrowing.
    pub fn increase_collateral_amount(&mut self, asset_code: String, collateral_to_add: U256) {
        self.require_not_paused();
        if collateral_to_add.is_zero() {
            self.env().revert(CdpError::ZeroAmount);
        }

        let borrower = self.env().caller();
        let market = self.load_market(&asset_code);
        let key = LoanKey {
            asset_code: asset_code.clone(),
            borrower,
        };
        let mut loan = match self.loans.get(&key) {
            Some(loan) if loan.has_debt() => loan,
            _ => self.env().revert(CdpError::LoanNotFound),
        };

        loan.collateral_quantity += collateral_to_add;
        let debt = real_debt(loan.indexed_debt, market.index_price);
        let value = self.value_of(&market, &asset_code, loan.collateral_quantity);
        if !meets_ratio(value, debt, market.config.liq_margin) {
            self.env().revert(CdpError::BelowLiquidationMargin);
        }

        self.loans.set(&key, loan.clone());
        self.pull_collateral(market.config.token, borrower, collateral_to_add);

        self.env().emit_event(events::IncreaseCollateral {
            asset_code,
            borrower,
            collateral_added: collateral_to_add,
            collateral_quantity: loan.collateral_quantity,
        });
    }

    /// Repay debt and withdraw collateral.
    ///
    /// Repaid principal is burned from the caller; the interest share goes to
    /// the treasury. Debt left under the dust threshold is forgiven and all
    /// collateral is returned.
    pub fn close_loan(&mut self, asset_code: String, collateral_to_withdraw: U256, repay_qty: U256) {
        self.require_not_paused();
        if collateral_to_withdraw.is_zero() && repay_qty.is_zero() {
            self.env().revert(CdpError::ZeroAmount);
        }

        let borrower = self.env().caller();
        let market = self.load_market(&asset_code);
        let key = LoanKey {
            asset_code: asset_code.clone(),
            borrower,
        };
        let loan = match self.loans.get(&key) {
            Some(loan) if !loan.is_empty() => loan,
            _ => self.env().revert(CdpError::LoanNotFound),
        };
        if collateral_to_withdraw > loan.collateral_quantity {
            self.env().revert(CdpError::InsufficientCollateral);
        }

        let repayment = match ledger::repay(&loan, repay_qty, market.index_price) {
            Ok(repayment) => repayment,
            Err(err) => self.env().revert(err),
        };
        let mut next = repayment.loan;

        let collateral_returned = if repayment.cleared {
            loan.collateral_quantity
        } else {
            collateral_to_withdraw
        };
        next.collateral_quantity = loan.collateral_quantity - collateral_returned;

        if !repayment.cleared {
            let value = self.value_of(&market, &asset_code, next.collateral_quantity);
            let margin = margin_of(&market.config, REMAINING_DEBT_MARGIN);
            if !meets_ratio(value, repayment.outstanding, margin) {
                self.env().revert(CdpError::MarginNotMet);
            }
        }

        self.loans.set(&key, next.clone());

        self.collect_payment(borrower, repayment.principal_repaid, repayment.interest_repaid);
        if !collateral_returned.is_zero() {
            self.push_collateral(market.config.token, borrower, collateral_returned);
        }

        self.env().emit_event(events::ClosedLoan {
            asset_code,
            borrower,
            collateral_returned,
            principal_repaid: repayment.principal_repaid,
            interest_repaid: repayment.interest_repaid,
            forgiven: repayment.forgiven,
            collateral_quantity: next.collateral_quantity,
            principal: next.principal,
        });
    }

    // ========== Liquidation ==========

    /// Liquidate a loan below `liq_margin`.
    ///
    /// The caller pays for the seized collateral at the liquidation bonus
    /// discount. A partial seizure leaves the loan at or just above
    /// `liq_margin`. When no partial seizure restores the margin the whole
    /// collateral is seized and the unpaid debt is written off.
    pub fn call_liquidation(&mut self, borrower: Address, asset_code: String) {
        self.require_not_paused();
        let liquidator = self.env().caller();
        if liquidator == borrower {
            self.env().revert(CdpError::SelfLiquidation);
        }

        let market = self.load_market(&asset_code);
        let key = LoanKey {
            asset_code: asset_code.clone(),
            borrower,
        };
        let loan = match self.loans.get(&key) {
            Some(loan) => loan,
            None => self.env().revert(CdpError::LoanNotFound),
        };

        let unit_price = self.value_of(&market, &asset_code, one());
        let plan = match plan_liquidation(
            &loan,
            unit_price,
            market.index_price,
            market.config.liq_margin,
            market.config.liquidation_bonus_factor,
        ) {
            Ok(plan) => plan,
            Err(err) => self.env().revert(err),
        };

        self.loans.set(&key, plan.loan.clone());
        let liquidations = self.total_liquidations.get().unwrap_or(0);
        self.total_liquidations.set(liquidations + 1);
        if plan.full_seizure {
            let bad_debt = self.get_total_bad_debt();
            self.total_bad_debt.set(bad_debt + plan.written_off);
        }

        self.collect_payment(liquidator, plan.principal_repaid, plan.interest_repaid);
        self.push_collateral(market.config.token, liquidator, plan.collateral_seized);
        if !plan.collateral_returned.is_zero() {
            self.push_collateral(market.config.token, borrower, plan.collateral_returned);
        }

        self.env().emit_event(events::Liquidation {
            asset_code: asset_code.clone(),
            borrower,
            liquidator,
            collateral_seized: plan.collateral_seized,
            credit_paid: plan.credit_paid(),
            principal_repaid: plan.principal_repaid,
            interest_repaid: plan.interest_repaid,
            full_seizure: plan.full_seizure,
        });
        if plan.full_seizure {
            self.env().emit_event(events::BadDebtCleared {
                asset_code,
                borrower,
                liquidator,
                written_off: plan.written_off,
            });
        }
    }

    /// Collateral to seize so a loan lands back at `liq_margin`
    pub fn view_liquidatable_amount(
        &self,
        collateral_qty: U256,
        price: U256,
        debt_value: U256,
        liq_margin: U256,
        liquidation_bonus_factor: U256,
    ) -> U256 {
        liquidation_engine::view_liquidatable_amount(
            collateral_qty,
            price,
            debt_value,
            liq_margin,
            liquidation_bonus_factor,
        )
    }

    // ========== Admin ==========

    pub fn pause(&mut self) {
        self.require_admin();
        self.paused.set(true);
        self.env().emit_event(events::VaultPaused {
            by: self.env().caller(),
        });
    }

    pub fn unpause(&mut self) {
        self.require_admin();
        self.paused.set(false);
        self.env().emit_event(events::VaultUnpaused {
            by: self.env().caller(),
        });
    }

    pub fn set_daily_max(&mut self, new_value: U256) {
        self.require_admin();
        let old_value = self.get_daily_max();
        self.daily_max.set(new_value);
        self.env()
            .emit_event(events::DailyMaxChanged { old_value, new_value });
    }

    /// Set the open-loan fee, at most 10%
    pub fn set_open_loan_fee(&mut self, new_value: U256) {
        self.require_admin();
        if new_value > U256::from(MAX_OPEN_LOAN_FEE) {
            self.env().revert(CdpError::FeeTooHigh);
        }
        let old_value = self.get_open_loan_fee();
        self.open_loan_fee.set(new_value);
        self.env()
            .emit_event(events::OpenLoanFeeChanged { old_value, new_value });
    }

    // ========== View Functions ==========

    /// Raw ledger entry, zeroed when absent
    pub fn get_loan(&self, asset_code: String, borrower: Address) -> Loan {
        self.loans.get_or_default(&LoanKey {
            asset_code,
            borrower,
        })
    }

    /// Real debt at the index projected to now
    pub fn get_real_debt(&self, asset_code: String, borrower: Address) -> U256 {
        let loan = self.get_loan(asset_code.clone(), borrower);
        if !loan.has_debt() {
            return U256::zero();
        }
        real_debt(loan.indexed_debt, self.registry().projected_index_price(asset_code))
    }

    pub fn get_loan_info(&self, asset_code: String, borrower: Address) -> LoanInfo {
        let loan = self.get_loan(asset_code.clone(), borrower);
        let debt = if loan.has_debt() {
            real_debt(loan.indexed_debt, self.registry().projected_index_price(asset_code.clone()))
        } else {
            U256::zero()
        };
        let collateral_value = if loan.collateral_quantity.is_zero() {
            U256::zero()
        } else {
            self.price_feed()
                .price(asset_code, loan.collateral_quantity)
        };
        let collateral_ratio = if debt.is_zero() {
            U256::MAX
        } else {
            collateral_value * one() / debt
        };
        LoanInfo {
            loan,
            real_debt: debt,
            collateral_value,
            collateral_ratio,
        }
    }

    /// Whether `call_liquidation` would currently accept the loan
    pub fn is_liquidatable(&self, asset_code: String, borrower: Address) -> bool {
        let config = match self.registry().get_collateral_config(asset_code.clone()) {
            Some(config) => config,
            None => return false,
        };
        let info = self.get_loan_info(asset_code, borrower);
        !info.real_debt.is_zero() && !meets_ratio(info.collateral_value, info.real_debt, config.liq_margin)
    }

    pub fn get_daily_issuance(&self) -> DailyIssuance {
        self.daily_issuance.get().unwrap_or_default()
    }

    pub fn get_daily_max(&self) -> U256 {
        self.daily_max.get().unwrap_or(U256::from(DEFAULT_DAILY_MAX))
    }

    pub fn get_open_loan_fee(&self) -> U256 {
        self.open_loan_fee.get().unwrap_or(U256::from(DEFAULT_OPEN_LOAN_FEE))
    }

    pub fn get_total_bad_debt(&self) -> U256 {
        self.total_bad_debt.get().unwrap_or_default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get().unwrap_or(false)
    }

    pub fn get_status(&self) -> VaultStatus {
        VaultStatus {
            family: self.get_family(),
            is_paused: self.is_paused(),
            total_liquidations: self.total_liquidations.get().unwrap_or(0),
            total_bad_debt: self.get_total_bad_debt(),
        }
    }

    pub fn get_family(&self) -> CollateralFamily {
        match self.family.get() {
            Some(family) => family,
            None => self.env().revert(CdpError::InvalidConfig),
        }
    }

    pub fn get_registry(&self) -> Option<Address> {
        self.registry.get()
    }

    // ========== Internal ==========

    /// Load an asset for a state-changing operation and catch its index up.
    fn load_market(&mut self, asset_code: &String) -> Market {
        let mut registry = self.registry();
        let config = match registry.get_collateral_config(asset_code.clone()) {
            Some(config) if !config.is_paused && config.family == self.get_family() => config,
            _ => self.env().revert(CdpError::UnsupportedCollateral),
        };

        let price_feed = self.require_address(registry.get_price_feed());
        if PriceFeedContractRef::new(self.env(), price_feed).is_suspended(asset_code.clone()) {
            self.env().revert(CdpError::MarketSuspended);
        }

        let index_price = registry.catch_up_index(asset_code.clone());
        Market {
            config,
            index_price,
            price_feed,
        }
    }

    fn value_of(&self, market: &Market, asset_code: &String, quantity: U256) -> U256 {
        if quantity.is_zero() {
            return U256::zero();
        }
        PriceFeedContractRef::new(self.env(), market.price_feed).price(asset_code.clone(), quantity)
    }

    fn consume_daily_issuance(&mut self, amount: U256) {
        let next = match roll_daily_issuance(
            self.get_daily_issuance(),
            self.now_secs(),
            amount,
            self.get_daily_max(),
        ) {
            Ok(next) => next,
            Err(err) => self.env().revert(err),
        };
        self.daily_issuance.set(next);
    }

    /// Burn the principal share from `payer` and route interest to the treasury
    fn collect_payment(&mut self, payer: Address, principal: U256, interest: U256) {
        if !principal.is_zero() {
            self.credit_token().burn_with_allowance(payer, principal);
        }
        if !interest.is_zero() {
            let treasury = self.require_address(self.registry().get_treasury());
            if !self.credit_token().transfer_from(payer, treasury, interest) {
                self.env().revert(CdpError::TokenTransferFailed);
            }
            FeeSinkContractRef::new(self.env(), treasury).record_interest_fee(interest);
        }
    }

    fn pull_collateral(&mut self, token: Address, from: Address, amount: U256) {
        let vault = self.env().self_address();
        if !Cep18TokenContractRef::new(self.env(), token).transfer_from(from, vault, amount) {
            self.env().revert(CdpError::TokenTransferFailed);
        }
    }

    fn push_collateral(&mut self, token: Address, to: Address, amount: U256) {
        if !Cep18TokenContractRef::new(self.env(), token).transfer(to, amount) {
            self.env().revert(CdpError::TokenTransferFailed);
        }
    }

    fn registry(&self) -> RegistryContractRef {
        let registry = self.require_address(self.registry.get());
        RegistryContractRef::new(self.env(), registry)
    }

    fn credit_token(&self) -> CreditMinterContractRef {
        let token = self.require_address(self.registry().get_credit_token());
        CreditMinterContractRef::new(self.env(), token)
    }

    fn price_feed(&self) -> PriceFeedContractRef {
        let feed = self.require_address(self.registry().get_price_feed());
        PriceFeedContractRef::new(self.env(), feed)
    }

    fn require_address(&self, address: Option<Address>) -> Address {
        match address {
            Some(address) => address,
            None => self.env().revert(CdpError::AddressNotSet),
        }
    }

    fn require_not_paused(&self) {
        if self.is_paused() {
            self.env().revert(CdpError::VaultPaused);
        }
    }

    fn require_admin(&self) {
        let caller = self.env().caller();
        if !self.registry().is_admin(caller) {
            self.env().revert(CdpError::Unauthorized);
        }
    }

    fn now_secs(&self) -> u64 {
        self.env().get_block_time() / 1_000
    }
}

fn margin_of(config: &CollateralConfig, kind: MarginKind) -> U256 {
    match kind {
        MarginKind::Opening => config.open_margin,
        MarginKind::Liquidation => config.liq_margin,
    }
}

/// Add `amount` to the day bucket, starting a new bucket once a day has passed.
fn roll_daily_issuance(
    current: DailyIssuance,
    now_secs: u64,
    amount: U256,
    daily_max: U256,
) -> Result<DailyIssuance, CdpError> {
    let mut bucket = if now_secs > current.day_start + ONE_DAY_SECONDS {
        DailyIssuance {
            day_start: now_secs,
            issued: U256::zero(),
        }
    } else {
        current
    };

    let issued = bucket.issued + amount;
    if issued > daily_max {
        return Err(CdpError::DailyMaxExceeded);
    }
    bucket.issued = issued;
    Ok(bucket)
}
