//! Deploys and wires a full protocol on the Odra test VM.

use odra::casper_types::U256;
use odra::host::{Deployer, HostEnv, HostRef};
use odra::prelude::*;

use credit_vault_contracts::credit_token::{CreditToken, CreditTokenHostRef, CreditTokenInitArgs};
use credit_vault_contracts::oracle_adapter::{OracleAdapter, OracleAdapterHostRef, OracleAdapterInitArgs};
use credit_vault_contracts::registry::{Registry, RegistryHostRef, RegistryInitArgs};
use credit_vault_contracts::treasury::{Treasury, TreasuryHostRef, TreasuryInitArgs};
use credit_vault_contracts::types::{one, CollateralFamily};
use credit_vault_contracts::vault::{Vault, VaultHostRef, VaultInitArgs};

pub const ASSET: &str = "sETH";
pub const CONFIG_CHANGE_DELAY: u64 = 3_600;
pub const PERIOD_MS: u64 = 180_000;

pub fn units(n: u64) -> U256 {
    U256::from(n) * one()
}

pub fn fp(numerator: u64, denominator: u64) -> U256 {
    one() * U256::from(numerator) / U256::from(denominator)
}

pub fn asset() -> String {
    ASSET.to_string()
}

pub struct Protocol {
    pub env: HostEnv,
    pub admin: Address,
    pub registry: RegistryHostRef,
    pub credit: CreditTokenHostRef,
    /// Collateral token, a second credit token deployment
    pub collateral: CreditTokenHostRef,
    pub oracle: OracleAdapterHostRef,
    pub treasury: TreasuryHostRef,
    pub vault: VaultHostRef,
}

impl Protocol {
    /// Protocol with one synthetic asset: open 2.0, liq 1.1, 1.02 per period,
    /// bonus 0.95, price 1.0.
    pub fn setup() -> Self {
        let env = odra_test::env();
        let admin = env.get_account(0);
        env.set_caller(admin);

        let mut registry = Registry::deploy(
            &env,
            RegistryInitArgs {
                admin: admin.into(),
                config_change_delay: CONFIG_CHANGE_DELAY,
            },
        );
        let registry_addr = registry.address().clone();

        let mut credit = CreditToken::deploy(
            &env,
            CreditTokenInitArgs {
                registry: registry_addr,
                name: String::from("Credit"),
                symbol: String::from("CRD"),
            },
        );
        let mut collateral = CreditToken::deploy(
            &env,
            CreditTokenInitArgs {
                registry: registry_addr,
                name: String::from("Synthetic Ether"),
                symbol: String::from("sETH"),
            },
        );
        let mut oracle = OracleAdapter::deploy(
            &env,
            OracleAdapterInitArgs {
                registry: registry_addr,
                max_price_age_seconds: 86_400,
                max_deviation_bps: 0,
            },
        );
        let mut treasury = Treasury::deploy(
            &env,
            TreasuryInitArgs {
                registry: registry_addr,
                credit_token: credit.address().clone(),
            },
        );
        let vault = Vault::deploy(
            &env,
            VaultInitArgs {
                registry: registry_addr,
                family: CollateralFamily::Synthetic,
            },
        );
        let vault_addr = vault.address().clone();

        registry.set_credit_token(credit.address().clone());
        registry.set_treasury(treasury.address().clone());
        registry.set_price_feed(oracle.address().clone());
        registry.set_vault(CollateralFamily::Synthetic, vault_addr);

        credit.add_minter(vault_addr);
        credit.add_minter(admin);
        collateral.add_minter(admin);
        treasury.add_depositor(vault_addr);
        oracle.add_feeder(admin);

        registry.add_collateral_type(
            asset(),
            collateral.address().clone(),
            CollateralFamily::Synthetic,
            units(2),
            fp(11, 10),
            fp(102, 100),
            fp(95, 100),
        );
        oracle.update_price(asset(), one());

        Self {
            env,
            admin,
            registry,
            credit,
            collateral,
            oracle,
            treasury,
            vault,
        }
    }

    pub fn account(&self, index: usize) -> Address {
        self.env.get_account(index)
    }

    pub fn vault_address(&self) -> Address {
        self.vault.address().clone()
    }

    pub fn treasury_address(&self) -> Address {
        self.treasury.address().clone()
    }

    /// Mint collateral to `account` and approve the vault for it
    pub fn fund_collateral(&mut self, account: Address, amount: U256) {
        let vault = self.vault_address();
        self.env.set_caller(self.admin);
        self.collateral.mint(account, amount);
        self.env.set_caller(account);
        self.collateral.approve(vault, amount);
        self.env.set_caller(self.admin);
    }

    /// Mint credit to `account` and approve the vault to spend `allowance`
    pub fn fund_credit(&mut self, account: Address, amount: U256, allowance: U256) {
        let vault = self.vault_address();
        self.env.set_caller(self.admin);
        if !amount.is_zero() {
            self.credit.mint(account, amount);
        }
        self.env.set_caller(account);
        self.credit.approve(vault, allowance);
        self.env.set_caller(self.admin);
    }

    /// Fund `borrower` and open a loan as them
    pub fn open(&mut self, borrower: Address, collateral: U256, debt: U256) {
        self.fund_collateral(borrower, collateral);
        self.env.set_caller(borrower);
        self.vault.open_loan(asset(), collateral, debt);
        self.env.set_caller(self.admin);
    }

    pub fn set_price(&mut self, price: U256) {
        self.env.set_caller(self.admin);
        self.oracle.update_price(asset(), price);
    }

    pub fn advance_periods(&self, periods: u64) {
        self.env.advance_block_time(periods * PERIOD_MS);
    }
}
