//! Deploy the credit vault protocol to Casper livenet/testnet using Odra livenet environment.
//!
//! Usage:
//!   cargo run --bin deploy_livenet --release
//!
//! Requires .env file with:
//!   ODRA_CASPER_LIVENET_SECRET_KEY_PATH=/path/to/secret_key.pem
//!   ODRA_CASPER_LIVENET_NODE_ADDRESS=https://node.testnet.casper.network
//!   ODRA_CASPER_LIVENET_CHAIN_NAME=casper-test
//!   ODRA_CASPER_LIVENET_PAYMENT_AMOUNT=200000000000
//!
//! Optional protocol parameters:
//!   CREDIT_VAULT_TOKEN_NAME, CREDIT_VAULT_TOKEN_SYMBOL
//!   CREDIT_VAULT_CONFIG_CHANGE_DELAY   seconds, 3600..=604800
//!   CREDIT_VAULT_MAX_PRICE_AGE         seconds
//!   CREDIT_VAULT_MAX_DEVIATION_BPS     0 disables the circuit breaker
//!   CREDIT_VAULT_DAILY_MAX             whole credit units per vault and day
//!   CREDIT_VAULT_COLLATERAL_CODE + CREDIT_VAULT_COLLATERAL_TOKEN
//!                                      register one synthetic collateral

use std::str::FromStr;

use odra::casper_types::U256;
use odra::host::{Deployer, HostRef};
use odra::prelude::*;

use credit_vault_contracts::credit_token::{CreditToken, CreditTokenInitArgs};
use credit_vault_contracts::oracle_adapter::{OracleAdapter, OracleAdapterInitArgs};
use credit_vault_contracts::registry::{Registry, RegistryInitArgs};
use credit_vault_contracts::treasury::{Treasury, TreasuryInitArgs};
use credit_vault_contracts::types::{one, CollateralFamily};
use credit_vault_contracts::vault::{Vault, VaultInitArgs};

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 1e18 fixed point from a per-mille value
fn per_mille(value: u64) -> U256 {
    one() * U256::from(value) / U256::from(1000u64)
}

fn main() {
    // Load environment from .env file
    dotenv::dotenv().ok();

    println!("=== Credit Vault Livenet Deployment ===");
    println!();

    let env = odra_casper_livenet_env::env();

    // Payment amount for deployments/calls (required for Casper 2.0 txs)
    let payment_amount: u64 = env_or("ODRA_CASPER_LIVENET_PAYMENT_AMOUNT", 200_000_000_000);
    env.set_gas(payment_amount);

    let deployer = env.caller();
    println!("Deployer: {:?}", deployer);
    println!();

    // Protocol parameters
    let token_name: String = env_or("CREDIT_VAULT_TOKEN_NAME", String::from("Credit USD"));
    let token_symbol: String = env_or("CREDIT_VAULT_TOKEN_SYMBOL", String::from("cUSD"));
    let config_change_delay: u64 = env_or("CREDIT_VAULT_CONFIG_CHANGE_DELAY", 259_200);
    let max_price_age_seconds: u64 = env_or("CREDIT_VAULT_MAX_PRICE_AGE", 3_600);
    let max_deviation_bps: u32 = env_or("CREDIT_VAULT_MAX_DEVIATION_BPS", 500);
    let daily_max_units: u64 = env_or("CREDIT_VAULT_DAILY_MAX", 1_000_000);

    // ==================== Phase 1: Core Contracts ====================
    println!("=== Phase 1: Deploying Core Contracts ===");
    println!();

    println!("Deploying Registry...");
    let mut registry = Registry::deploy(
        &env,
        RegistryInitArgs {
            admin: deployer.into(),
            config_change_delay,
        },
    );
    let registry_addr = registry.address().clone();
    println!("Registry deployed at: {:?}", registry_addr);

    println!("Deploying CreditToken...");
    let mut credit_token = CreditToken::deploy(
        &env,
        CreditTokenInitArgs {
            registry: registry_addr,
            name: token_name,
            symbol: token_symbol,
        },
    );
    let credit_token_addr = credit_token.address().clone();
    println!("CreditToken deployed at: {:?}", credit_token_addr);

    println!("Deploying OracleAdapter...");
    let mut oracle = OracleAdapter::deploy(
        &env,
        OracleAdapterInitArgs {
            registry: registry_addr,
            max_price_age_seconds,
            max_deviation_bps,
        },
    );
    let oracle_addr = oracle.address().clone();
    println!("OracleAdapter deployed at: {:?}", oracle_addr);

    println!("Deploying Treasury...");
    let mut treasury = Treasury::deploy(
        &env,
        TreasuryInitArgs {
            registry: registry_addr,
            credit_token: credit_token_addr,
        },
    );
    let treasury_addr = treasury.address().clone();
    println!("Treasury deployed at: {:?}", treasury_addr);

    println!();

    // ==================== Phase 2: Vaults ====================
    println!("=== Phase 2: Deploying Vaults ===");
    println!();

    let mut vaults = Vec::new();
    for family in [CollateralFamily::Synthetic, CollateralFamily::LiquidityShare] {
        println!("Deploying Vault ({:?})...", family);
        let mut vault = Vault::deploy(
            &env,
            VaultInitArgs {
                registry: registry_addr,
                family,
            },
        );
        let vault_addr = vault.address().clone();
        println!("Vault ({:?}) deployed at: {:?}", family, vault_addr);

        let daily_max = U256::from(daily_max_units) * one();
        if daily_max != vault.get_daily_max() {
            vault.set_daily_max(daily_max);
        }
        vaults.push((family, vault_addr));
    }

    println!();

    // ==================== Phase 3: Wiring ====================
    println!("=== Phase 3: Cross-contract Configuration ===");
    println!();

    println!("Configuring Registry address book...");
    registry.set_credit_token(credit_token_addr);
    registry.set_treasury(treasury_addr);
    registry.set_price_feed(oracle_addr);
    for (family, vault_addr) in &vaults {
        registry.set_vault(*family, *vault_addr);
    }
    println!("Done.");

    println!("Granting vault permissions...");
    for (_, vault_addr) in &vaults {
        credit_token.add_minter(*vault_addr);
        treasury.add_depositor(*vault_addr);
    }
    println!("Done.");

    println!("Registering deployer as price feeder...");
    oracle.add_feeder(deployer);
    println!("Done.");

    // Optional first collateral: 200% open, 110% liquidation, bonus 0.95,
    // roughly 5% a year compounded every 180 seconds.
    let collateral_code = std::env::var("CREDIT_VAULT_COLLATERAL_CODE").ok();
    let collateral_token = std::env::var("CREDIT_VAULT_COLLATERAL_TOKEN")
        .ok()
        .and_then(|v| Address::from_str(&v).ok());
    match (collateral_code, collateral_token) {
        (Some(code), Some(token)) => {
            println!("Registering collateral {}...", code);
            registry.add_collateral_type(
                code,
                token,
                CollateralFamily::Synthetic,
                per_mille(2000),
                per_mille(1100),
                U256::from(1_000_000_278_000_000_000u128),
                per_mille(950),
            );
            println!("Done.");
        }
        _ => println!("No collateral registered (set CREDIT_VAULT_COLLATERAL_CODE and CREDIT_VAULT_COLLATERAL_TOKEN)."),
    }

    println!();
    println!("=== Deployment Complete ===");
    println!();
    println!("Contract Addresses:");
    println!("  Registry:           {:?}", registry_addr);
    println!("  CreditToken:        {:?}", credit_token_addr);
    println!("  OracleAdapter:      {:?}", oracle_addr);
    println!("  Treasury:           {:?}", treasury_addr);
    for (family, vault_addr) in &vaults {
        println!("  Vault ({:?}):  {:?}", family, vault_addr);
    }
}
