use odra::casper_types::U256;
use odra::prelude::Addressable;
use odra::host::HostRef;
use pretty_assertions::assert_eq;

use credit_vault_contracts::errors::CdpError;
use credit_vault_contracts::interest::compound_index;
use credit_vault_contracts::registry::events::IndexRefreshed;
use credit_vault_contracts::types::{one, CollateralFamily, PERIOD_SECONDS};

use crate::fixture::{asset, fp, units, Protocol, CONFIG_CHANGE_DELAY};

#[test]
fn test_new_asset_starts_at_unit_index_on_period_boundary() {
    let p = Protocol::setup();
    let config = p.registry.get_collateral_config(asset()).unwrap();
    assert_eq!(config.index_price, one());
    assert_eq!(config.last_index_time % PERIOD_SECONDS, 0);
    assert!(p.registry.is_supported(asset()));
    assert_eq!(p.registry.get_collateral_count(), 1);
    assert_eq!(p.registry.get_collateral_code_at(0), Some(asset()));
}

#[test]
fn test_refresh_inside_period_is_noop() {
    let mut p = Protocol::setup();
    let before = p.registry.get_collateral_config(asset()).unwrap();

    p.registry.refresh_index(asset(), 5);

    let after = p.registry.get_collateral_config(asset()).unwrap();
    assert_eq!(after, before);
    assert_eq!(p.registry.owed_cycles(asset()), 0);
}

#[test]
fn test_refresh_rejects_more_cycles_than_owed() {
    let mut p = Protocol::setup();
    let before = p.registry.get_collateral_config(asset()).unwrap();
    p.advance_periods(2);
    assert_eq!(p.registry.owed_cycles(asset()), 2);

    assert_eq!(
        p.registry.try_refresh_index(asset(), 3),
        Err(CdpError::CycleCountTooHigh.into())
    );

    p.registry.refresh_index(asset(), 2);
    let after = p.registry.get_collateral_config(asset()).unwrap();
    assert_eq!(after.last_index_time, before.last_index_time + 2 * PERIOD_SECONDS);
    assert_eq!(after.index_price, fp(10404, 10000));
    assert!(p.env.emitted_event(
        &p.registry,
        IndexRefreshed {
            asset_code: asset(),
            cycles: 2,
            index_price: fp(10404, 10000),
            last_index_time: after.last_index_time,
        }
    ));
}

#[test]
fn test_refresh_in_steps_matches_projection() {
    let mut p = Protocol::setup();
    p.advance_periods(7);
    let projected = p.registry.projected_index_price(asset());

    p.registry.refresh_index(asset(), 3);
    assert_eq!(p.registry.owed_cycles(asset()), 4);
    p.registry.refresh_index(asset(), 4);

    assert_eq!(p.registry.get_index_price(asset()), projected);
    assert_eq!(projected, compound_index(one(), fp(102, 100), 7));
}

#[test]
fn test_refresh_unknown_asset() {
    let mut p = Protocol::setup();
    assert_eq!(
        p.registry.try_refresh_index(String::from("XYZ"), 1),
        Err(CdpError::UnsupportedCollateral.into())
    );
}

#[test]
fn test_add_collateral_validation() {
    let mut p = Protocol::setup();
    let token = p.collateral.address().clone();
    let code = String::from("sBTC");
    let family = CollateralFamily::Synthetic;

    assert_eq!(
        p.registry.try_add_collateral_type(asset(), token, family, units(2), fp(11, 10), fp(102, 100), fp(95, 100)),
        Err(CdpError::CollateralAlreadyExists.into())
    );
    assert_eq!(
        p.registry.try_add_collateral_type(code.clone(), token, family, units(2), one(), fp(102, 100), fp(95, 100)),
        Err(CdpError::InvalidMargins.into())
    );
    assert_eq!(
        p.registry.try_add_collateral_type(code.clone(), token, family, fp(11, 10), fp(11, 10), fp(102, 100), fp(95, 100)),
        Err(CdpError::InvalidMargins.into())
    );
    assert_eq!(
        p.registry.try_add_collateral_type(code.clone(), token, family, units(2), fp(11, 10), one(), fp(95, 100)),
        Err(CdpError::InvalidInterestRate.into())
    );
    assert_eq!(
        p.registry.try_add_collateral_type(code.clone(), token, family, units(2), fp(11, 10), fp(102, 100), U256::zero()),
        Err(CdpError::InvalidBonusFactor.into())
    );
    assert_eq!(
        p.registry.try_add_collateral_type(code.clone(), token, family, units(2), fp(11, 10), fp(102, 100), fp(101, 100)),
        Err(CdpError::InvalidBonusFactor.into())
    );
    // 0.9 * 1.1 < 1: seizing at that discount cannot restore the margin
    assert_eq!(
        p.registry.try_add_collateral_type(code.clone(), token, family, units(2), fp(11, 10), fp(102, 100), fp(9, 10)),
        Err(CdpError::InvalidBonusFactor.into())
    );
    assert_eq!(
        p.registry.try_queue_config_change(asset(), units(2), fp(11, 10), fp(102, 100), fp(9, 10)),
        Err(CdpError::InvalidBonusFactor.into())
    );

    let outsider = p.account(3);
    p.env.set_caller(outsider);
    assert_eq!(
        p.registry.try_add_collateral_type(code, token, family, units(2), fp(11, 10), fp(102, 100), fp(95, 100)),
        Err(CdpError::Unauthorized.into())
    );
}

#[test]
fn test_queued_change_waits_for_delay_and_compounds_first() {
    let mut p = Protocol::setup();
    p.registry
        .queue_config_change(asset(), units(3), fp(12, 10), fp(101, 100), fp(9, 10));
    let pending = p.registry.get_pending_change(asset()).unwrap();
    assert_eq!(pending.params.interest_per_period, fp(101, 100));

    assert_eq!(
        p.registry.try_apply_queued_change(asset()),
        Err(CdpError::ChangeNotReady.into())
    );

    let periods = CONFIG_CHANGE_DELAY / PERIOD_SECONDS;
    p.advance_periods(periods);
    p.registry.apply_queued_change(asset());

    let config = p.registry.get_collateral_config(asset()).unwrap();
    assert_eq!(config.index_price, compound_index(one(), fp(102, 100), periods));
    assert_eq!(config.interest_per_period, fp(101, 100));
    assert_eq!(config.open_margin, units(3));
    assert_eq!(config.liq_margin, fp(12, 10));
    assert_eq!(config.liquidation_bonus_factor, fp(9, 10));
    assert_eq!(p.registry.get_pending_change(asset()), None);

    // The new rate applies from here on
    p.advance_periods(1);
    assert_eq!(
        p.registry.projected_index_price(asset()),
        config.index_price * fp(101, 100) / one()
    );
}

#[test]
fn test_cancel_queued_change() {
    let mut p = Protocol::setup();
    assert_eq!(
        p.registry.try_cancel_queued_change(asset()),
        Err(CdpError::NoPendingChange.into())
    );

    p.registry
        .queue_config_change(asset(), units(3), fp(12, 10), fp(101, 100), fp(9, 10));
    p.registry.cancel_queued_change(asset());
    p.advance_periods(CONFIG_CHANGE_DELAY / PERIOD_SECONDS);
    assert_eq!(
        p.registry.try_apply_queued_change(asset()),
        Err(CdpError::NoPendingChange.into())
    );
}

#[test]
fn test_pause_and_unpause_collateral() {
    let mut p = Protocol::setup();
    p.registry.pause_collateral(asset());
    assert!(!p.registry.is_supported(asset()));
    p.registry.unpause_collateral(asset());
    assert!(p.registry.is_supported(asset()));
}

#[test]
fn test_config_change_delay_bounds() {
    let mut p = Protocol::setup();
    assert_eq!(
        p.registry.try_set_config_change_delay(3_599),
        Err(CdpError::InvalidConfig.into())
    );
    assert_eq!(
        p.registry.try_set_config_change_delay(604_801),
        Err(CdpError::InvalidConfig.into())
    );
    p.registry.set_config_change_delay(86_400);
    assert_eq!(p.registry.get_config_change_delay(), 86_400);
}

#[test]
fn test_address_book_and_admin_transfer() {
    let mut p = Protocol::setup();
    assert_eq!(p.registry.get_vault(CollateralFamily::Synthetic), Some(p.vault_address()));
    assert_eq!(p.registry.get_vault(CollateralFamily::LiquidityShare), None);
    assert_eq!(p.registry.get_treasury(), Some(p.treasury_address()));

    let new_admin = p.account(5);
    p.registry.transfer_admin(new_admin);
    assert!(p.registry.is_admin(new_admin));
    assert!(!p.registry.is_admin(p.admin));
    assert_eq!(
        p.registry.try_set_treasury(new_admin),
        Err(CdpError::Unauthorized.into())
    );
}
