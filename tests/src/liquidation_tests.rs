use odra::casper_types::U256;
use odra::host::HostRef;
use pretty_assertions::assert_eq;

use credit_vault_contracts::errors::CdpError;
use credit_vault_contracts::types::{one, Loan};
use credit_vault_contracts::vault::events::{BadDebtCleared, Liquidation};

use crate::fixture::{asset, fp, units, Protocol};

fn underwater(price: U256) -> (Protocol, odra::prelude::Address, odra::prelude::Address) {
    let mut p = Protocol::setup();
    let borrower = p.account(1);
    let liquidator = p.account(2);
    p.open(borrower, units(1000), units(500));
    p.fund_credit(liquidator, units(600), units(600));
    p.set_price(price);
    (p, borrower, liquidator)
}

#[test]
fn test_partial_liquidation_restores_margin() {
    let (mut p, borrower, liquidator) = underwater(fp(545, 1000));
    assert!(p.vault.is_liquidatable(asset(), borrower));

    p.env.set_caller(liquidator);
    p.vault.call_liquidation(borrower, asset());

    let loan = p.vault.get_loan(asset(), borrower);
    let seized = units(1000) - loan.collateral_quantity;
    let paid = units(500) - loan.principal;
    assert!(seized > units(203) && seized < units(204));
    assert_eq!(p.collateral.balance_of(liquidator), seized);
    assert_eq!(p.credit.balance_of(liquidator), units(600) - paid);

    let ratio = p.vault.get_loan_info(asset(), borrower).collateral_ratio;
    let margin = fp(11, 10);
    assert!(ratio >= margin);
    assert!(ratio - margin <= U256::from(1_000_000_000u64));
    assert!(!p.vault.is_liquidatable(asset(), borrower));

    let status = p.vault.get_status();
    assert_eq!(status.total_liquidations, 1);
    assert_eq!(status.total_bad_debt, U256::zero());
    assert!(p.env.emitted_event(
        &p.vault,
        Liquidation {
            asset_code: asset(),
            borrower,
            liquidator,
            collateral_seized: seized,
            credit_paid: paid,
            principal_repaid: paid,
            interest_repaid: U256::zero(),
            full_seizure: false,
        }
    ));
}

#[test]
fn test_full_seizure_clears_bad_debt() {
    // 1000 * 0.525 / 500 = 1.05, no partial seizure gets back to 1.1
    let (mut p, borrower, liquidator) = underwater(fp(525, 1000));

    p.env.set_caller(liquidator);
    p.vault.call_liquidation(borrower, asset());

    assert_eq!(p.vault.get_loan(asset(), borrower), Loan::default());
    assert_eq!(p.collateral.balance_of(liquidator), units(1000));
    assert_eq!(p.credit.balance_of(liquidator), units(600) - fp(49875, 100));
    assert_eq!(p.vault.get_total_bad_debt(), fp(125, 100));
    assert!(p.env.emitted_event(
        &p.vault,
        BadDebtCleared {
            asset_code: asset(),
            borrower,
            liquidator,
            written_off: fp(125, 100),
        }
    ));
}

#[test]
fn test_liquidation_preconditions() {
    let (mut p, borrower, liquidator) = underwater(one());

    let stranger = p.account(4);
    p.env.set_caller(liquidator);
    assert!(!p.vault.is_liquidatable(asset(), borrower));
    assert_eq!(
        p.vault.try_call_liquidation(borrower, asset()),
        Err(CdpError::NotLiquidatable.into())
    );
    assert_eq!(
        p.vault.try_call_liquidation(stranger, asset()),
        Err(CdpError::LoanNotFound.into())
    );

    p.env.set_caller(borrower);
    assert_eq!(
        p.vault.try_call_liquidation(borrower, asset()),
        Err(CdpError::SelfLiquidation.into())
    );
}

#[test]
fn test_interest_can_make_a_loan_liquidatable() {
    let (mut p, borrower, liquidator) = underwater(fp(60, 100));
    // 600 / 500 = 1.2 before interest
    assert!(!p.vault.is_liquidatable(asset(), borrower));

    // 1.02^5 pushes real debt above 545
    p.advance_periods(5);
    assert!(p.vault.is_liquidatable(asset(), borrower));

    p.env.set_caller(liquidator);
    p.vault.call_liquidation(borrower, asset());
    assert_eq!(p.vault.get_status().total_liquidations, 1);
}

#[test]
fn test_view_liquidatable_amount_matches_formula() {
    let p = Protocol::setup();
    let amount = p.vault.view_liquidatable_amount(
        units(1000),
        fp(545, 1000),
        units(500),
        fp(11, 10),
        fp(95, 100),
    );
    assert!(amount > units(203) && amount < units(204));

    let none = p
        .vault
        .view_liquidatable_amount(units(1000), one(), units(500), fp(11, 10), fp(95, 100));
    assert_eq!(none, U256::zero());
}

#[test]
fn test_partial_liquidations_land_at_or_above_margin() {
    let margin = fp(11, 10);
    let mut price = fp(530, 1000);
    while price < fp(545, 1000) {
        let (mut p, borrower, liquidator) = underwater(price);
        p.env.set_caller(liquidator);
        p.vault.call_liquidation(borrower, asset());

        let info = p.vault.get_loan_info(asset(), borrower);
        assert!(!info.real_debt.is_zero());
        assert!(info.collateral_ratio >= margin, "ratio {} below margin at price {}", info.collateral_ratio, price);
        assert!(!p.vault.is_liquidatable(asset(), borrower));
        assert_eq!(
            p.vault.try_call_liquidation(borrower, asset()),
            Err(CdpError::NotLiquidatable.into())
        );
        price = price + fp(3, 1000) + U256::from(13u64);
    }
}
