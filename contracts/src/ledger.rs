//! Indexed-debt loan ledger.
//!
//! A loan stores `principal` (face value originated) and `indexed_debt`
//! (the same debt divided by the asset index at origination). Real debt at any
//! later time is `indexed_debt * index / 1e18`. These helpers compute the next
//! ledger state without touching storage, so the vault can validate a
//! transition fully before committing it.
//!
//! Rounding truncates toward zero, with one exception: index units minted on
//! origination are rounded up so that `indexed_debt * index >= principal`
//! holds after every transition.

use odra::casper_types::U256;
use crate::errors::CdpError;
use crate::types::{one, Loan, DUST_THRESHOLD};

/// Real (interest-inclusive) debt of `indexed_debt` at `index_price`
pub fn real_debt(indexed_debt: U256, index_price: U256) -> U256 {
    indexed_debt * index_price / one()
}

/// `value * ratio`, both fixed point
pub fn apply_ratio(value: U256, ratio: U256) -> U256 {
    value * ratio / one()
}

/// Whether `collateral_value >= debt * ratio`
pub fn meets_ratio(collateral_value: U256, debt: U256, ratio: U256) -> bool {
    collateral_value >= apply_ratio(debt, ratio)
}

/// Index units retired by repaying `amount` (truncated)
pub fn to_indexed_down(amount: U256, index_price: U256) -> U256 {
    amount * one() / index_price
}

/// Index units created by borrowing `amount` (rounded up)
pub fn to_indexed_up(amount: U256, index_price: U256) -> U256 {
    let scaled = amount * one();
    let units = scaled / index_price;
    if (units * index_price) < scaled {
        units + U256::one()
    } else {
        units
    }
}

/// Result of originating debt against a loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origination {
    /// Loan after the change
    pub loan: Loan,
    /// Credit minted to the treasury
    pub fee: U256,
    /// Credit minted to the borrower
    pub borrower_amount: U256,
}

/// Add collateral and debt to a loan and split the minted credit by `fee_rate`.
pub fn originate(
    loan: &Loan,
    add_collateral: U256,
    add_debt: U256,
    index_price: U256,
    fee_rate: U256,
) -> Origination {
    let mut next = loan.clone();
    next.collateral_quantity = loan.collateral_quantity + add_collateral;

    if add_debt.is_zero() {
        return Origination {
            loan: next,
            fee: U256::zero(),
            borrower_amount: U256::zero(),
        };
    }

    next.principal = loan.principal + add_debt;
    next.indexed_debt = loan.indexed_debt + to_indexed_up(add_debt, index_price);

    let fee = apply_ratio(add_debt, fee_rate);
    Origination {
        loan: next,
        fee,
        borrower_amount: add_debt - fee,
    }
}

/// Result of repaying part or all of a loan's debt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repayment {
    /// Loan after the change (collateral untouched)
    pub loan: Loan,
    /// Share of the payment that retires principal (burned)
    pub principal_repaid: U256,
    /// Share of the payment that is interest revenue (sent to treasury)
    pub interest_repaid: U256,
    /// Remaining real debt after the payment, zero when cleared
    pub outstanding: U256,
    /// Dust written off because it fell under `DUST_THRESHOLD`
    pub forgiven: U256,
    /// Whether the loan's debt was cleared
    pub cleared: bool,
}

/// Apply a repayment of `repay_qty` at `index_price`.
///
/// Principal is retired before interest. The whole payment retires index
/// units, not only the principal share.
pub fn repay(loan: &Loan, repay_qty: U256, index_price: U256) -> Result<Repayment, CdpError> {
    let debt = real_debt(loan.indexed_debt, index_price);
    if repay_qty > debt {
        return Err(CdpError::RepayExceedsDebt);
    }

    let principal_repaid = repay_qty.min(loan.principal);
    let interest_repaid = repay_qty - principal_repaid;
    let outstanding = debt - repay_qty;

    let mut next = loan.clone();
    if outstanding < U256::from(DUST_THRESHOLD) {
        next.principal = U256::zero();
        next.indexed_debt = U256::zero();
        return Ok(Repayment {
            loan: next,
            principal_repaid,
            interest_repaid,
            outstanding: U256::zero(),
            forgiven: outstanding,
            cleared: true,
        });
    }

    next.principal = loan.principal - principal_repaid;
    next.indexed_debt = loan
        .indexed_debt
        .saturating_sub(to_indexed_down(repay_qty, index_price));

    Ok(Repayment {
        loan: next,
        principal_repaid,
        interest_repaid,
        outstanding,
        forgiven: U256::zero(),
        cleared: false,
    })
}
