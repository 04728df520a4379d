//! Liquidation Engine
//!
//! Computes how much collateral to seize from an under-collateralized loan.
//! A loan is liquidatable when its collateral ratio falls below `liq_margin`.
//!
//! Liquidation flow (driven by the vault):
//! 1. Check the loan ratio is below `liq_margin`
//! 2. Compute Δ, the collateral that brings the loan back to `liq_margin`
//!    when the liquidator pays `Δ * price * bonus` towards the debt
//! 3. Partial seizure when Δ is less than the posted collateral; the seized
//!    amount is nudged up until the loan sits at or above `liq_margin`
//! 4. Otherwise seize everything and write off the shortfall as bad debt
//!
//! Δ is 0 only when `liquidation_bonus_factor * liq_margin <= 1`. The registry
//! rejects such configurations, and a zero Δ never seizes anything.

use odra::casper_types::U256;
use crate::errors::CdpError;
use crate::ledger::{self, apply_ratio, real_debt, Repayment};
use crate::types::{one, Loan};

/// USD value of `quantity` collateral at `unit_price` (price of 1.0 unit)
pub fn collateral_value(quantity: U256, unit_price: U256) -> U256 {
    quantity * unit_price / one()
}

/// Upper bound on the steps taken to round a partial seizure up to the margin
const MAX_ROUNDING_STEPS: u32 = 64;

/// Collateral to seize so the loan lands at `liq_margin`, rounded up.
///
/// Returns 0 when the loan is healthy, or when the bonus factor is at or
/// below `1 / liq_margin` (seizing at that discount never improves the ratio).
/// A denominator that truncates to zero means no finite seizure is enough,
/// so the whole collateral is returned.
pub fn view_liquidatable_amount(
    collateral_qty: U256,
    price: U256,
    debt_value: U256,
    liq_margin: U256,
    liquidation_bonus_factor: U256,
) -> U256 {
    if liq_margin.is_zero() {
        return U256::zero();
    }

    let scale = one();
    let min_collat_point = debt_value * liq_margin / scale;
    let actual_collat_point = price * collateral_qty / scale;
    if actual_collat_point >= min_collat_point {
        return U256::zero();
    }

    let top = (min_collat_point - actual_collat_point) * scale / liq_margin;
    let inverse_margin = scale * scale / liq_margin;
    if liquidation_bonus_factor <= inverse_margin {
        return U256::zero();
    }

    let bottom = price * (liquidation_bonus_factor - inverse_margin) / scale;
    if bottom.is_zero() {
        return collateral_qty;
    }

    div_ceil(top * scale, bottom)
}

/// Whether a bonus factor lets partial seizures improve the collateral ratio
pub fn bonus_restores_margin(liq_margin: U256, liquidation_bonus_factor: U256) -> bool {
    apply_ratio(liquidation_bonus_factor, liq_margin) > one()
}

fn div_ceil(numerator: U256, denominator: U256) -> U256 {
    let quotient = numerator / denominator;
    if quotient * denominator == numerator {
        quotient
    } else {
        quotient + U256::one()
    }
}

/// Full description of a liquidation before it is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationPlan {
    /// Loan after the liquidation
    pub loan: Loan,
    /// Collateral handed to the liquidator
    pub collateral_seized: U256,
    /// Collateral returned to the borrower when the remaining debt was dust
    pub collateral_returned: U256,
    /// Credit paid by the liquidator, split as in a repayment
    pub principal_repaid: U256,
    pub interest_repaid: U256,
    /// Debt written off as bad debt
    pub written_off: U256,
    /// Whether all collateral was seized
    pub full_seizure: bool,
}

impl LiquidationPlan {
    /// Total credit the liquidator pays
    pub fn credit_paid(&self) -> U256 {
        self.principal_repaid + self.interest_repaid
    }
}

/// Plan the liquidation of `loan` at `unit_price` and `index_price`.
pub fn plan_liquidation(
    loan: &Loan,
    unit_price: U256,
    index_price: U256,
    liq_margin: U256,
    liquidation_bonus_factor: U256,
) -> Result<LiquidationPlan, CdpError> {
    let debt = real_debt(loan.indexed_debt, index_price);
    if debt.is_zero() {
        return Err(CdpError::LoanNotFound);
    }

    let value = collateral_value(loan.collateral_quantity, unit_price);
    if ledger::meets_ratio(value, debt, liq_margin) {
        return Err(CdpError::NotLiquidatable);
    }

    let delta = view_liquidatable_amount(
        loan.collateral_quantity,
        unit_price,
        debt,
        liq_margin,
        liquidation_bonus_factor,
    );

    if delta.is_zero() {
        return Err(CdpError::NotLiquidatable);
    }

    // Truncation in the price and payment math can leave the loan a few wei
    // under the margin, so grow Δ until the resulting loan clears it.
    let mut delta = delta;
    let mut step = (delta / U256::from(1u64 << 40)).max(U256::one());
    for _ in 0..MAX_ROUNDING_STEPS {
        if delta >= loan.collateral_quantity {
            break;
        }
        let plan = partial_seizure(loan, delta, unit_price, index_price, liquidation_bonus_factor)?;
        if restores_margin(&plan, unit_price, index_price, liq_margin) {
            return Ok(plan);
        }
        delta += step;
        step = step + step;
    }

    Ok(full_seizure(loan, value, debt, liquidation_bonus_factor))
}

fn partial_seizure(
    loan: &Loan,
    delta: U256,
    unit_price: U256,
    index_price: U256,
    liquidation_bonus_factor: U256,
) -> Result<LiquidationPlan, CdpError> {
    let debt = real_debt(loan.indexed_debt, index_price);
    let payment = apply_ratio(collateral_value(delta, unit_price), liquidation_bonus_factor).min(debt);
    let Repayment {
        loan: mut next,
        principal_repaid,
        interest_repaid,
        cleared,
        ..
    } = ledger::repay(loan, payment, index_price)?;

    let remaining = loan.collateral_quantity - delta;
    let collateral_returned = if cleared { remaining } else { U256::zero() };
    next.collateral_quantity = remaining - collateral_returned;

    Ok(LiquidationPlan {
        loan: next,
        collateral_seized: delta,
        collateral_returned,
        principal_repaid,
        interest_repaid,
        written_off: U256::zero(),
        full_seizure: false,
    })
}

/// `value * 1e18 >= debt * liq_margin` without truncating either side
fn restores_margin(plan: &LiquidationPlan, unit_price: U256, index_price: U256, liq_margin: U256) -> bool {
    let debt = real_debt(plan.loan.indexed_debt, index_price);
    if debt.is_zero() {
        return true;
    }
    let value = collateral_value(plan.loan.collateral_quantity, unit_price);
    value * one() >= debt * liq_margin
}

fn full_seizure(loan: &Loan, value: U256, debt: U256, liquidation_bonus_factor: U256) -> LiquidationPlan {
    let payment = apply_ratio(value, liquidation_bonus_factor).min(debt);
    let principal_repaid = payment.min(loan.principal);

    LiquidationPlan {
        loan: Loan::default(),
        collateral_seized: loan.collateral_quantity,
        collateral_returned: U256::zero(),
        principal_repaid,
        interest_repaid: payment - principal_repaid,
        written_off: debt - payment,
        full_seizure: true,
    }
}
