//! Treasury Contract
//!
//! Receives protocol revenue in credit tokens:
//! - Borrowing fees minted on loan origination
//! - Interest paid on repayment and liquidation
//!
//! Vaults are registered as depositors and report every amount they route here.

use odra::prelude::*;
use odra::casper_types::U256;
use odra::ContractRef;
use crate::credit_token::CreditTokenContractRef;
use crate::errors::CdpError;
use crate::registry::RegistryContractRef;

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;
    use super::FeeKind;

    #[odra::event]
    pub struct FeeRecorded {
        pub depositor: Address,
        pub kind: FeeKind,
        pub amount: U256,
    }

    #[odra::event]
    pub struct FeesDistributed {
        pub recipient: Address,
        pub amount: U256,
    }
}

/// Revenue source
#[odra::odra_type]
#[derive(Copy)]
pub enum FeeKind {
    Borrowing,
    Interest,
}

/// Fee totals by source
#[odra::odra_type]
pub struct FeeBreakdown {
    /// Total borrowing fees collected
    pub borrowing: U256,
    /// Total interest collected
    pub interest: U256,
}

#[odra::module(events = [events::FeeRecorded, events::FeesDistributed])]
pub struct Treasury {
    registry: Var<Address>,
    credit_token: Var<Address>,
    /// All-time revenue
    total_fees_collected: Var<U256>,
    total_fees_distributed: Var<U256>,
    /// Revenue not yet distributed
    pending_fees: Var<U256>,
    borrowing_fees: Var<U256>,
    interest_fees: Var<U256>,
    /// Protocol contracts allowed to record revenue
    authorized_depositors: Mapping<Address, bool>,
    fee_recipient: Var<Option<Address>>,
}

#[odra::module]
impl Treasury {
    pub fn init(&mut self, registry: Address, credit_token: Address) {
        self.registry.set(registry);
        self.credit_token.set(credit_token);
        self.total_fees_collected.set(U256::zero());
        self.total_fees_distributed.set(U256::zero());
        self.pending_fees.set(U256::zero());
        self.borrowing_fees.set(U256::zero());
        self.interest_fees.set(U256::zero());
        self.fee_recipient.set(None);
    }

    // ========== Revenue (depositors only) ==========

    /// Record the origination fee minted to the treasury
    pub fn record_borrowing_fee(&mut self, amount: U256) {
        self.require_authorized_depositor();
        self.add_fee(amount, FeeKind::Borrowing);
    }

    /// Record interest transferred to the treasury
    pub fn record_interest_fee(&mut self, amount: U256) {
        self.require_authorized_depositor();
        self.add_fee(amount, FeeKind::Interest);
    }

    // ========== Distribution (admin only) ==========

    /// Send pending revenue to the fee recipient
    pub fn distribute_fees(&mut self, amount: U256) {
        self.require_registry_admin();
        if amount.is_zero() {
            self.env().revert(CdpError::ZeroAmount);
        }
        let recipient = match self.get_fee_recipient() {
            Some(recipient) => recipient,
            None => self.env().revert(CdpError::AddressNotSet),
        };
        let pending = self.get_pending_fees();
        if amount > pending {
            self.env().revert(CdpError::InsufficientTokenBalance);
        }

        self.pending_fees.set(pending - amount);
        let distributed = self.get_total_fees_distributed();
        self.total_fees_distributed.set(distributed + amount);

        let token = self.require_credit_token();
        if !CreditTokenContractRef::new(self.env(), token).transfer(recipient, amount) {
            self.env().revert(CdpError::TokenTransferFailed);
        }

        self.env().emit_event(events::FeesDistributed { recipient, amount });
    }

    // ========== Views ==========

    pub fn get_total_fees_collected(&self) -> U256 {
        self.total_fees_collected.get().unwrap_or_default()
    }

    pub fn get_total_fees_distributed(&self) -> U256 {
        self.total_fees_distributed.get().unwrap_or_default()
    }

    pub fn get_pending_fees(&self) -> U256 {
        self.pending_fees.get().unwrap_or_default()
    }

    pub fn get_fee_breakdown(&self) -> FeeBreakdown {
        FeeBreakdown {
            borrowing: self.borrowing_fees.get().unwrap_or_default(),
            interest: self.interest_fees.get().unwrap_or_default(),
        }
    }

    pub fn get_fee_recipient(&self) -> Option<Address> {
        self.fee_recipient.get().flatten()
    }

    pub fn is_depositor(&self, account: Address) -> bool {
        self.authorized_depositors.get_or_default(&account)
    }

    // ========== Admin ==========

    pub fn add_depositor(&mut self, depositor: Address) {
        self.require_registry_admin();
        self.authorized_depositors.set(&depositor, true);
    }

    pub fn remove_depositor(&mut self, depositor: Address) {
        self.require_registry_admin();
        self.authorized_depositors.set(&depositor, false);
    }

    pub fn set_fee_recipient(&mut self, recipient: Address) {
        self.require_registry_admin();
        self.fee_recipient.set(Some(recipient));
    }

    // ========== Internal ==========

    fn add_fee(&mut self, amount: U256, kind: FeeKind) {
        if amount.is_zero() {
            return;
        }

        let total = self.get_total_fees_collected();
        self.total_fees_collected.set(total + amount);
        let pending = self.get_pending_fees();
        self.pending_fees.set(pending + amount);

        let bucket = match kind {
            FeeKind::Borrowing => &mut self.borrowing_fees,
            FeeKind::Interest => &mut self.interest_fees,
        };
        let current = bucket.get().unwrap_or_default();
        bucket.set(current + amount);

        self.env().emit_event(events::FeeRecorded {
            depositor: self.env().caller(),
            kind,
            amount,
        });
    }

    fn require_authorized_depositor(&self) {
        if !self.is_depositor(self.env().caller()) {
            self.env().revert(CdpError::UnauthorizedProtocol);
        }
    }

    fn require_credit_token(&self) -> Address {
        match self.credit_token.get() {
            Some(addr) => addr,
            None => self.env().revert(CdpError::AddressNotSet),
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
}
