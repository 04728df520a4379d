//! Credit token
//!
//! CEP-18 compatible token issued against vault collateral. Vaults are
//! registered as minters; they mint on origination and burn repaid principal
//! through the payer's allowance. Balances and allowances are mirrored into
//! the standard CEP-18 dictionaries so wallets can read them.

use odra::prelude::*;
use odra::casper_types::{Key, U256};
use odra::casper_types::bytesrepr::ToBytes;
use odra::ContractRef;
use crate::errors::CdpError;
use crate::registry::RegistryContractRef;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

const DECIMALS: u8 = 18;
const CEP18_NAME_KEY: &str = "name";
const CEP18_SYMBOL_KEY: &str = "symbol";
const CEP18_DECIMALS_KEY: &str = "decimals";
const CEP18_TOTAL_SUPPLY_KEY: &str = "total_supply";
const CEP18_BALANCES_DICT: &str = "balances";
const CEP18_ALLOWANCES_DICT: &str = "allowances";

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;

    #[odra::event]
    pub struct Transfer {
        pub from: Address,
        pub to: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct Approval {
        pub owner: Address,
        pub spender: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct Mint {
        pub to: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct Burn {
        pub from: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct MinterChanged {
        pub minter: Address,
        pub enabled: bool,
    }
}

#[odra::module(events = [
    events::Transfer,
    events::Approval,
    events::Mint,
    events::Burn,
    events::MinterChanged
])]
pub struct CreditToken {
    name: Var<String>,
    symbol: Var<String>,
    total_supply: Var<U256>,
    balances: Mapping<Address, U256>,
    /// (owner, spender) -> amount
    allowances: Mapping<(Address, Address), U256>,
    /// Registry consulted for admin rights
    registry: Var<Address>,
    minters: Mapping<Address, bool>,
    /// 0 means uncapped
    supply_cap: Var<U256>,
}

#[odra::module]
impl CreditToken {
    pub fn init(&mut self, registry: Address, name: String, symbol: String) {
        self.name.set(name.clone());
        self.symbol.set(symbol.clone());
        self.total_supply.set(U256::zero());
        self.registry.set(registry);
        self.supply_cap.set(U256::zero());

        self.env().init_dictionary(CEP18_BALANCES_DICT);
        self.env().init_dictionary(CEP18_ALLOWANCES_DICT);
        self.env().set_named_value(CEP18_NAME_KEY, name);
        self.env().set_named_value(CEP18_SYMBOL_KEY, symbol);
        self.env().set_named_value(CEP18_DECIMALS_KEY, DECIMALS);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, U256::zero());
    }

    // ========== CEP-18 ==========

    pub fn name(&self) -> String {
        self.name.get().unwrap_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get().unwrap_or_default()
    }

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply.get().unwrap_or_default()
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get_or_default(&account)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get_or_default(&(owner, spender))
    }

    pub fn transfer(&mut self, recipient: Address, amount: U256) -> bool {
        let sender = self.env().caller();
        self.move_balance(sender, recipient, amount);
        true
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        let owner = self.env().caller();
        self.write_allowance(owner, spender, amount);
        self.env().emit_event(events::Approval { owner, spender, amount });
        true
    }

    /// Spend `amount` of the caller's allowance on `owner`
    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool {
        let spender = self.env().caller();
        self.spend_allowance(owner, spender, amount);
        self.move_balance(owner, recipient, amount);
        true
    }

    // ========== Minter entry points ==========

    /// Mint new tokens (minters only), bounded by the supply cap
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.require_minter();

        let new_supply = self.total_supply() + amount;
        let cap = self.get_supply_cap();
        if !cap.is_zero() && new_supply > cap {
            self.env().revert(CdpError::SupplyCapExceeded);
        }

        let balance = self.balance_of(to) + amount;
        self.write_balance(to, balance);
        self.write_total_supply(new_supply);
        self.env().emit_event(events::Mint { to, amount });
    }

    /// Burn the caller's own tokens
    pub fn burn(&mut self, amount: U256) {
        let caller = self.env().caller();
        self.burn_internal(caller, amount);
    }

    /// Burn `from`'s tokens without an allowance (minters only)
    pub fn burn_from(&mut self, from: Address, amount: U256) {
        self.require_minter();
        self.burn_internal(from, amount);
    }

    /// Burn `from`'s tokens against the allowance it granted to the calling minter.
    pub fn burn_with_allowance(&mut self, from: Address, amount: U256) {
        self.require_minter();
        let spender = self.env().caller();
        self.spend_allowance(from, spender, amount);
        self.burn_internal(from, amount);
    }

    // ========== Admin ==========

    pub fn add_minter(&mut self, minter: Address) {
        self.require_registry_admin();
        self.minters.set(&minter, true);
        self.env().emit_event(events::MinterChanged { minter, enabled: true });
    }

    pub fn remove_minter(&mut self, minter: Address) {
        self.require_registry_admin();
        self.minters.set(&minter, false);
        self.env().emit_event(events::MinterChanged { minter, enabled: false });
    }

    pub fn is_minter(&self, account: Address) -> bool {
        self.minters.get_or_default(&account)
    }

    pub fn set_supply_cap(&mut self, cap: U256) {
        self.require_registry_admin();
        self.supply_cap.set(cap);
    }

    pub fn get_supply_cap(&self) -> U256 {
        self.supply_cap.get().unwrap_or_default()
    }

    pub fn get_registry(&self) -> Option<Address> {
        self.registry.get()
    }

    // ========== Internal ==========

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(CdpError::InsufficientTokenBalance);
        }
        self.write_balance(from, from_balance - amount);
        let to_balance = self.balance_of(to);
        self.write_balance(to, to_balance + amount);
        self.env().emit_event(events::Transfer { from, to, amount });
    }

    fn spend_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        let current = self.allowance(owner, spender);
        if current < amount {
            self.env().revert(CdpError::InsufficientAllowance);
        }
        self.write_allowance(owner, spender, current - amount);
    }

    fn burn_internal(&mut self, from: Address, amount: U256) {
        let balance = self.balance_of(from);
        if balance < amount {
            self.env().revert(CdpError::InsufficientTokenBalance);
        }
        self.write_balance(from, balance - amount);
        let supply = self.total_supply() - amount;
        self.write_total_supply(supply);
        self.env().emit_event(events::Burn { from, amount });
    }

    fn write_balance(&mut self, owner: Address, amount: U256) {
        self.balances.set(&owner, amount);
        let key = Self::cep18_balance_key(owner);
        self.env()
            .set_dictionary_value(CEP18_BALANCES_DICT, key.as_bytes(), amount);
    }

    fn write_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(owner, spender), amount);
        let key = Self::cep18_allowance_key(owner, spender);
        self.env()
            .set_dictionary_value(CEP18_ALLOWANCES_DICT, key.as_bytes(), amount);
    }

    fn write_total_supply(&mut self, amount: U256) {
        self.total_supply.set(amount);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, amount);
    }

    fn cep18_balance_key(owner: Address) -> String {
        let bytes = Key::from(owner).to_bytes().unwrap_or_default();
        BASE64_STANDARD.encode(bytes)
    }

    fn cep18_allowance_key(owner: Address, spender: Address) -> String {
        let mut bytes = Key::from(owner).to_bytes().unwrap_or_default();
        bytes.extend_from_slice(&Key::from(spender).to_bytes().unwrap_or_default());
        BASE64_STANDARD.encode(bytes)
    }

    fn require_minter(&self) {
        if !self.is_minter(self.env().caller()) {
            self.env().revert(CdpError::UnauthorizedProtocol);
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
