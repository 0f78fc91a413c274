use cosmwasm_std::Uint128;

use crate::error::ContractError;
use crate::state::CapitalLedger;

impl CapitalLedger {
    pub fn available(&self) -> Uint128 {
        self.balance.saturating_sub(self.reserved)
    }

    /// Moves `amount` from available into the reservation held by `holder`.
    pub fn reserve(&mut self, holder: &mut Uint128, amount: Uint128) -> Result<(), ContractError> {
        if amount > self.available() {
            return Err(ContractError::InsufficientFunds {});
        }
        self.reserved += amount;
        *holder += amount;
        Ok(())
    }

    /// Returns reserved capital held by `holder` to available.
    pub fn release(&mut self, holder: &mut Uint128, amount: Uint128) -> Result<(), ContractError> {
        if amount > *holder || amount > self.reserved {
            return Err(ContractError::OverRelease {});
        }
        self.reserved -= amount;
        *holder -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: Uint128) {
        self.balance += amount;
    }

    /// Debits only ever touch unreserved capital.
    pub fn debit(&mut self, amount: Uint128) -> Result<(), ContractError> {
        if amount > self.available() {
            return Err(ContractError::InsufficientFunds {});
        }
        self.balance -= amount;
        Ok(())
    }

    /// Applies a signed result to the balance.
    pub fn settle_pnl(&mut self, pnl: i128) -> Result<(), ContractError> {
        let magnitude = Uint128::new(pnl.unsigned_abs());
        if pnl >= 0 {
            self.credit(magnitude);
            Ok(())
        } else {
            self.debit(magnitude)
        }
    }
}

// Share math. A garden with no shares or no capital prices shares 1:1.

pub fn shares_for_deposit(amount: Uint128, total_shares: Uint128, balance: Uint128) -> Uint128 {
    if total_shares.is_zero() || balance.is_zero() {
        amount
    } else {
        amount.multiply_ratio(total_shares, balance)
    }
}

pub fn value_of_shares(shares: Uint128, total_shares: Uint128, balance: Uint128) -> Uint128 {
    if total_shares.is_zero() {
        Uint128::zero()
    } else {
        shares.multiply_ratio(balance, total_shares)
    }
}

/// Shares that, once minted, are worth exactly `value` of the post-mint pool.
pub fn shares_to_mint_for_value(value: Uint128, total_shares: Uint128, balance: Uint128) -> Uint128 {
    if value.is_zero() || balance <= value {
        return Uint128::zero();
    }
    value.multiply_ratio(total_shares, balance - value)
}
