use super::{payout_total, Asset, AssetTransfer, Payout, TransferError};
use crate::abiencode::types::{Address, U256};
use alloc::collections::BTreeMap;
use tracing::debug;

/// Fungible token accounts, keyed by `(token, account)`.
///
/// Deposits are pulled through an allowance the owner granted the escrow
/// with [TokenLedger::approve], like `transferFrom` on an ERC-20 token.
/// Allowances are tracked per owner and token, so channels of different
/// owners never share one.
#[derive(Debug, Default, Clone)]
pub struct TokenLedger {
    balances: BTreeMap<(Address, Address), U256>,
    allowances: BTreeMap<(Address, Address), U256>,
    escrow: BTreeMap<Address, U256>,
}

fn get(map: &BTreeMap<(Address, Address), U256>, token: Address, account: Address) -> U256 {
    map.get(&(token, account)).copied().unwrap_or_else(U256::zero)
}

impl TokenLedger {
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), TransferError> {
        let new = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        self.balances.insert((token, to), new);
        Ok(())
    }

    /// Allow the escrow to pull up to `amount` of `token` from `owner`.
    /// Replaces any previous allowance.
    pub fn approve(&mut self, token: Address, owner: Address, amount: U256) {
        self.allowances.insert((token, owner), amount);
    }

    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        get(&self.balances, token, account)
    }

    pub fn allowance(&self, token: Address, owner: Address) -> U256 {
        get(&self.allowances, token, owner)
    }

    pub fn escrow_of(&self, token: Address) -> U256 {
        self.escrow.get(&token).copied().unwrap_or_else(U256::zero)
    }

    fn token_of(asset: Asset) -> Result<Address, TransferError> {
        match asset {
            Asset::Token(token) => Ok(token),
            Asset::Native => Err(TransferError::UnsupportedAsset(asset)),
        }
    }
}

impl AssetTransfer for TokenLedger {
    fn deposit(&mut self, asset: Asset, from: Address, amount: U256) -> Result<(), TransferError> {
        let token = Self::token_of(asset)?;

        let approved = self.allowance(token, from);
        let allowance = approved
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientAllowance {
                owner: from,
                needed: amount,
                available: approved,
            })?;
        let available = self.balance_of(token, from);
        let balance = available
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientBalance {
                account: from,
                needed: amount,
                available,
            })?;
        let escrow = self
            .escrow_of(token)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.allowances.insert((token, from), allowance);
        self.balances.insert((token, from), balance);
        self.escrow.insert(token, escrow);
        debug!(%token, %from, %amount, "token deposit into escrow");
        Ok(())
    }

    fn payout(&mut self, asset: Asset, payouts: &[Payout]) -> Result<(), TransferError> {
        let token = Self::token_of(asset)?;

        let total = payout_total(payouts)?;
        let available = self.escrow_of(token);
        let escrow = available
            .checked_sub(total)
            .ok_or(TransferError::InsufficientEscrow {
                needed: total,
                available,
            })?;

        let mut staged: BTreeMap<(Address, Address), U256> = BTreeMap::new();
        for p in payouts {
            let key = (token, p.to);
            let current = match staged.get(&key) {
                Some(b) => *b,
                None => self.balance_of(token, p.to),
            };
            let new = current
                .checked_add(p.amount)
                .ok_or(TransferError::Overflow)?;
            staged.insert(key, new);
        }

        self.balances.extend(staged);
        self.escrow.insert(token, escrow);
        for p in payouts {
            debug!(%token, to = %p.to, amount = %p.amount, "token payout from escrow");
        }
        Ok(())
    }
}
