use super::{payout_total, Asset, AssetTransfer, Payout, TransferError};
use crate::abiencode::types::{Address, U256};
use alloc::collections::BTreeMap;
use tracing::debug;

/// Native currency accounts plus the escrow balance held by the adjudicator.
///
/// The value attached to a call is modelled as a debit of the caller's
/// account.
#[derive(Debug, Default, Clone)]
pub struct NativeLedger {
    balances: BTreeMap<Address, U256>,
    escrow: U256,
}

impl NativeLedger {
    /// Credit `amount` to `account`, e.g. to set up a test or demo.
    pub fn fund(&mut self, account: Address, amount: U256) -> Result<(), TransferError> {
        let balance = self.balance_of(account);
        let new = balance.checked_add(amount).ok_or(TransferError::Overflow)?;
        self.balances.insert(account, new);
        Ok(())
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_else(U256::zero)
    }

    /// Everything currently locked in channels.
    pub fn escrow(&self) -> U256 {
        self.escrow
    }

    fn check_asset(asset: Asset) -> Result<(), TransferError> {
        match asset {
            Asset::Native => Ok(()),
            Asset::Token(_) => Err(TransferError::UnsupportedAsset(asset)),
        }
    }
}

impl AssetTransfer for NativeLedger {
    fn deposit(&mut self, asset: Asset, from: Address, amount: U256) -> Result<(), TransferError> {
        Self::check_asset(asset)?;

        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientBalance {
                account: from,
                needed: amount,
                available,
            })?;
        let escrow = self
            .escrow
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.balances.insert(from, remaining);
        self.escrow = escrow;
        debug!(%from, %amount, "native deposit into escrow");
        Ok(())
    }

    fn payout(&mut self, asset: Asset, payouts: &[Payout]) -> Result<(), TransferError> {
        Self::check_asset(asset)?;

        let total = payout_total(payouts)?;
        let escrow = self
            .escrow
            .checked_sub(total)
            .ok_or(TransferError::InsufficientEscrow {
                needed: total,
                available: self.escrow,
            })?;

        // Stage the new balances first, so an overflow on the last recipient
        // does not leave the earlier ones paid.
        let mut staged: BTreeMap<Address, U256> = BTreeMap::new();
        for p in payouts {
            let current = match staged.get(&p.to) {
                Some(b) => *b,
                None => self.balance_of(p.to),
            };
            let new = current
                .checked_add(p.amount)
                .ok_or(TransferError::Overflow)?;
            staged.insert(p.to, new);
        }

        self.balances.extend(staged);
        self.escrow = escrow;
        for p in payouts {
            debug!(to = %p.to, amount = %p.amount, "native payout from escrow");
        }
        Ok(())
    }
}
