//! Moving value into and out of channel escrow.
//!
//! The adjudicator only talks to an [AssetTransfer], it does not know whether
//! the escrow holds native currency or a token. [NativeLedger] and
//! [TokenLedger] are in-memory implementations of both variants, [Treasury]
//! combines them and routes by [Asset].

mod native;
mod token;

use crate::abiencode::types::{Address, U256};
use serde::Serialize;

pub use native::NativeLedger;
pub use token::TokenLedger;

/// The currency locked in a channel.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Asset {
    #[default]
    Native,
    /// A fungible token, identified by its contract address.
    Token(Address),
}

impl Asset {
    /// Address used to identify the asset on-chain, the zero address stands
    /// for the native currency.
    pub fn address(&self) -> Address {
        match self {
            Asset::Native => Address::ZERO,
            Asset::Token(addr) => *addr,
        }
    }

    pub fn from_address(addr: Address) -> Self {
        if addr.is_zero() {
            Asset::Native
        } else {
            Asset::Token(addr)
        }
    }
}

// Encoded as `address`.
impl Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.address().serialize(serializer)
    }
}

/// One leg of a settlement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("insufficient balance: {account} has {available}, needs {needed}")]
    InsufficientBalance {
        account: Address,
        needed: U256,
        available: U256,
    },
    #[error("insufficient allowance: {owner} approved {available}, needs {needed}")]
    InsufficientAllowance {
        owner: Address,
        needed: U256,
        available: U256,
    },
    #[error("escrow holds {available}, cannot pay out {needed}")]
    InsufficientEscrow { needed: U256, available: U256 },
    #[error("asset {0:?} is not handled here")]
    UnsupportedAsset(Asset),
    #[error("arithmetic overflow")]
    Overflow,
}

/// Capability to pull funds into escrow and push them out again.
///
/// Both operations are all-or-nothing: when they return an error nothing has
/// moved.
pub trait AssetTransfer {
    /// Move `amount` of `asset` from `from` into escrow.
    fn deposit(&mut self, asset: Asset, from: Address, amount: U256) -> Result<(), TransferError>;

    /// Pay every entry of `payouts` out of escrow.
    fn payout(&mut self, asset: Asset, payouts: &[Payout]) -> Result<(), TransferError>;
}

impl<T: AssetTransfer + ?Sized> AssetTransfer for &mut T {
    fn deposit(&mut self, asset: Asset, from: Address, amount: U256) -> Result<(), TransferError> {
        (**self).deposit(asset, from, amount)
    }

    fn payout(&mut self, asset: Asset, payouts: &[Payout]) -> Result<(), TransferError> {
        (**self).payout(asset, payouts)
    }
}

impl<T: AssetTransfer + ?Sized> AssetTransfer for Box<T> {
    fn deposit(&mut self, asset: Asset, from: Address, amount: U256) -> Result<(), TransferError> {
        (**self).deposit(asset, from, amount)
    }

    fn payout(&mut self, asset: Asset, payouts: &[Payout]) -> Result<(), TransferError> {
        (**self).payout(asset, payouts)
    }
}

/// Sum of all payout amounts.
fn payout_total(payouts: &[Payout]) -> Result<U256, TransferError> {
    payouts.iter().try_fold(U256::zero(), |acc, p| {
        acc.checked_add(p.amount).ok_or(TransferError::Overflow)
    })
}

/// Routes transfers to the ledger responsible for the asset variant.
#[derive(Debug)]
pub struct Treasury {
    native: Option<NativeLedger>,
    token: Option<TokenLedger>,
}

impl Default for Treasury {
    fn default() -> Self {
        Self::new(Some(NativeLedger::default()), Some(TokenLedger::default()))
    }
}

impl Treasury {
    pub fn new(native: Option<NativeLedger>, token: Option<TokenLedger>) -> Self {
        Self { native, token }
    }

    pub fn native_only(ledger: NativeLedger) -> Self {
        Self::new(Some(ledger), None)
    }

    pub fn token_only(ledger: TokenLedger) -> Self {
        Self::new(None, Some(ledger))
    }

    pub fn native(&self) -> Option<&NativeLedger> {
        self.native.as_ref()
    }

    pub fn native_mut(&mut self) -> Option<&mut NativeLedger> {
        self.native.as_mut()
    }

    pub fn token(&self) -> Option<&TokenLedger> {
        self.token.as_ref()
    }

    pub fn token_mut(&mut self) -> Option<&mut TokenLedger> {
        self.token.as_mut()
    }

    fn route(&mut self, asset: Asset) -> Result<&mut dyn AssetTransfer, TransferError> {
        let ledger: Option<&mut dyn AssetTransfer> = match asset {
            Asset::Native => self.native.as_mut().map(|l| l as &mut dyn AssetTransfer),
            Asset::Token(_) => self.token.as_mut().map(|l| l as &mut dyn AssetTransfer),
        };
        ledger.ok_or(TransferError::UnsupportedAsset(asset))
    }
}

impl AssetTransfer for Treasury {
    fn deposit(&mut self, asset: Asset, from: Address, amount: U256) -> Result<(), TransferError> {
        self.route(asset)?.deposit(asset, from, amount)
    }

    fn payout(&mut self, asset: Asset, payouts: &[Payout]) -> Result<(), TransferError> {
        self.route(asset)?.payout(asset, payouts)
    }
}
