//! On-chain side of a two-party payment channel.
//!
//! A channel escrows the deposits of both participants. Off-chain they
//! exchange [Snapshot]s signed by both, and only one of them is ever
//! submitted: with [Adjudicator::close], possibly overridden by newer ones
//! through [Adjudicator::challenge], and paid out with
//! [Adjudicator::redeem].

mod adjudicator;
mod error;
mod event;
mod snapshot;
mod store;
pub mod timer;

use crate::{
    abiencode::types::{Address, Hash, U256},
    asset::Asset,
};

pub use adjudicator::Adjudicator;
pub use error::Error;
pub use event::Event;
pub use snapshot::{verify_party, SignedSnapshot, Snapshot};
pub use store::ChannelStore;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Open,
    /// Closed with a challenge period, waiting for newer states or redeem.
    Disputed,
    /// Paid out. Terminal.
    Settled,
}

/// Which side of the channel a participant is on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    /// The participant who opened the channel.
    Party,
    CounterParty,
}

impl Role {
    pub fn other(self) -> Self {
        match self {
            Role::Party => Role::CounterParty,
            Role::CounterParty => Role::Party,
        }
    }
}

/// The record the adjudicator keeps for every channel.
///
/// Only the [Adjudicator] modifies it, everyone else gets to look at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub(crate) channel_id: Hash,
    pub(crate) asset: Asset,
    pub(crate) party: Address,
    pub(crate) counter_party: Address,
    pub(crate) party_balance: U256,
    pub(crate) counter_party_balance: U256,
    pub(crate) total_deposited: U256,
    pub(crate) nonce: U256,
    pub(crate) challenge_period: u64,
    pub(crate) challenge_expiry: Option<u64>,
    pub(crate) status: Status,
    pub(crate) joined: bool,
}

impl Channel {
    pub(crate) fn new(
        channel_id: Hash,
        asset: Asset,
        party: Address,
        counter_party: Address,
        amount: U256,
        challenge_period: u64,
    ) -> Self {
        Self {
            channel_id,
            asset,
            party,
            counter_party,
            party_balance: amount,
            counter_party_balance: U256::zero(),
            total_deposited: amount,
            nonce: U256::zero(),
            challenge_period,
            challenge_expiry: None,
            status: Status::Open,
            joined: false,
        }
    }

    pub fn channel_id(&self) -> Hash {
        self.channel_id
    }
    pub fn asset(&self) -> Asset {
        self.asset
    }
    pub fn party(&self) -> Address {
        self.party
    }
    pub fn counter_party(&self) -> Address {
        self.counter_party
    }
    pub fn party_balance(&self) -> U256 {
        self.party_balance
    }
    pub fn counter_party_balance(&self) -> U256 {
        self.counter_party_balance
    }
    pub fn total_deposited(&self) -> U256 {
        self.total_deposited
    }
    pub fn nonce(&self) -> U256 {
        self.nonce
    }
    pub fn challenge_period(&self) -> u64 {
        self.challenge_period
    }
    /// Set when the channel enters the dispute, kept after settlement.
    pub fn challenge_expiry(&self) -> Option<u64> {
        self.challenge_expiry
    }
    pub fn status(&self) -> Status {
        self.status
    }
    pub fn joined(&self) -> bool {
        self.joined
    }

    pub fn address_of(&self, role: Role) -> Address {
        match role {
            Role::Party => self.party,
            Role::CounterParty => self.counter_party,
        }
    }

    pub fn balance_of(&self, role: Role) -> U256 {
        match role {
            Role::Party => self.party_balance,
            Role::CounterParty => self.counter_party_balance,
        }
    }

    pub fn role_of(&self, addr: Address) -> Option<Role> {
        if addr == self.party {
            Some(Role::Party)
        } else if addr == self.counter_party {
            Some(Role::CounterParty)
        } else {
            None
        }
    }

    /// Seconds left until the dispute can be redeemed, `None` if the channel
    /// is not disputed.
    pub fn challenge_remaining(&self, now: u64) -> Option<u64> {
        match (self.status, self.challenge_expiry) {
            (Status::Disputed, Some(expiry)) => Some(expiry.saturating_sub(now)),
            _ => None,
        }
    }

    /// The state currently recorded, without signatures.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            channel_id: self.channel_id,
            party_balance: self.party_balance,
            counter_party_balance: self.counter_party_balance,
            nonce: self.nonce,
        }
    }

    /// Balances add up to the deposits.
    pub fn is_conserved(&self) -> bool {
        self.party_balance.checked_add(self.counter_party_balance) == Some(self.total_deposited)
    }
}
