use crate::abiencode::types::{Hash, U256};

/// Notification emitted by a successful transition, for off-chain
/// observers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    ChannelOpened {
        channel_id: Hash,
    },
    CounterPartyJoined {
        channel_id: Hash,
    },
    /// Closed with a challenge period, redeemable at `expiry`.
    ChannelOnChallenge {
        channel_id: Hash,
        expiry: u64,
    },
    ChannelChallenged {
        channel_id: Hash,
        nonce: U256,
        expiry: u64,
    },
    /// Settled and paid out.
    ChannelClosed {
        channel_id: Hash,
    },
}

impl Event {
    pub fn channel_id(&self) -> Hash {
        match *self {
            Event::ChannelOpened { channel_id }
            | Event::CounterPartyJoined { channel_id }
            | Event::ChannelOnChallenge { channel_id, .. }
            | Event::ChannelChallenged { channel_id, .. }
            | Event::ChannelClosed { channel_id } => channel_id,
        }
    }
}
