use super::Status;
use crate::{
    abiencode::{
        self,
        types::{Address, Hash, U256},
    },
    asset::TransferError,
    sig,
};

/// Why a transition was rejected. A rejected transition never changes
/// anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("channel {0} does not exist")]
    ChannelNotFound(Hash),
    #[error("channel id {0} is already in use")]
    ChannelIdInUse(Hash),

    #[error("cannot open a channel with yourself")]
    SelfChannelNotAllowed,
    #[error("opening deposit must not be zero")]
    ZeroDepositNotAllowed,
    #[error("challenge period {requested}s exceeds the maximum of {max}s")]
    ChallengePeriodTooLong { requested: u64, max: u64 },
    #[error("deposit failed: {0}")]
    DepositFailed(#[source] TransferError),
    #[error("payout failed: {0}")]
    PayoutFailed(#[source] TransferError),

    #[error("channel is not open")]
    ChannelNotOpen,
    #[error("only the designated counter party can join")]
    NotTheDesignatedCounterParty,
    #[error("channel was already joined")]
    AlreadyJoined,
    #[error("channel was never joined")]
    ChannelNotJoined,

    #[error("expected channel status {expected:?}, found {found:?}")]
    InvalidChannelStatus { expected: Status, found: Status },
    #[error("{0} is not a participant of the channel")]
    NotAParticipant(Address),

    #[error("invalid signature: {0}")]
    InvalidSignature(#[source] sig::Error),
    #[error("party signature recovers to {recovered}")]
    InvalidPartySignature { recovered: Address },
    #[error("counter party signature recovers to {recovered}")]
    InvalidCounterPartySignature { recovered: Address },
    #[error("signing failed: {0}")]
    Signing(#[source] sig::Error),

    #[error(
        "balances {party_balance} + {counter_party_balance} do not add up to the deposit of {total_deposited}"
    )]
    ConservationViolation {
        party_balance: U256,
        counter_party_balance: U256,
        total_deposited: U256,
    },
    #[error("stale state: nonce {submitted} is not above {current}")]
    StaleState { current: U256, submitted: U256 },

    #[error("challenge period is over")]
    ChallengePeriodOver,
    #[error("challenge period is not over, {remaining}s remaining")]
    ChallengePeriodNotOver { remaining: u64 },

    #[error("balance overflow")]
    BalanceOverflow,
    #[error("timestamp overflow")]
    TimestampOverflow,

    #[error("encoding failed: {0}")]
    Encoding(#[from] abiencode::Error),
}
