//! Protobuf messages for off-chain watchers.
//!
//! Channel records and events are exposed as [ChannelRecord] and
//! [Notification]. Integers wider than 64 bits (balances, nonces) are sent as
//! 32 byte big endian, addresses as their 20 bytes. Messages are framed with a
//! big endian u16 length.

use crate::{
    abiencode::types::{Address, Hash, U256},
    asset::Asset,
    channel::{Channel, Event, Status},
};
use alloc::vec::Vec;
use prost::{bytes::BufMut, Message};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelRecord {
    #[prost(bytes = "vec", tag = "1")]
    pub channel_id: Vec<u8>,
    /// Token address, all zero for the native currency.
    #[prost(bytes = "vec", tag = "2")]
    pub asset: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub party: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub counter_party: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub party_balance: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub counter_party_balance: Vec<u8>,
    #[prost(bytes = "vec", tag = "7")]
    pub total_deposited: Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub nonce: Vec<u8>,
    #[prost(uint64, tag = "9")]
    pub challenge_period: u64,
    #[prost(uint64, optional, tag = "10")]
    pub challenge_expiry: Option<u64>,
    #[prost(enumeration = "ChannelStatus", tag = "11")]
    pub status: i32,
    #[prost(bool, tag = "12")]
    pub joined: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChannelStatus {
    Open = 0,
    Disputed = 1,
    Settled = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Notification {
    #[prost(enumeration = "NotificationKind", tag = "1")]
    pub kind: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub channel_id: Vec<u8>,
    /// Only set for challenges.
    #[prost(bytes = "vec", tag = "3")]
    pub nonce: Vec<u8>,
    /// Set when the channel enters or stays in the dispute.
    #[prost(uint64, optional, tag = "4")]
    pub expiry: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NotificationKind {
    ChannelOpened = 0,
    CounterPartyJoined = 1,
    ChannelOnChallenge = 2,
    ChannelChallenged = 3,
    ChannelClosed = 4,
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("field {field} must be {expected} bytes long, got {got}")]
    ByteLengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("unknown channel status {0}")]
    UnknownStatus(i32),
    #[error("message of {0} bytes does not fit into a frame")]
    FrameTooLarge(usize),
    #[error("frame is truncated")]
    Truncated,
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
    #[error(transparent)]
    Encode(#[from] prost::EncodeError),
}

impl From<Status> for ChannelStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Open => ChannelStatus::Open,
            Status::Disputed => ChannelStatus::Disputed,
            Status::Settled => ChannelStatus::Settled,
        }
    }
}

impl From<ChannelStatus> for Status {
    fn from(status: ChannelStatus) -> Self {
        match status {
            ChannelStatus::Open => Status::Open,
            ChannelStatus::Disputed => Status::Disputed,
            ChannelStatus::Settled => Status::Settled,
        }
    }
}

impl From<&Channel> for ChannelRecord {
    fn from(ch: &Channel) -> Self {
        Self {
            channel_id: ch.channel_id().0.to_vec(),
            asset: ch.asset().address().0.to_vec(),
            party: ch.party().0.to_vec(),
            counter_party: ch.counter_party().0.to_vec(),
            party_balance: ch.party_balance().to_bytes32().to_vec(),
            counter_party_balance: ch.counter_party_balance().to_bytes32().to_vec(),
            total_deposited: ch.total_deposited().to_bytes32().to_vec(),
            nonce: ch.nonce().to_bytes32().to_vec(),
            challenge_period: ch.challenge_period(),
            challenge_expiry: ch.challenge_expiry(),
            status: ChannelStatus::from(ch.status()) as i32,
            joined: ch.joined(),
        }
    }
}

fn fixed<const N: usize>(field: &'static str, bytes: &[u8]) -> Result<[u8; N], ConversionError> {
    bytes
        .try_into()
        .map_err(|_| ConversionError::ByteLengthMismatch {
            field,
            expected: N,
            got: bytes.len(),
        })
}

impl TryFrom<ChannelRecord> for Channel {
    type Error = ConversionError;

    fn try_from(rec: ChannelRecord) -> Result<Self, Self::Error> {
        let status = ChannelStatus::from_i32(rec.status)
            .ok_or(ConversionError::UnknownStatus(rec.status))?;

        Ok(Channel {
            channel_id: Hash(fixed("channel_id", &rec.channel_id)?),
            asset: Asset::from_address(Address(fixed("asset", &rec.asset)?)),
            party: Address(fixed("party", &rec.party)?),
            counter_party: Address(fixed("counter_party", &rec.counter_party)?),
            party_balance: U256::from_bytes32(fixed("party_balance", &rec.party_balance)?),
            counter_party_balance: U256::from_bytes32(fixed(
                "counter_party_balance",
                &rec.counter_party_balance,
            )?),
            total_deposited: U256::from_bytes32(fixed("total_deposited", &rec.total_deposited)?),
            nonce: U256::from_bytes32(fixed("nonce", &rec.nonce)?),
            challenge_period: rec.challenge_period,
            challenge_expiry: rec.challenge_expiry,
            status: status.into(),
            joined: rec.joined,
        })
    }
}

impl From<&Event> for Notification {
    fn from(event: &Event) -> Self {
        let (kind, nonce, expiry) = match *event {
            Event::ChannelOpened { .. } => (NotificationKind::ChannelOpened, None, None),
            Event::CounterPartyJoined { .. } => (NotificationKind::CounterPartyJoined, None, None),
            Event::ChannelOnChallenge { expiry, .. } => {
                (NotificationKind::ChannelOnChallenge, None, Some(expiry))
            }
            Event::ChannelChallenged { nonce, expiry, .. } => (
                NotificationKind::ChannelChallenged,
                Some(nonce),
                Some(expiry),
            ),
            Event::ChannelClosed { .. } => (NotificationKind::ChannelClosed, None, None),
        };

        Self {
            kind: kind as i32,
            channel_id: event.channel_id().0.to_vec(),
            nonce: nonce.map(|n| n.to_bytes32().to_vec()).unwrap_or_default(),
            expiry,
        }
    }
}

/// Encode `msg` prefixed with its length as big endian u16.
///
/// We cannot use `encode_length_delimited`, which writes the length as a
/// LEB128 varint.
pub fn encode_framed<T: Message>(msg: &T) -> Result<Vec<u8>, ConversionError> {
    let len = msg.encoded_len();
    let frame_len = u16::try_from(len).map_err(|_| ConversionError::FrameTooLarge(len))?;

    let mut buf = Vec::with_capacity(2 + len);
    buf.put_slice(&frame_len.to_be_bytes());
    msg.encode(&mut buf)?;
    Ok(buf)
}

/// Decode one frame from the start of `buf`, returning the message and the
/// number of bytes consumed.
pub fn decode_framed<T: Message + Default>(buf: &[u8]) -> Result<(T, usize), ConversionError> {
    let header: [u8; 2] = buf
        .get(..2)
        .and_then(|h| h.try_into().ok())
        .ok_or(ConversionError::Truncated)?;
    let end = 2 + usize::from(u16::from_be_bytes(header));
    let body = buf.get(2..end).ok_or(ConversionError::Truncated)?;

    Ok((T::decode(body)?, end))
}
