//! Two-party payment channels with an on-chain style adjudicator.
//!
//! Both participants lock funds into escrow, exchange balance updates
//! off-chain ([client::ChannelClient]) and settle through the
//! [channel::Adjudicator], which resolves disputes with a challenge period.

extern crate alloc;

mod abiencode {
    mod error;
    mod hashing;
    mod ser;

    pub mod types;

    pub use error::Error;
    pub use hashing::to_hash;
    pub use ser::{to_bytes, to_writer, Writer};

    #[cfg(test)]
    mod tests;
}
pub mod asset;
pub mod channel;
pub mod client;
pub mod config;
pub mod sig;
pub mod wire;

pub use abiencode::{
    types::{Address, Hash, Signature, U256},
    Error as EncodingError,
};
pub use channel::{Adjudicator, Channel, Event, Role, SignedSnapshot, Snapshot, Status};
pub use client::ChannelClient;
