use super::{Error, Role};
use crate::{
    abiencode::{
        self,
        types::{Address, Hash, Signature, U256},
    },
    sig::{self, Signer},
};
use alloc::vec::Vec;
use serde::Serialize;

/// One off-chain agreed state of a channel.
///
/// Signed as `keccak256(abi.encode(bytes32 channel_id, uint256
/// party_balance, uint256 counter_party_balance, uint256 nonce))`. Any signer
/// has to reproduce this byte for byte, so the field order must not change.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub channel_id: Hash,
    pub party_balance: U256,
    pub counter_party_balance: U256,
    pub nonce: U256,
}

impl Snapshot {
    /// The canonical 128 byte encoding.
    pub fn encode(&self) -> Result<Vec<u8>, abiencode::Error> {
        abiencode::to_bytes(self)
    }

    pub fn digest(&self) -> Result<Hash, abiencode::Error> {
        abiencode::to_hash(self)
    }

    /// Sum of both balances, `None` on overflow.
    pub fn total(&self) -> Option<U256> {
        self.party_balance.checked_add(self.counter_party_balance)
    }

    pub fn balance_of(&self, role: Role) -> U256 {
        match role {
            Role::Party => self.party_balance,
            Role::CounterParty => self.counter_party_balance,
        }
    }

    pub fn sign(&self, signer: &Signer) -> Result<Signature, Error> {
        let hash = self.digest()?;
        signer.sign_eth(hash).map_err(Error::Signing)
    }
}

/// A [Snapshot] together with the signatures of both participants, what
/// `close` and `challenge` take.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SignedSnapshot {
    pub snapshot: Snapshot,
    pub party_signature: Signature,
    pub counter_party_signature: Signature,
}

impl SignedSnapshot {
    pub fn channel_id(&self) -> Hash {
        self.snapshot.channel_id
    }

    pub fn nonce(&self) -> U256 {
        self.snapshot.nonce
    }

    pub fn signature_of(&self, role: Role) -> Signature {
        match role {
            Role::Party => self.party_signature,
            Role::CounterParty => self.counter_party_signature,
        }
    }

    /// Check both signatures, party first.
    pub fn verify(&self, party: Address, counter_party: Address) -> Result<(), Error> {
        let digest = self.snapshot.digest()?;
        verify_party(digest, self.party_signature, party, Role::Party)?;
        verify_party(
            digest,
            self.counter_party_signature,
            counter_party,
            Role::CounterParty,
        )
    }
}

/// Check that `signature` over `digest` was made by `expected`, who holds
/// `role` in the channel.
pub fn verify_party(
    digest: Hash,
    signature: Signature,
    expected: Address,
    role: Role,
) -> Result<(), Error> {
    let recovered = sig::recover_signer(digest, signature).map_err(Error::InvalidSignature)?;
    if recovered == expected {
        return Ok(());
    }

    Err(match role {
        Role::Party => Error::InvalidPartySignature { recovered },
        Role::CounterParty => Error::InvalidCounterPartySignature { recovered },
    })
}
