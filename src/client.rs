use crate::{
    abiencode::types::{Address, Hash, Signature, U256},
    channel::{self, verify_party, Channel, Role, SignedSnapshot, Snapshot},
    sig::Signer,
};
use tracing::{debug, warn};

/// A payment signed by the proposer, waiting for the signature of the peer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub snapshot: Snapshot,
    pub signature: Signature,
    pub proposer: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("{0} is not the {1:?} of the channel")]
    NotAParticipant(Address, Role),
    #[error("proposal was not made by the peer")]
    NotFromPeer,
    #[error("proposal lowers our balance from {current} to {proposed}")]
    BalanceDecrease { current: U256, proposed: U256 },
    #[error("snapshot is for channel {got}, expected {expected}")]
    InvalidChannelId { expected: Hash, got: Hash },
    #[error("expected nonce {expected}, got {got}")]
    InvalidNonce { expected: U256, got: U256 },
    #[error("insufficient funds: {available} available, {needed} needed")]
    InsufficientFunds { available: U256, needed: U256 },
    #[error("balance overflow")]
    BalanceOverflow,
    #[error("nonce overflow")]
    NonceOverflow,
    #[error(transparent)]
    Channel(#[from] channel::Error),
}

/// Off-chain side of one channel for one participant.
///
/// Keeps the latest state both participants signed, which is what gets
/// submitted to [Adjudicator::close](crate::channel::Adjudicator::close) or
/// [Adjudicator::challenge](crate::channel::Adjudicator::challenge) at the
/// end. Payments are made by one side proposing the next state
/// ([ChannelClient::propose_payment]) and the other side countersigning it
/// ([ChannelClient::countersign]), after which the proposer installs the fully
/// signed state with [ChannelClient::accept].
#[derive(Debug)]
pub struct ChannelClient {
    signer: Signer,
    role: Role,
    party: Address,
    counter_party: Address,
    total: U256,
    current: Snapshot,
    latest: Option<SignedSnapshot>,
}

impl ChannelClient {
    /// Create the client from the on-chain record after the channel was
    /// joined.
    pub fn new(signer: Signer, role: Role, channel: &Channel) -> Result<Self, ClientError> {
        if signer.address() != channel.address_of(role) {
            return Err(ClientError::NotAParticipant(signer.address(), role));
        }

        Ok(Self {
            signer,
            role,
            party: channel.party(),
            counter_party: channel.counter_party(),
            total: channel.total_deposited(),
            current: channel.snapshot(),
            latest: None,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn channel_id(&self) -> Hash {
        self.current.channel_id
    }

    /// Our balance in the current state.
    pub fn balance(&self) -> U256 {
        self.current.balance_of(self.role)
    }

    /// The latest state signed by both, if there is one yet.
    pub fn latest(&self) -> Option<&SignedSnapshot> {
        self.latest.as_ref()
    }

    /// Propose moving `amount` to the participant with role `to`, signed by
    /// us. Nothing changes until the fully signed state comes back.
    pub fn propose_payment(&self, to: Role, amount: U256) -> Result<Proposal, ClientError> {
        let from = to.other();
        let available = self.current.balance_of(from);
        let debited = available
            .checked_sub(amount)
            .ok_or(ClientError::InsufficientFunds {
                available,
                needed: amount,
            })?;
        let credited = self
            .current
            .balance_of(to)
            .checked_add(amount)
            .ok_or(ClientError::BalanceOverflow)?;
        let nonce = self.next_nonce()?;

        let mut snapshot = Snapshot {
            nonce,
            ..self.current
        };
        match from {
            Role::Party => {
                snapshot.party_balance = debited;
                snapshot.counter_party_balance = credited;
            }
            Role::CounterParty => {
                snapshot.counter_party_balance = debited;
                snapshot.party_balance = credited;
            }
        }

        let signature = snapshot.sign(&self.signer)?;
        debug!(channel_id = %snapshot.channel_id, %nonce, %amount, ?to, "payment proposed");
        Ok(Proposal {
            snapshot,
            signature,
            proposer: self.role,
        })
    }

    /// Check a proposal of the peer, add our signature and make it the
    /// latest state.
    ///
    /// Only payments to us are countersigned, the peer cannot spend our
    /// balance.
    pub fn countersign(&mut self, proposal: &Proposal) -> Result<SignedSnapshot, ClientError> {
        if proposal.proposer != self.role.other() {
            return Err(ClientError::NotFromPeer);
        }
        let snapshot = proposal.snapshot;
        self.check_next(&snapshot)?;

        let current = self.balance();
        let proposed = snapshot.balance_of(self.role);
        if proposed < current {
            warn!(channel_id = %snapshot.channel_id, %current, %proposed, "proposal lowers our balance");
            return Err(ClientError::BalanceDecrease { current, proposed });
        }

        let digest = snapshot.digest().map_err(channel::Error::from)?;
        verify_party(
            digest,
            proposal.signature,
            self.address_of(proposal.proposer),
            proposal.proposer,
        )?;

        let ours = snapshot.sign(&self.signer)?;
        let signed = match self.role {
            Role::Party => SignedSnapshot {
                snapshot,
                party_signature: ours,
                counter_party_signature: proposal.signature,
            },
            Role::CounterParty => SignedSnapshot {
                snapshot,
                party_signature: proposal.signature,
                counter_party_signature: ours,
            },
        };

        self.install(signed);
        Ok(signed)
    }

    /// Install a fully signed state, e.g. the countersigned answer to our
    /// proposal.
    pub fn accept(&mut self, signed: SignedSnapshot) -> Result<(), ClientError> {
        self.check_next(&signed.snapshot)?;
        signed.verify(self.party, self.counter_party)?;
        self.install(signed);
        Ok(())
    }

    fn address_of(&self, role: Role) -> Address {
        match role {
            Role::Party => self.party,
            Role::CounterParty => self.counter_party,
        }
    }

    fn next_nonce(&self) -> Result<U256, ClientError> {
        self.current
            .nonce
            .checked_add(U256::one())
            .ok_or(ClientError::NonceOverflow)
    }

    /// Same channel, following nonce and the deposit is conserved.
    fn check_next(&self, snapshot: &Snapshot) -> Result<(), ClientError> {
        if snapshot.channel_id != self.current.channel_id {
            return Err(ClientError::InvalidChannelId {
                expected: self.current.channel_id,
                got: snapshot.channel_id,
            });
        }
        let expected = self.next_nonce()?;
        if snapshot.nonce != expected {
            return Err(ClientError::InvalidNonce {
                expected,
                got: snapshot.nonce,
            });
        }
        if snapshot.total() != Some(self.total) {
            return Err(channel::Error::ConservationViolation {
                party_balance: snapshot.party_balance,
                counter_party_balance: snapshot.counter_party_balance,
                total_deposited: self.total,
            }
            .into());
        }
        Ok(())
    }

    fn install(&mut self, signed: SignedSnapshot) {
        debug!(channel_id = %signed.channel_id(), nonce = %signed.nonce(), "new state installed");
        self.current = signed.snapshot;
        self.latest = Some(signed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset::{Asset, NativeLedger, Treasury},
        channel::{timer::ManualClock, Adjudicator},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn clients() -> (ChannelClient, ChannelClient) {
        let mut rng = StdRng::seed_from_u64(1);
        let alice = Signer::new(&mut rng);
        let bob = Signer::new(&mut rng);

        let mut native = NativeLedger::default();
        native.fund(alice.address(), 10.into()).unwrap();
        native.fund(bob.address(), 5.into()).unwrap();
        let mut adj = Adjudicator::new(Treasury::native_only(native), ManualClock::new(0));

        let id = adj
            .open(alice.address(), Asset::Native, bob.address(), 10.into(), 0)
            .unwrap()
            .channel_id();
        adj.join(bob.address(), id, 5.into()).unwrap();
        let channel = adj.channel(id).unwrap();

        (
            ChannelClient::new(alice, Role::Party, channel).unwrap(),
            ChannelClient::new(bob, Role::CounterParty, channel).unwrap(),
        )
    }

    #[test]
    fn wrong_role_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let alice = Signer::new(&mut rng);
        let channel = Channel::new(
            Hash([1; 32]),
            Asset::Native,
            alice.address(),
            Address([2; 20]),
            1.into(),
            0,
        );
        let addr = alice.address();

        assert_eq!(
            ChannelClient::new(alice, Role::CounterParty, &channel).unwrap_err(),
            ClientError::NotAParticipant(addr, Role::CounterParty)
        );
    }

    #[test]
    fn payment_roundtrip() {
        let (mut alice, mut bob) = clients();

        let proposal = alice.propose_payment(Role::CounterParty, 9.into()).unwrap();
        assert!(alice.latest().is_none());

        let signed = bob.countersign(&proposal).unwrap();
        alice.accept(signed).unwrap();

        assert_eq!(alice.latest(), bob.latest());
        assert_eq!(alice.balance(), 1.into());
        assert_eq!(bob.balance(), 14.into());
        assert_eq!(signed.nonce(), 1.into());
        assert_eq!(
            signed.verify(alice.address(), bob.address()),
            Ok(())
        );
    }

    #[test]
    fn payment_in_both_directions() {
        let (mut alice, mut bob) = clients();

        let p = bob.propose_payment(Role::Party, 5.into()).unwrap();
        let s = alice.countersign(&p).unwrap();
        bob.accept(s).unwrap();

        let p = alice.propose_payment(Role::CounterParty, 15.into()).unwrap();
        let s = bob.countersign(&p).unwrap();
        alice.accept(s).unwrap();

        assert_eq!(alice.balance(), U256::zero());
        assert_eq!(bob.balance(), 15.into());
        assert_eq!(alice.latest().unwrap().nonce(), 2.into());
    }

    #[test]
    fn overspending_is_rejected() {
        let (alice, _) = clients();
        assert_eq!(
            alice.propose_payment(Role::CounterParty, 11.into()),
            Err(ClientError::InsufficientFunds {
                available: 10.into(),
                needed: 11.into(),
            })
        );
    }

    #[test]
    fn countersign_checks_proposal() {
        let (alice, mut bob) = clients();
        let proposal = alice.propose_payment(Role::CounterParty, 1.into()).unwrap();

        let mut own = proposal;
        own.proposer = Role::CounterParty;
        assert_eq!(bob.countersign(&own), Err(ClientError::NotFromPeer));

        let mut skipped = proposal;
        skipped.snapshot.nonce = 2.into();
        assert_eq!(
            bob.countersign(&skipped),
            Err(ClientError::InvalidNonce {
                expected: 1.into(),
                got: 2.into()
            })
        );

        let mut minted = proposal;
        minted.snapshot.counter_party_balance = 100.into();
        assert!(matches!(
            bob.countersign(&minted),
            Err(ClientError::Channel(
                channel::Error::ConservationViolation { .. }
            ))
        ));

        let mut forged = proposal;
        forged.snapshot.party_balance = 8.into();
        forged.snapshot.counter_party_balance = 7.into();
        assert!(matches!(
            bob.countersign(&forged),
            Err(ClientError::Channel(
                channel::Error::InvalidPartySignature { .. }
            ))
        ));

        assert!(bob.latest().is_none());
    }

    #[test]
    fn peer_cannot_spend_our_balance() {
        let (mut alice, bob) = clients();

        // Bob proposes a payment from Alice to himself.
        let proposal = bob.propose_payment(Role::CounterParty, 10.into()).unwrap();
        assert_eq!(
            alice.countersign(&proposal),
            Err(ClientError::BalanceDecrease {
                current: 10.into(),
                proposed: U256::zero(),
            })
        );
        assert_eq!(alice.balance(), 10.into());
        assert!(alice.latest().is_none());
    }

    #[test]
    fn accept_requires_both_signatures() {
        let (mut alice, bob) = clients();
        let proposal = bob.propose_payment(Role::Party, 1.into()).unwrap();
        let half = SignedSnapshot {
            snapshot: proposal.snapshot,
            party_signature: proposal.signature,
            counter_party_signature: proposal.signature,
        };

        assert!(matches!(
            alice.accept(half),
            Err(ClientError::Channel(
                channel::Error::InvalidPartySignature { .. }
            ))
        ));
        assert!(alice.latest().is_none());
    }
}
