use super::{
    timer::{self, Clock},
    Channel, ChannelStore, Error, Event, SignedSnapshot, Status,
};
use crate::{
    abiencode::{
        self,
        types::{Address, Hash, U256},
    },
    asset::{Asset, AssetTransfer, Payout},
    config::Config,
};
use alloc::{collections::BTreeMap, vec::Vec};
use tracing::{info, warn};

/// The channel state machine.
///
/// Every transition first loads a copy of the record and checks everything,
/// then performs at most one asset transfer and only then writes the record
/// back. An error therefore never leaves anything changed.
#[derive(Debug)]
pub struct Adjudicator<T: AssetTransfer, C: Clock> {
    config: Config,
    store: ChannelStore,
    assets: T,
    clock: C,
    /// Channels opened per address, part of generated channel ids.
    open_counts: BTreeMap<Address, u64>,
}

impl<T: AssetTransfer, C: Clock> Adjudicator<T, C> {
    pub fn new(assets: T, clock: C) -> Self {
        Self::with_config(Config::default(), assets, clock)
    }

    pub fn with_config(config: Config, assets: T, clock: C) -> Self {
        Self {
            store: ChannelStore::new(config.id_reuse),
            config,
            assets,
            clock,
            open_counts: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn assets(&self) -> &T {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut T {
        &mut self.assets
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn channel(&self, channel_id: Hash) -> Result<&Channel, Error> {
        self.store.get(&channel_id)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.store.iter()
    }

    /// Open a channel with a generated id, returned in
    /// [Event::ChannelOpened].
    ///
    /// The id is `keccak256(abi.encode(party, counter_party, asset,
    /// challenge_period, amount, n))`, where `n` counts the channels `caller`
    /// opened before.
    pub fn open(
        &mut self,
        caller: Address,
        asset: Asset,
        counter_party: Address,
        amount: U256,
        challenge_period: u64,
    ) -> Result<Event, Error> {
        let count = self.open_counts.get(&caller).copied().unwrap_or(0);
        let channel_id = abiencode::to_hash(&(
            caller,
            counter_party,
            asset,
            challenge_period,
            amount,
            count,
        ))?;

        let event = self.open_with_id(
            caller,
            channel_id,
            asset,
            counter_party,
            amount,
            challenge_period,
        )?;
        self.open_counts.insert(caller, count.saturating_add(1));
        Ok(event)
    }

    /// Open a channel under an id chosen by the caller.
    pub fn open_with_id(
        &mut self,
        caller: Address,
        channel_id: Hash,
        asset: Asset,
        counter_party: Address,
        amount: U256,
        challenge_period: u64,
    ) -> Result<Event, Error> {
        if caller == counter_party {
            return Err(Error::SelfChannelNotAllowed);
        }
        if amount.is_zero() {
            return Err(Error::ZeroDepositNotAllowed);
        }
        if let Some(max) = self.config.max_challenge_period {
            if challenge_period > max {
                return Err(Error::ChallengePeriodTooLong {
                    requested: challenge_period,
                    max,
                });
            }
        }
        self.store.check_vacant(&channel_id)?;

        let channel = Channel::new(
            channel_id,
            asset,
            caller,
            counter_party,
            amount,
            challenge_period,
        );

        self.assets
            .deposit(asset, caller, amount)
            .map_err(Error::DepositFailed)?;
        self.store.insert(channel)?;

        info!(%channel_id, %caller, %counter_party, %amount, challenge_period, "channel opened");
        Ok(Event::ChannelOpened { channel_id })
    }

    /// Deposit of the counter party. Possible once, also with zero funds.
    pub fn join(
        &mut self,
        caller: Address,
        channel_id: Hash,
        amount: U256,
    ) -> Result<Event, Error> {
        let mut channel = self.store.get(&channel_id)?.clone();

        if channel.status != Status::Open {
            return Err(Error::ChannelNotOpen);
        }
        if caller != channel.counter_party {
            return Err(Error::NotTheDesignatedCounterParty);
        }
        if channel.joined {
            return Err(Error::AlreadyJoined);
        }

        channel.counter_party_balance = channel
            .counter_party_balance
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow)?;
        channel.total_deposited = channel
            .total_deposited
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow)?;
        channel.joined = true;

        if !amount.is_zero() {
            self.assets
                .deposit(channel.asset, caller, amount)
                .map_err(Error::DepositFailed)?;
        }
        self.store.update(channel)?;

        info!(%channel_id, %caller, %amount, "counter party joined");
        Ok(Event::CounterPartyJoined { channel_id })
    }

    /// Submit a mutually signed state to end the channel.
    ///
    /// Without a challenge period it is paid out right away, otherwise the
    /// channel is disputed until the period is over.
    pub fn close(&mut self, caller: Address, signed: &SignedSnapshot) -> Result<Event, Error> {
        let channel_id = signed.channel_id();
        let mut channel = self.store.get(&channel_id)?.clone();

        check_status(&channel, Status::Open)?;
        if !channel.joined {
            return Err(Error::ChannelNotJoined);
        }
        check_participant(&channel, caller)?;
        check_signed_state(&channel, signed)?;

        channel.party_balance = signed.snapshot.party_balance;
        channel.counter_party_balance = signed.snapshot.counter_party_balance;
        channel.nonce = signed.snapshot.nonce;

        let event = if channel.challenge_period == 0 {
            self.settle(&mut channel)?;
            Event::ChannelClosed { channel_id }
        } else {
            let expiry = timer::expiry(self.clock.now(), channel.challenge_period)?;
            channel.status = Status::Disputed;
            channel.challenge_expiry = Some(expiry);
            Event::ChannelOnChallenge { channel_id, expiry }
        };
        let status = channel.status;
        self.store.update(channel)?;

        info!(%channel_id, %caller, nonce = %signed.nonce(), ?status, "channel closed");
        Ok(event)
    }

    /// Replace the disputed state with a newer one, restarting the challenge
    /// period.
    pub fn challenge(&mut self, caller: Address, signed: &SignedSnapshot) -> Result<Event, Error> {
        let channel_id = signed.channel_id();
        let mut channel = self.store.get(&channel_id)?.clone();

        check_status(&channel, Status::Disputed)?;
        check_participant(&channel, caller)?;

        let now = self.clock.now();
        let expiry = channel.challenge_expiry.ok_or(Error::ChallengePeriodOver)?;
        if timer::is_expired(now, expiry) {
            return Err(Error::ChallengePeriodOver);
        }

        check_signed_state(&channel, signed)?;
        if signed.nonce() <= channel.nonce {
            warn!(%channel_id, %caller, current = %channel.nonce, submitted = %signed.nonce(), "stale state rejected");
            return Err(Error::StaleState {
                current: channel.nonce,
                submitted: signed.nonce(),
            });
        }

        let expiry = timer::expiry(now, channel.challenge_period)?;
        channel.party_balance = signed.snapshot.party_balance;
        channel.counter_party_balance = signed.snapshot.counter_party_balance;
        channel.nonce = signed.nonce();
        channel.challenge_expiry = Some(expiry);
        self.store.update(channel)?;

        info!(%channel_id, %caller, nonce = %signed.nonce(), expiry, status = ?Status::Disputed, "channel challenged");
        Ok(Event::ChannelChallenged {
            channel_id,
            nonce: signed.nonce(),
            expiry,
        })
    }

    /// Pay out a disputed channel once its challenge period is over. Anyone
    /// may call this.
    pub fn redeem(&mut self, caller: Address, channel_id: Hash) -> Result<Event, Error> {
        let mut channel = self.store.get(&channel_id)?.clone();

        check_status(&channel, Status::Disputed)?;
        let now = self.clock.now();
        if let Some(expiry) = channel.challenge_expiry {
            if !timer::is_expired(now, expiry) {
                return Err(Error::ChallengePeriodNotOver {
                    remaining: expiry - now,
                });
            }
        }

        self.settle(&mut channel)?;
        self.store.update(channel)?;

        info!(%channel_id, %caller, status = ?Status::Settled, "channel redeemed");
        Ok(Event::ChannelClosed { channel_id })
    }

    /// Pay both balances and mark the (staged) record as settled.
    fn settle(&mut self, channel: &mut Channel) -> Result<(), Error> {
        let payouts: Vec<Payout> = [
            Payout {
                to: channel.party,
                amount: channel.party_balance,
            },
            Payout {
                to: channel.counter_party,
                amount: channel.counter_party_balance,
            },
        ]
        .into_iter()
        .filter(|p| !p.amount.is_zero())
        .collect();

        if !payouts.is_empty() {
            self.assets
                .payout(channel.asset, &payouts)
                .map_err(Error::PayoutFailed)?;
        }
        channel.status = Status::Settled;
        Ok(())
    }
}

fn check_status(channel: &Channel, expected: Status) -> Result<(), Error> {
    if channel.status == expected {
        Ok(())
    } else {
        Err(Error::InvalidChannelStatus {
            expected,
            found: channel.status,
        })
    }
}

fn check_participant(channel: &Channel, caller: Address) -> Result<(), Error> {
    match channel.role_of(caller) {
        Some(_) => Ok(()),
        None => {
            warn!(channel_id = %channel.channel_id, %caller, "caller is not a participant");
            Err(Error::NotAParticipant(caller))
        }
    }
}

/// Signatures of both participants, then conservation of the deposit.
fn check_signed_state(channel: &Channel, signed: &SignedSnapshot) -> Result<(), Error> {
    if let Err(e) = signed.verify(channel.party, channel.counter_party) {
        warn!(channel_id = %channel.channel_id, error = %e, "signature check failed");
        return Err(e);
    }

    let snapshot = &signed.snapshot;
    let total = snapshot.total().ok_or(Error::BalanceOverflow)?;
    if total != channel.total_deposited {
        warn!(
            channel_id = %channel.channel_id,
            %total,
            total_deposited = %channel.total_deposited,
            "conservation violated"
        );
        return Err(Error::ConservationViolation {
            party_balance: snapshot.party_balance,
            counter_party_balance: snapshot.counter_party_balance,
            total_deposited: channel.total_deposited,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset::{NativeLedger, TransferError, Treasury},
        channel::{timer::ManualClock, Snapshot},
        config::IdReuse,
        sig::Signer,
    };
    use rand::{rngs::StdRng, SeedableRng};

    const DAY: u64 = 24 * 60 * 60;

    struct Setup {
        adj: Adjudicator<Treasury, ManualClock>,
        alice: Signer,
        bob: Signer,
        id: Hash,
    }

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn setup_with(config: Config, challenge_period: u64) -> Setup {
        let mut rng = StdRng::seed_from_u64(0);
        let alice = Signer::new(&mut rng);
        let bob = Signer::new(&mut rng);

        let mut native = NativeLedger::default();
        native.fund(alice.address(), 100.into()).unwrap();
        native.fund(bob.address(), 100.into()).unwrap();

        let mut adj =
            Adjudicator::with_config(config, Treasury::native_only(native), ManualClock::new(1000));
        let id = adj
            .open(
                alice.address(),
                Asset::Native,
                bob.address(),
                10.into(),
                challenge_period,
            )
            .unwrap()
            .channel_id();
        adj.join(bob.address(), id, 5.into()).unwrap();

        Setup {
            adj,
            alice,
            bob,
            id,
        }
    }

    fn setup(challenge_period: u64) -> Setup {
        setup_with(Config::default(), challenge_period)
    }

    impl Setup {
        fn signed(&self, nonce: u64, party: u64, counter_party: u64) -> SignedSnapshot {
            self.sign_for(self.id, nonce.into(), party.into(), counter_party.into())
        }

        fn sign_for(
            &self,
            channel_id: Hash,
            nonce: U256,
            party: U256,
            counter_party: U256,
        ) -> SignedSnapshot {
            let snapshot = Snapshot {
                channel_id,
                party_balance: party,
                counter_party_balance: counter_party,
                nonce,
            };
            SignedSnapshot {
                snapshot,
                party_signature: snapshot.sign(&self.alice).unwrap(),
                counter_party_signature: snapshot.sign(&self.bob).unwrap(),
            }
        }

        fn balance(&self, addr: Address) -> U256 {
            self.adj.assets().native().unwrap().balance_of(addr)
        }

        fn escrow(&self) -> U256 {
            self.adj.assets().native().unwrap().escrow()
        }

        fn channel(&self) -> Channel {
            self.adj.channel(self.id).unwrap().clone()
        }
    }

    #[test]
    fn open_records_deposit() {
        let s = setup(DAY);
        let ch = s.channel();

        assert_eq!(ch.party(), s.alice.address());
        assert_eq!(ch.counter_party(), s.bob.address());
        assert_eq!(ch.party_balance(), 10.into());
        assert_eq!(ch.counter_party_balance(), 5.into());
        assert_eq!(ch.total_deposited(), 15.into());
        assert_eq!(ch.nonce(), U256::zero());
        assert_eq!(ch.status(), Status::Open);
        assert!(ch.joined());
        assert_eq!(s.escrow(), 15.into());
        assert_eq!(s.balance(s.alice.address()), 90.into());
    }

    #[test]
    fn generated_ids_differ_per_open() {
        let mut s = setup(0);
        let (alice, bob) = (s.alice.address(), s.bob.address());
        let second = s
            .adj
            .open(alice, Asset::Native, bob, 10.into(), 0)
            .unwrap()
            .channel_id();

        assert_ne!(second, s.id);
        assert_eq!(s.adj.channels().count(), 2);
    }

    #[test]
    fn open_preconditions() {
        let mut s = setup(0);
        let alice = s.alice.address();

        assert_eq!(
            s.adj.open(alice, Asset::Native, alice, 1.into(), 0),
            Err(Error::SelfChannelNotAllowed)
        );
        assert_eq!(
            s.adj.open(alice, Asset::Native, addr(9), U256::zero(), 0),
            Err(Error::ZeroDepositNotAllowed)
        );
        assert_eq!(
            s.adj.open(alice, Asset::Native, addr(9), 1000.into(), 0),
            Err(Error::DepositFailed(TransferError::InsufficientBalance {
                account: alice,
                needed: 1000.into(),
                available: 90.into(),
            }))
        );
        assert_eq!(
            s.adj.open(alice, Asset::Token(addr(7)), addr(9), 1.into(), 0),
            Err(Error::DepositFailed(TransferError::UnsupportedAsset(
                Asset::Token(addr(7))
            )))
        );
        assert_eq!(s.adj.channels().count(), 1);
        assert_eq!(s.balance(alice), 90.into());
    }

    #[test]
    fn open_with_id_collision() {
        let mut s = setup(0);
        let (alice, bob, id) = (s.alice.address(), s.bob.address(), s.id);

        assert_eq!(
            s.adj.open_with_id(alice, id, Asset::Native, bob, 1.into(), 0),
            Err(Error::ChannelIdInUse(id))
        );
        // The deposit was not taken.
        assert_eq!(s.balance(alice), 90.into());
    }

    #[test]
    fn settled_id_reuse_follows_config() {
        let config = Config {
            id_reuse: IdReuse::AfterSettlement,
            ..Config::default()
        };
        let mut s = setup_with(config, 0);
        let (alice, bob, id) = (s.alice.address(), s.bob.address(), s.id);
        let signed = s.signed(1, 1, 14);
        s.adj.close(alice, &signed).unwrap();

        s.adj
            .open_with_id(alice, id, Asset::Native, bob, 1.into(), 0)
            .unwrap();
        assert_eq!(s.channel().status(), Status::Open);
        assert_eq!(s.channel().total_deposited(), 1.into());

        let mut f = setup(0);
        let (alice, bob, id) = (f.alice.address(), f.bob.address(), f.id);
        let signed = f.signed(1, 1, 14);
        f.adj.close(alice, &signed).unwrap();
        assert_eq!(
            f.adj.open_with_id(alice, id, Asset::Native, bob, 1.into(), 0),
            Err(Error::ChannelIdInUse(id))
        );
    }

    #[test]
    fn challenge_period_limit() {
        let config = Config {
            max_challenge_period: Some(DAY),
            ..Config::default()
        };
        let mut s = setup_with(config, DAY);
        let (alice, bob) = (s.alice.address(), s.bob.address());

        assert_eq!(
            s.adj.open(alice, Asset::Native, bob, 1.into(), DAY + 1),
            Err(Error::ChallengePeriodTooLong {
                requested: DAY + 1,
                max: DAY
            })
        );
    }

    #[test]
    fn join_preconditions() {
        let mut s = setup(0);
        let (alice, bob, id) = (s.alice.address(), s.bob.address(), s.id);

        assert_eq!(
            s.adj.join(alice, id, 1.into()),
            Err(Error::NotTheDesignatedCounterParty)
        );
        assert_eq!(s.adj.join(bob, id, 1.into()), Err(Error::AlreadyJoined));
        assert_eq!(
            s.adj.join(bob, Hash([0; 32]), 1.into()),
            Err(Error::ChannelNotFound(Hash([0; 32])))
        );
    }

    #[test]
    fn join_with_zero_is_single_use() {
        let mut s = setup(0);
        let (alice, bob) = (s.alice.address(), s.bob.address());
        let id = s
            .adj
            .open(alice, Asset::Native, bob, 1.into(), 0)
            .unwrap()
            .channel_id();

        s.adj.join(bob, id, U256::zero()).unwrap();
        assert_eq!(s.adj.channel(id).unwrap().total_deposited(), 1.into());
        assert_eq!(
            s.adj.join(bob, id, U256::zero()),
            Err(Error::AlreadyJoined)
        );
    }

    #[test]
    fn join_after_close_is_rejected() {
        let mut s = setup(DAY);
        let (alice, bob) = (s.alice.address(), s.bob.address());
        let id = s
            .adj
            .open(alice, Asset::Native, bob, 1.into(), DAY)
            .unwrap()
            .channel_id();
        s.adj.join(bob, id, U256::zero()).unwrap();

        let signed = s.sign_for(id, U256::zero(), 1.into(), U256::zero());
        s.adj.close(alice, &signed).unwrap();

        assert_eq!(s.adj.join(bob, id, 1.into()), Err(Error::ChannelNotOpen));
    }

    #[test]
    fn join_overflow_changes_nothing() {
        let mut s = setup(0);
        let (alice, bob) = (s.alice.address(), s.bob.address());
        let id = s
            .adj
            .open(alice, Asset::Native, bob, 1.into(), 0)
            .unwrap()
            .channel_id();
        let before = s.adj.channel(id).unwrap().clone();
        let escrow = s.escrow();

        assert_eq!(s.adj.join(bob, id, U256::MAX), Err(Error::BalanceOverflow));
        assert_eq!(s.adj.channel(id).unwrap(), &before);
        assert_eq!(s.escrow(), escrow);
        assert_eq!(s.balance(bob), 100.into());
    }

    #[test]
    fn join_deposit_failure_changes_nothing() {
        let mut s = setup(0);
        let (alice, bob) = (s.alice.address(), s.bob.address());
        let id = s
            .adj
            .open(alice, Asset::Native, bob, 1.into(), 0)
            .unwrap()
            .channel_id();
        let before = s.adj.channel(id).unwrap().clone();

        assert!(matches!(
            s.adj.join(bob, id, 1000.into()),
            Err(Error::DepositFailed(_))
        ));
        assert_eq!(s.adj.channel(id).unwrap(), &before);
    }

    #[test]
    fn close_without_period_settles() {
        let mut s = setup(0);
        let signed = s.signed(1, 1, 14);
        let event = s.adj.close(s.alice.address(), &signed).unwrap();

        assert_eq!(event, Event::ChannelClosed { channel_id: s.id });
        assert_eq!(s.channel().status(), Status::Settled);
        assert_eq!(s.balance(s.alice.address()), 91.into());
        assert_eq!(s.balance(s.bob.address()), 109.into());
        assert_eq!(s.escrow(), U256::zero());
    }

    #[test]
    fn close_with_period_disputes() {
        let mut s = setup(DAY);
        let signed = s.signed(1, 5, 10);
        let event = s.adj.close(s.bob.address(), &signed).unwrap();

        assert_eq!(
            event,
            Event::ChannelOnChallenge {
                channel_id: s.id,
                expiry: 1000 + DAY
            }
        );
        let ch = s.channel();
        assert_eq!(ch.status(), Status::Disputed);
        assert_eq!(ch.nonce(), 1.into());
        assert_eq!(ch.challenge_remaining(1000), Some(DAY));
        assert_eq!(s.escrow(), 15.into());
    }

    #[test]
    fn close_rejections_change_nothing() {
        let mut s = setup(DAY);
        let before = s.channel();
        let alice = s.alice.address();

        let forged = s.signed(1, 1000, 1000);
        assert_eq!(
            s.adj.close(alice, &forged),
            Err(Error::ConservationViolation {
                party_balance: 1000.into(),
                counter_party_balance: 1000.into(),
                total_deposited: 15.into(),
            })
        );

        let signed = s.signed(1, 5, 10);
        assert_eq!(
            s.adj.close(addr(0x77), &signed),
            Err(Error::NotAParticipant(addr(0x77)))
        );

        let mut tampered = signed;
        tampered.snapshot.party_balance = 6.into();
        tampered.snapshot.counter_party_balance = 9.into();
        assert!(matches!(
            s.adj.close(alice, &tampered),
            Err(Error::InvalidPartySignature { .. })
        ));

        let mut half = signed;
        half.counter_party_signature = signed.party_signature;
        assert_eq!(
            s.adj.close(alice, &half),
            Err(Error::InvalidCounterPartySignature { recovered: alice })
        );

        assert_eq!(s.channel(), before);
    }

    #[test]
    fn close_requires_join() {
        let mut s = setup(0);
        let (alice, bob) = (s.alice.address(), s.bob.address());
        let id = s
            .adj
            .open(alice, Asset::Native, bob, 10.into(), 0)
            .unwrap()
            .channel_id();
        let before = s.adj.channel(id).unwrap().clone();

        let signed = s.sign_for(id, U256::one(), 10.into(), U256::zero());
        assert_eq!(s.adj.close(alice, &signed), Err(Error::ChannelNotJoined));
        assert_eq!(s.adj.channel(id).unwrap(), &before);
        assert_eq!(s.balance(alice), 80.into());

        s.adj.join(bob, id, U256::zero()).unwrap();
        assert_eq!(
            s.adj.close(alice, &signed),
            Ok(Event::ChannelClosed { channel_id: id })
        );
        assert_eq!(s.balance(alice), 90.into());
    }

    #[test]
    fn overflowing_balances_are_not_a_conservation_violation() {
        let mut s = setup(DAY);
        let before = s.channel();

        let signed = s.sign_for(s.id, U256::one(), U256::MAX, U256::MAX);
        assert_eq!(
            s.adj.close(s.alice.address(), &signed),
            Err(Error::BalanceOverflow)
        );
        assert_eq!(s.channel(), before);

        let old = s.signed(1, 5, 10);
        s.adj.close(s.alice.address(), &old).unwrap();
        let disputed = s.channel();
        let signed = s.sign_for(s.id, 2.into(), U256::MAX, U256::one());
        assert_eq!(
            s.adj.challenge(s.bob.address(), &signed),
            Err(Error::BalanceOverflow)
        );
        assert_eq!(s.channel(), disputed);
    }

    #[test]
    fn close_twice_is_invalid_status() {
        let mut s = setup(DAY);
        let signed = s.signed(1, 5, 10);
        s.adj.close(s.alice.address(), &signed).unwrap();

        assert_eq!(
            s.adj.close(s.alice.address(), &signed),
            Err(Error::InvalidChannelStatus {
                expected: Status::Open,
                found: Status::Disputed
            })
        );
    }

    #[test]
    fn challenge_with_newer_state_resets_expiry() {
        let mut s = setup(DAY);
        let close = s.signed(1, 5, 10);
        s.adj.close(s.alice.address(), &close).unwrap();

        s.adj.clock().advance(DAY / 2);
        let newer = s.signed(2, 0, 15);
        let event = s.adj.challenge(s.bob.address(), &newer).unwrap();

        let expiry = 1000 + DAY / 2 + DAY;
        assert_eq!(
            event,
            Event::ChannelChallenged {
                channel_id: s.id,
                nonce: 2.into(),
                expiry
            }
        );
        let ch = s.channel();
        assert_eq!(ch.party_balance(), U256::zero());
        assert_eq!(ch.counter_party_balance(), 15.into());
        assert_eq!(ch.challenge_expiry(), Some(expiry));
    }

    #[test]
    fn challenge_may_lower_a_balance() {
        let mut s = setup(DAY);
        let close = s.signed(1, 0, 15);
        s.adj.close(s.bob.address(), &close).unwrap();

        let newer = s.signed(2, 12, 3);
        s.adj.challenge(s.alice.address(), &newer).unwrap();
        assert_eq!(s.channel().counter_party_balance(), 3.into());
    }

    #[test]
    fn stale_challenge_is_rejected() {
        let mut s = setup(DAY);
        let close = s.signed(5, 5, 10);
        s.adj.close(s.alice.address(), &close).unwrap();
        let before = s.channel();

        for nonce in [4, 5] {
            let stale = s.signed(nonce, 0, 15);
            assert_eq!(
                s.adj.challenge(s.bob.address(), &stale),
                Err(Error::StaleState {
                    current: 5.into(),
                    submitted: nonce.into()
                })
            );
        }
        assert_eq!(s.channel(), before);
    }

    #[test]
    fn challenge_after_expiry_is_rejected() {
        let mut s = setup(DAY);
        let close = s.signed(1, 5, 10);
        s.adj.close(s.alice.address(), &close).unwrap();

        s.adj.clock().advance(DAY);
        let newer = s.signed(2, 0, 15);
        assert_eq!(
            s.adj.challenge(s.bob.address(), &newer),
            Err(Error::ChallengePeriodOver)
        );
    }

    #[test]
    fn challenge_requires_dispute_and_participant() {
        let mut s = setup(DAY);
        let newer = s.signed(2, 0, 15);
        assert_eq!(
            s.adj.challenge(s.bob.address(), &newer),
            Err(Error::InvalidChannelStatus {
                expected: Status::Disputed,
                found: Status::Open
            })
        );

        let close = s.signed(1, 5, 10);
        s.adj.close(s.alice.address(), &close).unwrap();
        assert_eq!(
            s.adj.challenge(addr(0x77), &newer),
            Err(Error::NotAParticipant(addr(0x77)))
        );
    }

    #[test]
    fn redeem_waits_for_expiry() {
        let mut s = setup(DAY);
        let close = s.signed(1, 5, 10);
        s.adj.close(s.alice.address(), &close).unwrap();

        s.adj.clock().advance(DAY - 1);
        assert_eq!(
            s.adj.redeem(addr(0x77), s.id),
            Err(Error::ChallengePeriodNotOver { remaining: 1 })
        );

        s.adj.clock().advance(1);
        let event = s.adj.redeem(addr(0x77), s.id).unwrap();
        assert_eq!(event, Event::ChannelClosed { channel_id: s.id });
        assert_eq!(s.balance(s.alice.address()), 95.into());
        assert_eq!(s.balance(s.bob.address()), 105.into());
        assert_eq!(s.escrow(), U256::zero());
    }

    #[test]
    fn redeem_pays_once() {
        let mut s = setup(DAY);
        let close = s.signed(1, 0, 15);
        s.adj.close(s.alice.address(), &close).unwrap();
        s.adj.clock().advance(DAY);
        s.adj.redeem(s.bob.address(), s.id).unwrap();

        assert_eq!(
            s.adj.redeem(s.bob.address(), s.id),
            Err(Error::InvalidChannelStatus {
                expected: Status::Disputed,
                found: Status::Settled
            })
        );
        assert_eq!(s.balance(s.bob.address()), 110.into());
        assert_eq!(s.balance(s.alice.address()), 90.into());
    }

    #[test]
    fn redeem_open_channel_is_invalid_status() {
        let mut s = setup(DAY);
        assert_eq!(
            s.adj.redeem(s.alice.address(), s.id),
            Err(Error::InvalidChannelStatus {
                expected: Status::Disputed,
                found: Status::Open
            })
        );
    }

    #[test]
    fn settled_channel_rejects_everything() {
        let mut s = setup(0);
        let (alice, bob, id) = (s.alice.address(), s.bob.address(), s.id);
        let close = s.signed(1, 1, 14);
        s.adj.close(alice, &close).unwrap();

        let newer = s.signed(2, 0, 15);
        assert!(s.adj.join(bob, id, 1.into()).is_err());
        assert!(s.adj.close(alice, &newer).is_err());
        assert!(s.adj.challenge(alice, &newer).is_err());
        assert!(s.adj.redeem(alice, id).is_err());
        assert_eq!(s.balance(alice), 91.into());
    }
}
