//! Walkthrough of a channel that ends in a dispute.
//!
//! Alice and Bob open a channel, make a few payments off-chain and then Alice
//! tries to close with an old state that pays her more. Bob answers with the
//! latest state before the challenge period ends.
//!
//! Run with `RUST_LOG=debug cargo run --example dispute` to see the ledger
//! movements, too.

use paychan::{
    asset::{Asset, NativeLedger, Treasury},
    channel::{timer::ManualClock, Adjudicator},
    client::ChannelClient,
    sig::Signer,
    wire::{self, ChannelRecord, Notification},
    Role, U256,
};
use rand::{rngs::StdRng, SeedableRng};
use std::error::Error;
use tracing_subscriber::EnvFilter;

const DAY: u64 = 24 * 60 * 60;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Do not use that on any real device, this is just for demonstration.
    let mut rng = StdRng::seed_from_u64(0);
    let alice = Signer::new(&mut rng);
    let bob = Signer::new(&mut rng);
    let (alice_addr, bob_addr) = (alice.address(), bob.address());

    let mut native = NativeLedger::default();
    native.fund(alice_addr, 100.into())?;
    native.fund(bob_addr, 100.into())?;

    let mut adj = Adjudicator::new(Treasury::native_only(native), ManualClock::new(0));

    let event = adj.open(alice_addr, Asset::Native, bob_addr, 10.into(), DAY)?;
    let id = event.channel_id();
    println!("Opened: {:?}", event);
    println!("Joined: {:?}", adj.join(bob_addr, id, 5.into())?);

    let channel = adj.channel(id)?;
    let mut alice = ChannelClient::new(alice, Role::Party, channel)?;
    let mut bob = ChannelClient::new(bob, Role::CounterParty, channel)?;

    let mut history = Vec::new();
    for amount in [2u64, 3, 4] {
        let proposal = alice.propose_payment(Role::CounterParty, U256::from(amount))?;
        let signed = bob.countersign(&proposal)?;
        alice.accept(signed)?;
        println!(
            "Alice paid {}, balances now {} / {}",
            amount,
            signed.snapshot.party_balance,
            signed.snapshot.counter_party_balance
        );
        history.push(signed);
    }

    // Alice cheats with the first state.
    let event = adj.close(alice.address(), &history[0])?;
    println!("Close: {:?}", event);

    adj.clock().advance(DAY / 2);
    let latest = *bob.latest().ok_or("Bob has no signed state")?;
    let event = adj.challenge(bob.address(), &latest)?;
    println!("Challenge: {:?}", event);

    let frame = wire::encode_framed(&Notification::from(&event))?;
    println!("Watcher notification: 0x{}", hex::encode(&frame));

    if let Err(e) = adj.redeem(alice.address(), id) {
        println!("Redeem too early: {}", e);
    }

    adj.clock().advance(DAY);
    println!("Redeem: {:?}", adj.redeem(bob.address(), id)?);

    let record = ChannelRecord::from(adj.channel(id)?);
    println!("Final record: {:#?}", record);

    if let Some(ledger) = adj.assets().native() {
        println!(
            "Alice: {}, Bob: {}, escrow: {}",
            ledger.balance_of(alice.address()),
            ledger.balance_of(bob.address()),
            ledger.escrow()
        );
    }
    Ok(())
}
