//! Handsign Sync Demo
//!
//! Plays one private match between two local identities against the
//! in-process contract, with both sides driven by their own sync session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::time::timeout;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use handsign_sync::{
    ledger::sim::{SimClient, SimulatedLedger},
    store::{JsonFileStore, MemoryStore},
    Handsign, Match, MatchHandle, Stage, SyncConfig, SyncEvent, SyncSession, Visibility, POLL_INTERVAL_MS,
    VERSION, WINS_TO_FINISH,
};

/// How long to wait for the poller to observe a change.
const OBSERVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on rounds, ties included.
const MAX_ROUNDS: u32 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    let mut config = SyncConfig::from_env()?;
    if config.contract_address.is_empty() {
        config.contract_address = "secret1demo".to_string();
    }
    let config = Arc::new(config);

    info!("Handsign Sync v{}", VERSION);
    info!("Poll interval: {:?} (default {} ms)", config.poll_interval, POLL_INTERVAL_MS);
    info!("Contract: {}", config.contract_address);

    demo_match(config).await
}

/// Run one match to completion.
async fn demo_match(config: Arc<SyncConfig>) -> Result<()> {
    info!("=== Starting Demo Match ===");

    let ledger = SimulatedLedger::new(&config.contract_address, config.entry_stake.clone());
    let alice = start_session(&config, &ledger, "alice");
    let bob = SyncSession::start(config.clone(), Arc::new(ledger.client("bob")), MemoryStore::new());

    let mut events = alice.handle().events();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SyncEvent::RoundConcluded { round, result, .. } => info!("alice: round {} {:?}", round, result),
                SyncEvent::MatchOver { won, .. } => info!("alice: match over, won = {}", won),
                _ => {}
            }
        }
    });

    let created = alice.executor().create_or_join(Visibility::Private, None).await?;
    info!("alice created {}", created.locator);
    wait_until(alice.handle(), "alice in lobby", |m| m.stage >= Stage::Lobby).await?;

    let url = alice.executor().join_url().context("no join link")?;
    info!("Invite link: {}", url);
    bob.executor().join_from_url(&url).await?;

    let locator = created.locator;
    wait_until(alice.handle(), "alice game on", |m| m.stage >= Stage::GameOn).await?;
    wait_until(bob.handle(), "bob game on", |m| m.stage >= Stage::GameOn).await?;

    for n in 0..MAX_ROUNDS {
        let current = alice.handle().current().context("alice lost track of the match")?;
        if current.is_over() {
            break;
        }
        let round = current.round;

        let (a, b) = (Handsign::ALL[n as usize % 3], Handsign::ALL[(n as usize * 2 + 2) % 3]);
        info!("Round {}: alice {:?} vs bob {:?}", round, a, b);
        alice.executor().play_hand(locator, a).await?;
        bob.executor().play_hand(locator, b).await?;

        let advanced = |m: &Match| m.round > round || m.is_over();
        wait_until(alice.handle(), "alice round advance", advanced).await?;
        wait_until(bob.handle(), "bob round advance", advanced).await?;
    }

    let final_state = alice.handle().current().context("alice lost track of the match")?;
    if !final_state.is_over() {
        bail!("match did not finish within {} rounds", MAX_ROUNDS);
    }

    // Print final results
    info!("=== Match Results ===");
    info!("alice {} - {} bob (first to {})", final_state.wins, final_state.losses, WINS_TO_FINISH);
    for (index, round) in final_state.rounds.iter() {
        info!("Round {}: {:?} with {:?}", index + 1, round.result, round.handsign);
    }
    info!("Winner: {}", if final_state.won { "alice" } else { "bob" });

    alice.executor().leave().await?;
    bob.executor().leave().await?;

    alice.shutdown().await;
    bob.shutdown().await;
    event_log.abort();

    info!("=== Demo Complete ===");
    Ok(())
}

/// Session backed by the configured store.
fn start_session(config: &Arc<SyncConfig>, ledger: &SimulatedLedger, address: &str) -> SyncSession<SimClient> {
    let client = Arc::new(ledger.client(address));
    match &config.store_path {
        Some(path) => {
            let store = JsonFileStore::new(path);
            info!("{}: persisting to {}", client.address(), store.path().display());
            SyncSession::start(config.clone(), client, store)
        }
        None => {
            info!("{}: in-memory store", client.address());
            SyncSession::start(config.clone(), client, MemoryStore::new())
        }
    }
}

/// Wait for the watched match to satisfy `done`.
async fn wait_until(handle: &MatchHandle, what: &str, done: impl Fn(&Match) -> bool) -> Result<Match> {
    let mut rx = handle.subscribe();
    let matched = timeout(OBSERVE_TIMEOUT, rx.wait_for(|m| m.as_ref().is_some_and(|m| done(m))))
        .await
        .with_context(|| format!("timed out waiting for {what}"))??;
    (*matched).clone().context("match dropped")
}
