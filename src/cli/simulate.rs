//! Concurrent random trading traffic against one application

use super::app::TradeApp;
use crate::negotiation::TradeEvent;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SPREAD_MS: u64 = 2_000;
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Counts collected over one simulation run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub commands: usize,
    pub rejected: usize,
    pub offered: usize,
    pub accepted: usize,
    pub denied: usize,
    pub cancelled: usize,
    pub expired: usize,
    pub invalidated: usize,
    pub sessions: usize,
    pub still_pending: usize,
}

impl SimulationReport {
    fn record(&mut self, event: &TradeEvent) {
        match event {
            TradeEvent::NewOffer { .. } => self.offered += 1,
            TradeEvent::Accepted { .. } => self.accepted += 1,
            TradeEvent::Denied { .. } => self.denied += 1,
            TradeEvent::Cancelled { .. } => self.cancelled += 1,
            TradeEvent::Expired { .. } => self.expired += 1,
            TradeEvent::Invalidated { .. } => self.invalidated += 1,
            _ => {}
        }
    }

    /// Offers that ended in exactly one way
    pub fn resolved(&self) -> usize {
        self.accepted + self.denied + self.cancelled + self.expired + self.invalidated
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Commands:      {} ({} rejected)", self.commands, self.rejected)?;
        writeln!(f, "Offers:        {}", self.offered)?;
        writeln!(f, "  accepted     {}", self.accepted)?;
        writeln!(f, "  denied       {}", self.denied)?;
        writeln!(f, "  cancelled    {}", self.cancelled)?;
        writeln!(f, "  expired      {}", self.expired)?;
        writeln!(f, "  invalidated  {}", self.invalidated)?;
        writeln!(f, "Sessions:      {}", self.sessions)?;
        write!(f, "Still pending: {}", self.still_pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Move {
    Trade(String, String),
    Accept(String, Option<String>),
    Deny(String, Option<String>),
    Cancel(String, Option<String>),
    Reconnect(String),
}

/// Run `rounds` random commands among `players` simulated players
///
/// Commands are spread over a couple of seconds and run as separate tasks.
/// The run ends once every offer has had time to expire, so a correct
/// registry reports nothing still pending.
pub async fn simulate(
    app: &TradeApp,
    players: usize,
    rounds: usize,
    seed: u64,
) -> anyhow::Result<SimulationReport> {
    if players < 2 {
        anyhow::bail!("a simulation needs at least two players, got {}", players);
    }

    let names: Vec<String> = (1..=players).map(|i| format!("player{}", i)).collect();
    for name in &names {
        app.join(name);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let plan: Vec<(Duration, Move)> = (0..rounds)
        .map(|_| {
            let delay = Duration::from_millis(rng.gen_range(0..SPREAD_MS));
            (delay, random_move(&mut rng, &names))
        })
        .collect();

    tracing::info!(
        "Simulating {} commands among {} players (seed {})",
        rounds,
        players,
        seed
    );

    let stop = CancellationToken::new();
    let drain = {
        let app = app.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut report = SimulationReport::default();
            loop {
                for event in app.process_pending_events().await {
                    report.record(&event);
                }
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(DRAIN_INTERVAL) => {}
                }
            }
            for event in app.process_pending_events().await {
                report.record(&event);
            }
            report
        })
    };

    let tasks = plan.into_iter().map(|(delay, mv)| {
        let app = app.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            play(&app, mv).await
        })
    });

    let mut commands = 0;
    let mut rejected = 0;
    for outcome in join_all(tasks).await {
        match outcome {
            Ok(accepted) => {
                commands += 1;
                if !accepted {
                    rejected += 1;
                }
            }
            Err(e) => tracing::warn!("Simulated command panicked: {}", e),
        }
    }

    // Let every remaining offer run out.
    let timeout = app.settings().snapshot().timeout();
    tokio::time::sleep(timeout + DRAIN_INTERVAL * 2).await;

    stop.cancel();
    let mut report = drain.await?;
    report.commands = commands;
    report.rejected = rejected;
    report.sessions = app.exchange().len();
    report.still_pending = app.registry().pending_count();

    Ok(report)
}

fn random_move(rng: &mut StdRng, names: &[String]) -> Move {
    let actor = rng.gen_range(0..names.len());
    let mut other = rng.gen_range(0..names.len() - 1);
    if other >= actor {
        other += 1;
    }

    let actor = names[actor].clone();
    let other = names[other].clone();
    let named = |rng: &mut StdRng| rng.gen_bool(0.5).then(|| other.clone());

    match rng.gen_range(0..10) {
        0..=3 => Move::Trade(actor, other.clone()),
        4..=5 => Move::Accept(actor, named(rng)),
        6 => Move::Deny(actor, named(rng)),
        7..=8 => Move::Cancel(actor, named(rng)),
        _ => Move::Reconnect(actor),
    }
}

/// Execute one move, returning whether it went through
async fn play(app: &TradeApp, mv: Move) -> bool {
    tracing::debug!("Simulated move: {:?}", mv);

    match mv {
        Move::Trade(actor, target) => app.trade(&actor, &target).is_ok(),
        Move::Accept(actor, from) => app.accept(&actor, from.as_deref()).is_ok(),
        Move::Deny(actor, from) => app.deny(&actor, from.as_deref()).is_ok(),
        Move::Cancel(actor, to) => app.cancel(&actor, to.as_deref()).is_ok(),
        Move::Reconnect(actor) => {
            if app.leave(&actor).is_none() {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            app.join(&actor);
            true
        }
    }
}
