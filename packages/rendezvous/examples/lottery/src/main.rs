#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Lottery simulation built on `rendezvous` channels.
//!
//! Players submit a number to Administration over one shared channel, Draw
//! announces the winning number, Tally scores the submissions, and
//! Administration notifies each player on that player's own channel. Every
//! exchange is a synchronous hand-off: no role continues until the other
//! side has taken the message.
//!
//! Configure with `LOTTERY_PLAYERS`, `LOTTERY_MAX_NUMBER`,
//! `LOTTERY_DELAY_MS` and `LOTTERY_SEED`.

mod config;
mod roles;
mod simulation;

use thiserror::Error;

use crate::{config::Config, roles::PlayerId};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Logging(#[from] rendezvous_logging::InitError),
    #[error("Failed to spawn the {role} thread: {source}")]
    Spawn {
        role: String,
        source: std::io::Error,
    },
    #[error("The {role} thread panicked")]
    RoleFailed { role: String },
    #[error("No notification channel for player {0}")]
    UnknownPlayer(PlayerId),
}

fn main() -> Result<(), Error> {
    let _layer = rendezvous_logging::init(Some("lottery.log"))?;

    let config = Config::from_env()?;
    log::info!(
        "Starting lottery: players={} numbers=1..={} delay={:?} seed={:?}",
        config.players,
        config.max_number,
        config.delay,
        config.seed
    );

    let outcome = simulation::run(&config)?;

    println!("Winning number: {}", outcome.winning);
    for (id, result) in &outcome.results {
        let verdict = if result.hit { "WIN" } else { "-" };
        println!("  player {id:>3}: chose {:>3} {verdict}", result.chosen);
    }

    for id in outcome.mismatched() {
        log::error!(
            "Player {id} was sent {:?} but received {:?}",
            outcome.results.get(&id),
            outcome.received.get(&id)
        );
    }

    let winners = outcome.winners().collect::<Vec<_>>();
    if winners.is_empty() {
        println!("No winners this time.");
    } else {
        println!("Winners: {winners:?}");
    }

    Ok(())
}
