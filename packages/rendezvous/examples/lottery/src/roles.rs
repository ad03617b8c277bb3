//! The participants of the lottery.
//!
//! Each role runs on its own thread and talks to the others only through
//! [`Channel`]s. Every `send` below blocks until the other role has taken the
//! value, so the printed order of events follows the hand-offs.

use std::{collections::BTreeMap, thread, time::Duration};

use rand::{Rng, seq::SliceRandom as _};
use rendezvous::{Channel, FanOut};
use rendezvous_logging::debug_or_trace;

use crate::Error;

pub type PlayerId = usize;

/// A player's number, as handed to Administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub player_id: PlayerId,
    pub number: u32,
}

/// What Administration tells a player after the tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerResult {
    pub chosen: u32,
    pub winning: u32,
    pub hit: bool,
}

/// Administration's request to the tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyRequest {
    pub numbers: BTreeMap<PlayerId, u32>,
    pub winning: u32,
}

pub type Results = BTreeMap<PlayerId, PlayerResult>;

/// Random pauses between a role's steps, all scaled from one bound.
#[derive(Debug, Clone, Copy)]
pub struct Delays {
    max: Duration,
}

impl Delays {
    #[must_use]
    pub const fn new(max: Duration) -> Self {
        Self { max }
    }

    /// Before a player submits: `0..=max`.
    fn arrival(self, rng: &mut impl Rng) -> Duration {
        between(rng, Duration::ZERO, self.max)
    }

    /// Before a player listens for its result: `0..=2*max`.
    fn listen(self, rng: &mut impl Rng) -> Duration {
        between(rng, Duration::ZERO, self.max.saturating_mul(2))
    }

    /// Before the draw is announced: `max/2..=3*max/2`.
    fn draw(self, rng: &mut impl Rng) -> Duration {
        let half = self.max / 2;
        between(rng, half, self.max.saturating_add(half))
    }
}

fn between(rng: &mut impl Rng, from: Duration, to: Duration) -> Duration {
    if to <= from {
        return from;
    }
    let nanos = |duration: Duration| u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(rng.random_range(nanos(from)..=nanos(to)))
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

/// Submits one number, then waits for the result on the player's own
/// channel.
pub fn player(
    id: PlayerId,
    max_number: u32,
    submissions: &Channel<Submission>,
    notification: &Channel<PlayerResult>,
    delays: Delays,
    rng: &mut impl Rng,
) -> PlayerResult {
    pause(delays.arrival(rng));

    let number = rng.random_range(1..=max_number);
    log::info!("[Player {id}] chose {number}, submitting it to administration");
    submissions.send(Submission {
        player_id: id,
        number,
    });

    pause(delays.listen(rng));

    let result = notification.recv();
    let verdict = if result.hit { "won!" } else { "no luck" };
    log::info!(
        "[Player {id}] chose={} winning={} -> {verdict}",
        result.chosen,
        result.winning
    );

    result
}

/// Picks the winning number and hands it to Administration.
pub fn draw(max_number: u32, to_admin: &Channel<u32>, delays: Delays, rng: &mut impl Rng) -> u32 {
    pause(delays.draw(rng));

    let winning = rng.random_range(1..=max_number);
    log::info!("[Draw] winning number is {winning}, sending it to administration");
    to_admin.send(winning);

    winning
}

/// Scores every submission against the winning number.
pub fn tally(requests: &Channel<TallyRequest>, to_admin: &Channel<Results>) {
    let TallyRequest { numbers, winning } = requests.recv();
    log::info!(
        "[Tally] received {} submissions, winning={winning}",
        numbers.len()
    );

    let results = numbers
        .into_iter()
        .map(|(id, chosen)| {
            (
                id,
                PlayerResult {
                    chosen,
                    winning,
                    hit: chosen == winning,
                },
            )
        })
        .collect::<Results>();

    to_admin.send(results);
    log::info!("[Tally] results sent to administration");
}

/// The channels Administration is wired to.
pub struct AdminChannels<'a> {
    pub submissions: &'a Channel<Submission>,
    pub draw: &'a Channel<u32>,
    pub to_tally: &'a Channel<TallyRequest>,
    pub from_tally: &'a Channel<Results>,
    pub notifications: &'a FanOut<PlayerId, PlayerResult>,
}

/// Collects one number per player, gets the winning number, has it tallied
/// and notifies every player in random order.
///
/// # Errors
///
/// * If the tally returns a player that has no notification channel
pub fn administration(
    players: usize,
    channels: &AdminChannels<'_>,
    rng: &mut impl Rng,
) -> Result<Results, Error> {
    log::info!("[Admin] waiting for the players' numbers...");
    let mut numbers = BTreeMap::new();

    while numbers.len() < players {
        let Submission { player_id, number } = channels.submissions.recv();
        if numbers.contains_key(&player_id) {
            log::warn!("[Admin] ignoring duplicate submission from player {player_id}");
            continue;
        }
        numbers.insert(player_id, number);
        log::info!(
            "[Admin] player {player_id} chose {number} ({}/{players})",
            numbers.len()
        );
    }

    log::info!("[Admin] all numbers in, waiting for the draw...");
    let winning = channels.draw.recv();
    log::info!("[Admin] winning number {winning}, sending everything to the tally");
    channels.to_tally.send(TallyRequest { numbers, winning });

    let results = channels.from_tally.recv();
    log::info!("[Admin] results received, notifying players...");

    let mut order = results.keys().copied().collect::<Vec<_>>();
    order.shuffle(rng);
    debug_or_trace!(
        ("[Admin] notifying {} players", order.len()),
        ("[Admin] notification order {order:?}")
    );

    for id in order {
        let Some(&result) = results.get(&id) else {
            continue;
        };
        channels
            .notifications
            .send_to(&id, result)
            .map_err(|_| Error::UnknownPlayer(id))?;
        log::info!("[Admin] notified player {id}");
    }

    Ok(results)
}
