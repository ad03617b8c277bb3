//! Wires the roles together and runs one lottery.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use rand::{Rng as _, SeedableRng as _, rngs::StdRng};
use rendezvous::{Channel, FanOut};

use crate::{
    Error,
    config::Config,
    roles::{
        self, AdminChannels, Delays, PlayerId, PlayerResult, Results, Submission, TallyRequest,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub winning: u32,
    /// What Administration sent out, per player.
    pub results: Results,
    /// What each player actually received.
    pub received: Results,
}

impl Outcome {
    pub fn winners(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.results
            .iter()
            .filter(|(_, result)| result.hit)
            .map(|(id, _)| *id)
    }

    /// Players whose received result differs from the one Administration
    /// sent, or who received nothing.
    pub fn mismatched(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.results
            .iter()
            .filter(|(id, sent)| self.received.get(*id) != Some(*sent))
            .map(|(id, _)| *id)
            .chain(
                self.received
                    .keys()
                    .filter(|id| !self.results.contains_key(*id))
                    .copied(),
            )
    }
}

/// Runs one lottery: one thread per player plus Draw, Tally and
/// Administration, connected only through rendezvous channels.
///
/// On error the roles that were already started are not joined. They stay
/// blocked on their channels until the process exits.
///
/// # Errors
///
/// * If a role thread cannot be spawned
/// * If a role thread panics
/// * If Administration fails to notify a player
pub fn run(config: &Config) -> Result<Outcome, Error> {
    let mut seeds = config
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let delays = Delays::new(config.delay);
    let max_number = config.max_number;
    let ids = 1..=config.players;

    let submissions = Arc::new(Channel::<Submission>::new());
    let draw = Arc::new(Channel::<u32>::new());
    let to_tally = Arc::new(Channel::<TallyRequest>::new());
    let from_tally = Arc::new(Channel::<Results>::new());
    let notifications = Arc::new(FanOut::<PlayerId, PlayerResult>::new(ids.clone()));

    let admin = spawn("administration".to_string(), {
        let submissions = submissions.clone();
        let draw = draw.clone();
        let to_tally = to_tally.clone();
        let from_tally = from_tally.clone();
        let notifications = notifications.clone();
        let players = config.players;
        let mut rng = StdRng::seed_from_u64(seeds.random());
        move || {
            let channels = AdminChannels {
                submissions: &submissions,
                draw: &draw,
                to_tally: &to_tally,
                from_tally: &from_tally,
                notifications: &notifications,
            };
            roles::administration(players, &channels, &mut rng)
        }
    })?;

    let drawer = spawn("draw".to_string(), {
        let draw = draw.clone();
        let mut rng = StdRng::seed_from_u64(seeds.random());
        move || roles::draw(max_number, &draw, delays, &mut rng)
    })?;

    let tally = spawn("tally".to_string(), {
        let to_tally = to_tally.clone();
        let from_tally = from_tally.clone();
        move || roles::tally(&to_tally, &from_tally)
    })?;

    let players = ids
        .map(|id| {
            let notification = notifications.channel(&id).ok_or(Error::UnknownPlayer(id))?;
            let submissions = submissions.clone();
            let mut rng = StdRng::seed_from_u64(seeds.random());
            let handle = spawn(format!("player-{id}"), move || {
                roles::player(
                    id,
                    max_number,
                    &submissions,
                    &notification,
                    delays,
                    &mut rng,
                )
            })?;
            Ok((id, handle))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    // Administration finishes last; if it failed, players may never be notified
    let results = join(admin)??;
    let winning = join(drawer)?;
    join(tally)?;

    let received = players
        .into_iter()
        .map(|(id, handle)| Ok::<(PlayerId, PlayerResult), Error>((id, join(handle)?)))
        .collect::<Result<Results, _>>()?;

    Ok(Outcome {
        winning,
        results,
        received,
    })
}

fn spawn<T: Send + 'static>(
    role: String,
    f: impl FnOnce() -> T + Send + 'static,
) -> Result<JoinHandle<T>, Error> {
    thread::Builder::new()
        .name(role.clone())
        .spawn(f)
        .map_err(|source| Error::Spawn { role, source })
}

fn join<T>(handle: JoinHandle<T>) -> Result<T, Error> {
    let role = handle.thread().name().unwrap_or("unnamed").to_string();
    handle.join().map_err(|_| Error::RoleFailed { role })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config(players: usize, seed: u64) -> Config {
        Config {
            players,
            max_number: 20,
            delay: Duration::ZERO,
            seed: Some(seed),
        }
    }

    #[test_log::test]
    fn test_every_player_is_notified_of_their_own_result() {
        let outcome = run(&config(10, 42)).unwrap();

        assert_eq!(outcome.results.len(), 10);
        assert_eq!(outcome.received, outcome.results);
        assert_eq!(outcome.mismatched().count(), 0);
        assert_eq!(
            outcome.results.keys().copied().collect::<Vec<_>>(),
            (1..=10).collect::<Vec<_>>()
        );

        for result in outcome.results.values() {
            assert_eq!(result.winning, outcome.winning);
            assert_eq!(result.hit, result.chosen == outcome.winning);
            assert!((1..=20).contains(&result.chosen));
        }
    }

    #[test_log::test]
    fn test_seeded_runs_are_reproducible() {
        let first = run(&config(6, 7)).unwrap();
        let second = run(&config(6, 7)).unwrap();

        assert_eq!(first, second);
    }

    #[test_log::test]
    fn test_single_player() {
        let outcome = run(&config(1, 1)).unwrap();

        assert_eq!(outcome.received.len(), 1);
        assert_eq!(outcome.received, outcome.results);
    }

    #[test_log::test]
    fn test_everyone_wins_with_one_number() {
        let outcome = run(&Config {
            max_number: 1,
            ..config(4, 3)
        })
        .unwrap();

        assert_eq!(outcome.winning, 1);
        assert_eq!(outcome.winners().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test_log::test]
    fn test_with_real_delays() {
        let outcome = run(&Config {
            delay: Duration::from_millis(5),
            ..config(5, 9)
        })
        .unwrap();

        assert_eq!(outcome.received, outcome.results);
    }

    #[test_log::test]
    fn test_unseeded_run() {
        let outcome = run(&Config {
            seed: None,
            ..config(3, 0)
        })
        .unwrap();

        assert_eq!(outcome.received.len(), 3);
    }

    #[test_log::test]
    fn test_mismatched_reports_wrong_and_missing_notifications() {
        let result = |chosen| PlayerResult {
            chosen,
            winning: 2,
            hit: chosen == 2,
        };
        let outcome = Outcome {
            winning: 2,
            results: Results::from([(1, result(1)), (2, result(2)), (3, result(3))]),
            received: Results::from([(1, result(1)), (2, result(3)), (4, result(4))]),
        };

        assert_eq!(outcome.mismatched().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test_log::test]
    fn test_panicking_role_is_reported_by_name() {
        let handle = spawn::<()>("doomed".to_string(), || panic!("role failed")).unwrap();

        let error = join(handle).unwrap_err();

        assert!(matches!(error, Error::RoleFailed { ref role } if role == "doomed"));
    }
}
