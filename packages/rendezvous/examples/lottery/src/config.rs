//! Simulation settings read from the environment.

use std::time::Duration;

use moosicbox_env_utils::{
    DefaultEnvUsizeError, OptionEnvUsizeError, default_env_usize, option_env_u32, option_env_u64,
};
use thiserror::Error;

const DEFAULT_PLAYERS: usize = 10;
const DEFAULT_MAX_NUMBER: u32 = 20;
const DEFAULT_DELAY_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    DefaultEnvUsize(#[from] DefaultEnvUsizeError),
    #[error(transparent)]
    OptionEnvUsize(#[from] OptionEnvUsizeError),
    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        min: u64,
        value: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of players. Player ids run from 1 to `players`.
    pub players: usize,
    /// Chosen and winning numbers are drawn from `1..=max_number`.
    pub max_number: u32,
    /// Upper bound of a player's arrival delay. The other delays are derived
    /// from it; zero disables sleeping.
    pub delay: Duration,
    /// Fixed seed for a reproducible run.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            players: DEFAULT_PLAYERS,
            max_number: DEFAULT_MAX_NUMBER,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            seed: None,
        }
    }
}

impl Config {
    /// Reads `LOTTERY_PLAYERS`, `LOTTERY_MAX_NUMBER`, `LOTTERY_DELAY_MS` and
    /// `LOTTERY_SEED`, using defaults for unset variables.
    ///
    /// # Errors
    ///
    /// * If a set variable is not a valid number
    /// * If `LOTTERY_PLAYERS` or `LOTTERY_MAX_NUMBER` is zero
    pub fn from_env() -> Result<Self, ConfigError> {
        let players = default_env_usize("LOTTERY_PLAYERS", DEFAULT_PLAYERS)?;
        at_least("LOTTERY_PLAYERS", players as u64, 1)?;

        let max_number = option_env_u32("LOTTERY_MAX_NUMBER")?
            .unwrap_or(DEFAULT_MAX_NUMBER);
        at_least("LOTTERY_MAX_NUMBER", u64::from(max_number), 1)?;

        let delay_ms = option_env_u64("LOTTERY_DELAY_MS")?
            .unwrap_or(DEFAULT_DELAY_MS);
        let seed = option_env_u64("LOTTERY_SEED")?;

        Ok(Self {
            players,
            max_number,
            delay: Duration::from_millis(delay_ms),
            seed,
        })
    }
}

const fn at_least(name: &'static str, value: u64, min: u64) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::TooSmall { name, min, value });
    }
    Ok(())
}
