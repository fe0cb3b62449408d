//! Client configuration.

use crate::domain::{Account, QuizError, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Contract address of the public deployment.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5Eadf9cD069729b3457C67110EE1fF5Bb3EF7fc5";

/// Organizer of the public deployment.
pub const DEFAULT_ORGANIZER_ADDRESS: &str = "0xca7490a6ea2d9ba9d8819a18ad37744c7d680f1e";

/// Which score getter the deployed contract exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreGetter {
    /// `scoresOf(address)`
    #[default]
    ScoresOf,
    /// `scores(address)` (public mapping getter)
    Scores,
}

impl FromStr for ScoreGetter {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "scoresOf" | "scores_of" => Ok(Self::ScoresOf),
            "scores" => Ok(Self::Scores),
            other => Err(QuizError::Config(format!("unknown score getter: {other}"))),
        }
    }
}

/// Quiz Battle client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizClientConfig {
    /// JSON-RPC endpoint of the wallet-backed node.
    pub rpc_url: String,
    /// Quiz contract.
    pub contract_address: Account,
    /// Account allowed to see organizer controls.
    pub organizer_address: Account,
    /// Participants needed before the quiz can start.
    pub capacity: usize,
    /// Participants, leaderboard, winners and user score cadence.
    pub participants_interval: Duration,
    /// Quiz phase cadence.
    pub phase_interval: Duration,
    /// Prize pool cadence.
    pub prize_pool_interval: Duration,
    /// Client-local countdown before confirming the phase.
    pub countdown: Duration,
    /// Countdown tick.
    pub countdown_tick: Duration,
    /// Upper bound on a confirmation wait.
    pub confirmation_timeout: Duration,
    /// Receipt polling interval of the RPC adapter.
    pub receipt_poll_interval: Duration,
    /// Score getter to call.
    pub score_getter: ScoreGetter,
}

impl Default for QuizClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS
                .parse()
                .unwrap_or_default(),
            organizer_address: DEFAULT_ORGANIZER_ADDRESS
                .parse()
                .unwrap_or_default(),
            capacity: DEFAULT_CAPACITY,
            participants_interval: Duration::from_secs(10),
            phase_interval: Duration::from_secs(5),
            prize_pool_interval: Duration::from_secs(7),
            countdown: Duration::from_secs(5),
            countdown_tick: Duration::from_secs(1),
            confirmation_timeout: Duration::from_secs(120),
            receipt_poll_interval: Duration::from_secs(2),
            score_getter: ScoreGetter::ScoresOf,
        }
    }
}

impl QuizClientConfig {
    /// Short cadences for tests.
    pub fn for_testing() -> Self {
        Self {
            participants_interval: Duration::from_millis(100),
            phase_interval: Duration::from_millis(50),
            prize_pool_interval: Duration::from_millis(70),
            confirmation_timeout: Duration::from_secs(5),
            receipt_poll_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QB_RPC_URL`: JSON-RPC endpoint (default: http://127.0.0.1:8545)
    /// - `QB_CONTRACT_ADDRESS`: quiz contract
    /// - `QB_ORGANIZER_ADDRESS`: organizer account
    /// - `QB_CAPACITY`: participant threshold (default: 4)
    /// - `QB_PARTICIPANTS_INTERVAL_SECS`: default 10
    /// - `QB_PHASE_INTERVAL_SECS`: default 5
    /// - `QB_PRIZE_POOL_INTERVAL_SECS`: default 7
    /// - `QB_CONFIRMATION_TIMEOUT_SECS`: default 120
    /// - `QB_SCORE_GETTER`: `scoresOf` or `scores`
    pub fn from_env() -> Result<Self, QuizError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, QuizError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("QB_RPC_URL") {
            config.rpc_url = url;
        }
        if let Some(address) = lookup("QB_CONTRACT_ADDRESS") {
            config.contract_address = address.parse()?;
        }
        if let Some(address) = lookup("QB_ORGANIZER_ADDRESS") {
            config.organizer_address = address.parse()?;
        }
        if let Some(capacity) = lookup("QB_CAPACITY") {
            config.capacity = parse_number("QB_CAPACITY", &capacity)? as usize;
        }
        if let Some(secs) = lookup("QB_PARTICIPANTS_INTERVAL_SECS") {
            config.participants_interval =
                Duration::from_secs(parse_number("QB_PARTICIPANTS_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = lookup("QB_PHASE_INTERVAL_SECS") {
            config.phase_interval =
                Duration::from_secs(parse_number("QB_PHASE_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = lookup("QB_PRIZE_POOL_INTERVAL_SECS") {
            config.prize_pool_interval =
                Duration::from_secs(parse_number("QB_PRIZE_POOL_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = lookup("QB_CONFIRMATION_TIMEOUT_SECS") {
            config.confirmation_timeout =
                Duration::from_secs(parse_number("QB_CONFIRMATION_TIMEOUT_SECS", &secs)?);
        }
        if let Some(getter) = lookup("QB_SCORE_GETTER") {
            config.score_getter = getter.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the client cannot run with.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.capacity == 0 {
            return Err(QuizError::Config("capacity must be at least 1".into()));
        }
        let intervals = [
            ("participants_interval", self.participants_interval),
            ("phase_interval", self.phase_interval),
            ("prize_pool_interval", self.prize_pool_interval),
            ("countdown_tick", self.countdown_tick),
            ("receipt_poll_interval", self.receipt_poll_interval),
            ("confirmation_timeout", self.confirmation_timeout),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(QuizError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.countdown_tick > self.countdown {
            return Err(QuizError::Config("countdown_tick exceeds countdown".into()));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, QuizError> {
    value
        .trim()
        .parse()
        .map_err(|_| QuizError::Config(format!("{key}: not a number: {value}")))
}
