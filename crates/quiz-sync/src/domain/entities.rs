//! # Domain Entities
//!
//! Client-side mirrors of contract state plus the records the client owns
//! itself (transactions, status line, question catalogue).

use super::errors::QuizError;
use super::value_objects::{Account, QuestionId, TxHash, TxStatus, Wei};
use crate::algorithms::leaderboard;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default tournament capacity.
pub const DEFAULT_CAPACITY: usize = 4;

/// Registered participants, in contract order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSet {
    members: Vec<Account>,
    capacity: usize,
}

impl ParticipantSet {
    /// Build from a `getParticipants()` read.
    ///
    /// Duplicates keep their first position.
    pub fn from_reads(list: Vec<Account>, capacity: usize) -> Self {
        let mut members: Vec<Account> = Vec::with_capacity(list.len());
        for account in list {
            if !members.contains(&account) {
                members.push(account);
            }
        }
        Self { members, capacity }
    }

    /// Is this account registered?
    pub fn contains(&self, account: &Account) -> bool {
        self.members.contains(account)
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// No participants yet?
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// No free slot left?
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    /// Members in contract order.
    pub fn members(&self) -> &[Account] {
        &self.members
    }
}

/// One row of the ranked leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    /// Participant.
    pub account: Account,
    /// Authoritative score.
    pub score: U256,
}

/// Scores as read, in read order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    entries: Vec<(Account, U256)>,
}

impl ScoreBoard {
    /// Wrap scores in the order they were read.
    pub fn new(entries: Vec<(Account, U256)>) -> Self {
        Self { entries }
    }

    /// Score of one account, if it was read.
    pub fn score_of(&self, account: &Account) -> Option<U256> {
        self.entries
            .iter()
            .find(|(a, _)| a == account)
            .map(|(_, s)| *s)
    }

    /// Raw entries.
    pub fn entries(&self) -> &[(Account, U256)] {
        &self.entries
    }

    /// Sorted by score descending; equal scores keep read order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        leaderboard::rank(&self.entries)
    }
}

/// A declared winner and the reward assigned to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    /// Winning account.
    pub account: Account,
    /// Reward in base units.
    pub reward: Wei,
}

/// Where a winner list came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinnerSource {
    /// Parsed from `WinnerDeclared` logs of a receipt.
    Events,
    /// Read from `participantRewards(address)`.
    State,
}

/// Winners with provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerList {
    /// Winners in event or participant order.
    pub winners: Vec<Winner>,
    /// Provenance.
    pub source: WinnerSource,
}

impl WinnerList {
    /// Build from `(account, reward)` state reads, keeping rewards above zero.
    pub fn from_rewards(rewards: &[(Account, U256)]) -> Self {
        Self {
            winners: leaderboard::winners_from_rewards(rewards),
            source: WinnerSource::State,
        }
    }

    /// Build from receipt events.
    pub fn from_events(winners: Vec<Winner>) -> Self {
        Self {
            winners,
            source: WinnerSource::Events,
        }
    }

    /// Any winner known?
    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Number of winners.
    pub fn len(&self) -> usize {
        self.winners.len()
    }
}

/// A submitted transaction and where it is in its lifecycle.
#[derive(Clone, Debug)]
pub struct TransactionRecord {
    /// Correlation id for logs.
    pub id: Uuid,
    /// Logical operation label.
    pub operation: &'static str,
    /// Transaction hash.
    pub hash: TxHash,
    /// Current status.
    pub status: TxStatus,
    /// When the wallet returned the handle.
    pub submitted_at: Instant,
}

impl TransactionRecord {
    /// Record a freshly submitted transaction.
    pub fn submitted(operation: &'static str, hash: TxHash) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            hash,
            status: TxStatus::Submitted,
            submitted_at: Instant::now(),
        }
    }

    /// Transition to new status.
    pub fn transition_to(&mut self, next: TxStatus) -> Result<(), QuizError> {
        if !self.status.can_transition_to(next) {
            return Err(QuizError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Time since submission.
    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }
}

/// A quiz question with its answer choices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier passed to `submitAnswer`.
    pub id: QuestionId,
    /// Question text.
    pub prompt: String,
    /// Answer choices; the chosen text is submitted verbatim.
    pub choices: Vec<String>,
}

impl Question {
    /// Create a question.
    pub fn new(id: QuestionId, prompt: &str, choices: &[&str]) -> Self {
        Self {
            id,
            prompt: prompt.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// The built-in question catalogue.
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new(
            1,
            "What is the purpose of the TournamentPayout contract?",
            &["Hold NFTs", "Manage payouts", "Stake ETH"],
        ),
        Question::new(
            2,
            "What tool is used to deploy the contract?",
            &["Hardhat", "Remix", "Truffle"],
        ),
        Question::new(
            3,
            "What Chainlink service provides randomness?",
            &["VRF", "Functions", "Data Feeds"],
        ),
    ]
}

/// Severity of the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    /// Something is in flight.
    Info,
    /// Operation confirmed.
    Success,
    /// Operation failed.
    Error,
}

/// The single user-visible status slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Severity.
    pub level: StatusLevel,
    /// Human-readable text.
    pub text: String,
    /// Hash of the transaction this message is about, once known.
    pub tx_hash: Option<TxHash>,
}

impl StatusMessage {
    /// In-flight message.
    pub fn info(text: impl Into<String>, tx_hash: Option<TxHash>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
            tx_hash,
        }
    }

    /// Success message.
    pub fn success(text: impl Into<String>, tx_hash: Option<TxHash>) -> Self {
        Self {
            level: StatusLevel::Success,
            text: text.into(),
            tx_hash,
        }
    }

    /// Failure message.
    pub fn error(text: impl Into<String>, tx_hash: Option<TxHash>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
            tx_hash,
        }
    }
}
