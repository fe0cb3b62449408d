//! # Domain Value Objects
//!
//! Immutable value types: identities, amounts and the small state machines
//! the client tracks.

use super::errors::QuizError;
use crate::algorithms::units;
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Question identifier as used by `submitAnswer(uint questionId, ...)`.
pub type QuestionId = u64;

/// Decimals of the chain's native currency.
pub const ETHER_DECIMALS: u32 = 18;

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// 20-byte account address.
///
/// Equality is on the bytes, so two textual forms differing only in letter
/// case are the same account.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Account([u8; 20]);

impl Account {
    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Presentation form: first 6 and last 4 characters.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Account {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s.trim());
        if digits.len() != 40 {
            return Err(QuizError::InvalidAddress(s.to_string()));
        }
        let bytes = hex::decode(digits).map_err(|_| QuizError::InvalidAddress(s.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", self)
    }
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Wrap raw hash bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Presentation form: first 10 characters.
    pub fn short(&self) -> String {
        format!("{}...", &self.to_string()[..10])
    }
}

impl FromStr for TxHash {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s.trim());
        if digits.len() != 64 {
            return Err(QuizError::Decode(format!("bad transaction hash: {s}")));
        }
        let bytes =
            hex::decode(digits).map_err(|_| QuizError::Decode(format!("bad transaction hash: {s}")))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Amount in the base unit of the native currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Wei(pub U256);

impl Wei {
    /// Zero.
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Is this amount zero?
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Exact decimal rendering in whole currency units, e.g. `1.5`.
    pub fn format_ether(&self) -> String {
        units::format_units(self.0, ETHER_DECIMALS)
    }

    /// Parse a decimal amount in whole currency units without rounding.
    pub fn parse_ether(s: &str) -> Result<Self, QuizError> {
        units::parse_units(s, ETHER_DECIMALS).map(Self)
    }
}

impl From<U256> for Wei {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for Wei {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Wei {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.format_ether())
    }
}

/// Tournament phase as shown to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuizPhase {
    /// Registration open, quiz not running.
    #[default]
    NotStarted,
    /// Questions may be answered.
    InProgress,
    /// Winners are known.
    Ended,
}

/// Transaction lifecycle.
///
/// `Submitted -> Pending -> {Confirmed | Reverted | TimedOut}`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    /// Handle returned by the wallet.
    #[default]
    Submitted,
    /// Waiting for a receipt.
    Pending,
    /// Mined and successful.
    Confirmed,
    /// Mined and rejected by the contract.
    Reverted,
    /// No receipt within the confirmation timeout.
    TimedOut,
}

impl TxStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Pending)
                | (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Reverted)
                | (Self::Pending, Self::TimedOut)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Reverted | Self::TimedOut)
    }

    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Reverted => "reverted",
            Self::TimedOut => "timed_out",
        }
    }
}

/// A locally mirrored piece of contract state, refreshed independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SyncField {
    /// `getParticipants()`
    Participants,
    /// Scores of every participant.
    Leaderboard,
    /// Score of the connected account.
    UserScore,
    /// `quizStarted()`
    QuizPhase,
    /// `prizePool()`
    PrizePool,
    /// Participants with a reward above zero.
    Winners,
}

impl SyncField {
    /// Every field, in refresh order.
    pub const ALL: [SyncField; 6] = [
        SyncField::Participants,
        SyncField::Leaderboard,
        SyncField::UserScore,
        SyncField::QuizPhase,
        SyncField::PrizePool,
        SyncField::Winners,
    ];

    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participants => "participants",
            Self::Leaderboard => "leaderboard",
            Self::UserScore => "user_score",
            Self::QuizPhase => "quiz_phase",
            Self::PrizePool => "prize_pool",
            Self::Winners => "winners",
        }
    }
}

impl fmt::Display for SyncField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
