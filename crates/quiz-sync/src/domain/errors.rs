//! # Domain Errors
//!
//! Error taxonomy for the Quiz Battle client. Nothing here is fatal to the
//! process: every variant leaves the client usable, most are retried on the
//! next poll or the next user action.

use super::value_objects::{Account, QuestionId, TxHash};
use thiserror::Error;

/// Client error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// No wallet / signing capability present at all.
    #[error("No wallet available: install or enable a wallet provider")]
    NoWalletAvailable,

    /// Wallet present but no account is connected.
    #[error("No signer: connect a wallet account first")]
    NoSigner,

    /// The user declined the signing prompt.
    #[error("Request rejected by user")]
    UserRejected,

    /// Transport or node failure.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// The transaction was mined but rejected by the contract.
    #[error("Transaction reverted: {0}")]
    Reverted(TxHash),

    /// No receipt arrived within the confirmation timeout.
    #[error("Transaction not confirmed in time: {0}")]
    TimedOut(TxHash),

    /// Two dependent reads disagreed mid-transition.
    #[error("Stale read: {0}")]
    StaleRead(String),

    /// The question already has a pending or confirmed submission.
    #[error("Question {0} already answered")]
    AlreadyAnswered(QuestionId),

    /// The account is already a registered participant.
    #[error("Already registered: {0}")]
    AlreadyRegistered(Account),

    /// The tournament has no free participant slot.
    #[error("Tournament full: {0} participants")]
    TournamentFull(usize),

    /// Organizer-only action requested by another account.
    #[error("Organizer-only action")]
    NotOrganizer,

    /// Operation needs a connected session.
    #[error("Not connected")]
    NotConnected,

    /// Illegal transaction state transition.
    #[error("Invalid transaction transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Attempted state
        to: String,
    },

    /// Malformed ABI data or RPC payload.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Not a 20-byte hex address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Not an exact decimal amount.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl QuizError {
    /// Whether the user can recover by retrying or re-prompting.
    ///
    /// A missing wallet needs the user to install one first.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NoWalletAvailable | Self::Config(_))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoWalletAvailable => "no_wallet",
            Self::NoSigner => "no_signer",
            Self::UserRejected => "user_rejected",
            Self::RpcError(_) => "rpc_error",
            Self::Reverted(_) => "reverted",
            Self::TimedOut(_) => "timed_out",
            Self::StaleRead(_) => "stale_read",
            Self::AlreadyAnswered(_) => "already_answered",
            Self::AlreadyRegistered(_) => "already_registered",
            Self::TournamentFull(_) => "tournament_full",
            Self::NotOrganizer => "not_organizer",
            Self::NotConnected => "not_connected",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Decode(_) => "decode",
            Self::InvalidAddress(_) => "invalid_address",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::Config(_) => "config",
        }
    }
}
