//! # Quiz Battle Client Core
//!
//! Client-side core of a quiz tournament running on a smart contract:
//! participants register, answer questions on-chain, and an organizer
//! declares winners and distributes the prize pool.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Mirror contract state locally and keep it fresh with periodic reads
//! - Submit transactions and report their lifecycle on a single status line
//! - Track which questions were answered in the current session
//! - Project everything into a front-end neutral view
//!
//! ## Consistency Rules
//!
//! | Rule | Mechanism |
//! |------|-----------|
//! | No overlapping reads of one field | In-flight slot per field, newer session takes over |
//! | No stale data after an account switch | Session epoch checked before every write |
//! | Event winners beat state winners | Sequence check on the winners merge |
//! | Quiz shown as running only once confirmed | Confirming read after the countdown |
//!
//! ## Module Structure
//!
//! ```text
//! quiz-sync/
//! ├── domain/          # Account, Wei, ParticipantSet, TxStatus, errors
//! ├── algorithms/      # ABI codec, unit conversion, ranking
//! ├── ports/           # QuizBattleApi, ChainClient, ContractReader
//! ├── adapters/        # JSON-RPC wallet client, in-memory contract
//! ├── application/     # StateSync, TxSubmitter, QuizSession, scheduler
//! └── config.rs        # QuizClientConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{InMemoryQuizContract, JsonRpcChainClient, SIMULATED_CONTRACT};
pub use application::{
    project, Countdown, Operation, QuizBattleClient, QuizSession, RefreshOutcome, Screen,
    ScreenView, StateSync, SyncScheduler, SyncSnapshot, TxSubmitter,
};
pub use config::{QuizClientConfig, ScoreGetter};
pub use domain::{
    default_questions, organizer_controls_visible, Account, ContractEvent, LeaderboardEntry,
    ParticipantSet, Question, QuestionId, QuizError, QuizPhase, StatusLevel, StatusMessage,
    SyncField, TxHash, TxOutcome, TxStatus, Wei, Winner, WinnerList, WinnerSource,
};
pub use ports::{ChainClient, ContractCall, ContractReader, QuizBattleApi, TransactionHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
