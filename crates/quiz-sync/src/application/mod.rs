//! # Application Module
//!
//! Session services: state synchronisation, transaction submission, answer
//! tracking, the lobby countdown, the polling scheduler and view projection.

pub mod countdown;
pub mod projection;
pub mod quiz_session;
pub mod scheduler;
pub mod service;
pub mod state_sync;
pub mod tx_submitter;

pub use countdown::Countdown;
pub use projection::{project, QuestionView, Screen, ScreenView, WinnerView};
pub use quiz_session::{AnswerState, QuizSession, SubmissionTicket};
pub use scheduler::SyncScheduler;
pub use service::QuizBattleClient;
pub use state_sync::{RefreshOutcome, StateSync, SyncSnapshot};
pub use tx_submitter::{Operation, TxSubmitter};
