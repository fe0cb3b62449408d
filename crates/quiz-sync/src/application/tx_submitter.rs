//! # Transaction Submitter
//!
//! Drives one state-changing call through
//! `Submitted -> Pending -> {Confirmed | Reverted | TimedOut}`, keeps the
//! status slot current and refreshes what the call changed.

use super::state_sync::StateSync;
use crate::algorithms::abi;
use crate::domain::{
    winners_from_events, Account, QuestionId, QuizError, StatusMessage, SyncField,
    TransactionRecord, TxOutcome, TxStatus, Wei,
};
use crate::ports::{ChainClient, ContractCall};
use quiz_telemetry::{log_tx_event, TX_SUBMISSIONS};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// A state-changing contract operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `addParticipant(account)`
    Register(Account),
    /// `submitAnswer(question, answer)`
    SubmitAnswer {
        /// Question.
        question: QuestionId,
        /// Answer text.
        answer: String,
    },
    /// `manualStartQuiz()`
    ManualStartQuiz,
    /// `declareQuizWinners()`
    DeclareWinners,
    /// `resetTournament()`
    ResetTournament,
    /// `distributePayouts()`
    DistributePayouts,
    /// `fundPrizePool()` with value
    FundPrizePool(Wei),
}

impl Operation {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::ManualStartQuiz => "manual_start_quiz",
            Self::DeclareWinners => "declare_winners",
            Self::ResetTournament => "reset_tournament",
            Self::DistributePayouts => "distribute_payouts",
            Self::FundPrizePool(_) => "fund_prize_pool",
        }
    }

    /// Contract call carrying this operation.
    pub fn call(&self) -> ContractCall {
        match self {
            Self::Register(account) => ContractCall::AddParticipant(*account),
            Self::SubmitAnswer { question, answer } => ContractCall::SubmitAnswer {
                question: *question,
                answer: answer.clone(),
            },
            Self::ManualStartQuiz => ContractCall::ManualStartQuiz,
            Self::DeclareWinners => ContractCall::DeclareQuizWinners,
            Self::ResetTournament => ContractCall::ResetTournament,
            Self::DistributePayouts => ContractCall::DistributePayouts,
            Self::FundPrizePool(_) => ContractCall::FundPrizePool,
        }
    }

    /// Value attached to the transaction.
    pub fn value(&self) -> Option<Wei> {
        match self {
            Self::FundPrizePool(amount) => Some(*amount),
            _ => None,
        }
    }

    /// Organizer-only?
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Self::ManualStartQuiz
                | Self::DeclareWinners
                | Self::ResetTournament
                | Self::DistributePayouts
        )
    }

    /// Fields whose cached value the operation invalidates.
    pub fn affected_fields(&self) -> &'static [SyncField] {
        match self {
            Self::Register(_) => &[SyncField::Participants, SyncField::Leaderboard],
            Self::SubmitAnswer { .. } => &[SyncField::UserScore, SyncField::Leaderboard],
            Self::ManualStartQuiz => &[SyncField::QuizPhase],
            Self::DeclareWinners => &[SyncField::PrizePool, SyncField::QuizPhase],
            Self::ResetTournament => &SyncField::ALL,
            Self::DistributePayouts => &[SyncField::PrizePool],
            Self::FundPrizePool(_) => &[SyncField::PrizePool],
        }
    }

    /// In-flight status text.
    pub fn pending_message(&self) -> String {
        match self {
            Self::Register(account) => format!("Registering {}...", account.short()),
            Self::SubmitAnswer { question, .. } => format!("Submitting answer for Q{question}..."),
            Self::ManualStartQuiz => "Starting quiz...".to_string(),
            Self::DeclareWinners => "Declaring winners...".to_string(),
            Self::ResetTournament => "Resetting tournament...".to_string(),
            Self::DistributePayouts => "Distributing payouts...".to_string(),
            Self::FundPrizePool(amount) => format!("Funding prize pool with {amount}..."),
        }
    }

    /// Status text after confirmation.
    pub fn success_message(&self) -> String {
        match self {
            Self::Register(_) => "Participant added!".to_string(),
            Self::SubmitAnswer { question, .. } => format!("Answer submitted for Q{question}"),
            Self::ManualStartQuiz => "Quiz started manually".to_string(),
            Self::DeclareWinners => "Winners declared!".to_string(),
            Self::ResetTournament => "Tournament reset!".to_string(),
            Self::DistributePayouts => "Payouts distributed!".to_string(),
            Self::FundPrizePool(amount) => format!("Prize pool funded with {amount}"),
        }
    }

    /// Status text after a failure.
    pub fn failure_message(&self, error: &QuizError) -> String {
        let what = match self {
            Self::Register(_) => "Registration failed".to_string(),
            Self::SubmitAnswer { question, .. } => format!("Error submitting answer for Q{question}"),
            Self::ManualStartQuiz => "Failed to start quiz".to_string(),
            Self::DeclareWinners => "Error declaring winners".to_string(),
            Self::ResetTournament => "Failed to reset".to_string(),
            Self::DistributePayouts => "Failed to distribute payouts".to_string(),
            Self::FundPrizePool(_) => "Failed to fund prize pool".to_string(),
        };
        format!("{what}: {error}")
    }
}

/// Submits operations and follows them to a terminal state.
pub struct TxSubmitter {
    client: Arc<dyn ChainClient>,
    sync: Arc<StateSync>,
    confirmation_timeout: Duration,
}

impl TxSubmitter {
    /// Create a submitter.
    pub fn new(
        client: Arc<dyn ChainClient>,
        sync: Arc<StateSync>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            client,
            sync,
            confirmation_timeout,
        }
    }

    /// Submit `operation` and wait for its receipt.
    ///
    /// Returns the decoded events on confirmation. A revert, a timeout or a
    /// failed confirmation wait is an error; the caller rolls back whatever
    /// it applied optimistically.
    pub async fn submit(&self, operation: &Operation) -> Result<TxOutcome, QuizError> {
        let epoch = self.sync.epoch();
        let label = operation.label();
        self.sync
            .publish_status(epoch, StatusMessage::info(operation.pending_message(), None));

        let handle = match self.client.submit(&operation.call(), operation.value()).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(operation = label, error = %e, "[quiz-sync] Submission failed");
                count_outcome(operation, e.kind());
                self.sync.publish_status(
                    epoch,
                    StatusMessage::error(operation.failure_message(&e), None),
                );
                return Err(e);
            }
        };

        let mut record = TransactionRecord::submitted(label, handle.hash());
        log_tx_event!(info, label, "Transaction submitted", record.hash, id = %record.id);
        record.transition_to(TxStatus::Pending)?;
        self.sync.publish_status(
            epoch,
            StatusMessage::info(operation.pending_message(), Some(record.hash)),
        );

        let receipt = match tokio::time::timeout(self.confirmation_timeout, handle.wait()).await {
            Ok(Ok(receipt)) => Some(receipt),
            Ok(Err(e)) => {
                warn!(operation = label, tx_hash = %record.hash, error = %e,
                    "[quiz-sync] Confirmation wait failed, outcome unknown");
                None
            }
            Err(_) => None,
        };

        let Some(receipt) = receipt else {
            record.transition_to(TxStatus::TimedOut)?;
            log_tx_event!(warn, label, "Transaction not confirmed in time", record.hash,
                waited = ?record.elapsed());
            let error = QuizError::TimedOut(record.hash);
            count_outcome(operation, record.status.as_str());
            self.sync.publish_status(
                epoch,
                StatusMessage::error(operation.failure_message(&error), Some(record.hash)),
            );
            return Err(error);
        };

        if !receipt.success {
            record.transition_to(TxStatus::Reverted)?;
            log_tx_event!(warn, label, "Transaction reverted", record.hash);
            let error = QuizError::Reverted(record.hash);
            count_outcome(operation, record.status.as_str());
            self.sync.publish_status(
                epoch,
                StatusMessage::error(operation.failure_message(&error), Some(record.hash)),
            );
            return Err(error);
        }

        record.transition_to(TxStatus::Confirmed)?;
        let events = abi::decode_receipt_events(&receipt, &self.client.contract_address());
        log_tx_event!(info, label, "Transaction confirmed", record.hash,
            events = events.len(), block = receipt.block_number.unwrap_or_default());

        if matches!(operation, Operation::ResetTournament) {
            self.sync.clear_winners(epoch);
        }
        self.sync
            .install_event_winners(epoch, winners_from_events(&events));
        count_outcome(operation, record.status.as_str());
        self.sync.publish_status(
            epoch,
            StatusMessage::success(operation.success_message(), Some(record.hash)),
        );

        if self.sync.epoch() == epoch {
            if matches!(operation, Operation::ManualStartQuiz) {
                // The organizer asked for it; no countdown to wait out.
                self.sync.confirm_phase().await;
            } else {
                self.sync.refresh_fields(operation.affected_fields()).await;
            }
        }

        Ok(TxOutcome {
            operation: label,
            hash: record.hash,
            status: record.status,
            events,
        })
    }
}

fn count_outcome(operation: &Operation, status: &str) {
    TX_SUBMISSIONS
        .with_label_values(&[operation.label(), status])
        .inc();
}
