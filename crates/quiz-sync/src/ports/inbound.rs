//! # Inbound Ports
//!
//! Operations a front-end drives. Every write goes through the transaction
//! submitter and returns only once the transaction is terminal.

use crate::domain::{Account, LeaderboardEntry, QuestionId, QuizError, TxOutcome, Wei};
use async_trait::async_trait;
use primitive_types::U256;

/// Quiz Battle client API - inbound port.
#[async_trait]
pub trait QuizBattleApi: Send + Sync {
    /// Connect the wallet, start a session and begin synchronising.
    ///
    /// Registers the account when it is not a participant yet.
    async fn connect(&self) -> Result<Account, QuizError>;

    /// The wallet switched accounts: drop everything keyed to the old one.
    async fn switch_account(&self, account: Account) -> Result<(), QuizError>;

    /// Stop synchronising and clear the session.
    async fn disconnect(&self);

    /// `addParticipant(self)`, after a membership and capacity pre-check.
    async fn register(&self) -> Result<TxOutcome, QuizError>;

    /// `submitAnswer(question, answer)`; at most one per question.
    async fn submit_answer(
        &self,
        question: QuestionId,
        answer: &str,
    ) -> Result<TxOutcome, QuizError>;

    /// Authoritative score of the connected account.
    async fn fetch_score(&self) -> Result<U256, QuizError>;

    /// Organizer: `manualStartQuiz()`.
    async fn start_quiz(&self) -> Result<TxOutcome, QuizError>;

    /// Organizer: `declareQuizWinners()`.
    async fn declare_winners(&self) -> Result<TxOutcome, QuizError>;

    /// Organizer: `resetTournament()`.
    async fn reset_tournament(&self) -> Result<TxOutcome, QuizError>;

    /// Organizer: `distributePayouts()`.
    async fn distribute_payouts(&self) -> Result<TxOutcome, QuizError>;

    /// `fundPrizePool()` with `amount` attached.
    async fn fund_prize_pool(&self, amount: Wei) -> Result<TxOutcome, QuizError>;

    /// May this question still be answered?
    fn can_answer(&self, question: QuestionId) -> bool;

    /// Are organizer controls shown for the connected account?
    fn is_organizer(&self) -> bool;

    /// Current ranked leaderboard.
    fn leaderboard(&self) -> Vec<LeaderboardEntry>;
}
