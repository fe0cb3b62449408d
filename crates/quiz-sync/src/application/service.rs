//! # Quiz Battle Client
//!
//! Facade wiring StateSync, TxSubmitter, QuizSession, the countdown and the
//! scheduler into one session-scoped object. A session starts on connect,
//! is replaced on account switch and ends on disconnect; nothing survives
//! from one session to the next.

use super::countdown::Countdown;
use super::projection::{project, ScreenView};
use super::quiz_session::QuizSession;
use super::scheduler::SyncScheduler;
use super::state_sync::{StateSync, SyncSnapshot};
use super::tx_submitter::{Operation, TxSubmitter};
use crate::config::QuizClientConfig;
use crate::domain::{
    invariant_capacity, invariant_unique_participant, organizer_controls_visible, Account,
    LeaderboardEntry, QuestionId, QuizError, QuizPhase, StatusMessage, TxOutcome, Wei,
};
use crate::ports::{ChainClient, ContractReader, QuizBattleApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The client a front-end talks to.
pub struct QuizBattleClient {
    config: QuizClientConfig,
    client: Arc<dyn ChainClient>,
    sync: Arc<StateSync>,
    submitter: TxSubmitter,
    session: QuizSession,
    countdown: Arc<Countdown>,
    scheduler: Mutex<Option<SyncScheduler>>,
}

impl QuizBattleClient {
    /// Create a client; nothing runs until [`connect`](QuizBattleApi::connect).
    pub fn new(client: Arc<dyn ChainClient>, config: QuizClientConfig) -> Result<Self, QuizError> {
        config.validate()?;
        let sync = Arc::new(StateSync::new(Arc::clone(&client), &config));
        let submitter = TxSubmitter::new(
            Arc::clone(&client),
            Arc::clone(&sync),
            config.confirmation_timeout,
        );
        let countdown = Arc::new(Countdown::new(
            Arc::clone(&sync),
            config.countdown,
            config.countdown_tick,
        ));
        Ok(Self {
            config,
            client,
            sync,
            submitter,
            session: QuizSession::default(),
            countdown,
            scheduler: Mutex::new(None),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &QuizClientConfig {
        &self.config
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SyncSnapshot {
        self.sync.snapshot()
    }

    /// Follow snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.sync.subscribe()
    }

    /// Render the current state.
    pub fn view(&self) -> ScreenView {
        project(
            &self.sync.snapshot(),
            &self.session,
            &self.config.organizer_address,
            self.config.capacity,
        )
    }

    /// Answer tracking.
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// Connected account.
    pub fn account(&self) -> Option<Account> {
        self.sync.account()
    }

    /// Is the background polling running?
    pub fn is_syncing(&self) -> bool {
        self.scheduler.lock().is_some()
    }

    fn require_account(&self) -> Result<Account, QuizError> {
        self.sync.account().ok_or(QuizError::NotConnected)
    }

    fn report(&self, error: QuizError) -> QuizError {
        if error.is_recoverable() {
            debug!(kind = error.kind(), error = %error, "[quiz-sync] Action refused");
        } else {
            warn!(kind = error.kind(), error = %error, "[quiz-sync] Action failed");
        }
        self.sync
            .publish_status(self.sync.epoch(), StatusMessage::error(error.to_string(), None));
        error
    }

    fn stop_session(&self) {
        if let Some(mut scheduler) = self.scheduler.lock().take() {
            scheduler.stop();
        }
        self.countdown.cancel();
        self.session.reset();
    }

    async fn start_session(&self, account: Account) {
        self.stop_session();
        let epoch = self.sync.switch_account(Some(account));

        for (field, outcome) in self.sync.refresh_all().await {
            debug!(field = %field, outcome = outcome.as_str(), "[quiz-sync] Initial refresh");
        }

        let snapshot = self.sync.snapshot();
        if snapshot.epoch == epoch
            && snapshot.participants.is_some()
            && !snapshot.is_participant(&account)
            && snapshot.phase == QuizPhase::NotStarted
            && snapshot.quiz_started == Some(false)
        {
            if let Err(e) = self.register().await {
                warn!(account = %account, error = %e, "[quiz-sync] Auto-registration failed");
            }
        }

        if self.sync.epoch() == epoch {
            let scheduler = SyncScheduler::start(
                Arc::clone(&self.sync),
                Arc::clone(&self.countdown),
                &self.config,
            );
            *self.scheduler.lock() = Some(scheduler);
        }
    }

    async fn organizer_action(&self, operation: Operation) -> Result<TxOutcome, QuizError> {
        if !self.is_organizer() {
            return Err(self.report(QuizError::NotOrganizer));
        }
        self.submitter.submit(&operation).await
    }
}

#[async_trait]
impl QuizBattleApi for QuizBattleClient {
    async fn connect(&self) -> Result<Account, QuizError> {
        let accounts = self
            .client
            .request_accounts()
            .await
            .map_err(|e| self.report(e))?;
        let account = *accounts
            .first()
            .ok_or_else(|| self.report(QuizError::NoSigner))?;

        info!(account = %account, "[quiz-sync] Wallet connected");
        self.start_session(account).await;
        Ok(account)
    }

    async fn switch_account(&self, account: Account) -> Result<(), QuizError> {
        if self.sync.account() == Some(account) {
            return Ok(());
        }
        info!(account = %account, "[quiz-sync] Account switched");
        self.start_session(account).await;
        Ok(())
    }

    async fn disconnect(&self) {
        self.stop_session();
        self.sync.switch_account(None);
        info!("[quiz-sync] Disconnected");
    }

    async fn register(&self) -> Result<TxOutcome, QuizError> {
        let account = self.require_account()?;
        let snapshot = self.sync.snapshot();
        if let Some(participants) = &snapshot.participants {
            invariant_unique_participant(participants, &account).map_err(|e| self.report(e))?;
            invariant_capacity(participants).map_err(|e| self.report(e))?;
        }
        self.submitter.submit(&Operation::Register(account)).await
    }

    async fn submit_answer(
        &self,
        question: QuestionId,
        answer: &str,
    ) -> Result<TxOutcome, QuizError> {
        self.require_account()?;
        let ticket = self
            .session
            .record_submission(question)
            .map_err(|e| self.report(e))?;

        let operation = Operation::SubmitAnswer {
            question,
            answer: answer.to_string(),
        };
        match self.submitter.submit(&operation).await {
            Ok(outcome) => {
                if let Err(e) = self.session.commit(ticket) {
                    debug!(question, error = %e, "[quiz-sync] Answer no longer tracked");
                }
                Ok(outcome)
            }
            Err(e) => {
                self.session.rollback(ticket);
                Err(e)
            }
        }
    }

    async fn fetch_score(&self) -> Result<U256, QuizError> {
        let account = self.require_account()?;
        let epoch = self.sync.epoch();
        let score = self
            .client
            .score_of(account, self.config.score_getter)
            .await?;
        self.sync.record_user_score(epoch, score);
        Ok(score)
    }

    async fn start_quiz(&self) -> Result<TxOutcome, QuizError> {
        self.organizer_action(Operation::ManualStartQuiz).await
    }

    async fn declare_winners(&self) -> Result<TxOutcome, QuizError> {
        self.organizer_action(Operation::DeclareWinners).await
    }

    async fn reset_tournament(&self) -> Result<TxOutcome, QuizError> {
        let outcome = self.organizer_action(Operation::ResetTournament).await?;
        self.session.reset();
        Ok(outcome)
    }

    async fn distribute_payouts(&self) -> Result<TxOutcome, QuizError> {
        self.organizer_action(Operation::DistributePayouts).await
    }

    async fn fund_prize_pool(&self, amount: Wei) -> Result<TxOutcome, QuizError> {
        self.require_account()?;
        if amount.is_zero() {
            return Err(self.report(QuizError::InvalidAmount("amount must be positive".into())));
        }
        self.submitter.submit(&Operation::FundPrizePool(amount)).await
    }

    fn can_answer(&self, question: QuestionId) -> bool {
        self.session.can_answer(question)
    }

    fn is_organizer(&self) -> bool {
        organizer_controls_visible(self.sync.account().as_ref(), &self.config.organizer_address)
    }

    fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.sync.snapshot().leaderboard()
    }
}
