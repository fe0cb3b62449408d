//! # State Synchronisation
//!
//! Local, eventually-consistent mirror of the contract state.
//!
//! The snapshot lives in a `watch` channel: StateSync is its only writer,
//! everything else reads a clone or subscribes. Each field has one in-flight
//! slot; a refresh requested while the slot is taken is coalesced, never
//! queued. Every write is stamped with the session epoch, so results that
//! belong to a previous account are dropped instead of applied.

use crate::config::{QuizClientConfig, ScoreGetter};
use crate::domain::{
    Account, LeaderboardEntry, ParticipantSet, QuizError, QuizPhase, ScoreBoard, StatusMessage,
    SyncField, Wei, Winner, WinnerList,
};
use crate::ports::{ChainClient, ContractReader};
use futures::future::try_join_all;
use parking_lot::Mutex;
use primitive_types::U256;
use quiz_telemetry::{REFRESH_DURATION, SYNC_REFRESHES};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Everything the client knows about the contract, for one session.
///
/// `None` means "not read yet"; a failed read never resets a field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    /// Session generation; bumped on every account switch.
    pub epoch: u64,
    /// Connected account.
    pub account: Option<Account>,
    /// Registered participants.
    pub participants: Option<ParticipantSet>,
    /// Scores of all participants.
    pub scoreboard: Option<ScoreBoard>,
    /// Score of the connected account.
    pub user_score: Option<U256>,
    /// Last raw `quizStarted()` read.
    pub quiz_started: Option<bool>,
    /// Phase shown to the user.
    pub phase: QuizPhase,
    /// Prize pool.
    pub prize_pool: Option<Wei>,
    /// Declared winners.
    pub winners: Option<WinnerList>,
    /// Bumped whenever winners are installed from events or cleared.
    pub winners_seq: u64,
    /// Bumped each time the phase falls back to `NotStarted` (a reset), so
    /// every new lobby gets its own countdown.
    pub lobby_round: u64,
    /// Seconds left on the pre-start countdown.
    pub countdown: Option<u64>,
    /// The single status slot.
    pub status: Option<StatusMessage>,
}

impl SyncSnapshot {
    /// Number of registered participants, zero while unknown.
    pub fn participant_count(&self) -> usize {
        self.participants.as_ref().map_or(0, ParticipantSet::len)
    }

    /// Is `account` registered?
    pub fn is_participant(&self, account: &Account) -> bool {
        self.participants
            .as_ref()
            .is_some_and(|set| set.contains(account))
    }

    /// Ranked leaderboard, empty while unknown.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.scoreboard
            .as_ref()
            .map(ScoreBoard::leaderboard)
            .unwrap_or_default()
    }

    /// The contract says started but no confirming read has landed yet.
    pub fn awaiting_phase_confirmation(&self) -> bool {
        self.quiz_started == Some(true) && self.phase == QuizPhase::NotStarted
    }

    fn has_winners(&self) -> bool {
        self.winners.as_ref().is_some_and(|list| !list.is_empty())
    }

    fn set_phase(&mut self, phase: QuizPhase) {
        if phase == QuizPhase::NotStarted && self.phase != QuizPhase::NotStarted {
            self.lobby_round += 1;
        }
        self.phase = phase;
    }

    fn recompute_phase(&mut self) {
        if self.has_winners() {
            self.set_phase(QuizPhase::Ended);
        } else if self.phase == QuizPhase::Ended {
            self.set_phase(if self.quiz_started == Some(true) {
                QuizPhase::InProgress
            } else {
                QuizPhase::NotStarted
            });
        }
    }

    fn apply_started(&mut self, started: bool, confirming: bool) {
        self.quiz_started = Some(started);
        if self.has_winners() {
            self.set_phase(QuizPhase::Ended);
        } else if !started {
            self.set_phase(QuizPhase::NotStarted);
        } else if confirming {
            self.set_phase(QuizPhase::InProgress);
        }
    }
}

/// Result of one refresh request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Read completed and was applied.
    Applied,
    /// Another refresh of the same field was in flight.
    Coalesced,
    /// Read failed; the cached value stays.
    Failed,
    /// Read completed for a session or winner list that is no longer current.
    Discarded,
}

impl RefreshOutcome {
    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Coalesced => "coalesced",
            Self::Failed => "failed",
            Self::Discarded => "discarded",
        }
    }
}

enum FieldValue {
    Participants(ParticipantSet),
    Scores(ScoreBoard),
    UserScore(U256),
    Started(bool),
    PrizePool(Wei),
    Winners(WinnerList),
}

async fn session_ended(mut sessions: watch::Receiver<SyncSnapshot>, epoch: u64) {
    let _ = sessions.wait_for(|snapshot| snapshot.epoch != epoch).await;
}

/// Releases a field's in-flight slot, unless a newer epoch took it over.
struct SlotGuard<'a> {
    slots: &'a Mutex<HashMap<SyncField, u64>>,
    field: SyncField,
    epoch: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if slots.get(&self.field) == Some(&self.epoch) {
            slots.remove(&self.field);
        }
    }
}

/// Keeps the local snapshot in step with the contract.
pub struct StateSync {
    client: Arc<dyn ChainClient>,
    capacity: usize,
    score_getter: ScoreGetter,
    state: watch::Sender<SyncSnapshot>,
    in_flight: Mutex<HashMap<SyncField, u64>>,
}

impl StateSync {
    /// Create a sync engine over `client`.
    pub fn new(client: Arc<dyn ChainClient>, config: &QuizClientConfig) -> Self {
        let (state, _) = watch::channel(SyncSnapshot::default());
        Self {
            client,
            capacity: config.capacity,
            score_getter: config.score_getter,
            state,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.state.subscribe()
    }

    /// Current session epoch.
    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    /// Connected account.
    pub fn account(&self) -> Option<Account> {
        self.state.borrow().account
    }

    /// Participant threshold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Start a new session for `account` (or none).
    ///
    /// Every cached field is cleared and in-flight reads of the previous
    /// epoch are cancelled; their results will be discarded.
    pub fn switch_account(&self, account: Option<Account>) -> u64 {
        let mut epoch = 0;
        self.state.send_modify(|snapshot| {
            epoch = snapshot.epoch + 1;
            *snapshot = SyncSnapshot {
                epoch,
                account,
                ..Default::default()
            };
        });
        info!(epoch, account = ?account, "[quiz-sync] New session");
        epoch
    }

    /// Refresh one field from the contract.
    pub async fn refresh(&self, field: SyncField) -> RefreshOutcome {
        self.refresh_inner(field, false).await
    }

    /// Re-read the started flag and commit `InProgress` if it still holds.
    pub async fn confirm_phase(&self) -> RefreshOutcome {
        self.refresh_inner(SyncField::QuizPhase, true).await
    }

    /// Refresh every field concurrently.
    pub async fn refresh_all(&self) -> Vec<(SyncField, RefreshOutcome)> {
        let outcomes =
            futures::future::join_all(SyncField::ALL.iter().map(|field| self.refresh(*field)))
                .await;
        SyncField::ALL.iter().copied().zip(outcomes).collect()
    }

    /// Refresh a set of fields concurrently.
    pub async fn refresh_fields(&self, fields: &[SyncField]) {
        futures::future::join_all(fields.iter().map(|field| self.refresh(*field))).await;
    }

    fn try_acquire(&self, field: SyncField, epoch: u64) -> Option<SlotGuard<'_>> {
        let mut slots = self.in_flight.lock();
        if slots.get(&field).is_some_and(|held| *held >= epoch) {
            return None;
        }
        slots.insert(field, epoch);
        Some(SlotGuard {
            slots: &self.in_flight,
            field,
            epoch,
        })
    }

    async fn refresh_inner(&self, field: SyncField, confirming: bool) -> RefreshOutcome {
        let (epoch, account, winners_seq) = {
            let snapshot = self.state.borrow();
            (snapshot.epoch, snapshot.account, snapshot.winners_seq)
        };

        let Some(_slot) = self.try_acquire(field, epoch) else {
            debug!(field = %field, "[quiz-sync] Refresh coalesced");
            return self.record(field, RefreshOutcome::Coalesced);
        };

        let timer = REFRESH_DURATION
            .with_label_values(&[field.as_str()])
            .start_timer();
        let read = tokio::select! {
            result = self.read_field(field, account) => Some(result),
            _ = session_ended(self.state.subscribe(), epoch) => None,
        };
        timer.observe_duration();

        let outcome = match read {
            None => {
                debug!(field = %field, epoch, "[quiz-sync] Refresh cancelled by session change");
                RefreshOutcome::Discarded
            }
            Some(Err(e)) => {
                warn!(field = %field, error = %e, "[quiz-sync] Refresh failed, keeping cached value");
                RefreshOutcome::Failed
            }
            Some(Ok(None)) => RefreshOutcome::Discarded,
            Some(Ok(Some(value))) => self.apply(epoch, winners_seq, value, confirming),
        };
        if outcome == RefreshOutcome::Discarded {
            debug!(field = %field, epoch, "[quiz-sync] Stale result discarded");
        }
        self.record(field, outcome)
    }

    fn record(&self, field: SyncField, outcome: RefreshOutcome) -> RefreshOutcome {
        SYNC_REFRESHES
            .with_label_values(&[field.as_str(), outcome.as_str()])
            .inc();
        outcome
    }

    async fn member_list(&self) -> Result<Vec<Account>, QuizError> {
        let list = self.client.participants().await?;
        Ok(ParticipantSet::from_reads(list, self.capacity)
            .members()
            .to_vec())
    }

    /// `Ok(None)` when the field has nothing to read (no account connected).
    async fn read_field(
        &self,
        field: SyncField,
        account: Option<Account>,
    ) -> Result<Option<FieldValue>, QuizError> {
        let client = &self.client;
        let value = match field {
            SyncField::Participants => FieldValue::Participants(ParticipantSet::from_reads(
                client.participants().await?,
                self.capacity,
            )),
            SyncField::Leaderboard => {
                let members = self.member_list().await?;
                let scores = try_join_all(
                    members
                        .iter()
                        .map(|member| client.score_of(*member, self.score_getter)),
                )
                .await?;
                FieldValue::Scores(ScoreBoard::new(members.into_iter().zip(scores).collect()))
            }
            SyncField::UserScore => match account {
                Some(account) => {
                    FieldValue::UserScore(client.score_of(account, self.score_getter).await?)
                }
                None => return Ok(None),
            },
            SyncField::QuizPhase => FieldValue::Started(client.quiz_started().await?),
            SyncField::PrizePool => FieldValue::PrizePool(client.prize_pool().await?),
            SyncField::Winners => {
                let members = self.member_list().await?;
                let rewards =
                    try_join_all(members.iter().map(|member| client.reward_of(*member))).await?;
                let pairs: Vec<(Account, U256)> = members.into_iter().zip(rewards).collect();
                FieldValue::Winners(WinnerList::from_rewards(&pairs))
            }
        };
        Ok(Some(value))
    }

    fn apply(
        &self,
        epoch: u64,
        winners_seq: u64,
        value: FieldValue,
        confirming: bool,
    ) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::Discarded;
        self.state.send_if_modified(|snapshot| {
            if snapshot.epoch != epoch {
                return false;
            }
            match value {
                FieldValue::Participants(set) => snapshot.participants = Some(set),
                FieldValue::Scores(board) => snapshot.scoreboard = Some(board),
                FieldValue::UserScore(score) => snapshot.user_score = Some(score),
                FieldValue::Started(started) => {
                    if confirming && !started && snapshot.quiz_started == Some(true) {
                        let stale = QuizError::StaleRead("quizStarted flipped back".into());
                        warn!(error = %stale, "[quiz-sync] Phase change not confirmed");
                    }
                    snapshot.apply_started(started, confirming)
                }
                FieldValue::PrizePool(pool) => snapshot.prize_pool = Some(pool),
                FieldValue::Winners(list) => {
                    // Event winners installed after this read began win.
                    if snapshot.winners_seq != winners_seq {
                        return false;
                    }
                    snapshot.winners = Some(list);
                    snapshot.recompute_phase();
                }
            }
            outcome = RefreshOutcome::Applied;
            true
        });
        outcome
    }

    /// Install winners parsed from a confirmed receipt.
    pub fn install_event_winners(&self, epoch: u64, winners: Vec<Winner>) -> bool {
        if winners.is_empty() {
            return false;
        }
        self.state.send_if_modified(|snapshot| {
            if snapshot.epoch != epoch {
                return false;
            }
            snapshot.winners = Some(WinnerList::from_events(winners));
            snapshot.winners_seq += 1;
            snapshot.recompute_phase();
            true
        })
    }

    /// Forget winners, e.g. after a tournament reset.
    pub fn clear_winners(&self, epoch: u64) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.epoch != epoch {
                return false;
            }
            snapshot.winners = None;
            snapshot.winners_seq += 1;
            snapshot.recompute_phase();
            true
        })
    }

    /// Update the countdown display.
    pub fn set_countdown(&self, epoch: u64, seconds: Option<u64>) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.epoch != epoch || snapshot.countdown == seconds {
                return false;
            }
            snapshot.countdown = seconds;
            true
        })
    }

    /// Replace the status slot.
    pub fn publish_status(&self, epoch: u64, status: StatusMessage) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.epoch != epoch {
                return false;
            }
            snapshot.status = Some(status);
            true
        })
    }

    /// Store an on-demand score read started under `epoch`.
    pub fn record_user_score(&self, epoch: u64, score: U256) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.epoch != epoch {
                return false;
            }
            snapshot.user_score = Some(score);
            true
        })
    }
}
