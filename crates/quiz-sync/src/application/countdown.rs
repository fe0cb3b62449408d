//! Pre-start countdown.
//!
//! Client-local and best effort: once enough participants are registered
//! the lobby counts down, then StateSync re-reads the started flag before
//! the quiz screen is shown.

use super::state_sync::StateSync;
use crate::domain::QuizPhase;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Session epoch and lobby round a countdown was armed for.
type RoundKey = (u64, u64);

/// One countdown per lobby round of a session.
pub struct Countdown {
    sync: Arc<StateSync>,
    duration: Duration,
    tick: Duration,
    task: Mutex<Option<(RoundKey, JoinHandle<()>)>>,
}

impl Countdown {
    /// Create a disarmed countdown.
    pub fn new(sync: Arc<StateSync>, duration: Duration, tick: Duration) -> Self {
        Self {
            sync,
            duration,
            tick,
            task: Mutex::new(None),
        }
    }

    /// Arm if the lobby is full and the quiz has not started.
    ///
    /// Returns `true` only when a new countdown was started; each lobby
    /// round of a session arms at most once.
    pub fn arm(&self) -> bool {
        let snapshot = self.sync.snapshot();
        if snapshot.participant_count() < self.sync.capacity()
            || snapshot.phase != QuizPhase::NotStarted
        {
            return false;
        }

        let key = (snapshot.epoch, snapshot.lobby_round);
        let mut task = self.task.lock();
        if let Some((armed, handle)) = task.as_ref() {
            if *armed == key {
                return false;
            }
            handle.abort();
        }

        info!(
            epoch = snapshot.epoch,
            round = snapshot.lobby_round,
            seconds = self.duration.as_secs(),
            "[quiz-sync] Lobby full, countdown armed"
        );
        let handle = tokio::spawn(run(
            Arc::clone(&self.sync),
            snapshot.epoch,
            self.duration,
            self.tick,
        ));
        *task = Some((key, handle));
        true
    }

    /// Is a countdown ticking right now?
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    /// Stop the countdown, if any.
    pub fn cancel(&self) {
        if let Some(((epoch, _), handle)) = self.task.lock().take() {
            handle.abort();
            self.sync.set_countdown(epoch, None);
            debug!(epoch, "[quiz-sync] Countdown cancelled");
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.task.lock().take() {
            handle.abort();
        }
    }
}

async fn run(sync: Arc<StateSync>, epoch: u64, duration: Duration, tick: Duration) {
    let mut remaining = duration;
    loop {
        sync.set_countdown(epoch, Some(remaining.as_secs()));
        if remaining.is_zero() {
            break;
        }
        let step = tick.min(remaining);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
    sync.set_countdown(epoch, None);

    if sync.epoch() != epoch {
        return;
    }
    let outcome = sync.confirm_phase().await;
    info!(epoch, outcome = outcome.as_str(), "[quiz-sync] Countdown elapsed, phase re-read");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryQuizContract;
    use crate::config::QuizClientConfig;
    use crate::domain::{Account, SyncField};
    use crate::ports::{ChainClient, ContractCall};

    const ORGANIZER: Account = Account::new([0x0A; 20]);

    async fn full_lobby() -> (InMemoryQuizContract, Arc<StateSync>) {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        for b in 1..=4 {
            let who = Account::new([b; 20]);
            contract.select_account(who);
            contract
                .submit(&ContractCall::AddParticipant(who), None)
                .await
                .unwrap();
        }
        let sync = Arc::new(StateSync::new(
            Arc::new(contract.clone()),
            &QuizClientConfig::for_testing(),
        ));
        sync.switch_account(Some(Account::new([1; 20])));
        sync.refresh(SyncField::Participants).await;
        sync.refresh(SyncField::QuizPhase).await;
        (contract, sync)
    }

    fn countdown(sync: &Arc<StateSync>) -> Countdown {
        Countdown::new(Arc::clone(sync), Duration::from_secs(5), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_confirms_phase_after_five_seconds() {
        let (_contract, sync) = full_lobby().await;
        assert!(sync.snapshot().awaiting_phase_confirmation());

        let countdown = countdown(&sync);
        assert!(countdown.arm());
        assert!(!countdown.arm());
        tokio::task::yield_now().await;
        assert_eq!(sync.snapshot().countdown, Some(5));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(sync.snapshot().countdown, Some(3));
        assert_eq!(sync.snapshot().phase, QuizPhase::NotStarted);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let snapshot = sync.snapshot();
        assert_eq!(snapshot.countdown, None);
        assert_eq!(snapshot.phase, QuizPhase::InProgress);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_armed_below_capacity() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        let sync = Arc::new(StateSync::new(
            Arc::new(contract),
            &QuizClientConfig::for_testing(),
        ));
        sync.refresh(SyncField::Participants).await;
        assert!(!countdown(&sync).arm());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_countdown() {
        let (_contract, sync) = full_lobby().await;
        let countdown = countdown(&sync);
        countdown.arm();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        countdown.cancel();
        assert!(!countdown.is_running());
        assert_eq!(sync.snapshot().countdown, None);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sync.snapshot().phase, QuizPhase::NotStarted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_rearms() {
        let (_contract, sync) = full_lobby().await;
        let countdown = countdown(&sync);
        assert!(countdown.arm());

        sync.switch_account(Some(Account::new([2; 20])));
        sync.refresh(SyncField::Participants).await;
        assert!(countdown.arm());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_lobby_rearms_in_same_session() {
        let (contract, sync) = full_lobby().await;
        let countdown = countdown(&sync);
        assert!(countdown.arm());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sync.snapshot().phase, QuizPhase::InProgress);

        contract.select_account(ORGANIZER);
        contract
            .submit(&ContractCall::ResetTournament, None)
            .await
            .unwrap();
        sync.refresh(SyncField::QuizPhase).await;
        let round = sync.snapshot().lobby_round;
        assert_eq!(sync.snapshot().phase, QuizPhase::NotStarted);
        assert!(round > 0);

        for b in 5..=8 {
            let who = Account::new([b; 20]);
            contract.select_account(who);
            contract
                .submit(&ContractCall::AddParticipant(who), None)
                .await
                .unwrap();
        }
        sync.refresh(SyncField::Participants).await;
        sync.refresh(SyncField::QuizPhase).await;
        assert_eq!(sync.snapshot().lobby_round, round);

        assert!(countdown.arm());
        assert!(!countdown.arm());
        tokio::task::yield_now().await;
        assert_eq!(sync.snapshot().countdown, Some(5));
    }
}
