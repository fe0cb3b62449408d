//! # Sync Scheduler
//!
//! One polling task per field. Ticks that fall behind are skipped rather
//! than bunched up, and a tick whose refresh is still running is coalesced
//! by StateSync. Stopping (or dropping) the scheduler ends every task.

use super::countdown::Countdown;
use super::state_sync::StateSync;
use crate::config::QuizClientConfig;
use crate::domain::SyncField;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Owns the polling tasks of one session.
pub struct SyncScheduler {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Spawn the pollers.
    pub fn start(
        sync: Arc<StateSync>,
        countdown: Arc<Countdown>,
        config: &QuizClientConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let mut scheduler = Self {
            shutdown_tx,
            tasks: Vec::with_capacity(6),
        };

        for field in [SyncField::Leaderboard, SyncField::Winners, SyncField::UserScore] {
            let sync = Arc::clone(&sync);
            scheduler.spawn(field, config.participants_interval, move || {
                let sync = Arc::clone(&sync);
                async move {
                    sync.refresh(field).await;
                }
            });
        }

        {
            let sync = Arc::clone(&sync);
            let countdown = Arc::clone(&countdown);
            scheduler.spawn(SyncField::Participants, config.participants_interval, move || {
                let sync = Arc::clone(&sync);
                let countdown = Arc::clone(&countdown);
                async move {
                    sync.refresh(SyncField::Participants).await;
                    countdown.arm();
                }
            });
        }

        {
            let sync = Arc::clone(&sync);
            let countdown = Arc::clone(&countdown);
            scheduler.spawn(SyncField::QuizPhase, config.phase_interval, move || {
                let sync = Arc::clone(&sync);
                let countdown = Arc::clone(&countdown);
                async move {
                    sync.refresh(SyncField::QuizPhase).await;
                    // Without a countdown to wait for, confirm right away.
                    let snapshot = sync.snapshot();
                    if snapshot.awaiting_phase_confirmation()
                        && snapshot.participants.is_some()
                        && !countdown.is_running()
                        && !countdown.arm()
                    {
                        sync.confirm_phase().await;
                    }
                }
            });
        }

        {
            let sync = Arc::clone(&sync);
            scheduler.spawn(SyncField::PrizePool, config.prize_pool_interval, move || {
                let sync = Arc::clone(&sync);
                async move {
                    sync.refresh(SyncField::PrizePool).await;
                }
            });
        }

        info!(tasks = scheduler.tasks.len(), "[quiz-sync] Sync scheduler started");
        scheduler
    }

    fn spawn<F, Fut>(&mut self, field: SyncField, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown_tx.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let poll = async {
                loop {
                    ticker.tick().await;
                    tick().await;
                }
            };
            tokio::select! {
                _ = poll => {}
                _ = shutdown.changed() => {
                    debug!(field = %field, "[quiz-sync] Poller stopped");
                }
            }
        }));
    }

    /// Number of live polling tasks.
    pub fn running_tasks(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    /// Stop every poller.
    pub fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("[quiz-sync] Sync scheduler stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
