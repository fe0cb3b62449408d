//! # Consistency Under Concurrency
//!
//! Coalesced reads, stale results after an account switch, failing reads
//! and scheduler shutdown.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use futures::future::join_all;
    use primitive_types::U256;
    use quiz_sync::{
        InMemoryQuizContract, QuizBattleApi, RefreshOutcome, StateSync, SyncField, Wei,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn state_sync(contract: &InMemoryQuizContract) -> Arc<StateSync> {
        Arc::new(StateSync::new(Arc::new(contract.clone()), &config()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_share_one_read() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        join(&contract, player(1)).await;
        contract.set_read_delay(Duration::from_millis(100));

        let sync = state_sync(&contract);
        sync.switch_account(Some(player(1)));

        let outcomes = join_all((0..8).map(|_| sync.refresh(SyncField::Participants))).await;
        let applied = outcomes
            .iter()
            .filter(|o| **o == RefreshOutcome::Applied)
            .count();
        assert_eq!(applied, 1);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, RefreshOutcome::Applied | RefreshOutcome::Coalesced)));
        assert_eq!(contract.max_concurrent_reads("getParticipants"), 1);
        assert_eq!(sync.snapshot().participant_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_discarded_after_account_switch() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        contract.set_score(player(1), 7);
        contract.set_read_delay(Duration::from_secs(1));

        let sync = state_sync(&contract);
        sync.switch_account(Some(player(1)));

        let pending = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.refresh(SyncField::UserScore).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        sync.switch_account(Some(player(2)));

        assert_eq!(pending.await.unwrap(), RefreshOutcome::Discarded);
        let snapshot = sync.snapshot();
        assert_eq!(snapshot.account, Some(player(2)));
        assert_eq!(snapshot.user_score, None);

        // The new session reads its own score without waiting on the old slot.
        assert_eq!(
            sync.refresh(SyncField::UserScore).await,
            RefreshOutcome::Applied
        );
        assert_eq!(sync.snapshot().user_score, Some(U256::zero()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_keeps_last_value() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        let sync = state_sync(&contract);
        sync.switch_account(Some(player(1)));
        assert_eq!(
            sync.refresh(SyncField::PrizePool).await,
            RefreshOutcome::Applied
        );
        assert_eq!(sync.snapshot().prize_pool, Some(Wei::zero()));

        contract.fail_next_reads(1);
        assert_eq!(
            sync.refresh(SyncField::PrizePool).await,
            RefreshOutcome::Failed
        );
        assert_eq!(sync.snapshot().prize_pool, Some(Wei::zero()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_continues_after_failures() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        let client = client_for(&contract);
        contract.select_account(player(1));
        client.connect().await.unwrap();

        contract.fail_next_reads(5);
        contract.set_score(player(1), 3);
        let snapshot = wait_until(&client, |s| s.user_score == Some(U256::from(3))).await;
        assert_eq!(snapshot.account, Some(player(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_polling() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        let client = client_for(&contract);
        contract.select_account(player(1));
        client.connect().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(contract.read_count("prizePool") > 1);

        client.disconnect().await;
        let reads = contract.read_count("prizePool");
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(contract.read_count("prizePool"), reads);
        assert_eq!(client.snapshot().account, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_account_never_shows_previous_data() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        contract.set_score(player(1), 9);
        let client = client_for(&contract);
        contract.select_account(player(1));
        client.connect().await.unwrap();
        assert_eq!(client.snapshot().user_score, Some(U256::from(9)));

        let mut updates = client.subscribe();
        let observer = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.account == Some(player(2)) {
                    assert_ne!(snapshot.user_score, Some(U256::from(9)));
                    if snapshot.user_score.is_some() {
                        return;
                    }
                }
            }
        });

        contract.set_read_delay(Duration::from_millis(300));
        contract.select_account(player(2));
        client.switch_account(player(2)).await.unwrap();
        observer.await.unwrap();
        assert_eq!(client.snapshot().user_score, Some(U256::zero()));
    }
}
