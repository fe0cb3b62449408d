//! # Tournament Flows
//!
//! A full lobby, the countdown, answering, winner declaration and payouts,
//! seen through one client while other players act on the contract
//! directly.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use primitive_types::U256;
    use quiz_sync::{
        ContractCall, InMemoryQuizContract, QuizBattleApi, QuizError, QuizPhase, Screen,
        StatusLevel, Wei, WinnerSource,
    };

    async fn lobby_with_three(contract: &InMemoryQuizContract) {
        for byte in 1..=3 {
            join(contract, player(byte)).await;
        }
    }

    async fn answer_as(contract: &InMemoryQuizContract, byte: u8, answers: &[(u64, &str)]) {
        for (question, answer) in answers {
            send_as(
                contract,
                player(byte),
                ContractCall::SubmitAnswer {
                    question: *question,
                    answer: answer.to_string(),
                },
            )
            .await;
        }
    }

    // =========================================================================
    // LOBBY → QUIZ
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_full_lobby_counts_down_before_quiz() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        lobby_with_three(&contract).await;

        let client = client_for(&contract);
        let mut updates = client.subscribe();
        let observer = tokio::spawn(async move {
            let mut countdown_seen = false;
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.countdown.is_some() {
                    countdown_seen = true;
                    assert_ne!(snapshot.phase, QuizPhase::InProgress);
                }
                if snapshot.phase == QuizPhase::InProgress {
                    return countdown_seen;
                }
            }
            false
        });

        contract.select_account(player(4));
        client.connect().await.unwrap();
        assert_eq!(contract.registered().len(), 4);

        let snapshot = wait_for_phase(&client, QuizPhase::InProgress).await;
        assert_eq!(snapshot.countdown, None);
        assert!(observer.await.unwrap(), "countdown never shown");
        assert_eq!(client.view().screen, Screen::Quiz);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_lobby_waits() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        join(&contract, player(1)).await;

        let client = client_for(&contract);
        contract.select_account(player(2));
        client.connect().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        let view = client.view();
        assert_eq!(view.screen, Screen::Lobby { countdown: None });
        assert_eq!(view.participants, 2);
        assert!(view.registered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_organizer_manual_start() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        join(&contract, player(1)).await;

        let client = client_for(&contract);
        contract.select_account(ORGANIZER);
        client.connect().await.unwrap();
        assert!(client.is_organizer());

        client.start_quiz().await.unwrap();
        wait_for_phase(&client, QuizPhase::InProgress).await;
    }

    // =========================================================================
    // ANSWERING
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_answers_update_score_and_leaderboard() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        lobby_with_three(&contract).await;
        let client = client_for(&contract);
        contract.select_account(player(4));
        client.connect().await.unwrap();
        wait_for_phase(&client, QuizPhase::InProgress).await;

        answer_as(&contract, 1, &[(1, "Manage payouts"), (2, "Remix")]).await;

        contract.select_account(player(4));
        client.submit_answer(1, "Manage payouts").await.unwrap();
        client.submit_answer(2, "Hardhat").await.unwrap();

        assert!(!client.can_answer(1));
        assert!(!client.can_answer(2));
        assert!(client.can_answer(3));
        assert_eq!(client.snapshot().user_score, Some(U256::one()));

        let leaderboard = client.leaderboard();
        assert_eq!(leaderboard.len(), 4);
        assert_eq!(leaderboard[0].account, player(1));
        assert_eq!(leaderboard[0].score, U256::from(2));
        assert_eq!(leaderboard[1].account, player(4));
        assert_eq!(leaderboard[1].rank, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_signature_keeps_question_open() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        lobby_with_three(&contract).await;
        let client = client_for(&contract);
        contract.select_account(player(4));
        client.connect().await.unwrap();
        wait_for_phase(&client, QuizPhase::InProgress).await;

        contract.reject_next_signature();
        assert_eq!(
            client.submit_answer(3, "VRF").await,
            Err(QuizError::UserRejected)
        );
        assert!(client.can_answer(3));
        assert_eq!(
            client.snapshot().status.map(|s| s.level),
            Some(StatusLevel::Error)
        );

        client.submit_answer(3, "VRF").await.unwrap();
        assert!(!client.can_answer(3));
        assert_eq!(
            client.snapshot().status.map(|s| s.level),
            Some(StatusLevel::Success)
        );
    }

    // =========================================================================
    // RESULTS AND PAYOUTS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_declare_winners_and_pay_out() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        lobby_with_three(&contract).await;
        join(&contract, player(4)).await;
        let all_correct = [(1, "Manage payouts"), (2, "Remix"), (3, "VRF")];
        answer_as(&contract, 1, &all_correct).await;
        answer_as(&contract, 2, &all_correct).await;
        answer_as(&contract, 3, &[(3, "VRF")]).await;

        let client = client_for(&contract);
        contract.select_account(ORGANIZER);
        client.connect().await.unwrap();
        assert!(client.view().organizer_controls);

        client
            .fund_prize_pool(Wei::parse_ether("3").unwrap())
            .await
            .unwrap();
        let outcome = client.declare_winners().await.unwrap();

        let winners = outcome.winners();
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[0].account, player(1));
        assert_eq!(winners[1].reward.format_ether(), "1.5");

        let snapshot = client.snapshot();
        assert_eq!(snapshot.phase, QuizPhase::Ended);
        assert_eq!(
            snapshot.winners.as_ref().map(|w| w.source),
            Some(WinnerSource::Events)
        );
        let view = client.view();
        assert_eq!(view.screen, Screen::Results);
        assert_eq!(view.winners[0].reward, "1.5 ETH");

        client.distribute_payouts().await.unwrap();
        let expected = Wei::parse_ether("1.5").unwrap().0;
        assert_eq!(contract.balance_of(&player(1)), expected);
        assert_eq!(contract.balance_of(&player(2)), expected);
        assert!(contract.balance_of(&player(3)).is_zero());

        // Later state reads agree with the events and keep the results screen.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(client.view().screen, Screen::Results);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_lobby() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        lobby_with_three(&contract).await;
        join(&contract, player(4)).await;
        answer_as(&contract, 1, &[(1, "Manage payouts")]).await;

        let client = client_for(&contract);
        contract.select_account(ORGANIZER);
        client.connect().await.unwrap();
        client
            .fund_prize_pool(Wei::parse_ether("1").unwrap())
            .await
            .unwrap();
        client.declare_winners().await.unwrap();
        assert_eq!(client.snapshot().phase, QuizPhase::Ended);

        client.reset_tournament().await.unwrap();
        let snapshot = wait_for_phase(&client, QuizPhase::NotStarted).await;
        assert!(snapshot.winners.as_ref().map_or(true, |w| w.is_empty()));
        assert_eq!(snapshot.participant_count(), 0);
        assert_eq!(client.view().screen, Screen::Lobby { countdown: None });
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_organizer_cannot_act() {
        let contract = InMemoryQuizContract::new(ORGANIZER);
        let client = client_for(&contract);
        contract.select_account(player(1));
        client.connect().await.unwrap();

        assert!(!client.view().organizer_controls);
        assert_eq!(client.start_quiz().await, Err(QuizError::NotOrganizer));
        assert_eq!(client.declare_winners().await, Err(QuizError::NotOrganizer));
        assert_eq!(client.reset_tournament().await, Err(QuizError::NotOrganizer));
        assert_eq!(
            client.distribute_payouts().await,
            Err(QuizError::NotOrganizer)
        );
        assert_eq!(client.snapshot().quiz_started, Some(false));
    }
}
