//! Cross-component scenarios.

pub mod consistency;
pub mod flows;

#[cfg(test)]
pub(crate) mod fixtures {
    use quiz_sync::{
        Account, ChainClient, ContractCall, InMemoryQuizContract, QuizBattleClient,
        QuizClientConfig, QuizPhase, SyncSnapshot,
    };
    use std::sync::Arc;
    use std::time::Duration;

    pub const ORGANIZER: Account = Account::new([0x0A; 20]);

    pub fn player(byte: u8) -> Account {
        Account::new([byte; 20])
    }

    pub fn config() -> QuizClientConfig {
        QuizClientConfig {
            organizer_address: ORGANIZER,
            ..QuizClientConfig::for_testing()
        }
    }

    pub fn client_for(contract: &InMemoryQuizContract) -> QuizBattleClient {
        QuizBattleClient::new(Arc::new(contract.clone()), config()).unwrap()
    }

    /// Register `account` straight through the contract, bypassing any client.
    pub async fn join(contract: &InMemoryQuizContract, account: Account) {
        contract.select_account(account);
        let handle = contract
            .submit(&ContractCall::AddParticipant(account), None)
            .await
            .unwrap();
        assert!(handle.wait().await.unwrap().success);
    }

    /// Send a transaction as `account` straight through the contract.
    pub async fn send_as(contract: &InMemoryQuizContract, account: Account, call: ContractCall) {
        contract.select_account(account);
        let handle = contract.submit(&call, None).await.unwrap();
        assert!(handle.wait().await.unwrap().success);
    }

    pub async fn wait_until<F>(client: &QuizBattleClient, predicate: F) -> SyncSnapshot
    where
        F: FnMut(&SyncSnapshot) -> bool,
    {
        let mut updates = client.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(60), updates.wait_for(predicate))
            .await
            .expect("condition not reached in time")
            .expect("state channel closed")
            .clone();
        snapshot
    }

    pub async fn wait_for_phase(client: &QuizBattleClient, phase: QuizPhase) -> SyncSnapshot {
        wait_until(client, |snapshot| snapshot.phase == phase).await
    }
}
