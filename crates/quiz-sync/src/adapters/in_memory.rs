//! In-memory quiz contract and wallet.
//!
//! Simulates the contract behind [`ChainClient`]: views are ABI-encoded and
//! then decoded through the same path as the JSON-RPC adapter, writes
//! produce receipts with encoded logs. Hooks let tests inject failures,
//! latency and held confirmations, and observe read concurrency.

use crate::algorithms::abi::{self, Token};
use crate::domain::{Account, LogEntry, QuestionId, QuizError, TxHash, TxReceipt, Wei, DEFAULT_CAPACITY};
use crate::ports::{ChainClient, ContractCall, ContractValue, TransactionHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Address the simulator deploys at.
pub const SIMULATED_CONTRACT: Account = Account::new([0xC0; 20]);

/// Correct answers of the built-in catalogue.
pub fn answer_key() -> HashMap<QuestionId, &'static str> {
    HashMap::from([(1, "Manage payouts"), (2, "Remix"), (3, "VRF")])
}

#[derive(Debug, Default)]
struct ContractState {
    participants: Vec<Account>,
    scores: HashMap<Account, U256>,
    answered: HashSet<(Account, QuestionId)>,
    rewards: HashMap<Account, U256>,
    balances: HashMap<Account, U256>,
    prize_pool: U256,
    started: bool,
    declared: bool,
    paid_out: bool,
}

#[derive(Debug, Default)]
struct Wallet {
    available: bool,
    accounts: Vec<Account>,
    selected: Option<Account>,
}

#[derive(Debug, Default)]
struct Hooks {
    reject_next_signature: bool,
    failing_reads: u32,
    read_delay: Duration,
}

#[derive(Debug, Default)]
struct ReadStats {
    in_flight: HashMap<&'static str, usize>,
    high_water: HashMap<&'static str, usize>,
    total: HashMap<&'static str, usize>,
}

struct Inner {
    address: Account,
    organizer: Account,
    capacity: usize,
    answers: HashMap<QuestionId, &'static str>,
    state: Mutex<ContractState>,
    wallet: Mutex<Wallet>,
    hooks: Mutex<Hooks>,
    reads: Mutex<ReadStats>,
    held: watch::Sender<bool>,
    nonce: AtomicU64,
}

/// Simulated quiz contract plus wallet.
#[derive(Clone)]
pub struct InMemoryQuizContract {
    inner: Arc<Inner>,
}

/// Decrements the in-flight count of a method on drop.
struct ReadTracker {
    inner: Arc<Inner>,
    method: &'static str,
}

impl ReadTracker {
    fn start(inner: &Arc<Inner>, method: &'static str) -> Self {
        let mut stats = inner.reads.lock();
        let now = {
            let count = stats.in_flight.entry(method).or_insert(0);
            *count += 1;
            *count
        };
        let high = stats.high_water.entry(method).or_insert(0);
        *high = (*high).max(now);
        *stats.total.entry(method).or_insert(0) += 1;
        Self {
            inner: Arc::clone(inner),
            method,
        }
    }
}

impl Drop for ReadTracker {
    fn drop(&mut self) {
        let mut stats = self.inner.reads.lock();
        if let Some(count) = stats.in_flight.get_mut(self.method) {
            *count = count.saturating_sub(1);
        }
    }
}

impl InMemoryQuizContract {
    /// Deploy with `organizer` and the default capacity.
    pub fn new(organizer: Account) -> Self {
        Self::with_capacity(organizer, DEFAULT_CAPACITY)
    }

    /// Deploy with an explicit capacity.
    pub fn with_capacity(organizer: Account, capacity: usize) -> Self {
        let (held, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                address: SIMULATED_CONTRACT,
                organizer,
                capacity,
                answers: answer_key(),
                state: Mutex::new(ContractState::default()),
                wallet: Mutex::new(Wallet {
                    available: true,
                    ..Default::default()
                }),
                hooks: Mutex::new(Hooks::default()),
                reads: Mutex::new(ReadStats::default()),
                held,
                nonce: AtomicU64::new(0),
            }),
        }
    }

    // ---- wallet hooks ----

    /// Simulate a missing wallet extension.
    pub fn set_wallet_available(&self, available: bool) {
        self.inner.wallet.lock().available = available;
    }

    /// Make `account` the wallet's selected account.
    pub fn select_account(&self, account: Account) {
        let mut wallet = self.inner.wallet.lock();
        if !wallet.accounts.contains(&account) {
            wallet.accounts.push(account);
        }
        wallet.selected = Some(account);
    }

    /// Lock the wallet: no account exposed.
    pub fn disconnect_wallet(&self) {
        let mut wallet = self.inner.wallet.lock();
        wallet.accounts.clear();
        wallet.selected = None;
    }

    /// Decline the next signing prompt.
    pub fn reject_next_signature(&self) {
        self.inner.hooks.lock().reject_next_signature = true;
    }

    // ---- read hooks ----

    /// Fail the next `count` reads with an RPC error.
    pub fn fail_next_reads(&self, count: u32) {
        self.inner.hooks.lock().failing_reads = count;
    }

    /// Delay every read by `delay`.
    pub fn set_read_delay(&self, delay: Duration) {
        self.inner.hooks.lock().read_delay = delay;
    }

    /// Highest number of concurrent reads observed for a method.
    pub fn max_concurrent_reads(&self, method: &str) -> usize {
        self.inner
            .reads
            .lock()
            .high_water
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// Number of reads issued for a method.
    pub fn read_count(&self, method: &str) -> usize {
        self.inner.reads.lock().total.get(method).copied().unwrap_or(0)
    }

    // ---- confirmation hooks ----

    /// While held, transaction handles do not resolve.
    pub fn hold_confirmations(&self, held: bool) {
        self.inner.held.send_replace(held);
    }

    // ---- state hooks ----

    /// Overwrite the started flag, bypassing contract rules.
    pub fn force_started(&self, started: bool) {
        self.inner.state.lock().started = started;
    }

    /// Overwrite a score, bypassing contract rules.
    pub fn set_score(&self, account: Account, score: u64) {
        self.inner
            .state
            .lock()
            .scores
            .insert(account, U256::from(score));
    }

    /// Balance credited by `distributePayouts`.
    pub fn balance_of(&self, account: &Account) -> U256 {
        self.inner
            .state
            .lock()
            .balances
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Registered participants, read without going through the ABI.
    pub fn registered(&self) -> Vec<Account> {
        self.inner.state.lock().participants.clone()
    }

    /// Organizer account.
    pub fn organizer(&self) -> Account {
        self.inner.organizer
    }

    fn view(&self, call: &ContractCall) -> Vec<u8> {
        let state = self.inner.state.lock();
        let score = |account: &Account| state.scores.get(account).copied().unwrap_or_default();
        let token = match call {
            ContractCall::GetParticipants => Token::AddressArray(state.participants.clone()),
            ContractCall::ScoresOf(account) | ContractCall::Scores(account) => {
                Token::Uint(score(account))
            }
            ContractCall::PrizePool => Token::Uint(state.prize_pool),
            ContractCall::QuizStarted => Token::Bool(state.started),
            ContractCall::ParticipantRewards(account) => {
                Token::Uint(state.rewards.get(account).copied().unwrap_or_default())
            }
            _ => return Vec::new(),
        };
        abi::encode(&[token])
    }

    fn execute(
        &self,
        sender: Account,
        call: &ContractCall,
        value: U256,
    ) -> Result<Vec<LogEntry>, &'static str> {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if !value.is_zero() && !matches!(call, ContractCall::FundPrizePool) {
            return Err("non-payable");
        }
        let organizer_only = matches!(
            call,
            ContractCall::ManualStartQuiz
                | ContractCall::DeclareQuizWinners
                | ContractCall::ResetTournament
                | ContractCall::DistributePayouts
        );
        if organizer_only && sender != inner.organizer {
            return Err("only organizer");
        }

        match call {
            ContractCall::AddParticipant(account) => {
                if state.started {
                    return Err("quiz already started");
                }
                if state.participants.contains(account) {
                    return Err("already registered");
                }
                if state.participants.len() >= inner.capacity {
                    return Err("tournament full");
                }
                state.participants.push(*account);
                if state.participants.len() == inner.capacity {
                    state.started = true;
                }
                Ok(Vec::new())
            }
            ContractCall::SubmitAnswer { question, answer } => {
                if !state.started || state.declared {
                    return Err("quiz not running");
                }
                if !state.participants.contains(&sender) {
                    return Err("not a participant");
                }
                if !state.answered.insert((sender, *question)) {
                    return Err("already answered");
                }
                if inner.answers.get(question) == Some(&answer.as_str()) {
                    *state.scores.entry(sender).or_default() += U256::one();
                }
                Ok(Vec::new())
            }
            ContractCall::ManualStartQuiz => {
                if state.started {
                    return Err("quiz already started");
                }
                state.started = true;
                Ok(Vec::new())
            }
            ContractCall::DeclareQuizWinners => {
                if !state.started || state.declared {
                    return Err("cannot declare now");
                }
                let top = state
                    .participants
                    .iter()
                    .map(|p| state.scores.get(p).copied().unwrap_or_default())
                    .max()
                    .unwrap_or_default();
                let winners: Vec<Account> = if top.is_zero() {
                    Vec::new()
                } else {
                    state
                        .participants
                        .iter()
                        .filter(|p| state.scores.get(p).copied().unwrap_or_default() == top)
                        .copied()
                        .collect()
                };

                let mut logs = Vec::with_capacity(winners.len() + 1);
                if !winners.is_empty() {
                    let share = state.prize_pool / U256::from(winners.len());
                    for winner in &winners {
                        state.rewards.insert(*winner, share);
                        logs.push(abi::winner_declared_log(inner.address, winner, share));
                    }
                    state.prize_pool -= share * U256::from(winners.len());
                }
                state.declared = true;
                logs.push(abi::tournament_ended_log(inner.address, U256::from(winners.len())));
                Ok(logs)
            }
            ContractCall::DistributePayouts => {
                if !state.declared || state.paid_out {
                    return Err("nothing to pay out");
                }
                let rewards: Vec<(Account, U256)> =
                    state.rewards.iter().map(|(a, r)| (*a, *r)).collect();
                for (account, reward) in rewards {
                    *state.balances.entry(account).or_default() += reward;
                }
                state.paid_out = true;
                Ok(Vec::new())
            }
            ContractCall::ResetTournament => {
                let pool = state.prize_pool;
                let balances = std::mem::take(&mut state.balances);
                *state = ContractState {
                    prize_pool: pool,
                    balances,
                    ..Default::default()
                };
                Ok(Vec::new())
            }
            ContractCall::FundPrizePool => {
                if value.is_zero() {
                    return Err("no value");
                }
                state.prize_pool += value;
                Ok(Vec::new())
            }
            _ => Err("not a transaction"),
        }
    }

    fn next_hash(&self, sender: &Account) -> TxHash {
        let nonce = self.inner.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = sender.as_bytes().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        TxHash::new(abi::keccak256(&preimage))
    }
}

#[async_trait]
impl ChainClient for InMemoryQuizContract {
    fn contract_address(&self) -> Account {
        self.inner.address
    }

    async fn request_accounts(&self) -> Result<Vec<Account>, QuizError> {
        let wallet = self.inner.wallet.lock();
        if !wallet.available {
            return Err(QuizError::NoWalletAvailable);
        }
        let selected = wallet.selected.ok_or(QuizError::NoSigner)?;
        let mut accounts = vec![selected];
        accounts.extend(wallet.accounts.iter().filter(|a| **a != selected));
        Ok(accounts)
    }

    async fn read(&self, call: &ContractCall) -> Result<ContractValue, QuizError> {
        let _tracker = ReadTracker::start(&self.inner, call.method());

        let delay = self.inner.hooks.lock().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        {
            let mut hooks = self.inner.hooks.lock();
            if hooks.failing_reads > 0 {
                hooks.failing_reads -= 1;
                return Err(QuizError::RpcError(format!(
                    "simulated failure of {}",
                    call.method()
                )));
            }
        }

        call.decode_output(&self.view(call))
    }

    async fn submit(
        &self,
        call: &ContractCall,
        value: Option<Wei>,
    ) -> Result<Box<dyn TransactionHandle>, QuizError> {
        let sender = {
            let wallet = self.inner.wallet.lock();
            if !wallet.available {
                return Err(QuizError::NoWalletAvailable);
            }
            wallet.selected.ok_or(QuizError::NoSigner)?
        };
        {
            let mut hooks = self.inner.hooks.lock();
            if hooks.reject_next_signature {
                hooks.reject_next_signature = false;
                return Err(QuizError::UserRejected);
            }
        }

        let hash = self.next_hash(&sender);
        let value = value.map(|v| v.0).unwrap_or_default();
        let (success, logs) = match self.execute(sender, call, value) {
            Ok(logs) => (true, logs),
            Err(reason) => {
                debug!(method = call.method(), tx_hash = %hash, reason, "[quiz-sync] Simulated revert");
                (false, Vec::new())
            }
        };
        let block = self.inner.nonce.load(Ordering::SeqCst);

        Ok(Box::new(InMemoryTxHandle {
            receipt: TxReceipt {
                hash,
                success,
                block_number: Some(block),
                logs,
            },
            held: self.inner.held.subscribe(),
        }))
    }
}

/// Handle for a simulated transaction.
pub struct InMemoryTxHandle {
    receipt: TxReceipt,
    held: watch::Receiver<bool>,
}

#[async_trait]
impl TransactionHandle for InMemoryTxHandle {
    fn hash(&self) -> TxHash {
        self.receipt.hash
    }

    async fn wait(&self) -> Result<TxReceipt, QuizError> {
        let mut held = self.held.clone();
        held.wait_for(|held| !*held)
            .await
            .map_err(|_| QuizError::RpcError("simulator dropped".into()))?;
        Ok(self.receipt.clone())
    }
}
