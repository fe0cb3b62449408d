//! # Outbound Ports
//!
//! The chain connection the client drives, and the typed contract calls it
//! speaks. Implementations own no quiz state.

use crate::algorithms::abi::{self, Token};
use crate::config::ScoreGetter;
use crate::domain::{Account, QuestionId, QuizError, TxHash, TxReceipt, Wei};
use async_trait::async_trait;
use primitive_types::U256;

/// One call against the quiz contract ABI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractCall {
    /// `getParticipants() -> address[]`
    GetParticipants,
    /// `scoresOf(address) -> uint`
    ScoresOf(Account),
    /// `scores(address) -> uint`
    Scores(Account),
    /// `prizePool() -> uint`
    PrizePool,
    /// `quizStarted() -> bool`
    QuizStarted,
    /// `participantRewards(address) -> uint`
    ParticipantRewards(Account),
    /// `addParticipant(address)`
    AddParticipant(Account),
    /// `submitAnswer(uint, string)`
    SubmitAnswer {
        /// Question being answered.
        question: QuestionId,
        /// Chosen answer text.
        answer: String,
    },
    /// `manualStartQuiz()`
    ManualStartQuiz,
    /// `declareQuizWinners()`
    DeclareQuizWinners,
    /// `resetTournament()`
    ResetTournament,
    /// `distributePayouts()`
    DistributePayouts,
    /// `fundPrizePool()` (payable)
    FundPrizePool,
}

impl ContractCall {
    /// Canonical function signature.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::GetParticipants => "getParticipants()",
            Self::ScoresOf(_) => "scoresOf(address)",
            Self::Scores(_) => "scores(address)",
            Self::PrizePool => "prizePool()",
            Self::QuizStarted => "quizStarted()",
            Self::ParticipantRewards(_) => "participantRewards(address)",
            Self::AddParticipant(_) => "addParticipant(address)",
            Self::SubmitAnswer { .. } => "submitAnswer(uint256,string)",
            Self::ManualStartQuiz => "manualStartQuiz()",
            Self::DeclareQuizWinners => "declareQuizWinners()",
            Self::ResetTournament => "resetTournament()",
            Self::DistributePayouts => "distributePayouts()",
            Self::FundPrizePool => "fundPrizePool()",
        }
    }

    /// Method name without the argument list.
    pub fn method(&self) -> &'static str {
        let signature = self.signature();
        signature.split('(').next().unwrap_or(signature)
    }

    /// Read-only call?
    pub fn is_view(&self) -> bool {
        matches!(
            self,
            Self::GetParticipants
                | Self::ScoresOf(_)
                | Self::Scores(_)
                | Self::PrizePool
                | Self::QuizStarted
                | Self::ParticipantRewards(_)
        )
    }

    fn tokens(&self) -> Vec<Token> {
        match self {
            Self::ScoresOf(account)
            | Self::Scores(account)
            | Self::ParticipantRewards(account)
            | Self::AddParticipant(account) => vec![Token::Address(*account)],
            Self::SubmitAnswer { question, answer } => vec![
                Token::Uint(U256::from(*question)),
                Token::String(answer.clone()),
            ],
            _ => Vec::new(),
        }
    }

    /// Calldata: selector plus encoded arguments.
    pub fn encode(&self) -> Vec<u8> {
        abi::encode_call(self.signature(), &self.tokens())
    }

    /// Decode the raw return data of this call.
    pub fn decode_output(&self, data: &[u8]) -> Result<ContractValue, QuizError> {
        match self {
            Self::GetParticipants => abi::decode_address_array(data).map(ContractValue::Addresses),
            Self::QuizStarted => abi::decode_bool(data).map(ContractValue::Bool),
            Self::ScoresOf(_) | Self::Scores(_) | Self::PrizePool | Self::ParticipantRewards(_) => {
                abi::decode_uint(data).map(ContractValue::Uint)
            }
            _ => Ok(ContractValue::Empty),
        }
    }

    /// The score getter call for an account.
    pub fn score(getter: ScoreGetter, account: Account) -> Self {
        match getter {
            ScoreGetter::ScoresOf => Self::ScoresOf(account),
            ScoreGetter::Scores => Self::Scores(account),
        }
    }
}

/// A decoded return value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractValue {
    /// `address[]`
    Addresses(Vec<Account>),
    /// `uint256`
    Uint(U256),
    /// `bool`
    Bool(bool),
    /// No return data.
    Empty,
}

impl ContractValue {
    fn mismatch(&self, expected: &str) -> QuizError {
        QuizError::Decode(format!("expected {expected}, got {self:?}"))
    }

    /// Expect an address list.
    pub fn into_addresses(self) -> Result<Vec<Account>, QuizError> {
        match self {
            Self::Addresses(list) => Ok(list),
            other => Err(other.mismatch("address[]")),
        }
    }

    /// Expect a uint.
    pub fn into_uint(self) -> Result<U256, QuizError> {
        match self {
            Self::Uint(value) => Ok(value),
            other => Err(other.mismatch("uint256")),
        }
    }

    /// Expect a bool.
    pub fn into_bool(self) -> Result<bool, QuizError> {
        match self {
            Self::Bool(flag) => Ok(flag),
            other => Err(other.mismatch("bool")),
        }
    }
}

/// A submitted transaction awaiting its receipt.
#[async_trait]
pub trait TransactionHandle: Send + Sync {
    /// Hash, known as soon as the wallet accepted the transaction.
    fn hash(&self) -> TxHash;

    /// Wait for the receipt. May never resolve; callers bound it.
    async fn wait(&self) -> Result<TxReceipt, QuizError>;
}

/// Wallet-backed chain connection - outbound port.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the quiz contract.
    fn contract_address(&self) -> Account;

    /// Ask the wallet for its accounts; the first one is the signer.
    ///
    /// Fails with `NoWalletAvailable` when there is no wallet at all and
    /// `NoSigner` when the wallet exposes no account.
    async fn request_accounts(&self) -> Result<Vec<Account>, QuizError>;

    /// Side-effect free call. Safe to issue concurrently.
    async fn read(&self, call: &ContractCall) -> Result<ContractValue, QuizError>;

    /// Sign and send a state-changing call, optionally attaching value.
    async fn submit(
        &self,
        call: &ContractCall,
        value: Option<Wei>,
    ) -> Result<Box<dyn TransactionHandle>, QuizError>;
}

/// Typed reads over any [`ChainClient`].
#[async_trait]
pub trait ContractReader {
    /// `getParticipants()`
    async fn participants(&self) -> Result<Vec<Account>, QuizError>;

    /// Score of one account through the configured getter.
    async fn score_of(&self, account: Account, getter: ScoreGetter) -> Result<U256, QuizError>;

    /// `quizStarted()`
    async fn quiz_started(&self) -> Result<bool, QuizError>;

    /// `prizePool()`
    async fn prize_pool(&self) -> Result<Wei, QuizError>;

    /// `participantRewards(account)`
    async fn reward_of(&self, account: Account) -> Result<U256, QuizError>;
}

#[async_trait]
impl<C: ChainClient + ?Sized> ContractReader for C {
    async fn participants(&self) -> Result<Vec<Account>, QuizError> {
        self.read(&ContractCall::GetParticipants).await?.into_addresses()
    }

    async fn score_of(&self, account: Account, getter: ScoreGetter) -> Result<U256, QuizError> {
        self.read(&ContractCall::score(getter, account)).await?.into_uint()
    }

    async fn quiz_started(&self) -> Result<bool, QuizError> {
        self.read(&ContractCall::QuizStarted).await?.into_bool()
    }

    async fn prize_pool(&self) -> Result<Wei, QuizError> {
        self.read(&ContractCall::PrizePool).await?.into_uint().map(Wei)
    }

    async fn reward_of(&self, account: Account) -> Result<U256, QuizError> {
        self.read(&ContractCall::ParticipantRewards(account))
            .await?
            .into_uint()
    }
}
