//! JSON-RPC chain client.
//!
//! Talks to a wallet-backed node (EIP-1193 semantics over HTTP): the node
//! holds the keys, so `eth_sendTransaction` is all a write needs.

use crate::domain::{Account, LogEntry, QuizError, TxHash, TxReceipt, Wei};
use crate::ports::{ChainClient, ContractCall, ContractValue, TransactionHandle};
use async_trait::async_trait;
use parking_lot::RwLock;
use primitive_types::U256;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193: the requested account has not been authorized.
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// JSON-RPC: method not found.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

#[derive(Debug)]
enum RpcFailure {
    Transport(String),
    Rpc(JsonRpcError),
}

/// Map a JSON-RPC error object onto the client taxonomy.
pub fn map_rpc_error(error: &JsonRpcError) -> QuizError {
    match error.code {
        USER_REJECTED_CODE => QuizError::UserRejected,
        UNAUTHORIZED_CODE => QuizError::NoSigner,
        code => QuizError::RpcError(format!("{code}: {}", error.message)),
    }
}

impl From<RpcFailure> for QuizError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Transport(message) => QuizError::RpcError(message),
            RpcFailure::Rpc(error) => map_rpc_error(&error),
        }
    }
}

struct RpcTransport {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl RpcTransport {
    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>, RpcFailure> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(format!("{method}: {e}")))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(format!("{method}: bad response: {e}")))?;

        if let Some(error) = rpc_response.error {
            debug!(method, code = error.code, "[quiz-sync] RPC error: {}", error.message);
            return Err(RpcFailure::Rpc(error));
        }
        Ok(rpc_response.result)
    }

    async fn call_required<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, QuizError> {
        self.call(method, params)
            .await?
            .ok_or_else(|| QuizError::RpcError(format!("{method}: response missing result")))
    }
}

/// Chain client over HTTP JSON-RPC.
pub struct JsonRpcChainClient {
    transport: Arc<RpcTransport>,
    contract: Account,
    poll_interval: Duration,
    signer: RwLock<Option<Account>>,
}

impl JsonRpcChainClient {
    /// Create a client for `contract` behind `rpc_url`.
    pub fn new(rpc_url: impl Into<String>, contract: Account, poll_interval: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            transport: Arc::new(RpcTransport {
                http_client,
                rpc_url: rpc_url.into(),
                request_id: AtomicU64::new(1),
            }),
            contract,
            poll_interval,
            signer: RwLock::new(None),
        }
    }

    /// Use `account` as sender for subsequent writes.
    pub fn set_signer(&self, account: Option<Account>) {
        *self.signer.write() = account;
    }

    /// Current sender.
    pub fn signer(&self) -> Option<Account> {
        *self.signer.read()
    }

    async fn accounts(&self, method: &str) -> Result<Vec<String>, RpcFailure> {
        Ok(self
            .transport
            .call::<_, Vec<String>>(method, Vec::<()>::new())
            .await?
            .unwrap_or_default())
    }
}

fn is_method_not_found(failure: &RpcFailure) -> bool {
    matches!(failure, RpcFailure::Rpc(e) if e.code == METHOD_NOT_FOUND_CODE)
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    fn contract_address(&self) -> Account {
        self.contract
    }

    async fn request_accounts(&self) -> Result<Vec<Account>, QuizError> {
        let raw = match self.accounts("eth_requestAccounts").await {
            Ok(list) => list,
            Err(failure) if is_method_not_found(&failure) => {
                match self.accounts("eth_accounts").await {
                    Ok(list) => list,
                    Err(failure) if is_method_not_found(&failure) => {
                        return Err(QuizError::NoWalletAvailable)
                    }
                    Err(failure) => return Err(failure.into()),
                }
            }
            Err(failure) => return Err(failure.into()),
        };

        let accounts = raw
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<Account>, _>>()?;
        let first = *accounts.first().ok_or(QuizError::NoSigner)?;
        self.set_signer(Some(first));
        Ok(accounts)
    }

    async fn read(&self, call: &ContractCall) -> Result<ContractValue, QuizError> {
        let params = json!([
            {
                "to": self.contract.to_string(),
                "data": format!("0x{}", hex::encode(call.encode())),
            },
            "latest"
        ]);
        let result: String = self.transport.call_required("eth_call", params).await?;
        call.decode_output(&decode_hex_bytes(&result)?)
    }

    async fn submit(
        &self,
        call: &ContractCall,
        value: Option<Wei>,
    ) -> Result<Box<dyn TransactionHandle>, QuizError> {
        let from = self.signer().ok_or(QuizError::NoSigner)?;
        let mut tx = json!({
            "from": from.to_string(),
            "to": self.contract.to_string(),
            "data": format!("0x{}", hex::encode(call.encode())),
        });
        if let Some(value) = value {
            tx["value"] = json!(format!("0x{:x}", value.0));
        }

        let hash: String = self
            .transport
            .call_required("eth_sendTransaction", json!([tx]))
            .await?;
        let hash: TxHash = hash.parse()?;
        debug!(method = call.method(), tx_hash = %hash, "[quiz-sync] Transaction sent");

        Ok(Box::new(JsonRpcTxHandle {
            transport: Arc::clone(&self.transport),
            hash,
            poll_interval: self.poll_interval,
        }))
    }
}

/// Handle that polls `eth_getTransactionReceipt`.
pub struct JsonRpcTxHandle {
    transport: Arc<RpcTransport>,
    hash: TxHash,
    poll_interval: Duration,
}

#[async_trait]
impl TransactionHandle for JsonRpcTxHandle {
    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn wait(&self) -> Result<TxReceipt, QuizError> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .transport
                .call("eth_getTransactionReceipt", json!([self.hash.to_string()]))
                .await
                .map_err(|failure| {
                    warn!(tx_hash = %self.hash, "[quiz-sync] Receipt poll failed: {:?}", failure);
                    QuizError::from(failure)
                })?;

            if let Some(receipt) = receipt {
                return TxReceipt::try_from(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// Hex transaction hash.
    pub transaction_hash: String,
    /// `0x1` on success, `0x0` on revert.
    pub status: Option<String>,
    /// Hex block number.
    pub block_number: Option<String>,
    /// Emitted logs.
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

/// Log entry of an [`RpcReceipt`].
#[derive(Debug, Clone, Deserialize)]
pub struct RpcLog {
    /// Emitting contract.
    pub address: String,
    /// Hex topics.
    pub topics: Vec<String>,
    /// Hex data.
    pub data: String,
}

impl TryFrom<RpcReceipt> for TxReceipt {
    type Error = QuizError;

    fn try_from(receipt: RpcReceipt) -> Result<Self, Self::Error> {
        let success = match receipt.status.as_deref() {
            Some(status) => parse_hex_u64(status)? == 1,
            None => return Err(QuizError::Decode("receipt without status".into())),
        };
        let block_number = receipt
            .block_number
            .as_deref()
            .map(parse_hex_u64)
            .transpose()?;
        let logs = receipt
            .logs
            .into_iter()
            .map(LogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TxReceipt {
            hash: receipt.transaction_hash.parse()?,
            success,
            block_number,
            logs,
        })
    }
}

impl TryFrom<RpcLog> for LogEntry {
    type Error = QuizError;

    fn try_from(log: RpcLog) -> Result<Self, Self::Error> {
        let topics = log
            .topics
            .iter()
            .map(|topic| {
                let bytes = decode_hex_bytes(topic)?;
                <[u8; 32]>::try_from(bytes.as_slice())
                    .map_err(|_| QuizError::Decode(format!("topic is not 32 bytes: {topic}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LogEntry {
            address: log.address.parse()?,
            topics,
            data: decode_hex_bytes(&log.data)?,
        })
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_u64(s: &str) -> Result<u64, QuizError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|_| QuizError::Decode(format!("bad quantity: {s}")))
}

/// Parse `0x`-prefixed hex data; `0x` alone is empty.
pub fn decode_hex_bytes(s: &str) -> Result<Vec<u8>, QuizError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|_| QuizError::Decode(format!("bad hex data: {s}")))
}

/// Parse a hex quantity into a 256-bit integer.
pub fn parse_hex_u256(s: &str) -> Result<U256, QuizError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(digits, 16).map_err(|_| QuizError::Decode(format!("bad quantity: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::abi::{self, WINNER_DECLARED};

    const HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
    const CONTRACT: &str = "0x5eadf9cd069729b3457c67110ee1ff5bb3ef7fc5";

    #[test]
    fn test_error_mapping() {
        let rejected = JsonRpcError {
            code: 4001,
            message: "User denied".into(),
        };
        assert_eq!(map_rpc_error(&rejected), QuizError::UserRejected);

        let unauthorized = JsonRpcError {
            code: 4100,
            message: "unauthorized".into(),
        };
        assert_eq!(map_rpc_error(&unauthorized), QuizError::NoSigner);

        let other = JsonRpcError {
            code: -32000,
            message: "execution reverted".into(),
        };
        assert!(matches!(map_rpc_error(&other), QuizError::RpcError(m) if m.contains("reverted")));
    }

    #[test]
    fn test_transport_failure_is_rpc_error() {
        let err: QuizError = RpcFailure::Transport("connection refused".into()).into();
        assert!(matches!(err, QuizError::RpcError(_)));
    }

    #[test]
    fn test_receipt_conversion() {
        let winner_topic = format!("0x{}", hex::encode(abi::event_topic(WINNER_DECLARED)));
        let winner_word = format!("0x{}", "00".repeat(12) + &"ab".repeat(20));
        let reward = format!("0x{}", hex::encode(abi::uint_word(U256::exp10(18))));

        let raw = json!({
            "transactionHash": HASH,
            "status": "0x1",
            "blockNumber": "0x1b4",
            "logs": [{
                "address": CONTRACT,
                "topics": [winner_topic, winner_word],
                "data": reward,
            }]
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        let receipt = TxReceipt::try_from(receipt).unwrap();

        assert!(receipt.success);
        assert_eq!(receipt.block_number, Some(436));
        let contract: Account = CONTRACT.parse().unwrap();
        let events = abi::decode_receipt_events(&receipt, &contract);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_reverted_receipt() {
        let raw = json!({ "transactionHash": HASH, "status": "0x0", "logs": [] });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        let receipt = TxReceipt::try_from(receipt).unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.block_number, None);
    }

    #[test]
    fn test_receipt_without_status_rejected() {
        let raw = json!({ "transactionHash": HASH, "logs": [] });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        assert!(TxReceipt::try_from(receipt).is_err());
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
        assert!(parse_hex_u64("0xzz").is_err());
        assert!(decode_hex_bytes("0x").unwrap().is_empty());
        assert_eq!(parse_hex_u256("0xde0b6b3a7640000").unwrap(), U256::exp10(18));
    }

    #[test]
    fn test_signer_starts_empty() {
        let client = JsonRpcChainClient::new(
            "http://127.0.0.1:1",
            CONTRACT.parse().unwrap(),
            Duration::from_millis(10),
        );
        assert_eq!(client.signer(), None);
        assert_eq!(client.contract_address().to_string(), CONTRACT);
    }

    #[tokio::test]
    async fn test_submit_without_signer() {
        let client = JsonRpcChainClient::new(
            "http://127.0.0.1:1",
            CONTRACT.parse().unwrap(),
            Duration::from_millis(10),
        );
        let result = client.submit(&ContractCall::ManualStartQuiz, None).await;
        assert!(matches!(result, Err(QuizError::NoSigner)));
    }
}
