//! # Receipts and Contract Events
//!
//! Raw receipt data as returned by a node, and the typed events the client
//! cares about.

use super::entities::Winner;
use super::value_objects::{Account, TxHash, TxStatus, Wei};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// One log entry of a receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emitting contract.
    pub address: Account,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<[u8; 32]>,
    /// ABI-encoded non-indexed arguments.
    pub data: Vec<u8>,
}

/// Mined transaction receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash.
    pub hash: TxHash,
    /// `status == 1`
    pub success: bool,
    /// Block the transaction was mined in.
    pub block_number: Option<u64>,
    /// Emitted logs.
    pub logs: Vec<LogEntry>,
}

/// Events emitted by the quiz contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    /// `WinnerDeclared(address indexed winner, uint reward)`
    WinnerDeclared {
        /// Winning account.
        winner: Account,
        /// Reward in base units.
        reward: Wei,
    },
    /// `TournamentEnded(uint)`
    TournamentEnded {
        /// Value carried by the event.
        value: U256,
    },
}

/// Terminal result of a confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TxOutcome {
    /// Logical operation label.
    pub operation: &'static str,
    /// Transaction hash.
    pub hash: TxHash,
    /// Terminal status; always `Confirmed` for a returned outcome.
    pub status: TxStatus,
    /// Events of interest decoded from the receipt. May be empty.
    pub events: Vec<ContractEvent>,
}

impl TxOutcome {
    /// `WinnerDeclared` entries of this outcome.
    pub fn winners(&self) -> Vec<Winner> {
        winners_from_events(&self.events)
    }
}

/// Winners among a list of decoded events, in log order.
pub fn winners_from_events(events: &[ContractEvent]) -> Vec<Winner> {
    events
        .iter()
        .filter_map(|event| match event {
            ContractEvent::WinnerDeclared { winner, reward } => Some(Winner {
                account: *winner,
                reward: *reward,
            }),
            ContractEvent::TournamentEnded { .. } => None,
        })
        .collect()
}
