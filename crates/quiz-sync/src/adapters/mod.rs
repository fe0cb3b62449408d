//! # Adapters
//!
//! Implementations of the outbound [`ChainClient`](crate::ports::ChainClient) port.

pub mod in_memory;
pub mod json_rpc;

pub use in_memory::{answer_key, InMemoryQuizContract, InMemoryTxHandle, SIMULATED_CONTRACT};
pub use json_rpc::{JsonRpcChainClient, JsonRpcTxHandle};
