//! # Ports
//!
//! Inbound: what the client offers to a front-end.
//! Outbound: what the client needs from a wallet-backed chain connection.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
