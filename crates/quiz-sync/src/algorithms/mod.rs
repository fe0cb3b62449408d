//! # Algorithms
//!
//! Pure functions: the contract ABI codec, exact unit conversion and
//! leaderboard derivation.

pub mod abi;
pub mod leaderboard;
pub mod units;

pub use abi::{
    decode_address_array, decode_bool, decode_log, decode_receipt_events, decode_uint,
    encode_call, event_topic, selector, Token,
};
pub use leaderboard::{rank, winners_from_rewards};
pub use units::{format_units, parse_units};
