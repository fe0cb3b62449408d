//! # Quiz Battle Test Suite
//!
//! End-to-end flows driving the public client API against the in-memory
//! contract.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs        # Lobby, quiz, results and payout flows
//!     └── consistency.rs  # Coalescing, stale reads, failure handling
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p quiz-tests
//! cargo test -p quiz-tests integration::flows
//! ```

pub mod integration;
