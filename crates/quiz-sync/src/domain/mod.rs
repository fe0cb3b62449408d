//! # Domain Module
//!
//! Core types for the Quiz Battle client: identities, amounts, cached
//! contract state, transaction records and receipt events.

pub mod entities;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use events::*;
pub use invariants::*;
pub use value_objects::*;
