//! # Domain Invariants
//!
//! Client-side rules. None of these are security checks: the contract
//! enforces access and membership, the client only avoids sending
//! transactions that would revert.

use super::entities::ParticipantSet;
use super::errors::QuizError;
use super::value_objects::Account;

/// Organizer gate.
///
/// Organizer controls are shown iff the connected account equals the
/// configured organizer. Accounts compare on bytes, so letter case in the
/// textual forms does not matter.
pub fn organizer_controls_visible(connected: Option<&Account>, organizer: &Account) -> bool {
    connected.is_some_and(|account| account == organizer)
}

/// Invariant: an account registers at most once.
pub fn invariant_unique_participant(
    participants: &ParticipantSet,
    account: &Account,
) -> Result<(), QuizError> {
    if participants.contains(account) {
        return Err(QuizError::AlreadyRegistered(*account));
    }
    Ok(())
}

/// Invariant: registration needs a free slot.
pub fn invariant_capacity(participants: &ParticipantSet) -> Result<(), QuizError> {
    if participants.is_full() {
        return Err(QuizError::TournamentFull(participants.capacity()));
    }
    Ok(())
}
