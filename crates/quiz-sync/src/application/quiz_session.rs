//! # Quiz Session
//!
//! Which questions the connected account may still answer.
//!
//! Each question moves `(absent) -> Pending -> Confirmed`; a failed
//! transaction rolls `Pending` back to absent. Scores are never derived
//! from this set: the contract's score is the only score shown.

use crate::domain::{Question, QuestionId, QuizError};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Local state of one answered question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerState {
    /// Submission sent, receipt outstanding.
    Pending,
    /// Receipt confirmed.
    Confirmed,
}

/// Handed out by [`QuizSession::record_submission`]; settles that one
/// submission. A reset in between voids it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionTicket {
    /// Question the submission was for.
    pub question: QuestionId,
    generation: u64,
}

#[derive(Default)]
struct Answers {
    generation: u64,
    states: HashMap<QuestionId, AnswerState>,
}

/// Answer tracking for the connected account.
pub struct QuizSession {
    questions: Vec<Question>,
    answers: RwLock<Answers>,
}

impl QuizSession {
    /// Session over a question catalogue.
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            answers: RwLock::new(Answers::default()),
        }
    }

    /// The catalogue.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Look up a question.
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// False once a submission for `question` was recorded.
    pub fn can_answer(&self, question: QuestionId) -> bool {
        !self.answers.read().states.contains_key(&question)
    }

    /// Local state of a question.
    pub fn state(&self, question: QuestionId) -> Option<AnswerState> {
        self.answers.read().states.get(&question).copied()
    }

    /// Mark `question` answered before the transaction confirms.
    ///
    /// Check and insert happen under one lock, so a double click cannot
    /// produce two submissions.
    pub fn record_submission(&self, question: QuestionId) -> Result<SubmissionTicket, QuizError> {
        let mut answers = self.answers.write();
        if answers.states.contains_key(&question) {
            return Err(QuizError::AlreadyAnswered(question));
        }
        answers.states.insert(question, AnswerState::Pending);
        Ok(SubmissionTicket {
            question,
            generation: answers.generation,
        })
    }

    /// Pending -> Confirmed.
    pub fn commit(&self, ticket: SubmissionTicket) -> Result<(), QuizError> {
        let mut answers = self.answers.write();
        if answers.generation != ticket.generation {
            return Err(QuizError::StaleRead(format!(
                "Q{} was submitted before a reset",
                ticket.question
            )));
        }
        match answers.states.get(&ticket.question).copied() {
            Some(AnswerState::Pending) => {
                answers.states.insert(ticket.question, AnswerState::Confirmed);
                Ok(())
            }
            other => Err(QuizError::InvalidTransition {
                from: format!("{:?}", other),
                to: "Confirmed".to_string(),
            }),
        }
    }

    /// Drop a pending submission. Confirmed answers and submissions voided
    /// by a reset are left alone.
    pub fn rollback(&self, ticket: SubmissionTicket) -> bool {
        let mut answers = self.answers.write();
        if answers.generation != ticket.generation {
            return false;
        }
        if answers.states.get(&ticket.question) == Some(&AnswerState::Pending) {
            answers.states.remove(&ticket.question);
            return true;
        }
        false
    }

    /// Forget every answer (tournament reset or account switch).
    ///
    /// Tickets issued before the reset no longer settle anything.
    pub fn reset(&self) {
        let mut answers = self.answers.write();
        answers.generation += 1;
        answers.states.clear();
    }

    /// Answered question ids, ascending.
    pub fn answered(&self) -> Vec<QuestionId> {
        let mut ids: Vec<QuestionId> = self.answers.read().states.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(crate::domain::default_questions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_record_blocks_answer() {
        let session = QuizSession::default();
        assert!(session.can_answer(1));
        session.record_submission(1).unwrap();
        assert!(!session.can_answer(1));
        assert_eq!(session.record_submission(1), Err(QuizError::AlreadyAnswered(1)));
    }

    #[test]
    fn test_rollback_reopens_question() {
        let session = QuizSession::default();
        let ticket = session.record_submission(3).unwrap();
        assert!(session.rollback(ticket));
        assert!(session.can_answer(3));
    }

    #[test]
    fn test_commit_then_rollback_keeps_answer() {
        let session = QuizSession::default();
        let ticket = session.record_submission(2).unwrap();
        session.commit(ticket).unwrap();
        assert!(!session.rollback(ticket));
        assert_eq!(session.state(2), Some(AnswerState::Confirmed));
    }

    #[test]
    fn test_commit_twice() {
        let session = QuizSession::default();
        let ticket = session.record_submission(1).unwrap();
        session.commit(ticket).unwrap();
        assert!(matches!(
            session.commit(ticket),
            Err(QuizError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_ticket_from_before_reset_settles_nothing() {
        let session = QuizSession::default();
        let old = session.record_submission(1).unwrap();
        session.reset();
        let current = session.record_submission(1).unwrap();

        assert!(!session.rollback(old));
        assert!(!session.can_answer(1));
        assert!(matches!(session.commit(old), Err(QuizError::StaleRead(_))));
        assert_eq!(session.state(1), Some(AnswerState::Pending));

        assert!(session.rollback(current));
        assert!(session.can_answer(1));
    }

    #[test]
    fn test_reset_clears_everything() {
        let session = QuizSession::default();
        let first = session.record_submission(1).unwrap();
        session.record_submission(2).unwrap();
        session.commit(first).unwrap();
        session.reset();
        assert!(session.answered().is_empty());
        assert!(session.can_answer(1) && session.can_answer(2));
    }

    #[test]
    fn test_catalogue_lookup() {
        let session = QuizSession::default();
        assert_eq!(session.question(2).unwrap().choices[1], "Remix");
        assert!(session.question(4).is_none());
    }

    #[derive(Clone, Debug)]
    enum Step {
        Record(QuestionId),
        Commit(QuestionId),
        Rollback(QuestionId),
        Reset,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (1u64..5).prop_map(Step::Record),
            (1u64..5).prop_map(Step::Commit),
            (1u64..5).prop_map(Step::Rollback),
            Just(Step::Reset),
        ]
    }

    proptest! {
        #[test]
        fn prop_recorded_question_stays_closed(steps in prop::collection::vec(step(), 0..40), q in 1u64..5) {
            let session = QuizSession::default();
            let mut tickets: HashMap<QuestionId, SubmissionTicket> = HashMap::new();
            for s in &steps {
                match s {
                    Step::Record(id) => {
                        if let Ok(ticket) = session.record_submission(*id) {
                            tickets.insert(*id, ticket);
                        }
                    }
                    Step::Commit(id) => {
                        if let Some(ticket) = tickets.get(id) {
                            let _ = session.commit(*ticket);
                        }
                    }
                    Step::Rollback(id) => {
                        if let Some(ticket) = tickets.get(id) {
                            session.rollback(*ticket);
                        }
                    }
                    Step::Reset => session.reset(),
                }
            }
            let _ = session.record_submission(q);
            prop_assert!(!session.can_answer(q));

            // Tickets issued before a reset never touch the fresh submission.
            session.reset();
            session.record_submission(q).unwrap();
            for ticket in tickets.values() {
                session.rollback(*ticket);
                session.commit(*ticket).ok();
            }
            prop_assert!(!session.can_answer(q));
            prop_assert_eq!(session.state(q), Some(AnswerState::Pending));
        }
    }
}
