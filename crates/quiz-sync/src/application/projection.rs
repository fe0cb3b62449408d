//! # UI Projection
//!
//! Pure function from synchronised state to what a front-end shows.

use super::quiz_session::QuizSession;
use super::state_sync::SyncSnapshot;
use crate::domain::{organizer_controls_visible, Account, LeaderboardEntry, QuestionId, QuizPhase, StatusLevel};
use serde::Serialize;
use std::fmt;

/// Which screen is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Screen {
    /// No wallet account connected.
    Connect,
    /// Registration and countdown.
    Lobby {
        /// Seconds left, when counting down.
        countdown: Option<u64>,
    },
    /// Questions.
    Quiz,
    /// Winners.
    Results,
}

/// A question as rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// Question id.
    pub id: QuestionId,
    /// Prompt.
    pub prompt: String,
    /// Choices.
    pub choices: Vec<String>,
    /// Still answerable by this account.
    pub answerable: bool,
}

/// A winner as rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WinnerView {
    /// Short address.
    pub account: String,
    /// Exact reward, e.g. `1.5 ETH`.
    pub reward: String,
}

/// Everything a front-end needs for one frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScreenView {
    /// Current screen.
    pub screen: Screen,
    /// Short form of the connected account.
    pub wallet: Option<String>,
    /// Registered participants.
    pub participants: usize,
    /// Participants needed.
    pub capacity: usize,
    /// Is the connected account registered?
    pub registered: bool,
    /// Formatted prize pool, `None` while unknown.
    pub prize_pool: Option<String>,
    /// Ranked leaderboard.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Declared winners.
    pub winners: Vec<WinnerView>,
    /// Authoritative score of the connected account.
    pub score: Option<String>,
    /// Question list with answerability.
    pub questions: Vec<QuestionView>,
    /// Show start/declare/reset/payout controls.
    pub organizer_controls: bool,
    /// Status line.
    pub status: Option<(StatusLevel, String)>,
    /// Short hash of the transaction the status is about.
    pub status_tx: Option<String>,
}

/// Project state into a view.
pub fn project(
    snapshot: &SyncSnapshot,
    session: &QuizSession,
    organizer: &Account,
    capacity: usize,
) -> ScreenView {
    let screen = match (snapshot.account, snapshot.phase) {
        (None, _) => Screen::Connect,
        (Some(_), QuizPhase::NotStarted) => Screen::Lobby {
            countdown: snapshot.countdown,
        },
        (Some(_), QuizPhase::InProgress) => Screen::Quiz,
        (Some(_), QuizPhase::Ended) => Screen::Results,
    };

    let winners = snapshot
        .winners
        .as_ref()
        .map(|list| {
            list.winners
                .iter()
                .map(|w| WinnerView {
                    account: w.account.short(),
                    reward: w.reward.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let questions = session
        .questions()
        .iter()
        .map(|q| QuestionView {
            id: q.id,
            prompt: q.prompt.clone(),
            choices: q.choices.clone(),
            answerable: session.can_answer(q.id),
        })
        .collect();

    ScreenView {
        screen,
        wallet: snapshot.account.map(|a| a.short()),
        participants: snapshot.participant_count(),
        capacity,
        registered: snapshot
            .account
            .is_some_and(|account| snapshot.is_participant(&account)),
        prize_pool: snapshot.prize_pool.map(|pool| pool.to_string()),
        leaderboard: snapshot.leaderboard(),
        winners,
        score: snapshot.user_score.map(|score| score.to_string()),
        questions,
        organizer_controls: organizer_controls_visible(snapshot.account.as_ref(), organizer),
        status: snapshot
            .status
            .as_ref()
            .map(|status| (status.level, status.text.clone())),
        status_tx: snapshot
            .status
            .as_ref()
            .and_then(|status| status.tx_hash)
            .map(|hash| hash.short()),
    }
}

impl fmt::Display for ScreenView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quiz Battle")?;
        match &self.wallet {
            Some(wallet) => writeln!(f, "Wallet: {wallet}")?,
            None => {
                writeln!(f, "Connect your wallet to play.")?;
                return self.fmt_status(f);
            }
        }
        writeln!(
            f,
            "Participants: {}/{}{}",
            self.participants,
            self.capacity,
            if self.registered { " (registered)" } else { "" }
        )?;
        writeln!(
            f,
            "Prize pool: {}",
            self.prize_pool.as_deref().unwrap_or("unknown")
        )?;

        match self.screen {
            Screen::Connect => {}
            Screen::Lobby { countdown } => match countdown {
                Some(seconds) => writeln!(f, "Quiz starts in {seconds}s...")?,
                None => writeln!(f, "Waiting for players...")?,
            },
            Screen::Quiz => {
                for q in &self.questions {
                    let marker = if q.answerable { " " } else { "x" };
                    writeln!(f, "[{marker}] Q{}: {}", q.id, q.prompt)?;
                    writeln!(f, "      {}", q.choices.join(" | "))?;
                }
                if let Some(score) = &self.score {
                    writeln!(f, "Your score: {score}")?;
                }
            }
            Screen::Results => {
                writeln!(f, "Winners:")?;
                for winner in &self.winners {
                    writeln!(f, "  {} {}", winner.account, winner.reward)?;
                }
            }
        }

        if !self.leaderboard.is_empty() {
            writeln!(f, "Leaderboard:")?;
            for entry in &self.leaderboard {
                writeln!(f, "  {}. {} {}", entry.rank, entry.account.short(), entry.score)?;
            }
        }
        if self.organizer_controls {
            writeln!(f, "Organizer: start | declare | reset | payout")?;
        }
        self.fmt_status(f)
    }
}

impl ScreenView {
    fn fmt_status(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((level, text)) = &self.status {
            let tag = match level {
                StatusLevel::Info => "..",
                StatusLevel::Success => "ok",
                StatusLevel::Error => "!!",
            };
            write!(f, "[{tag}] {text}")?;
            if let Some(tx) = &self.status_tx {
                write!(f, " (tx {tx})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
