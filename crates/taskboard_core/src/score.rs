use crate::model::{StatusTransition, TaskStatus};
use time::OffsetDateTime;

pub const DEFAULT_DECAY_DAYS: u32 = 7;

/// Productivity score with a rolling reset window.
///
/// The score counts completions net of un-completions. Deleting a completed
/// task does not take its point away, so the score may exceed the number of
/// tasks currently completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEngine {
    score: u64,
    last_reset_at: OffsetDateTime,
    decay_days: u32,
}

impl ScoreEngine {
    pub fn new(score: u64, last_reset_at: OffsetDateTime) -> Self {
        Self::with_decay_days(score, last_reset_at, DEFAULT_DECAY_DAYS)
    }

    pub fn with_decay_days(score: u64, last_reset_at: OffsetDateTime, decay_days: u32) -> Self {
        Self {
            score,
            last_reset_at,
            decay_days: decay_days.max(1),
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn last_reset_at(&self) -> OffsetDateTime {
        self.last_reset_at
    }

    pub fn decay_days(&self) -> u32 {
        self.decay_days
    }

    pub fn tier(&self) -> ScoreTier {
        ScoreTier::for_score(self.score)
    }

    pub fn on_status_change(&mut self, transition: StatusTransition) {
        if transition.from == transition.to {
            return;
        }
        match transition.to {
            TaskStatus::Completed => self.score += 1,
            TaskStatus::Pending => self.score = self.score.saturating_sub(1),
        }
    }

    /// Zeroes the score once the window has fully elapsed since the last reset.
    /// A `now` before `last_reset_at` never resets.
    pub fn check_decay(&mut self, now: OffsetDateTime) -> bool {
        let elapsed_days = (now - self.last_reset_at).whole_days();
        if elapsed_days < i64::from(self.decay_days) {
            return false;
        }

        tracing::info!(
            previous_score = self.score,
            elapsed_days,
            "productivity score reset"
        );
        self.score = 0;
        self.last_reset_at = now;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    Idle,
    Building,
    Excellent,
    OnFire,
    Master,
    Legendary,
}

impl ScoreTier {
    pub fn for_score(score: u64) -> Self {
        match score {
            0 => Self::Idle,
            1..=4 => Self::Building,
            5..=9 => Self::Excellent,
            10..=14 => Self::OnFire,
            15..=19 => Self::Master,
            _ => Self::Legendary,
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Self::Idle => "😴",
            Self::Building => "😊",
            Self::Excellent => "😎",
            Self::OnFire => "🚀",
            Self::Master => "💪",
            Self::Legendary => "🔥",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Idle => "Start completing tasks to build your productivity score!",
            Self::Building => "Keep going! You are building momentum.",
            Self::Excellent => "Excellent progress! Keep up the good work.",
            Self::OnFire => "You are on fire! Keep the streak going.",
            Self::Master => "Incredible! You are a productivity master!",
            Self::Legendary => "Legendary! You are unstoppable!",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Excellent => "excellent",
            Self::OnFire => "on_fire",
            Self::Master => "master",
            Self::Legendary => "legendary",
        }
    }
}
