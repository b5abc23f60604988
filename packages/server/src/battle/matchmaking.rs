use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;

use crate::entity::problem::Difficulty;

/// Difficulty a player is willing to battle on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DifficultyPreference {
    #[serde(alias = "easy")]
    Easy,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "hard")]
    Hard,
    #[default]
    #[serde(alias = "any")]
    Any,
}

impl DifficultyPreference {
    fn as_difficulty(self) -> Option<Difficulty> {
        match self {
            Self::Easy => Some(Difficulty::Easy),
            Self::Medium => Some(Difficulty::Medium),
            Self::Hard => Some(Difficulty::Hard),
            Self::Any => None,
        }
    }

    /// Agreed category for two preferences: `None` if they are incompatible,
    /// `Some(None)` if both accept anything.
    pub fn agree(self, other: Self) -> Option<Option<Difficulty>> {
        match (self.as_difficulty(), other.as_difficulty()) {
            (Some(a), Some(b)) if a == b => Some(Some(a)),
            (Some(_), Some(_)) => None,
            (Some(a), None) | (None, Some(a)) => Some(Some(a)),
            (None, None) => Some(None),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QueueEntry {
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    pub preference: DifficultyPreference,
    pub enqueued_at: Instant,
}

#[derive(Clone, Debug)]
pub struct MatchedPair {
    pub first: QueueEntry,
    pub second: QueueEntry,
    /// `None` when both sides accept any difficulty.
    pub difficulty: Option<Difficulty>,
}

/// Waiting pool of players looking for an opponent.
pub struct MatchmakingPool {
    entries: Vec<QueueEntry>,
    base_tolerance: u32,
    growth_per_sec: u32,
}

impl MatchmakingPool {
    pub fn new(base_tolerance: u32, growth_per_sec: u32) -> Self {
        Self {
            entries: Vec::new(),
            base_tolerance,
            growth_per_sec,
        }
    }

    /// Adds the entry, replacing any previous one of the same user.
    /// Returns `true` if an entry was replaced.
    pub fn join(&mut self, entry: QueueEntry) -> bool {
        let replaced = self.leave(entry.user_id);
        self.entries.push(entry);
        replaced
    }

    pub fn leave(&mut self, user_id: i32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.user_id != user_id);
        self.entries.len() != before
    }

    pub fn contains(&self, user_id: i32) -> bool {
        self.entries.iter().any(|e| e.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rating gap accepted for a pair whose longer-waiting side has waited
    /// since `since`.
    pub fn tolerance(&self, since: Instant, now: Instant) -> f64 {
        let waited = now.saturating_duration_since(since).as_secs_f64();
        f64::from(self.base_tolerance) + f64::from(self.growth_per_sec) * waited
    }

    /// Removes and returns the compatible pair with the smallest rating gap.
    pub fn take_pair(&mut self, now: Instant) -> Option<MatchedPair> {
        self.entries.sort_by_key(|e| e.rating);

        // (gap, earliest enqueue, i, j, difficulty)
        let mut best: Option<(i32, Instant, usize, usize, Option<Difficulty>)> = None;
        for i in 0..self.entries.len() {
            for j in (i + 1)..self.entries.len() {
                let (a, b) = (&self.entries[i], &self.entries[j]);
                let Some(difficulty) = a.preference.agree(b.preference) else {
                    continue;
                };
                let gap = (a.rating - b.rating).abs();
                let oldest = a.enqueued_at.min(b.enqueued_at);
                if f64::from(gap) > self.tolerance(oldest, now) {
                    continue;
                }
                let better = match &best {
                    None => true,
                    Some((best_gap, best_oldest, ..)) => {
                        gap < *best_gap || (gap == *best_gap && oldest < *best_oldest)
                    }
                };
                if better {
                    best = Some((gap, oldest, i, j, difficulty));
                }
            }
        }

        let (_, _, i, j, difficulty) = best?;
        // j > i, so removing j first keeps i valid.
        let second = self.entries.remove(j);
        let first = self.entries.remove(i);
        Some(MatchedPair {
            first,
            second,
            difficulty,
        })
    }
}
