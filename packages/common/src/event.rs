use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event delivered to live client sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelayEventType {
    SubmissionCompleted,
    PlaygroundCompleted,
    LeaderboardUpdate,
    BattleSearching,
    BattleFound,
    BattleStart,
    BattleOpponentTyping,
    BattleOpponentSubmitted,
    BattleSubmissionResult,
    BattleEnd,
    BattleError,
    BattleQueueLeft,
}

impl RelayEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmissionCompleted => "submission_completed",
            Self::PlaygroundCompleted => "playground_completed",
            Self::LeaderboardUpdate => "leaderboard_update",
            Self::BattleSearching => "battle_searching",
            Self::BattleFound => "battle_found",
            Self::BattleStart => "battle_start",
            Self::BattleOpponentTyping => "battle_opponent_typing",
            Self::BattleOpponentSubmitted => "battle_opponent_submitted",
            Self::BattleSubmissionResult => "battle_submission_result",
            Self::BattleEnd => "battle_end",
            Self::BattleError => "battle_error",
            Self::BattleQueueLeft => "battle_queue_left",
        }
    }
}

impl fmt::Display for RelayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event addressed to one user's sessions, or broadcast when `user_id` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEvent {
    pub user_id: Option<i32>,
    #[serde(rename = "type")]
    pub event_type: RelayEventType,
    pub payload: serde_json::Value,
}

impl RelayEvent {
    pub fn to_user(user_id: i32, event_type: RelayEventType, payload: serde_json::Value) -> Self {
        Self {
            user_id: Some(user_id),
            event_type,
            payload,
        }
    }

    pub fn broadcast(event_type: RelayEventType, payload: serde_json::Value) -> Self {
        Self {
            user_id: None,
            event_type,
            payload,
        }
    }

    /// Client-facing frame `{type, payload}`.
    pub fn to_frame(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.event_type,
            "payload": self.payload,
        })
    }
}
