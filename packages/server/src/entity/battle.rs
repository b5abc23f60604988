use common::Verdict;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a battle session.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    #[sea_orm(string_value = "waiting")]
    Waiting,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BattleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Why a battle ended the way it did.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum WinReason {
    /// Both accepted; the faster submission won.
    #[sea_orm(string_value = "speed")]
    Speed,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "forfeit")]
    Forfeit,
    #[sea_orm(string_value = "draw")]
    Draw,
}

// Player columns are plain ids; both reference `user`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "battle")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub player1_id: i32,
    pub player2_id: i32,
    pub problem_id: i32,

    pub status: BattleStatus,
    pub time_limit_secs: i32,
    pub started_at: Option<DateTimeUtc>,
    pub ended_at: Option<DateTimeUtc>,

    pub winner_id: Option<i32>,
    pub win_reason: Option<WinReason>,
    pub rating_delta: i32,

    pub player1_verdict: Option<Verdict>,
    pub player1_time_secs: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub player1_code: Option<String>,
    pub player1_language: Option<String>,

    pub player2_verdict: Option<Verdict>,
    pub player2_time_secs: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub player2_code: Option<String>,
    pub player2_language: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
