//! Persistence seams consumed by the judging pipeline and the battle service.
//!
//! Problems and users are owned by external collaborators; this crate only
//! reads them, credits points, and transfers ratings.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::judge_job::TestCaseData;
use common::{SubmissionStatus, Verdict};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::battle::{BattleStatus, WinReason};
use crate::entity::problem::Difficulty;

pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("{0}")]
    NotFound(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProblemInfo {
    pub id: i32,
    pub title: String,
    pub statement: String,
    pub difficulty: Difficulty,
    pub points: Option<i32>,
}

impl ProblemInfo {
    /// Points credited on first solve: configured value or the difficulty default.
    pub fn credit_points(&self) -> i32 {
        self.points.unwrap_or_else(|| self.difficulty.default_points())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub points: i32,
    pub rating: i32,
}

/// Input for a new stored submission.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub code: String,
    pub language: String,
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub problem_id: Option<i32>,
    pub user_id: Option<i32>,
}

/// A persisted submission.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: i32,
    pub code: String,
    pub language: String,
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub problem_id: Option<i32>,
    pub user_id: Option<i32>,
    pub status: SubmissionStatus,
    pub verdict: Option<Verdict>,
    pub actual_output: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Final fields written by the judging pipeline.
#[derive(Clone, Debug)]
pub struct SubmissionUpdate {
    pub status: SubmissionStatus,
    pub verdict: Option<Verdict>,
    pub actual_output: Option<String>,
}

/// One side's recorded battle submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub verdict: Option<Verdict>,
    /// Seconds since the battle started.
    pub time_secs: Option<f64>,
    #[serde(skip_serializing)]
    pub code: Option<String>,
    pub language: Option<String>,
}

/// A persisted battle row.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BattleRecord {
    pub id: Uuid,
    pub player1_id: i32,
    pub player2_id: i32,
    pub problem_id: i32,
    pub status: BattleStatus,
    pub time_limit_secs: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub winner_id: Option<i32>,
    pub win_reason: Option<WinReason>,
    pub rating_delta: i32,
    pub player1: PlayerResult,
    pub player2: PlayerResult,
    pub created_at: DateTime<Utc>,
}

/// Zero-sum rating change applied at battle completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatingTransfer {
    pub winner_id: i32,
    pub loser_id: i32,
    pub delta: i32,
}

#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn find_problem(&self, id: i32) -> Result<Option<ProblemInfo>, StoreError>;

    /// Random problem of the given difficulty, falling back to any difficulty.
    async fn random_problem(
        &self,
        difficulty: Difficulty,
    ) -> Result<Option<ProblemInfo>, StoreError>;

    /// Test cases in judging order (position, then id).
    async fn test_cases(&self, problem_id: i32) -> Result<Vec<TestCaseData>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i32) -> Result<Option<UserProfile>, StoreError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_submission(&self, new: NewSubmission) -> Result<SubmissionRecord, StoreError>;

    async fn find_submission(&self, id: i32) -> Result<Option<SubmissionRecord>, StoreError>;

    /// Applies the update only if the status transition is allowed. Returns
    /// whether the row changed.
    async fn apply_update(&self, id: i32, update: SubmissionUpdate) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SolvedStore: Send + Sync {
    /// Marks the problem solved and credits points. Returns `true` only for
    /// the call that actually inserted the marker.
    async fn credit_solve(&self, user_id: i32, problem_id: i32) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait BattleStore: Send + Sync {
    async fn create_battle(&self, record: &BattleRecord) -> Result<(), StoreError>;

    /// Writes the final row and applies the rating transfer in one transaction.
    async fn finalize_battle(
        &self,
        record: &BattleRecord,
        transfer: Option<RatingTransfer>,
    ) -> Result<(), StoreError>;

    async fn find_battle(&self, id: Uuid) -> Result<Option<BattleRecord>, StoreError>;
}

/// Everything the server needs from persistence.
pub trait Store: ProblemStore + UserStore + SubmissionStore + SolvedStore + BattleStore {}

impl<T> Store for T where T: ProblemStore + UserStore + SubmissionStore + SolvedStore + BattleStore {}
