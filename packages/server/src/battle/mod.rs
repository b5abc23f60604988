//! Real-time 1v1 battles: matchmaking, session state machine and scoring.

pub mod matchmaking;
pub mod rating;
pub mod service;
pub mod session;

use thiserror::Error;
use worker::SandboxError;

use crate::store::StoreError;

pub use matchmaking::{DifficultyPreference, MatchmakingPool, QueueEntry};
pub use service::{BattleService, BattleView, SubmitSummary};
pub use session::{BattleSession, Resolution, Side};

#[derive(Debug, Error)]
pub enum BattleError {
    #[error("Battle not found")]
    NotFound,
    #[error("User is not a participant of this battle")]
    NotParticipant,
    #[error("Battle is not active")]
    NotActive,
    #[error("Solution already submitted")]
    AlreadySubmitted,
    #[error("Battle already finished")]
    Finished,
    #[error("User {0} not found")]
    UnknownUser(i32),
    #[error("User is already in a battle")]
    InBattle,
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
