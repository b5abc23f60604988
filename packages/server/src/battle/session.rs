use std::time::Duration;

use chrono::{DateTime, Utc};
use common::Verdict;
use common::judge_job::TestCaseData;
use tokio::time::Instant;
use uuid::Uuid;

use super::BattleError;
use crate::entity::battle::{BattleStatus, WinReason};
use crate::store::{BattleRecord, PlayerResult, ProblemInfo};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub user_id: i32,
    pub username: String,
    pub rating: i32,
    /// Set before judging starts so a second submit is rejected.
    reserved: bool,
    result: Option<SubmissionResult>,
}

impl Player {
    pub fn new(user_id: i32, username: String, rating: i32) -> Self {
        Self {
            user_id,
            username,
            rating,
            reserved: false,
            result: None,
        }
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    fn accepted(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.verdict.is_accepted())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionResult {
    pub verdict: Verdict,
    /// Seconds since the battle started.
    pub time_secs: f64,
    pub code: String,
    pub language: String,
}

/// How a finished battle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Option<Side>,
    pub reason: WinReason,
}

/// One live battle. Timers are owned by the service; this type only holds
/// state and the rules that move it.
#[derive(Clone, Debug)]
pub struct BattleSession {
    pub id: Uuid,
    pub problem: ProblemInfo,
    pub test_cases: Vec<TestCaseData>,
    players: [Player; 2],
    status: BattleStatus,
    pub time_limit_secs: u64,
    pub created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    started_instant: Option<Instant>,
}

impl BattleSession {
    pub fn new(
        problem: ProblemInfo,
        test_cases: Vec<TestCaseData>,
        first: Player,
        second: Player,
        time_limit_secs: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem,
            test_cases,
            players: [first, second],
            status: BattleStatus::Waiting,
            time_limit_secs,
            created_at: Utc::now(),
            started_at: None,
            started_instant: None,
        }
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn player(&self, side: Side) -> &Player {
        &self.players[side.index()]
    }

    fn player_mut(&mut self, side: Side) -> &mut Player {
        &mut self.players[side.index()]
    }

    pub fn side_of(&self, user_id: i32) -> Option<Side> {
        if self.players[0].user_id == user_id {
            Some(Side::One)
        } else if self.players[1].user_id == user_id {
            Some(Side::Two)
        } else {
            None
        }
    }

    pub fn has_player(&self, user_id: i32) -> bool {
        self.side_of(user_id).is_some()
    }

    /// Countdown over: the clock starts now.
    pub fn activate(&mut self) {
        if self.status == BattleStatus::Waiting {
            self.status = BattleStatus::Active;
            self.started_at = Some(Utc::now());
            self.started_instant = Some(Instant::now());
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started_instant
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Time left on the session clock; zero once the limit has passed.
    pub fn remaining(&self) -> Duration {
        let limit = Duration::from_secs(self.time_limit_secs);
        match self.started_instant {
            Some(t) => limit.saturating_sub(t.elapsed()),
            None => limit,
        }
    }

    /// Claims the side's single submission slot.
    pub fn reserve(&mut self, side: Side) -> Result<(), BattleError> {
        if self.status != BattleStatus::Active {
            return Err(BattleError::NotActive);
        }
        let player = self.player_mut(side);
        if player.reserved {
            return Err(BattleError::AlreadySubmitted);
        }
        player.reserved = true;
        Ok(())
    }

    /// Gives the slot back after judging could not produce a verdict.
    pub fn release(&mut self, side: Side) {
        let player = self.player_mut(side);
        if player.result.is_none() {
            player.reserved = false;
        }
    }

    pub fn record(&mut self, side: Side, result: SubmissionResult) {
        self.player_mut(side).result = Some(result);
    }

    pub fn both_submitted(&self) -> bool {
        self.players.iter().all(|p| p.result.is_some())
    }

    /// `side` just got Accepted while the opponent has nothing recorded yet.
    pub fn should_start_grace(&self, side: Side) -> bool {
        self.player(side).accepted() && self.player(side.other()).result.is_none()
    }

    /// Winner by the scoring rules, evaluated at the moment the battle ends.
    pub fn resolve(&self) -> Resolution {
        let [a, b] = &self.players;
        match (&a.result, &b.result) {
            (Some(ra), Some(rb)) if a.accepted() && b.accepted() => {
                let winner = if rb.time_secs < ra.time_secs {
                    Side::Two
                } else {
                    Side::One
                };
                Resolution {
                    winner: Some(winner),
                    reason: WinReason::Speed,
                }
            }
            _ if a.accepted() => Resolution {
                winner: Some(Side::One),
                reason: WinReason::Accepted,
            },
            _ if b.accepted() => Resolution {
                winner: Some(Side::Two),
                reason: WinReason::Accepted,
            },
            (Some(_), None) => Resolution {
                winner: Some(Side::One),
                reason: WinReason::Accepted,
            },
            (None, Some(_)) => Resolution {
                winner: Some(Side::Two),
                reason: WinReason::Accepted,
            },
            _ => Resolution {
                winner: None,
                reason: WinReason::Draw,
            },
        }
    }

    pub fn forfeit(side: Side) -> Resolution {
        Resolution {
            winner: Some(side.other()),
            reason: WinReason::Forfeit,
        }
    }

    fn player_result(player: &Player) -> PlayerResult {
        match &player.result {
            Some(r) => PlayerResult {
                verdict: Some(r.verdict),
                time_secs: Some(r.time_secs),
                code: Some(r.code.clone()),
                language: Some(r.language.clone()),
            },
            None => PlayerResult::default(),
        }
    }

    /// Current state as a battle row.
    pub fn snapshot(&self) -> BattleRecord {
        BattleRecord {
            id: self.id,
            player1_id: self.players[0].user_id,
            player2_id: self.players[1].user_id,
            problem_id: self.problem.id,
            status: self.status,
            time_limit_secs: i32::try_from(self.time_limit_secs).unwrap_or(i32::MAX),
            started_at: self.started_at,
            ended_at: None,
            winner_id: None,
            win_reason: None,
            rating_delta: 0,
            player1: Self::player_result(&self.players[0]),
            player2: Self::player_result(&self.players[1]),
            created_at: self.created_at,
        }
    }

    /// Final row for a resolved battle.
    pub fn completed_record(&self, resolution: Resolution, rating_delta: i32) -> BattleRecord {
        BattleRecord {
            status: BattleStatus::Completed,
            ended_at: Some(Utc::now()),
            winner_id: resolution.winner.map(|side| self.player(side).user_id),
            win_reason: Some(resolution.reason),
            rating_delta,
            ..self.snapshot()
        }
    }

    pub fn cancelled_record(&self) -> BattleRecord {
        BattleRecord {
            status: BattleStatus::Cancelled,
            ended_at: Some(Utc::now()),
            ..self.snapshot()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::problem::Difficulty;

    fn session() -> BattleSession {
        let problem = ProblemInfo {
            id: 1,
            title: "Sum".into(),
            statement: String::new(),
            difficulty: Difficulty::Easy,
            points: None,
        };
        BattleSession::new(
            problem,
            vec![],
            Player::new(10, "a".into(), 1200),
            Player::new(20, "b".into(), 1200),
            600,
        )
    }

    fn result(verdict: Verdict, time_secs: f64) -> SubmissionResult {
        SubmissionResult {
            verdict,
            time_secs,
            code: "x".into(),
            language: "python".into(),
        }
    }

    #[test]
    fn test_submit_requires_active_battle() {
        let mut s = session();
        assert!(matches!(s.reserve(Side::One), Err(BattleError::NotActive)));
        s.activate();
        assert!(s.reserve(Side::One).is_ok());
        assert!(matches!(
            s.reserve(Side::One),
            Err(BattleError::AlreadySubmitted)
        ));
    }

    #[test]
    fn test_release_reopens_slot_only_without_result() {
        let mut s = session();
        s.activate();
        s.reserve(Side::One).unwrap();
        s.release(Side::One);
        assert!(s.reserve(Side::One).is_ok());

        s.record(Side::One, result(Verdict::WrongAnswer, 3.0));
        s.release(Side::One);
        assert!(s.reserve(Side::One).is_err());
    }

    #[test]
    fn test_both_accepted_faster_wins() {
        let mut s = session();
        s.record(Side::One, result(Verdict::Accepted, 42.0));
        s.record(Side::Two, result(Verdict::Accepted, 38.5));

        let r = s.resolve();
        assert_eq!(r.winner, Some(Side::Two));
        assert_eq!(r.reason, WinReason::Speed);
    }

    #[test]
    fn test_single_accepted_wins() {
        let mut s = session();
        s.record(Side::One, result(Verdict::WrongAnswer, 10.0));
        s.record(Side::Two, result(Verdict::Accepted, 50.0));

        assert_eq!(
            s.resolve(),
            Resolution {
                winner: Some(Side::Two),
                reason: WinReason::Accepted
            }
        );
    }

    #[test]
    fn test_only_submitter_wins_when_nobody_accepted() {
        let mut s = session();
        s.record(Side::One, result(Verdict::WrongAnswer, 10.0));

        let r = s.resolve();
        assert_eq!(r.winner, Some(Side::One));
        assert_eq!(r.reason, WinReason::Accepted);
    }

    #[test]
    fn test_no_submissions_is_a_draw() {
        let r = session().resolve();
        assert_eq!(r.winner, None);
        assert_eq!(r.reason, WinReason::Draw);
    }

    #[test]
    fn test_both_failed_is_a_draw() {
        let mut s = session();
        s.record(Side::One, result(Verdict::WrongAnswer, 10.0));
        s.record(Side::Two, result(Verdict::RuntimeError, 20.0));
        assert_eq!(s.resolve().reason, WinReason::Draw);
    }

    #[test]
    fn test_forfeit_awards_the_other_side() {
        assert_eq!(BattleSession::forfeit(Side::One).winner, Some(Side::Two));
        assert_eq!(BattleSession::forfeit(Side::Two).winner, Some(Side::One));
    }

    #[test]
    fn test_grace_starts_only_for_first_accepted() {
        let mut s = session();
        s.record(Side::One, result(Verdict::Accepted, 5.0));
        assert!(s.should_start_grace(Side::One));

        s.record(Side::Two, result(Verdict::WrongAnswer, 6.0));
        assert!(!s.should_start_grace(Side::One));
        assert!(!s.should_start_grace(Side::Two));
    }

    #[test]
    fn test_completed_record_carries_winner() {
        let mut s = session();
        s.activate();
        s.record(Side::Two, result(Verdict::Accepted, 12.0));

        let record = s.completed_record(s.resolve(), 16);
        assert_eq!(record.status, BattleStatus::Completed);
        assert_eq!(record.winner_id, Some(20));
        assert_eq!(record.win_reason, Some(WinReason::Accepted));
        assert_eq!(record.rating_delta, 16);
        assert_eq!(record.player2.verdict, Some(Verdict::Accepted));
        assert!(record.ended_at.is_some());
    }
}
