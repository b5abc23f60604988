//! In-memory store used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use common::judge_job::TestCaseData;
use uuid::Uuid;

use super::*;
use crate::battle::rating::apply_transfer;

#[derive(Default)]
struct Inner {
    problems: Vec<ProblemInfo>,
    test_cases: HashMap<i32, Vec<TestCaseData>>,
    users: HashMap<i32, UserProfile>,
    submissions: HashMap<i32, SubmissionRecord>,
    solved: HashSet<(i32, i32)>,
    battles: HashMap<Uuid, BattleRecord>,
    next_submission_id: i32,
    faults: HashSet<Fault>,
}

/// Store call that fails once after [`MemoryStore::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fault {
    TestCases,
    CreditSolve,
    FinalizeBattle,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: i32, rating: i32) {
        self.inner.lock().unwrap().users.insert(
            id,
            UserProfile {
                id,
                username: format!("user{id}"),
                points: 0,
                rating,
            },
        );
    }

    pub fn add_problem(&self, id: i32, difficulty: Difficulty, cases: &[(&str, &str)]) {
        let mut inner = self.inner.lock().unwrap();
        inner.problems.push(ProblemInfo {
            id,
            title: format!("Problem {id}"),
            statement: String::new(),
            difficulty,
            points: None,
        });
        let cases = cases
            .iter()
            .enumerate()
            .map(|(i, (input, expected))| TestCaseData {
                id: id * 100 + i as i32,
                input: input.to_string(),
                expected_output: expected.to_string(),
            })
            .collect();
        inner.test_cases.insert(id, cases);
    }

    pub fn fail_next(&self, fault: Fault) {
        self.inner.lock().unwrap().faults.insert(fault);
    }

    pub fn user(&self, id: i32) -> UserProfile {
        self.inner.lock().unwrap().users[&id].clone()
    }

    pub fn battle(&self, id: Uuid) -> Option<BattleRecord> {
        self.inner.lock().unwrap().battles.get(&id).cloned()
    }

    pub fn battles(&self) -> Vec<BattleRecord> {
        self.inner.lock().unwrap().battles.values().cloned().collect()
    }

    pub fn submission(&self, id: i32) -> Option<SubmissionRecord> {
        self.inner.lock().unwrap().submissions.get(&id).cloned()
    }
}

impl Inner {
    fn trip(&mut self, fault: Fault) -> Result<(), StoreError> {
        if self.faults.remove(&fault) {
            return Err(StoreError::Db(DbErr::Custom(format!("{fault:?} failed"))));
        }
        Ok(())
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn find_problem(&self, id: i32) -> Result<Option<ProblemInfo>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.problems.iter().find(|p| p.id == id).cloned())
    }

    async fn random_problem(
        &self,
        difficulty: Difficulty,
    ) -> Result<Option<ProblemInfo>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .problems
            .iter()
            .find(|p| p.difficulty == difficulty)
            .or_else(|| inner.problems.first())
            .cloned())
    }

    async fn test_cases(&self, problem_id: i32) -> Result<Vec<TestCaseData>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip(Fault::TestCases)?;
        Ok(inner.test_cases.get(&problem_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i32) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_submission(&self, new: NewSubmission) -> Result<SubmissionRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_submission_id += 1;
        let now = Utc::now();
        let record = SubmissionRecord {
            id: inner.next_submission_id,
            code: new.code,
            language: new.language,
            input: new.input,
            expected_output: new.expected_output,
            problem_id: new.problem_id,
            user_id: new.user_id,
            status: SubmissionStatus::Pending,
            verdict: None,
            actual_output: None,
            created_at: now,
            updated_at: now,
        };
        inner.submissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_submission(&self, id: i32) -> Result<Option<SubmissionRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().submissions.get(&id).cloned())
    }

    async fn apply_update(&self, id: i32, update: SubmissionUpdate) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .submissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Submission {id} not found")))?;
        if !row.status.can_transition_to(update.status) {
            return Ok(false);
        }
        row.status = update.status;
        row.verdict = update.verdict;
        row.actual_output = update.actual_output;
        row.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl SolvedStore for MemoryStore {
    async fn credit_solve(&self, user_id: i32, problem_id: i32) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip(Fault::CreditSolve)?;
        let points = inner
            .problems
            .iter()
            .find(|p| p.id == problem_id)
            .map(ProblemInfo::credit_points)
            .ok_or_else(|| StoreError::NotFound(format!("Problem {problem_id} not found")))?;
        if !inner.solved.insert((user_id, problem_id)) {
            return Ok(false);
        }
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.points += points;
        }
        Ok(true)
    }
}

#[async_trait]
impl BattleStore for MemoryStore {
    async fn create_battle(&self, record: &BattleRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .battles
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn finalize_battle(
        &self,
        record: &BattleRecord,
        transfer: Option<RatingTransfer>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.trip(Fault::FinalizeBattle)?;
        inner.battles.insert(record.id, record.clone());
        if let Some(t) = transfer {
            let winner = inner.users.get(&t.winner_id).map_or(0, |u| u.rating);
            let loser = inner.users.get(&t.loser_id).map_or(0, |u| u.rating);
            let (winner, loser) = apply_transfer(winner, loser, t.delta);
            if let Some(w) = inner.users.get_mut(&t.winner_id) {
                w.rating = winner;
            }
            if let Some(l) = inner.users.get_mut(&t.loser_id) {
                l.rating = loser;
            }
        }
        Ok(())
    }

    async fn find_battle(&self, id: Uuid) -> Result<Option<BattleRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().battles.get(&id).cloned())
    }
}
