use async_trait::async_trait;
use chrono::Utc;
use common::judge_job::TestCaseData;
use rand::seq::IndexedRandom;
use sea_orm::sea_query::{Expr, ExprTrait, LockType, OnConflict};
use sea_orm::*;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::*;
use crate::battle::rating::apply_transfer;
use crate::entity::{battle, problem, solved_problem, submission, test_case, user};

/// SeaORM-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    db: DatabaseConnection,
}

impl PostgresStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl From<problem::Model> for ProblemInfo {
    fn from(m: problem::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            statement: m.statement,
            difficulty: m.difficulty,
            points: m.points,
        }
    }
}

impl From<user::Model> for UserProfile {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            points: m.points,
            rating: m.rating,
        }
    }
}

impl From<submission::Model> for SubmissionRecord {
    fn from(m: submission::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            language: m.language,
            input: m.input,
            expected_output: m.expected_output,
            problem_id: m.problem_id,
            user_id: m.user_id,
            status: m.status,
            verdict: m.verdict,
            actual_output: m.actual_output,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<battle::Model> for BattleRecord {
    fn from(m: battle::Model) -> Self {
        Self {
            id: m.id,
            player1_id: m.player1_id,
            player2_id: m.player2_id,
            problem_id: m.problem_id,
            status: m.status,
            time_limit_secs: m.time_limit_secs,
            started_at: m.started_at,
            ended_at: m.ended_at,
            winner_id: m.winner_id,
            win_reason: m.win_reason,
            rating_delta: m.rating_delta,
            player1: PlayerResult {
                verdict: m.player1_verdict,
                time_secs: m.player1_time_secs,
                code: m.player1_code,
                language: m.player1_language,
            },
            player2: PlayerResult {
                verdict: m.player2_verdict,
                time_secs: m.player2_time_secs,
                code: m.player2_code,
                language: m.player2_language,
            },
            created_at: m.created_at,
        }
    }
}

fn battle_active_model(record: &BattleRecord) -> battle::ActiveModel {
    battle::ActiveModel {
        id: Set(record.id),
        player1_id: Set(record.player1_id),
        player2_id: Set(record.player2_id),
        problem_id: Set(record.problem_id),
        status: Set(record.status),
        time_limit_secs: Set(record.time_limit_secs),
        started_at: Set(record.started_at),
        ended_at: Set(record.ended_at),
        winner_id: Set(record.winner_id),
        win_reason: Set(record.win_reason),
        rating_delta: Set(record.rating_delta),
        player1_verdict: Set(record.player1.verdict),
        player1_time_secs: Set(record.player1.time_secs),
        player1_code: Set(record.player1.code.clone()),
        player1_language: Set(record.player1.language.clone()),
        player2_verdict: Set(record.player2.verdict),
        player2_time_secs: Set(record.player2.time_secs),
        player2_code: Set(record.player2.code.clone()),
        player2_language: Set(record.player2.language.clone()),
        created_at: Set(record.created_at),
    }
}

async fn set_rating<C: ConnectionTrait>(conn: &C, user_id: i32, rating: i32) -> Result<(), DbErr> {
    user::Entity::update_many()
        .col_expr(user::Column::Rating, Expr::value(rating))
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl ProblemStore for PostgresStore {
    async fn find_problem(&self, id: i32) -> Result<Option<ProblemInfo>, StoreError> {
        Ok(problem::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(ProblemInfo::from))
    }

    async fn random_problem(
        &self,
        difficulty: Difficulty,
    ) -> Result<Option<ProblemInfo>, StoreError> {
        let mut ids: Vec<i32> = problem::Entity::find()
            .select_only()
            .column(problem::Column::Id)
            .filter(problem::Column::Difficulty.eq(difficulty))
            .into_tuple()
            .all(&self.db)
            .await?;

        if ids.is_empty() {
            debug!(?difficulty, "No problem of requested difficulty, using any");
            ids = problem::Entity::find()
                .select_only()
                .column(problem::Column::Id)
                .into_tuple()
                .all(&self.db)
                .await?;
        }

        let Some(&id) = ids.choose(&mut rand::rng()) else {
            return Ok(None);
        };
        self.find_problem(id).await
    }

    async fn test_cases(&self, problem_id: i32) -> Result<Vec<TestCaseData>, StoreError> {
        let rows = test_case::Entity::find()
            .filter(test_case::Column::ProblemId.eq(problem_id))
            .order_by_asc(test_case::Column::Position)
            .order_by_asc(test_case::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|tc| TestCaseData {
                id: tc.id,
                input: tc.input,
                expected_output: tc.expected_output,
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn find_user(&self, id: i32) -> Result<Option<UserProfile>, StoreError> {
        Ok(user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(UserProfile::from))
    }
}

#[async_trait]
impl SubmissionStore for PostgresStore {
    async fn create_submission(&self, new: NewSubmission) -> Result<SubmissionRecord, StoreError> {
        let now = Utc::now();
        let model = submission::ActiveModel {
            code: Set(new.code),
            language: Set(new.language),
            input: Set(new.input),
            expected_output: Set(new.expected_output),
            status: Set(SubmissionStatus::Pending),
            verdict: Set(None),
            actual_output: Set(None),
            problem_id: Set(new.problem_id),
            user_id: Set(new.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?.into())
    }

    async fn find_submission(&self, id: i32) -> Result<Option<SubmissionRecord>, StoreError> {
        Ok(submission::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(SubmissionRecord::from))
    }

    #[instrument(skip(self, update), fields(status = %update.status))]
    async fn apply_update(&self, id: i32, update: SubmissionUpdate) -> Result<bool, StoreError> {
        let txn = self.db.begin().await?;

        let current = submission::Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Submission {id} not found")))?;

        if !current.status.can_transition_to(update.status) {
            debug!(current = %current.status, "Transition not allowed, skipping");
            txn.commit().await?;
            return Ok(false);
        }

        submission::ActiveModel {
            id: Set(id),
            status: Set(update.status),
            verdict: Set(update.verdict),
            actual_output: Set(update.actual_output),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        txn.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl SolvedStore for PostgresStore {
    #[instrument(skip(self))]
    async fn credit_solve(&self, user_id: i32, problem_id: i32) -> Result<bool, StoreError> {
        let txn = self.db.begin().await?;

        let problem = problem::Entity::find_by_id(problem_id)
            .one(&txn)
            .await?
            .map(ProblemInfo::from)
            .ok_or_else(|| StoreError::NotFound(format!("Problem {problem_id} not found")))?;

        let marker = solved_problem::ActiveModel {
            user_id: Set(user_id),
            problem_id: Set(problem_id),
            solved_at: Set(Utc::now()),
        };

        let inserted = match solved_problem::Entity::insert(marker)
            .on_conflict(
                OnConflict::columns([
                    solved_problem::Column::UserId,
                    solved_problem::Column::ProblemId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
        {
            Ok(rows) => rows > 0,
            Err(DbErr::RecordNotInserted) => false,
            Err(e) => return Err(e.into()),
        };

        if !inserted {
            txn.commit().await?;
            return Ok(false);
        }

        let points = problem.credit_points();
        user::Entity::update_many()
            .col_expr(
                user::Column::Points,
                Expr::col(user::Column::Points).add(points),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!(points, "Credited first solve");
        Ok(true)
    }
}

#[async_trait]
impl BattleStore for PostgresStore {
    async fn create_battle(&self, record: &BattleRecord) -> Result<(), StoreError> {
        battle::Entity::insert(battle_active_model(record))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, record, transfer), fields(battle_id = %record.id))]
    async fn finalize_battle(
        &self,
        record: &BattleRecord,
        transfer: Option<RatingTransfer>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        battle_active_model(record).update(&txn).await?;

        if let Some(t) = transfer {
            let players = user::Entity::find()
                .filter(user::Column::Id.is_in([t.winner_id, t.loser_id]))
                .lock(LockType::Update)
                .all(&txn)
                .await?;

            let rating_of = |id: i32| {
                players
                    .iter()
                    .find(|u| u.id == id)
                    .map(|u| u.rating)
                    .ok_or_else(|| StoreError::NotFound(format!("User {id} not found")))
            };
            let winner_rating = rating_of(t.winner_id)?;
            let loser_rating = rating_of(t.loser_id)?;

            let (winner_new, loser_new) = apply_transfer(winner_rating, loser_rating, t.delta);
            set_rating(&txn, t.winner_id, winner_new).await?;
            set_rating(&txn, t.loser_id, loser_new).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn find_battle(&self, id: Uuid) -> Result<Option<BattleRecord>, StoreError> {
        Ok(battle::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(BattleRecord::from))
    }
}
