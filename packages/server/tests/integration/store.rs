use std::sync::Arc;

use common::{SubmissionStatus, Verdict};
use sea_orm::{EntityTrait, PaginatorTrait};
use server::entity::battle::{BattleStatus, WinReason};
use server::entity::problem::{self, Difficulty};
use server::store::{
    BattleRecord, BattleStore, NewSubmission, PlayerResult, ProblemStore, RatingTransfer,
    SolvedStore, SubmissionStore, SubmissionUpdate,
};
use uuid::Uuid;

use crate::common::TestApp;

fn active_battle(player1_id: i32, player2_id: i32, problem_id: i32) -> BattleRecord {
    let now = chrono::Utc::now();
    BattleRecord {
        id: Uuid::new_v4(),
        player1_id,
        player2_id,
        problem_id,
        status: BattleStatus::Active,
        time_limit_secs: 900,
        started_at: Some(now),
        ended_at: None,
        winner_id: None,
        win_reason: None,
        rating_delta: 0,
        player1: PlayerResult::default(),
        player2: PlayerResult::default(),
        created_at: now,
    }
}

mod solves {
    use super::*;

    #[tokio::test]
    async fn concurrent_solves_credit_exactly_once() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("racer", 1200).await;
        let problem_id = app.create_problem(Difficulty::Medium, &[("1", "1")]).await;

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let store = Arc::clone(&app.store);
                tokio::spawn(async move { store.credit_solve(user_id, problem_id).await })
            })
            .collect();

        let mut credited = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                credited += 1;
            }
        }

        assert_eq!(credited, 1);
        assert_eq!(app.user(user_id).await.points, 2);
    }
}

mod submissions {
    use super::*;

    #[tokio::test]
    async fn final_status_is_never_overwritten() {
        let app = TestApp::spawn().await;
        let problem_id = app.create_problem(Difficulty::Easy, &[("1", "1")]).await;
        let submission = app
            .store
            .create_submission(NewSubmission {
                code: "echo".into(),
                language: "python".into(),
                input: None,
                expected_output: None,
                problem_id: Some(problem_id),
                user_id: None,
            })
            .await
            .unwrap();
        assert_eq!(submission.status, SubmissionStatus::Pending);

        let completed = app
            .store
            .apply_update(
                submission.id,
                SubmissionUpdate {
                    status: SubmissionStatus::Completed,
                    verdict: Some(Verdict::Accepted),
                    actual_output: Some("1".into()),
                },
            )
            .await
            .unwrap();
        assert!(completed);

        let regressed = app
            .store
            .apply_update(
                submission.id,
                SubmissionUpdate {
                    status: SubmissionStatus::Running,
                    verdict: None,
                    actual_output: None,
                },
            )
            .await
            .unwrap();
        assert!(!regressed);

        let stored = app
            .store
            .find_submission(submission.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
        assert_eq!(stored.verdict, Some(Verdict::Accepted));
        assert_eq!(stored.actual_output.as_deref(), Some("1"));
    }
}

mod problems {
    use super::*;

    #[tokio::test]
    async fn random_problem_falls_back_to_any_difficulty() {
        let app = TestApp::spawn().await;
        let problem_id = app.create_problem(Difficulty::Easy, &[("1", "1")]).await;

        let picked = app
            .store
            .random_problem(Difficulty::Hard)
            .await
            .unwrap()
            .expect("Expected a fallback problem");

        assert_eq!(picked.id, problem_id);
        assert_eq!(picked.difficulty, Difficulty::Easy);
    }

    #[tokio::test]
    async fn random_problem_on_empty_catalogue_is_none() {
        let app = TestApp::spawn().await;

        let picked = app.store.random_problem(Difficulty::Easy).await.unwrap();

        assert!(picked.is_none());
    }

    #[tokio::test]
    async fn test_cases_come_back_in_position_order() {
        let app = TestApp::spawn().await;
        let problem_id = app
            .create_problem(Difficulty::Easy, &[("a", "1"), ("b", "2"), ("c", "3")])
            .await;

        let cases = app.store.test_cases(problem_id).await.unwrap();

        let inputs: Vec<_> = cases.iter().map(|c| c.input.as_str()).collect();
        assert_eq!(inputs, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn sample_seed_runs_once() {
        let app = TestApp::spawn().await;

        server::seed::seed_sample_problems(&app.db).await.unwrap();
        server::seed::seed_sample_problems(&app.db).await.unwrap();

        let count = problem::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 10);

        let medium = app.store.random_problem(Difficulty::Medium).await.unwrap().unwrap();
        assert_eq!(medium.difficulty, Difficulty::Medium);
        assert_eq!(app.store.test_cases(medium.id).await.unwrap().len(), 5);
    }
}

mod battles {
    use super::*;

    #[tokio::test]
    async fn finalize_transfers_rating_with_floor() {
        let app = TestApp::spawn().await;
        let winner = app.create_user("winner", 1500).await;
        let loser = app.create_user("loser", 10).await;
        let problem_id = app.create_problem(Difficulty::Easy, &[("1", "1")]).await;

        let mut record = active_battle(winner, loser, problem_id);
        app.store.create_battle(&record).await.unwrap();

        record.status = BattleStatus::Completed;
        record.ended_at = Some(chrono::Utc::now());
        record.winner_id = Some(winner);
        record.win_reason = Some(WinReason::Forfeit);
        record.rating_delta = 16;
        app.store
            .finalize_battle(
                &record,
                Some(RatingTransfer {
                    winner_id: winner,
                    loser_id: loser,
                    delta: 16,
                }),
            )
            .await
            .unwrap();

        assert_eq!(app.user(winner).await.rating, 1516);
        assert_eq!(app.user(loser).await.rating, 0);

        let stored = app.store.find_battle(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BattleStatus::Completed);
        assert_eq!(stored.winner_id, Some(winner));
        assert_eq!(stored.win_reason, Some(WinReason::Forfeit));
        assert_eq!(stored.rating_delta, 16);
    }

    #[tokio::test]
    async fn draw_leaves_ratings_untouched() {
        let app = TestApp::spawn().await;
        let p1 = app.create_user("p1", 1300).await;
        let p2 = app.create_user("p2", 1250).await;
        let problem_id = app.create_problem(Difficulty::Easy, &[("1", "1")]).await;

        let mut record = active_battle(p1, p2, problem_id);
        app.store.create_battle(&record).await.unwrap();

        record.status = BattleStatus::Completed;
        record.win_reason = Some(WinReason::Draw);
        app.store.finalize_battle(&record, None).await.unwrap();

        assert_eq!(app.user(p1).await.rating, 1300);
        assert_eq!(app.user(p2).await.rating, 1250);
        let stored = app.store.find_battle(record.id).await.unwrap().unwrap();
        assert_eq!(stored.winner_id, None);
        assert_eq!(stored.win_reason, Some(WinReason::Draw));
    }
}
