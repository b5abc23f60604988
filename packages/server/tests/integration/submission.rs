use std::time::Duration;

use common::RelayEventType;
use serde_json::json;
use server::entity::problem::Difficulty;

use crate::common::{TestApp, routes};

const SUM_CASES: &[(&str, &str)] = &[("1 2", "3"), ("10 20", "30"), ("-4 4", "0")];

mod submission_creation {
    use super::*;

    #[tokio::test]
    async fn accepted_submission_completes_and_credits_points() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("alice", 1200).await;
        let problem_id = app.create_problem(Difficulty::Medium, SUM_CASES).await;

        let res = app
            .post(
                routes::SUBMISSIONS,
                &json!({
                    "code": "sum",
                    "language": "python",
                    "problemId": problem_id,
                    "userId": user_id,
                }),
            )
            .await;

        assert_eq!(res.status, 202, "{}", res.text);
        assert_eq!(res.body["message"], "Submission queued");
        assert_eq!(res.body["status"], "Pending");
        assert!(res.body["jobId"].is_string());
        let submission_id = res.body["submissionId"].as_i64().unwrap() as i32;

        let judged = app.wait_for_submission(submission_id).await;
        assert_eq!(judged["status"], "Completed");
        assert_eq!(judged["verdict"], "Accepted");
        assert_eq!(judged["problemId"], problem_id);
        assert_eq!(app.user(user_id).await.points, 2);
    }

    #[tokio::test]
    async fn snake_case_body_is_accepted() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("snake", 1200).await;
        let problem_id = app.create_problem(Difficulty::Easy, SUM_CASES).await;

        let res = app
            .post(
                routes::SUBMISSIONS,
                &json!({
                    "code": "sum",
                    "problem_id": problem_id,
                    "user_id": user_id,
                }),
            )
            .await;

        assert_eq!(res.status, 202, "{}", res.text);
        let submission_id = res.body["submissionId"].as_i64().unwrap() as i32;
        let judged = app.wait_for_submission(submission_id).await;
        assert_eq!(judged["language"], "python");
        assert_eq!(judged["verdict"], "Accepted");
    }

    #[tokio::test]
    async fn wrong_output_is_recorded_without_points() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("bob", 1200).await;
        let problem_id = app.create_problem(Difficulty::Easy, SUM_CASES).await;

        let res = app
            .post(
                routes::SUBMISSIONS,
                &json!({
                    "code": "print:3",
                    "problemId": problem_id,
                    "userId": user_id,
                }),
            )
            .await;
        let submission_id = res.body["submissionId"].as_i64().unwrap() as i32;

        let judged = app.wait_for_submission(submission_id).await;
        assert_eq!(judged["status"], "Completed");
        assert_eq!(judged["verdict"], "Wrong Answer");
        assert_eq!(app.user(user_id).await.points, 0);
    }

    #[tokio::test]
    async fn second_accepted_submission_does_not_credit_again() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("carol", 1200).await;
        let problem_id = app.create_problem(Difficulty::Hard, SUM_CASES).await;
        let body = json!({ "code": "sum", "problemId": problem_id, "userId": user_id });

        for _ in 0..2 {
            let res = app.post(routes::SUBMISSIONS, &body).await;
            let submission_id = res.body["submissionId"].as_i64().unwrap() as i32;
            let judged = app.wait_for_submission(submission_id).await;
            assert_eq!(judged["verdict"], "Accepted");
        }

        assert_eq!(app.user(user_id).await.points, 3);
    }

    #[tokio::test]
    async fn problem_without_test_cases_is_an_internal_error() {
        let app = TestApp::spawn().await;
        let problem_id = app.create_problem(Difficulty::Easy, &[]).await;

        let res = app
            .post(
                routes::SUBMISSIONS,
                &json!({ "code": "sum", "problemId": problem_id }),
            )
            .await;
        let submission_id = res.body["submissionId"].as_i64().unwrap() as i32;

        let judged = app.wait_for_submission(submission_id).await;
        assert_eq!(judged["verdict"], "Internal Error");
    }

    #[tokio::test]
    async fn completion_is_pushed_to_the_owner() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("dave", 1200).await;
        let problem_id = app.create_problem(Difficulty::Easy, SUM_CASES).await;
        let mut events = app.relay.subscribe_user(user_id);

        let res = app
            .post(
                routes::SUBMISSIONS,
                &json!({ "code": "sum", "problemId": problem_id, "userId": user_id }),
            )
            .await;
        let submission_id = res.body["submissionId"].clone();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("No completion event")
            .unwrap();
        assert_eq!(event.event_type, RelayEventType::SubmissionCompleted);
        assert_eq!(event.payload["submissionId"], submission_id);
        assert_eq!(event.payload["verdict"], "Accepted");
    }
}

mod playground {
    use super::*;

    #[tokio::test]
    async fn playground_run_has_no_submission_row() {
        let app = TestApp::spawn().await;
        let user_id = app.create_user("eve", 1200).await;
        let mut events = app.relay.subscribe_user(user_id);

        let res = app
            .post(
                routes::SUBMISSIONS,
                &json!({ "code": "echo", "input": "hello", "userId": user_id }),
            )
            .await;

        assert_eq!(res.status, 202, "{}", res.text);
        assert!(res.body["submissionId"].is_null());

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("No playground event")
            .unwrap();
        assert_eq!(event.event_type, RelayEventType::PlaygroundCompleted);
        assert_eq!(event.payload["jobId"], res.body["jobId"]);
        assert_eq!(event.payload["verdict"], "Success");
        assert_eq!(event.payload["actual_output"], "hello");
    }
}

mod submission_validation {
    use super::*;

    #[tokio::test]
    async fn blank_code_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::SUBMISSIONS, &json!({ "code": "   ", "language": "python" }))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.post_raw(routes::SUBMISSIONS, "{\"code\": ").await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_problem_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::SUBMISSIONS, &json!({ "code": "sum", "problemId": 999_999 }))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod submission_retrieval {
    use super::*;

    #[tokio::test]
    async fn unknown_submission_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::submission(424_242)).await;

        assert_eq!(res.status, 404);
    }
}
