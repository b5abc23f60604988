use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::SubmissionStatus;
use common::judge_job::JudgeJob;
use common::judge_result::{JudgeResult, JudgeSystemErrorInfo};
use common::worker::Task;
use tracing::{debug, info, instrument, warn};

use crate::consumers::apply_judge_result;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::state::AppState;
use crate::store::{NewSubmission, SubmissionRecord};

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit code for judging",
    description = "Queues code for asynchronous judging. With `problemId` a submission is stored and judged against the problem's test cases; otherwise the code runs once as an ad-hoc job. The outcome is delivered over the WebSocket as `submission_completed` or `playground_completed`.",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 202, description = "Job queued", body = CreateSubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(problem_id = ?payload.problem_id, user_id = ?payload.user_id))]
pub async fn create_submission(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_submission(&payload)?;
    let language = payload.language.trim().to_string();

    let job = match payload.problem_id {
        Some(problem_id) => {
            state
                .store
                .find_problem(problem_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;

            let submission = state
                .store
                .create_submission(NewSubmission {
                    code: payload.code.clone(),
                    language: language.clone(),
                    input: payload.input,
                    expected_output: payload.expected_output,
                    problem_id: Some(problem_id),
                    user_id: payload.user_id,
                })
                .await?;
            let test_cases = state.store.test_cases(problem_id).await?;

            JudgeJob::for_submission(
                submission.id,
                problem_id,
                payload.user_id,
                payload.code,
                language,
                test_cases,
            )
        }
        None => JudgeJob::playground(
            payload.user_id,
            payload.code,
            language,
            payload.input,
            payload.expected_output,
        ),
    };

    let response = CreateSubmissionResponse {
        message: "Submission queued",
        job_id: job.job_id.clone(),
        submission_id: job.submission_id,
        status: SubmissionStatus::Pending,
    };

    dispatch_judge_job(&state, job).await;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Hand the job to the queue, or to the in-process judge when the queue is
/// disabled. A job that cannot be queued is failed right away.
#[instrument(skip_all, fields(job_id = %job.job_id, submission_id = job.submission_id))]
async fn dispatch_judge_job(state: &AppState, job: JudgeJob) {
    let task = match Task::from_message(&job) {
        Ok(task) => task,
        Err(e) => {
            fail_job(state, &job, "ENCODE_FAILED", e.to_string()).await;
            return;
        }
    };

    let Some(ref mq) = state.mq else {
        debug!("MQ disabled, judging in-process");
        state.local_judge.spawn(task);
        return;
    };

    match mq.publish_task(&state.config.mq.queue_name, &task).await {
        Ok(()) => info!(test_cases = job.test_cases.len(), "Judge job enqueued"),
        Err(e) => {
            warn!(error = %e, "Failed to enqueue judge job");
            fail_job(state, &job, "ENQUEUE_FAILED", e.to_string()).await;
        }
    }
}

async fn fail_job(state: &AppState, job: &JudgeJob, code: &str, message: String) {
    let result = JudgeResult::system_error(job, JudgeSystemErrorInfo::new(code, message));
    if let Err(e) = apply_judge_result(state.store.as_ref(), &state.relay, result).await {
        warn!(error = %e, "Failed to record judge failure");
    }
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get a submission",
    params(
        ("id" = i32, Path, description = "Submission ID")
    ),
    responses(
        (status = 200, description = "Submission details", body = SubmissionRecord),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(submission_id = %id))]
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionRecord>, AppError> {
    let submission = state
        .store
        .find_submission(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;
    Ok(Json(submission))
}
