use common::judge_job::JudgeJob;
use common::judge_result::{JudgeResult, JudgeSystemErrorInfo};
use common::worker::{Task, TaskDecodeError};
use common::{SubmissionStatus, Verdict};
use mq::ResultPublisher;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::handlers::judge::handle_judge_job;
use crate::models::executor::SandboxExecutor;

/// Handle one task pulled from the job queue: decode it, judge it and publish
/// the progress and final results.
pub async fn process_task(
    task: Task,
    executor: &SandboxExecutor,
    publisher: &dyn ResultPublisher,
    result_queue: &str,
) -> Result<()> {
    let task_id = task.id.clone();
    let payload = task.payload.clone();

    let job: JudgeJob = match task.into_message() {
        Ok(job) => job,
        Err(TaskDecodeError::TypeMismatch { actual, .. }) => {
            warn!(task_type = %actual, "Unknown task type, skipping");
            return Ok(());
        }
        Err(e) => {
            error!(job_id = %task_id, error = %e, "Failed to parse JudgeJob");
            let result = undecodable_result(task_id, &payload, &e);
            if result.submission_id.is_some() {
                publisher.publish_result(result_queue, &result).await?;
            }
            return Ok(());
        }
    };

    process_job(&job, executor, publisher, result_queue).await
}

async fn process_job(
    job: &JudgeJob,
    executor: &SandboxExecutor,
    publisher: &dyn ResultPublisher,
    result_queue: &str,
) -> Result<()> {
    info!(
        submission_id = job.submission_id,
        job_id = %job.job_id,
        test_cases = job.test_cases.len(),
        is_playground = job.is_playground,
        "Processing judge job"
    );

    if !job.is_playground {
        publisher
            .publish_result(result_queue, &JudgeResult::running(job))
            .await?;
    }

    let result = handle_judge_job(job, executor).await;
    publisher.publish_result(result_queue, &result).await?;

    info!(
        submission_id = result.submission_id,
        status = %result.status,
        verdict = ?result.verdict,
        "Published result to queue"
    );
    Ok(())
}

/// Error result for a payload that could not be decoded, addressed with
/// whatever identifiers can still be read from it.
fn undecodable_result(
    job_id: String,
    payload: &serde_json::Value,
    err: &TaskDecodeError,
) -> JudgeResult {
    let read_id = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok())
    };
    let submission_id = read_id("submissionId");
    let info = JudgeSystemErrorInfo::new("DESERIALIZATION_ERROR", err.to_string());

    JudgeResult {
        job_id,
        submission_id,
        problem_id: read_id("problemId"),
        user_id: read_id("userId"),
        is_playground: submission_id.is_none(),
        status: SubmissionStatus::Error,
        verdict: Some(Verdict::Error),
        output: Some(info.message.clone()),
        error_info: Some(info),
    }
}
