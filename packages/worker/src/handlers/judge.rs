use common::judge_job::JudgeJob;
use common::judge_result::{JudgeResult, JudgeSystemErrorInfo};
use tracing::{error, info, instrument};

use crate::models::executor::SandboxExecutor;
use crate::models::judge::{judge_single, judge_test_cases};

/// Judge one job to a terminal result. Infrastructure failures become an
/// `Error` result rather than an `Err`, since jobs are never retried.
#[instrument(skip_all, fields(submission_id = job.submission_id, job_id = %job.job_id))]
pub async fn handle_judge_job(job: &JudgeJob, executor: &SandboxExecutor) -> JudgeResult {
    let outcome = if job.is_playground {
        judge_single(
            executor,
            &job.code,
            &job.language,
            job.input.as_deref().unwrap_or_default(),
            job.expected_output.as_deref(),
        )
        .await
    } else {
        judge_test_cases(
            executor,
            &job.code,
            &job.language,
            &job.test_cases,
            None,
        )
        .await
    };

    match outcome {
        Ok(outcome) => {
            info!(
                verdict = %outcome.verdict,
                cases_run = outcome.cases_run,
                "Judging completed"
            );
            JudgeResult::completed(job, outcome.verdict, outcome.output)
        }
        Err(e) => {
            error!(error = %e, "Judging failed");
            JudgeResult::system_error(job, JudgeSystemErrorInfo::new(e.code(), e.to_string()))
        }
    }
}
