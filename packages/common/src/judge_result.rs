use crate::judge_job::JudgeJob;
use crate::mq::Message;
use crate::{SubmissionStatus, Verdict};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeSystemErrorInfo {
    /// Machine-readable error code (e.g., "SANDBOX_ERROR").
    pub code: String,
    /// Human-readable error description.
    pub message: String,
}

impl JudgeSystemErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Message published by the worker on the result queue.
///
/// A job produces at most one `Running` progress message followed by exactly
/// one final message (`Completed` or `Error`).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JudgeResult {
    /// Original job ID.
    pub job_id: String,
    pub submission_id: Option<i32>,
    pub problem_id: Option<i32>,
    pub user_id: Option<i32>,
    pub is_playground: bool,
    pub status: SubmissionStatus,
    /// Final verdict (None while running).
    pub verdict: Option<Verdict>,
    /// Output of the last executed test case, compiler diagnostics, or error text.
    pub output: Option<String>,
    /// Structured error info (only for `Error` status).
    pub error_info: Option<JudgeSystemErrorInfo>,
}

impl JudgeResult {
    fn from_job(job: &JudgeJob, status: SubmissionStatus) -> Self {
        Self {
            job_id: job.job_id.clone(),
            submission_id: job.submission_id,
            problem_id: job.problem_id,
            user_id: job.user_id,
            is_playground: job.is_playground,
            status,
            verdict: None,
            output: None,
            error_info: None,
        }
    }

    /// Progress notice sent when a worker slot picks the job up.
    pub fn running(job: &JudgeJob) -> Self {
        Self::from_job(job, SubmissionStatus::Running)
    }

    pub fn completed(job: &JudgeJob, verdict: Verdict, output: String) -> Self {
        Self {
            verdict: Some(verdict),
            output: Some(output),
            ..Self::from_job(job, SubmissionStatus::Completed)
        }
    }

    /// Create a result indicating a judging failure. The error message doubles
    /// as the stored output.
    pub fn system_error(job: &JudgeJob, error_info: JudgeSystemErrorInfo) -> Self {
        Self {
            verdict: Some(Verdict::Error),
            output: Some(error_info.message.clone()),
            error_info: Some(error_info),
            ..Self::from_job(job, SubmissionStatus::Error)
        }
    }

    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }
}

impl Message for JudgeResult {
    fn message_type() -> &'static str {
        "judge_result"
    }

    fn message_id(&self) -> &str {
        &self.job_id
    }
}
