use common::SubmissionStatus;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for creating a submission or an ad-hoc run.
///
/// With `problemId` the code is judged against the problem's test cases and
/// a submission row is stored. Without it the code runs once against
/// `input` (compared with `expectedOutput` when given).
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    #[schema(example = "a, b = map(int, input().split())\nprint(a + b)")]
    #[serde(default)]
    pub code: String,
    /// Programming language (e.g., "cpp", "java", "python").
    #[schema(example = "python")]
    #[serde(default = "default_language")]
    pub language: String,
    #[schema(example = 1)]
    #[serde(alias = "problem_id")]
    pub problem_id: Option<i32>,
    /// Owner of the submission. Completion events are relayed to this user.
    #[schema(example = 1)]
    #[serde(alias = "user_id")]
    pub user_id: Option<i32>,
    /// Stdin for ad-hoc runs.
    pub input: Option<String>,
    /// Expected stdout for ad-hoc runs.
    #[serde(alias = "expected_output")]
    pub expected_output: Option<String>,
}

fn default_language() -> String {
    "python".into()
}

/// Returned as soon as the job is queued.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionResponse {
    #[schema(example = "Submission queued")]
    pub message: &'static str,
    /// Judge job identifier (UUID).
    pub job_id: String,
    /// Stored submission id; null for ad-hoc runs.
    #[schema(example = 1)]
    pub submission_id: Option<i32>,
    pub status: SubmissionStatus,
}

pub fn validate_create_submission(req: &CreateSubmissionRequest) -> Result<(), AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::Validation("Code is required".into()));
    }
    if req.language.trim().is_empty() {
        return Err(AppError::Validation("Language is required".into()));
    }
    Ok(())
}
