use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mq::Message;

/// Test case data needed for judging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseData {
    /// Test case ID
    pub id: i32,
    /// Input data to feed to the program
    pub input: String,
    /// Expected output for comparison
    pub expected_output: String,
}

/// A judge job message sent to the worker queue.
///
/// Saved-problem submissions carry `submission_id` and the problem's test
/// cases. Playground runs carry only `input` and an optional
/// `expected_output` and never touch the submission table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeJob {
    /// Job identifier (UUID)
    pub job_id: String,
    pub submission_id: Option<i32>,
    pub code: String,
    /// Programming language (e.g., "cpp", "java", "python")
    pub language: String,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
    /// Test cases in judging order.
    #[serde(default)]
    pub test_cases: Vec<TestCaseData>,
    pub problem_id: Option<i32>,
    /// Owner of the job; completion events are relayed to this user.
    pub user_id: Option<i32>,
    pub is_playground: bool,
}

impl JudgeJob {
    /// Job for a stored submission against a problem's test cases.
    pub fn for_submission(
        submission_id: i32,
        problem_id: i32,
        user_id: Option<i32>,
        code: String,
        language: String,
        test_cases: Vec<TestCaseData>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            submission_id: Some(submission_id),
            code,
            language,
            input: None,
            expected_output: None,
            test_cases,
            problem_id: Some(problem_id),
            user_id,
            is_playground: false,
        }
    }

    /// Ad-hoc run that is never persisted.
    pub fn playground(
        user_id: Option<i32>,
        code: String,
        language: String,
        input: Option<String>,
        expected_output: Option<String>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            submission_id: None,
            code,
            language,
            input,
            expected_output,
            test_cases: vec![],
            problem_id: None,
            user_id,
            is_playground: true,
        }
    }

    pub fn test_case_ids(&self) -> Vec<i32> {
        self.test_cases.iter().map(|tc| tc.id).collect()
    }
}

impl Message for JudgeJob {
    fn message_type() -> &'static str {
        "judge_job"
    }

    fn message_id(&self) -> &str {
        &self.job_id
    }
}
