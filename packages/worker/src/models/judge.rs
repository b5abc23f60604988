//! Output comparison and ordered test-case evaluation.

use std::time::Duration;

use common::Verdict;
use common::judge_job::TestCaseData;
use tracing::debug;

use super::executor::SandboxExecutor;
use super::sandbox::error::SandboxError;

pub const NO_TEST_CASES: &str = "No test cases configured for this problem";

/// Canonical form used for comparison: CRLF folded to LF, surrounding
/// whitespace removed.
pub fn normalize_output(raw: &str) -> String {
    raw.replace("\r\n", "\n").trim().to_string()
}

pub fn outputs_match(expected: &str, actual: &str) -> bool {
    normalize_output(expected) == normalize_output(actual)
}

/// Verdict and the output of the last case that ran.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    pub verdict: Verdict,
    pub output: String,
    pub cases_run: usize,
}

/// Run `code` against `test_cases` in order, stopping at the first case that
/// fails to run cleanly or whose output differs.
pub async fn judge_test_cases(
    executor: &SandboxExecutor,
    code: &str,
    language: &str,
    test_cases: &[TestCaseData],
    timeout: Option<Duration>,
) -> Result<JudgeOutcome, SandboxError> {
    if test_cases.is_empty() {
        return Ok(JudgeOutcome {
            verdict: Verdict::InternalError,
            output: NO_TEST_CASES.to_string(),
            cases_run: 0,
        });
    }

    let mut last_output = String::new();
    for (index, tc) in test_cases.iter().enumerate() {
        let report = executor.execute(code, &tc.input, language, timeout).await?;
        let cases_run = index + 1;

        if report.verdict != Verdict::Success {
            debug!(test_case_id = tc.id, verdict = %report.verdict, "Test case failed to run");
            return Ok(JudgeOutcome {
                verdict: report.verdict,
                output: report.output,
                cases_run,
            });
        }
        if !outputs_match(&tc.expected_output, &report.output) {
            debug!(test_case_id = tc.id, "Test case output mismatch");
            return Ok(JudgeOutcome {
                verdict: Verdict::WrongAnswer,
                output: report.output,
                cases_run,
            });
        }
        last_output = report.output;
    }

    Ok(JudgeOutcome {
        verdict: Verdict::Accepted,
        output: last_output,
        cases_run: test_cases.len(),
    })
}

/// Single ad-hoc run. With an expected output the result is judged
/// (Accepted / Wrong Answer); without one the raw run verdict is returned.
pub async fn judge_single(
    executor: &SandboxExecutor,
    code: &str,
    language: &str,
    stdin: &str,
    expected_output: Option<&str>,
) -> Result<JudgeOutcome, SandboxError> {
    let report = executor.execute(code, stdin, language, None).await?;

    let verdict = match (report.verdict, expected_output) {
        (Verdict::Success, Some(expected)) if outputs_match(expected, &report.output) => {
            Verdict::Accepted
        }
        (Verdict::Success, Some(_)) => Verdict::WrongAnswer,
        (verdict, _) => verdict,
    };

    Ok(JudgeOutcome {
        verdict,
        output: report.output,
        cases_run: 1,
    })
}
