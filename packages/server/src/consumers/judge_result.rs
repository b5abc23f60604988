use std::sync::Arc;

use common::judge_result::JudgeResult;
use common::{RelayEventType, Verdict};
use mq::{BroccoliError, BrokerMessage, Mq};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::relay::Relay;
use crate::store::{Store, SubmissionUpdate};

/// Consume judge results from the result queue.
pub async fn consume_judge_results(
    store: Arc<dyn Store>,
    relay: Arc<Relay>,
    mq: Arc<Mq>,
    queue_name: String,
) {
    info!(queue = %queue_name, "Starting judge result consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // single-threaded for sequential DB writes
            None,
            move |message: BrokerMessage<JudgeResult>| {
                let store = Arc::clone(&store);
                let relay = Arc::clone(&relay);
                async move {
                    let result = message.payload;
                    let submission_id = result.submission_id;
                    let job_id = result.job_id.clone();

                    if let Err(e) = apply_judge_result(store.as_ref(), &relay, result).await {
                        error!(
                            submission_id,
                            job_id = %job_id,
                            error = %e,
                            "Failed to process judge result"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Judge result consumer stopped unexpectedly");
    }
}

/// Apply one judge result: credit a first solve, persist it and notify the
/// owner. Results that would move a submission backwards are dropped.
#[instrument(skip_all, fields(job_id = %result.job_id, submission_id = result.submission_id))]
pub async fn apply_judge_result(
    store: &dyn Store,
    relay: &Relay,
    result: JudgeResult,
) -> anyhow::Result<()> {
    if result.is_playground {
        if result.is_final()
            && let Some(user_id) = result.user_id
        {
            relay.send_to(
                user_id,
                RelayEventType::PlaygroundCompleted,
                json!({
                    "jobId": result.job_id,
                    "verdict": result.verdict,
                    "actual_output": result.output,
                    "status": result.status,
                }),
            );
        }
        return Ok(());
    }

    let Some(submission_id) = result.submission_id else {
        warn!("Judge result without submission id, dropping");
        return Ok(());
    };

    // Credit before the row goes terminal so a failed credit is retried with
    // the redelivered result; crediting is idempotent.
    let accepted = result.is_final() && result.verdict == Some(Verdict::Accepted);
    if accepted
        && let (Some(user_id), Some(problem_id)) = (result.user_id, result.problem_id)
    {
        let credited = store.credit_solve(user_id, problem_id).await?;
        debug!(user_id, problem_id, credited, "Solve recorded");
    }

    let applied = store
        .apply_update(
            submission_id,
            SubmissionUpdate {
                status: result.status,
                verdict: result.verdict,
                actual_output: result.output.clone(),
            },
        )
        .await?;

    if !applied {
        debug!(status = %result.status, "Stale judge result, skipping");
        return Ok(());
    }
    if !result.is_final() {
        return Ok(());
    }

    if let Some(user_id) = result.user_id {
        relay.send_to(
            user_id,
            RelayEventType::SubmissionCompleted,
            json!({
                "submissionId": submission_id,
                "verdict": result.verdict,
                "actual_output": result.output,
                "status": result.status,
            }),
        );
    }

    if accepted {
        relay.broadcast(
            RelayEventType::LeaderboardUpdate,
            json!({ "message": "Leaderboard updated" }),
        );
    }

    info!(
        status = %result.status,
        verdict = ?result.verdict,
        "Processed judge result"
    );
    Ok(())
}
