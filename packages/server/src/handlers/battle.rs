use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;
use uuid::Uuid;

use crate::battle::{BattleView, SubmitSummary};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::battle::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Battles",
    operation_id = "getBattle",
    summary = "Get battle state",
    description = "Returns the live session while the battle runs, otherwise the stored battle row. Submitted code is never included.",
    params(
        ("id" = Uuid, Path, description = "Battle ID")
    ),
    responses(
        (status = 200, description = "Battle state", body = BattleView),
        (status = 404, description = "Battle not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(battle_id = %id))]
pub async fn get_battle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BattleView>, AppError> {
    Ok(Json(state.battles.get_battle(id).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/submit",
    tag = "Battles",
    operation_id = "submitBattleSolution",
    summary = "Submit a battle solution",
    description = "Judges the solution synchronously against the battle's test cases. Each player may submit once while the battle is active.",
    params(
        ("id" = Uuid, Path, description = "Battle ID")
    ),
    request_body = BattleSubmitRequest,
    responses(
        (status = 200, description = "Verdict summary", body = SubmitSummary),
        (status = 400, description = "Validation error or not a participant (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Battle not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Battle not active, already submitted or finished (CONFLICT)", body = ErrorBody),
        (status = 503, description = "No sandbox backend available (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(battle_id = %id, user_id = payload.user_id))]
pub async fn submit_battle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<BattleSubmitRequest>,
) -> Result<Json<SubmitSummary>, AppError> {
    validate_battle_submit(&payload)?;
    let summary = state
        .battles
        .submit(
            id,
            payload.user_id,
            payload.code,
            payload.language.trim().to_string(),
        )
        .await?;
    Ok(Json(summary))
}
