use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    /// Whether judge jobs go through the MQ.
    pub queue_enabled: bool,
    pub queued_players: usize,
    pub live_battles: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Liveness probe",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse),
    ),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        queue_enabled: state.mq.is_some(),
        queued_players: state.battles.queue_len(),
        live_battles: state.battles.live_sessions(),
    })
}
