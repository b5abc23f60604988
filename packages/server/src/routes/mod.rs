mod v1;

use axum::routing::get;
use utoipa_axum::router::OpenApiRouter;

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes())
}

/// Live event socket, outside the documented REST surface.
pub fn ws_routes() -> axum::Router<AppState> {
    axum::Router::new().route("/ws", get(handlers::ws::ws_handler))
}
