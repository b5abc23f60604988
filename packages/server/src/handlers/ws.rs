use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use common::{RelayEvent, RelayEventType};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::battle::{BattleError, DifficultyPreference};
use crate::state::AppState;

/// Inbound socket frame `{type, payload}`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinUser {
        user_id: i32,
    },
    BattleJoinQueue {
        user_id: i32,
        #[serde(default)]
        difficulty: DifficultyPreference,
    },
    BattleLeaveQueue {
        user_id: i32,
    },
    BattleTyping {
        battle_id: Uuid,
        user_id: i32,
        #[serde(default)]
        line_count: u32,
        #[serde(default)]
        language: String,
    },
    BattleForfeit {
        battle_id: Uuid,
        user_id: i32,
    },
}

/// Per-socket state: the user this socket speaks for and its relay topic.
#[derive(Default)]
struct Connection {
    user_id: Option<i32>,
    events: Option<broadcast::Receiver<RelayEvent>>,
}

impl Connection {
    fn bind(&mut self, state: &AppState, user_id: i32) {
        if self.user_id == Some(user_id) {
            return;
        }
        if let Some(previous) = self.user_id {
            state.battles.on_disconnect(previous);
        }
        self.user_id = Some(user_id);
        self.events = Some(state.relay.subscribe_user(user_id));
        debug!(user_id, "Socket joined user topic");
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[instrument(skip_all)]
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut global = state.relay.subscribe_global();
    let mut conn = Connection::default();

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(frame) = handle_client_message(&state, &mut conn, text.as_str()).await
                        && send_frame(&mut socket, &frame).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "Socket receive failed");
                    break;
                }
            },
            event = recv_optional(&mut conn.events) => match event {
                Ok(event) => {
                    if send_frame(&mut socket, &event.to_frame()).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = ?conn.user_id, skipped, "Socket lagging, dropped events");
                }
                Err(RecvError::Closed) => conn.events = None,
            },
            event = global.recv() => match event {
                Ok(event) => {
                    if send_frame(&mut socket, &event.to_frame()).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Socket lagging on broadcasts");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Some(user_id) = conn.user_id {
        state.battles.on_disconnect(user_id);
        info!(user_id, "Socket disconnected");
    }
}

async fn recv_optional(
    rx: &mut Option<broadcast::Receiver<RelayEvent>>,
) -> Result<RelayEvent, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &serde_json::Value) -> Result<(), axum::Error> {
    socket.send(Message::Text(frame.to_string().into())).await
}

fn error_frame(message: impl Into<String>) -> serde_json::Value {
    json!({
        "type": RelayEventType::BattleError,
        "payload": { "message": message.into() },
    })
}

/// Applies one inbound frame. Returns a frame to send straight back on
/// failure; successful operations answer through the relay.
async fn handle_client_message(
    state: &AppState,
    conn: &mut Connection,
    text: &str,
) -> Option<serde_json::Value> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Ignoring malformed socket frame");
            return None;
        }
    };

    let result: Result<(), BattleError> = match message {
        ClientMessage::JoinUser { user_id } => {
            conn.bind(state, user_id);
            Ok(())
        }
        ClientMessage::BattleJoinQueue {
            user_id,
            difficulty,
        } => {
            conn.bind(state, user_id);
            state.battles.join_queue(user_id, difficulty).await
        }
        ClientMessage::BattleLeaveQueue { user_id } => {
            state.battles.leave_queue(user_id);
            Ok(())
        }
        ClientMessage::BattleTyping {
            battle_id,
            user_id,
            line_count,
            language,
        } => {
            state
                .battles
                .typing(battle_id, user_id, line_count, &language);
            Ok(())
        }
        ClientMessage::BattleForfeit { battle_id, user_id } => {
            state.battles.forfeit(battle_id, user_id).await
        }
    };

    match result {
        Ok(()) => None,
        Err(BattleError::Store(e)) => {
            warn!(error = %e, "Battle operation failed");
            Some(error_frame("Battle service unavailable"))
        }
        Err(e) => Some(error_frame(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_queue_join_with_default_difficulty() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"battle_join_queue","payload":{"userId":3}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::BattleJoinQueue {
                user_id: 3,
                difficulty: DifficultyPreference::Any,
            }
        );
    }

    #[test]
    fn test_parses_lowercase_difficulty() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"battle_join_queue","payload":{"userId":3,"difficulty":"hard"}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::BattleJoinQueue {
                difficulty: DifficultyPreference::Hard,
                ..
            }
        ));
    }

    #[test]
    fn test_parses_typing_heartbeat() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"battle_typing","payload":{{"battleId":"{id}","userId":1,"lineCount":14,"language":"go"}}}}"#
        );
        let msg: ClientMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            msg,
            ClientMessage::BattleTyping {
                battle_id: id,
                user_id: 1,
                line_count: 14,
                language: "go".into(),
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"hello","payload":{}}"#).is_err());
    }
}
