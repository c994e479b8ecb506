//! REST surface: room CRUD, message history, the user directory, and health.
//!
//! Room-list mutations made here fan out `chatroomsUpdated` to every
//! connected client, same as mutations arriving over the WebSocket.
//!
//! Request bodies parse as loose JSON; an absent field reads as blank and
//! fails validation with the wire error shape, not an extractor rejection.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::info,
};

use {
    stuga_directory::DirectoryError,
    stuga_protocol::{ChatMessage, ErrorShape, PROTOCOL_VERSION, error_codes, events},
    stuga_rooms::RoomError,
};

use crate::{
    broadcast::{broadcast_all, deliver},
    events::broadcast_snapshot,
    state::GatewayState,
};

// ── Error mapping ────────────────────────────────────────────────────────────

/// A rejected request: HTTP status plus the wire error shape in the body.
pub struct ApiError {
    status: StatusCode,
    shape: ErrorShape,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.shape })),
        )
            .into_response()
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        let (status, code) = match &err {
            RoomError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            RoomError::AlreadyExists(_) => (StatusCode::BAD_REQUEST, error_codes::ALREADY_EXISTS),
            RoomError::InvalidInput(_) => (StatusCode::BAD_REQUEST, error_codes::INVALID_INPUT),
        };
        Self {
            status,
            shape: ErrorShape::new(code, err.to_string()),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        let (status, code) = match &err {
            DirectoryError::AlreadyExists(_) => {
                (StatusCode::BAD_REQUEST, error_codes::ALREADY_EXISTS)
            },
            DirectoryError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, error_codes::UNAUTHORIZED)
            },
            DirectoryError::AlreadyActive(_) => (StatusCode::FORBIDDEN, error_codes::UNAUTHORIZED),
            DirectoryError::InvalidInput(_) => (StatusCode::BAD_REQUEST, error_codes::INVALID_INPUT),
        };
        Self {
            status,
            shape: ErrorShape::new(code, err.to_string()),
        }
    }
}

// ── Room handlers ────────────────────────────────────────────────────────────

pub async fn list_chatrooms(State(state): State<Arc<GatewayState>>) -> Json<Vec<String>> {
    let core = state.core.lock().await;
    Json(core.rooms.list_rooms())
}

pub async fn create_chatroom(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = body.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let mut core = state.core.lock().await;
    core.rooms.create_room(name)?;
    broadcast_all(&state, events::CHATROOMS_UPDATED, serde_json::json!({})).await;
    info!(room = %name, "room created");
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

pub async fn delete_chatroom(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut core = state.core.lock().await;
    core.rooms.delete_room(&name)?;
    // Members are not evicted; stale presence corrects itself on the next
    // join, and in-flight messages may transparently recreate the room.
    broadcast_all(&state, events::CHATROOMS_UPDATED, serde_json::json!({})).await;
    info!(room = %name, "room deleted");
    Ok(Json(serde_json::json!({ "message": "room deleted" })))
}

pub async fn get_messages(
    State(state): State<Arc<GatewayState>>,
    Path(room): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let core = state.core.lock().await;
    Ok(Json(core.rooms.message_history(&room)?))
}

// ── Directory handlers ───────────────────────────────────────────────────────

pub async fn list_users(State(state): State<Arc<GatewayState>>) -> Json<Vec<String>> {
    Json(state.directory.list_users().await)
}

pub async fn register(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let username = body.get("username").and_then(|v| v.as_str()).unwrap_or("");
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or("");
    state.directory.register(username, password).await?;
    info!(user = %username, "user registered");
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

pub async fn login(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let username = body.get("username").and_then(|v| v.as_str()).unwrap_or("");
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or("");
    state.directory.login(username, password).await?;
    info!(user = %username, "user logged in");
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Logout succeeds unconditionally, even for unknown or inactive users.
pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let username = body.get("username").and_then(|v| v.as_str()).unwrap_or("");
    state.directory.logout(username).await;

    let mut core = state.core.lock().await;
    if let Some(vacated) = core.presence.logout(username) {
        if let Some(room) = &vacated.room {
            let members = core.presence.members_of(room);
            deliver(
                &state,
                &members,
                events::USER_LEFT,
                serde_json::json!({ "user": vacated.user }),
            )
            .await;
        }
        broadcast_snapshot(&state, &core).await;
    }
    info!(user = %username, "user logged out");
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Health ───────────────────────────────────────────────────────────────────

pub async fn health(State(state): State<Arc<GatewayState>>) -> Json<serde_json::Value> {
    let connections = state.client_count().await;
    let clients = state.clients.read().await;
    let client_list: Vec<_> = clients
        .values()
        .map(|c| {
            serde_json::json!({
                "connId": c.conn_id,
                "remoteIp": c.remote_ip,
                "connectedAt": c.connected_at.elapsed().as_secs(),
            })
        })
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "protocol": PROTOCOL_VERSION,
        "hostname": state.hostname,
        "connections": connections,
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "clients": client_list,
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use {stuga_directory::MemoryDirectory, stuga_rooms::RoomRegistry, tokio::sync::mpsc};

    use crate::state::ConnectedClient;

    use super::*;

    fn test_state() -> Arc<GatewayState> {
        GatewayState::new(
            Arc::new(MemoryDirectory::new()),
            RoomRegistry::with_defaults(&["general".to_string()]),
        )
    }

    #[test]
    fn room_errors_map_to_status_and_code() {
        let err: ApiError = RoomError::NotFound("x".into()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.shape.code, error_codes::NOT_FOUND);

        let err: ApiError = RoomError::AlreadyExists("x".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.shape.code, error_codes::ALREADY_EXISTS);
    }

    #[test]
    fn directory_errors_map_to_status_and_code() {
        let err: ApiError = DirectoryError::InvalidCredentials.into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.shape.code, error_codes::UNAUTHORIZED);

        let err: ApiError = DirectoryError::AlreadyActive("x".into()).into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.shape.code, error_codes::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_duplicate_room() {
        let state = test_state();
        let created = create_chatroom(
            State(Arc::clone(&state)),
            Json(serde_json::json!({ "name": "games" })),
        )
        .await;
        assert!(created.is_ok());

        let dup = create_chatroom(
            State(Arc::clone(&state)),
            Json(serde_json::json!({ "name": "games" })),
        )
        .await;
        let err = dup.err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let rooms = list_chatrooms(State(state)).await;
        assert_eq!(rooms.0, vec!["games".to_string(), "general".to_string()]);
    }

    #[tokio::test]
    async fn missing_name_is_invalid_input() {
        let state = test_state();
        let res = create_chatroom(State(state), Json(serde_json::json!({}))).await;
        let err = res.err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.shape.code, error_codes::INVALID_INPUT);
    }

    #[tokio::test]
    async fn delete_missing_room_is_not_found() {
        let state = test_state();
        let res = delete_chatroom(State(state), Path("nowhere".into())).await;
        assert_eq!(res.err().unwrap().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn history_of_missing_room_is_not_found() {
        let state = test_state();
        let res = get_messages(State(state), Path("nowhere".into())).await;
        assert_eq!(res.err().unwrap().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_clears_presence_entry() {
        let state = test_state();
        state.directory.register("alice", "pw").await.unwrap();
        state.directory.login("alice", "pw").await.unwrap();
        {
            let mut core = state.core.lock().await;
            core.presence.connect("c1");
            core.presence.authenticate("c1", "alice");
            core.presence.join("alice", "general");
        }

        logout(
            State(Arc::clone(&state)),
            Json(serde_json::json!({ "username": "alice" })),
        )
        .await;

        assert!(!state.directory.is_active("alice").await);
        let core = state.core.lock().await;
        assert!(core.presence.snapshot().is_empty());
        // The connection itself survives the logout.
        assert_eq!(core.presence.connection_count(), 1);
    }

    #[tokio::test]
    async fn health_lists_connected_clients() {
        let state = test_state();
        let (tx, _rx) = mpsc::unbounded_channel();
        state
            .register_client(ConnectedClient {
                conn_id: "c1".into(),
                sender: tx,
                connected_at: Instant::now(),
                remote_ip: Some("127.0.0.1".parse().unwrap()),
            })
            .await;

        let body = health(State(state)).await.0;
        assert_eq!(body["connections"], 1);
        assert_eq!(body["clients"][0]["connId"], "c1");
        assert_eq!(body["clients"][0]["remoteIp"], "127.0.0.1");
    }
}
