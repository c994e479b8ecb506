//! Inbound client event handling: joinRoom, leaveRoom, chatMessage, and
//! connection teardown.
//!
//! A rejected event never fans out. The originating connection alone gets an
//! `error` event; everyone else sees nothing.

use tracing::{debug, info, warn};

use {
    stuga_protocol::{ClientFrame, ErrorShape, error_codes, events},
    stuga_rooms::{AppendPolicy, RoomError},
};

use crate::{
    broadcast::{broadcast_all, deliver, send_error},
    state::GatewayState,
};

/// Dispatch a parsed client frame.
pub async fn handle_frame(state: &GatewayState, conn_id: &str, frame: ClientFrame) {
    let result = match frame {
        ClientFrame::JoinRoom { room, user } => handle_join(state, conn_id, &room, &user).await,
        ClientFrame::LeaveRoom { room, user } => handle_leave(state, conn_id, &room, &user).await,
        ClientFrame::ChatMessage {
            room,
            user,
            message,
        } => handle_chat(state, conn_id, &room, &user, &message).await,
    };
    if let Err(err) = result {
        warn!(conn_id = %conn_id, code = %err.code, msg = %err.message, "event rejected");
        send_error(state, conn_id, err).await;
    }
}

/// Clean up after a closed connection and announce whatever it vacated.
pub async fn handle_disconnect(state: &GatewayState, conn_id: &str) {
    state.remove_client(conn_id).await;

    let mut core = state.core.lock().await;
    let Some(vacated) = core.presence.disconnect(conn_id) else {
        debug!(conn_id = %conn_id, "unbound connection closed");
        return;
    };
    if let Some(room) = &vacated.room {
        let members = core.presence.members_of(room);
        deliver(
            state,
            &members,
            events::USER_LEFT,
            serde_json::json!({ "user": vacated.user }),
        )
        .await;
    }
    state.directory.logout(&vacated.user).await;
    broadcast_snapshot(state, &core).await;
    info!(conn_id = %conn_id, user = %vacated.user, "user disconnected");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn handle_join(
    state: &GatewayState,
    conn_id: &str,
    room: &str,
    user: &str,
) -> Result<(), ErrorShape> {
    if room.trim().is_empty() || user.trim().is_empty() {
        return Err(ErrorShape::new(
            error_codes::INVALID_INPUT,
            "room and user must not be empty",
        ));
    }
    if !state.directory.is_active(user).await {
        return Err(ErrorShape::new(
            error_codes::UNAUTHORIZED,
            format!("no active login for {user}"),
        ));
    }

    let mut core = state.core.lock().await;

    // Rooms can be referenced before they exist (clients mint direct-message
    // rooms on the fly); the first join brings them into being.
    if !core.rooms.room_exists(room) {
        core.rooms.create_room(room).map_err(room_error)?;
        broadcast_all(state, events::CHATROOMS_UPDATED, serde_json::json!({})).await;
    }

    // Last connection wins; whatever seats the rebind vacated are announced
    // to their rooms before the new join.
    for vacated in core.presence.authenticate(conn_id, user) {
        if let Some(old_room) = &vacated.room {
            let members = core.presence.members_of(old_room);
            deliver(
                state,
                &members,
                events::USER_LEFT,
                serde_json::json!({ "user": vacated.user }),
            )
            .await;
        }
    }

    let Some(change) = core.presence.join(user, room) else {
        return Err(ErrorShape::new(
            error_codes::UNAUTHORIZED,
            format!("connection is not bound to {user}"),
        ));
    };
    if let Some(previous) = &change.previous {
        let members = core.presence.members_of(previous);
        deliver(
            state,
            &members,
            events::USER_LEFT,
            serde_json::json!({ "user": user }),
        )
        .await;
    }

    let members = core.presence.members_of(room);
    deliver(
        state,
        &members,
        events::USER_JOINED,
        serde_json::json!({ "user": user }),
    )
    .await;
    broadcast_snapshot(state, &core).await;

    debug!(conn_id = %conn_id, user, room, "joined room");
    Ok(())
}

async fn handle_leave(
    state: &GatewayState,
    conn_id: &str,
    room: &str,
    user: &str,
) -> Result<(), ErrorShape> {
    let mut core = state.core.lock().await;
    if core.presence.identity_of(conn_id) != Some(user) {
        return Err(ErrorShape::new(
            error_codes::UNAUTHORIZED,
            format!("connection is not bound to {user}"),
        ));
    }

    // A leave for a room the user is not in is stale, not an error.
    if core.presence.leave(user, room) {
        let members = core.presence.members_of(room);
        deliver(
            state,
            &members,
            events::USER_LEFT,
            serde_json::json!({ "user": user }),
        )
        .await;
        broadcast_snapshot(state, &core).await;
        debug!(conn_id = %conn_id, user, room, "left room");
    }
    Ok(())
}

async fn handle_chat(
    state: &GatewayState,
    conn_id: &str,
    room: &str,
    user: &str,
    message: &str,
) -> Result<(), ErrorShape> {
    let mut core = state.core.lock().await;
    if core.presence.identity_of(conn_id).is_none() {
        return Err(ErrorShape::new(
            error_codes::UNAUTHORIZED,
            "join a room before sending messages",
        ));
    }

    // `user` is the display name to attribute, not re-checked against the
    // bound identity.
    let created = core
        .rooms
        .append_message(room, user, message, AppendPolicy::CreateIfMissing)
        .map_err(room_error)?;
    if created {
        broadcast_all(state, events::CHATROOMS_UPDATED, serde_json::json!({})).await;
    }

    let members = core.presence.members_of(room);
    deliver(
        state,
        &members,
        events::CHAT_MESSAGE,
        serde_json::json!({ "user": user, "message": message }),
    )
    .await;
    debug!(conn_id = %conn_id, user, room, "chat message");
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Push the full presence snapshot to every connected client.
pub(crate) async fn broadcast_snapshot(state: &GatewayState, core: &crate::state::CoreState) {
    let snapshot = core.presence.snapshot();
    let payload = serde_json::to_value(snapshot).unwrap_or_default();
    broadcast_all(state, events::UPDATE_ONLINE_USERS, payload).await;
}

fn room_error(e: RoomError) -> ErrorShape {
    let code = match &e {
        RoomError::NotFound(_) => error_codes::NOT_FOUND,
        RoomError::AlreadyExists(_) => error_codes::ALREADY_EXISTS,
        RoomError::InvalidInput(_) => error_codes::INVALID_INPUT,
    };
    ErrorShape::new(code, e.to_string())
}
