//! Wire protocol shared by the gateway and its clients.
//!
//! Everything on the wire is JSON text. Clients send [`ClientFrame`]s;
//! the server answers with [`EventFrame`] envelopes carrying a per-process
//! sequence number so clients can spot gaps after a reconnect.

use serde::{Deserialize, Serialize};

/// Bumped whenever a frame shape changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 2;

// ── Event names ──────────────────────────────────────────────────────────────

/// Server→client event names.
pub mod events {
    /// Room-scoped: a message was posted to the room.
    pub const CHAT_MESSAGE: &str = "chatMessage";
    /// Room-scoped: a user entered the room.
    pub const USER_JOINED: &str = "userJoined";
    /// Room-scoped: a user left the room.
    pub const USER_LEFT: &str = "userLeft";
    /// Global: full presence snapshot.
    pub const UPDATE_ONLINE_USERS: &str = "updateOnlineUsers";
    /// Global: the room list changed; clients should re-fetch it.
    pub const CHATROOMS_UPDATED: &str = "chatroomsUpdated";
    /// Sent only to the connection whose own frame was rejected.
    pub const ERROR: &str = "error";
}

// ── Error codes ──────────────────────────────────────────────────────────────

pub mod error_codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
}

/// Structured error carried in `error` events and HTTP error bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}

impl ErrorShape {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

// ── Client frames ────────────────────────────────────────────────────────────

/// A frame sent by a client over the WebSocket, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Enter a room (and authenticate the connection as `user`).
    #[serde(rename = "joinRoom")]
    JoinRoom { room: String, user: String },
    /// Leave a room explicitly.
    #[serde(rename = "leaveRoom")]
    LeaveRoom { room: String, user: String },
    /// Post a message to a room. `user` is the display name to attribute.
    #[serde(rename = "chatMessage")]
    ChatMessage {
        room: String,
        user: String,
        message: String,
    },
}

impl ClientFrame {
    /// Parse a raw WebSocket text payload.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// Failure to interpret an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(String),
}

// ── Event frames ─────────────────────────────────────────────────────────────

/// Server→client event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub seq: u64,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, payload: serde_json::Value, seq: u64) -> Self {
        Self {
            frame_type: "event".into(),
            event: event.into(),
            payload,
            seq,
        }
    }
}

// ── Payload types ────────────────────────────────────────────────────────────

/// A stored chat message; also the `chatMessage` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user: String,
    pub message: String,
}

/// One entry of the `updateOnlineUsers` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceInfo {
    pub user: String,
    /// `None` while the user is online but not in any room.
    pub room: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_room() {
        let frame = ClientFrame::parse(r#"{"type":"joinRoom","room":"general","user":"alice"}"#)
            .unwrap();
        assert_eq!(frame, ClientFrame::JoinRoom {
            room: "general".into(),
            user: "alice".into(),
        });
    }

    #[test]
    fn parses_leave_room() {
        let frame = ClientFrame::parse(r#"{"type":"leaveRoom","room":"general","user":"alice"}"#)
            .unwrap();
        assert_eq!(frame, ClientFrame::LeaveRoom {
            room: "general".into(),
            user: "alice".into(),
        });
    }

    #[test]
    fn parses_chat_message() {
        let frame = ClientFrame::parse(
            r#"{"type":"chatMessage","room":"general","user":"alice","message":"hi"}"#,
        )
        .unwrap();
        assert_eq!(frame, ClientFrame::ChatMessage {
            room: "general".into(),
            user: "alice".into(),
            message: "hi".into(),
        });
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(ClientFrame::parse(r#"{"type":"shoutRoom","room":"x","user":"y"}"#).is_err());
    }

    #[test]
    fn rejects_non_json() {
        assert!(ClientFrame::parse("not json").is_err());
    }

    #[test]
    fn event_frame_envelope_shape() {
        let frame = EventFrame::new(
            events::USER_JOINED,
            serde_json::json!({"user": "alice"}),
            7,
        );
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"], "userJoined");
        assert_eq!(json["payload"]["user"], "alice");
        assert_eq!(json["seq"], 7);
    }

    #[test]
    fn error_shape_display() {
        let err = ErrorShape::new(error_codes::NOT_FOUND, "no such room: attic");
        assert_eq!(err.to_string(), "NOT_FOUND: no such room: attic");
    }
}
