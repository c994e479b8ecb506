//! Room registry: named rooms, each with an ordered message history.
//!
//! The registry is a plain data store. It never touches the network; the
//! gateway decides when a change is worth announcing to clients.

use std::collections::{BTreeMap, VecDeque};

use stuga_protocol::ChatMessage;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(String),
    #[error("room already exists: {0}")]
    AlreadyExists(String),
    #[error("{0}")]
    InvalidInput(String),
}

// ── Types ────────────────────────────────────────────────────────────────────

/// What `append_message` does when the target room does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPolicy {
    /// Create the room on first reference, then append.
    CreateIfMissing,
    /// Reject the append with `NotFound`.
    RequireExisting,
}

/// A single room: its ordered history, oldest first.
#[derive(Debug, Default)]
struct Room {
    messages: VecDeque<ChatMessage>,
}

/// All rooms, keyed by name. BTreeMap keeps `list_rooms` alphabetical and
/// stable for a given snapshot.
pub struct RoomRegistry {
    rooms: BTreeMap<String, Room>,
    /// Max messages retained per room. `None` = unbounded.
    history_limit: Option<usize>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: BTreeMap::new(),
            history_limit: None,
        }
    }

    /// Registry pre-seeded with the configured default rooms.
    /// Blank or duplicate names are skipped.
    pub fn with_defaults(defaults: &[String]) -> Self {
        let mut reg = Self::new();
        for name in defaults {
            let _ = reg.create_room(name);
        }
        reg
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    /// Create a new empty room.
    pub fn create_room(&mut self, name: &str) -> Result<(), RoomError> {
        if name.trim().is_empty() {
            return Err(RoomError::InvalidInput("room name must not be empty".into()));
        }
        if self.rooms.contains_key(name) {
            return Err(RoomError::AlreadyExists(name.to_string()));
        }
        self.rooms.insert(name.to_string(), Room::default());
        Ok(())
    }

    /// Delete a room and discard its entire history.
    pub fn delete_room(&mut self, name: &str) -> Result<(), RoomError> {
        self.rooms
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RoomError::NotFound(name.to_string()))
    }

    pub fn room_exists(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// All room names, alphabetical.
    pub fn list_rooms(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    /// Full history of a room, oldest first.
    pub fn message_history(&self, name: &str) -> Result<Vec<ChatMessage>, RoomError> {
        self.rooms
            .get(name)
            .map(|r| r.messages.iter().cloned().collect())
            .ok_or_else(|| RoomError::NotFound(name.to_string()))
    }

    /// Append a message to a room's history.
    ///
    /// Returns `true` when this append created the room
    /// (only possible under `AppendPolicy::CreateIfMissing`).
    pub fn append_message(
        &mut self,
        room: &str,
        user: &str,
        message: &str,
        policy: AppendPolicy,
    ) -> Result<bool, RoomError> {
        if room.trim().is_empty() || user.trim().is_empty() || message.trim().is_empty() {
            return Err(RoomError::InvalidInput(
                "room, user and message must all be non-empty".into(),
            ));
        }
        let created = if self.rooms.contains_key(room) {
            false
        } else {
            match policy {
                AppendPolicy::RequireExisting => {
                    return Err(RoomError::NotFound(room.to_string()));
                },
                AppendPolicy::CreateIfMissing => {
                    self.rooms.insert(room.to_string(), Room::default());
                    true
                },
            }
        };

        // contains_key/insert above guarantee presence here.
        if let Some(entry) = self.rooms.get_mut(room) {
            if let Some(limit) = self.history_limit
                && limit > 0
            {
                while entry.messages.len() >= limit {
                    entry.messages.pop_front();
                }
            }
            entry.messages.push_back(ChatMessage {
                user: user.to_string(),
                message: message.to_string(),
            });
        }
        Ok(created)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_alphabetical() {
        let mut reg = RoomRegistry::new();
        reg.create_room("zebra").unwrap();
        reg.create_room("attic").unwrap();
        reg.create_room("mid").unwrap();
        assert_eq!(reg.list_rooms(), vec!["attic", "mid", "zebra"]);
    }

    #[test]
    fn duplicate_create_rejected() {
        let mut reg = RoomRegistry::new();
        reg.create_room("general").unwrap();
        assert_eq!(
            reg.create_room("general"),
            Err(RoomError::AlreadyExists("general".into()))
        );
    }

    #[test]
    fn blank_room_name_rejected() {
        let mut reg = RoomRegistry::new();
        assert!(matches!(
            reg.create_room("   "),
            Err(RoomError::InvalidInput(_))
        ));
    }

    #[test]
    fn delete_discards_history() {
        let mut reg = RoomRegistry::new();
        reg.create_room("general").unwrap();
        reg.append_message("general", "alice", "hi", AppendPolicy::RequireExisting)
            .unwrap();
        reg.delete_room("general").unwrap();
        assert_eq!(
            reg.message_history("general"),
            Err(RoomError::NotFound("general".into()))
        );
        // Re-creating yields an empty room, not the old history.
        reg.create_room("general").unwrap();
        assert!(reg.message_history("general").unwrap().is_empty());
    }

    #[test]
    fn delete_missing_room_not_found() {
        let mut reg = RoomRegistry::new();
        assert_eq!(
            reg.delete_room("attic"),
            Err(RoomError::NotFound("attic".into()))
        );
    }

    #[test]
    fn history_preserves_append_order() {
        let mut reg = RoomRegistry::new();
        reg.create_room("general").unwrap();
        for text in ["m1", "m2", "m3"] {
            reg.append_message("general", "alice", text, AppendPolicy::RequireExisting)
                .unwrap();
        }
        let history = reg.message_history("general").unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn append_require_existing_rejects_missing_room() {
        let mut reg = RoomRegistry::new();
        assert_eq!(
            reg.append_message("ghost", "alice", "hi", AppendPolicy::RequireExisting),
            Err(RoomError::NotFound("ghost".into()))
        );
        assert!(!reg.room_exists("ghost"));
    }

    #[test]
    fn append_create_if_missing_creates_room() {
        let mut reg = RoomRegistry::new();
        let created = reg
            .append_message("fresh", "alice", "hi", AppendPolicy::CreateIfMissing)
            .unwrap();
        assert!(created);
        assert_eq!(reg.list_rooms(), vec!["fresh"]);
        assert_eq!(reg.message_history("fresh").unwrap().len(), 1);

        // Second append into the same room reports no creation.
        let created = reg
            .append_message("fresh", "alice", "again", AppendPolicy::CreateIfMissing)
            .unwrap();
        assert!(!created);
    }

    #[test]
    fn blank_message_fields_rejected() {
        let mut reg = RoomRegistry::new();
        reg.create_room("general").unwrap();
        for (room, user, message) in [
            ("general", "alice", ""),
            ("general", "", "hi"),
            ("", "alice", "hi"),
            ("general", "alice", "   "),
        ] {
            assert!(
                matches!(
                    reg.append_message(room, user, message, AppendPolicy::CreateIfMissing),
                    Err(RoomError::InvalidInput(_))
                ),
                "should reject ({room:?}, {user:?}, {message:?})"
            );
        }
    }

    #[test]
    fn history_limit_evicts_oldest() {
        let mut reg = RoomRegistry::new().with_history_limit(Some(2));
        reg.create_room("general").unwrap();
        for text in ["m1", "m2", "m3"] {
            reg.append_message("general", "alice", text, AppendPolicy::RequireExisting)
                .unwrap();
        }
        let texts: Vec<String> = reg
            .message_history("general")
            .unwrap()
            .into_iter()
            .map(|m| m.message)
            .collect();
        assert_eq!(texts, vec!["m2", "m3"]);
    }

    #[test]
    fn defaults_are_seeded() {
        let reg = RoomRegistry::with_defaults(&["general".to_string()]);
        assert!(reg.room_exists("general"));
        assert_eq!(reg.room_count(), 1);
    }
}
