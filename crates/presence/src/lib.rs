//! Presence tracker: which connections are live, which identity each carries,
//! and which single room each identity currently occupies.
//!
//! Room membership is derived, never stored per-room: the members of a room
//! are exactly the entries whose `room` matches. Every transition returns
//! what was vacated so the caller can announce it.

use std::collections::HashMap;

use stuga_protocol::PresenceInfo;

// ── Types ────────────────────────────────────────────────────────────────────

/// Where an authenticated identity currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    /// The connection carrying this identity.
    pub conn_id: String,
    /// The single room the identity occupies, if any.
    pub room: Option<String>,
}

/// A (user, room) pairing that a transition vacated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vacated {
    pub user: String,
    pub room: Option<String>,
}

/// Result of a join: the room left behind by the switch, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomChange {
    pub previous: Option<String>,
}

/// Tracks live connections and one presence entry per authenticated identity.
pub struct PresenceTracker {
    /// conn_id → identity bound to it (None until the first join).
    conns: HashMap<String, Option<String>>,
    /// user → entry (reverse index of `conns` for authenticated connections).
    entries: HashMap<String, PresenceEntry>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            conns: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    /// Record a freshly opened connection.
    pub fn connect(&mut self, conn_id: &str) {
        self.conns.insert(conn_id.to_string(), None);
    }

    /// Bind `user` to `conn_id`, creating or re-pointing the presence entry.
    ///
    /// Last connection wins: a binding held by another connection is evicted
    /// (that connection stays open but carries no identity afterwards).
    /// Returns every (user, room) pairing the rebind vacated.
    pub fn authenticate(&mut self, conn_id: &str, user: &str) -> Vec<Vacated> {
        let mut vacated = Vec::new();

        // A connection switching identities gives up the old one first.
        if let Some(Some(old)) = self.conns.get(conn_id).cloned()
            && old != user
            && self.entries.get(&old).is_some_and(|e| e.conn_id == conn_id)
            && let Some(entry) = self.entries.remove(&old)
        {
            vacated.push(Vacated {
                user: old,
                room: entry.room,
            });
        }

        let already_here = self
            .entries
            .get(user)
            .is_some_and(|e| e.conn_id == conn_id);
        if !already_here
            && let Some(prev) = self.entries.insert(user.to_string(), PresenceEntry {
                conn_id: conn_id.to_string(),
                room: None,
            })
        {
            if let Some(slot) = self.conns.get_mut(&prev.conn_id) {
                *slot = None;
            }
            if prev.room.is_some() {
                vacated.push(Vacated {
                    user: user.to_string(),
                    room: prev.room,
                });
            }
        }

        self.conns.insert(conn_id.to_string(), Some(user.to_string()));
        vacated
    }

    /// Move `user` into `room`. Returns `None` when the user has no entry
    /// (never authenticated), otherwise the room the move vacated.
    pub fn join(&mut self, user: &str, room: &str) -> Option<RoomChange> {
        let entry = self.entries.get_mut(user)?;
        let previous = match entry.room.as_deref() {
            Some(current) if current == room => None,
            _ => entry.room.take(),
        };
        entry.room = Some(room.to_string());
        Some(RoomChange { previous })
    }

    /// Clear `user`'s room, but only if it still is `room`. Returns whether
    /// anything changed; a stale leave (wrong or no room) is a no-op.
    pub fn leave(&mut self, user: &str, room: &str) -> bool {
        match self.entries.get_mut(user) {
            Some(entry) if entry.room.as_deref() == Some(room) => {
                entry.room = None;
                true
            },
            _ => false,
        }
    }

    /// Drop a connection. Removes the identity's entry only when it still
    /// points at this connection, so a superseded connection's death cannot
    /// evict the newer login.
    pub fn disconnect(&mut self, conn_id: &str) -> Option<Vacated> {
        let user = self.conns.remove(conn_id)??;
        if self.entries.get(&user).is_some_and(|e| e.conn_id == conn_id)
            && let Some(entry) = self.entries.remove(&user)
        {
            return Some(Vacated {
                user,
                room: entry.room,
            });
        }
        None
    }

    /// Remove `user`'s entry without closing the connection that carried it.
    pub fn logout(&mut self, user: &str) -> Option<Vacated> {
        let entry = self.entries.remove(user)?;
        if let Some(slot) = self.conns.get_mut(&entry.conn_id) {
            *slot = None;
        }
        Some(Vacated {
            user: user.to_string(),
            room: entry.room,
        })
    }

    /// The identity bound to a connection, if any.
    pub fn identity_of(&self, conn_id: &str) -> Option<&str> {
        self.conns.get(conn_id).and_then(|u| u.as_deref())
    }

    /// The room a user occupies, if any.
    pub fn room_of(&self, user: &str) -> Option<&str> {
        self.entries.get(user).and_then(|e| e.room.as_deref())
    }

    /// Connection ids of every entry currently in `room`.
    pub fn members_of(&self, room: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.room.as_deref() == Some(room))
            .map(|e| e.conn_id.clone())
            .collect()
    }

    /// Online users and their rooms, sorted by user for stable payloads.
    pub fn snapshot(&self) -> Vec<PresenceInfo> {
        let mut list: Vec<PresenceInfo> = self
            .entries
            .iter()
            .map(|(user, entry)| PresenceInfo {
                user: user.clone(),
                room: entry.room.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.user.cmp(&b.user));
        list
    }

    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    pub fn online_count(&self) -> usize {
        self.entries.len()
    }
}
