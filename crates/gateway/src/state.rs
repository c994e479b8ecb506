use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use tokio::sync::{Mutex, RwLock, mpsc};

use {
    stuga_directory::UserDirectory, stuga_presence::PresenceTracker, stuga_rooms::RoomRegistry,
};

// ── Connected client ─────────────────────────────────────────────────────────

/// A WebSocket client currently connected to the gateway.
#[derive(Debug)]
pub struct ConnectedClient {
    pub conn_id: String,
    /// Channel for sending serialized frames to this client's write loop.
    pub sender: mpsc::UnboundedSender<String>,
    pub connected_at: Instant,
    pub remote_ip: Option<IpAddr>,
}

impl ConnectedClient {
    /// Send a serialized JSON frame to this client. Never blocks; a dead
    /// receiver just makes this return false.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}

// ── Core state ───────────────────────────────────────────────────────────────

/// Rooms and presence, guarded by one lock. Every mutation and the fan-out
/// it triggers happens inside the same critical section, which keeps
/// per-room message order total and membership views untorn.
pub struct CoreState {
    pub rooms: RoomRegistry,
    pub presence: PresenceTracker,
}

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
pub struct GatewayState {
    /// All connected WebSocket clients, keyed by conn_id.
    pub clients: RwLock<HashMap<String, ConnectedClient>>,
    /// Rooms + presence. Lock order: `core` before `clients`, never reverse.
    pub core: Mutex<CoreState>,
    /// Monotonically increasing sequence counter for event frames.
    pub seq: AtomicU64,
    /// Server version string.
    pub version: String,
    pub hostname: String,
    pub started_at: Instant,
    /// Identity collaborator consulted on join/login.
    pub directory: Arc<dyn UserDirectory>,
}

impl GatewayState {
    pub fn new(directory: Arc<dyn UserDirectory>, rooms: RoomRegistry) -> Arc<Self> {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".into());

        Arc::new(Self {
            clients: RwLock::new(HashMap::new()),
            core: Mutex::new(CoreState {
                rooms,
                presence: PresenceTracker::new(),
            }),
            seq: AtomicU64::new(0),
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname,
            started_at: Instant::now(),
            directory,
        })
    }

    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register a new client connection.
    pub async fn register_client(&self, client: ConnectedClient) {
        let conn_id = client.conn_id.clone();
        self.clients.write().await.insert(conn_id, client);
    }

    /// Remove a client by conn_id. Returns the removed client if found.
    pub async fn remove_client(&self, conn_id: &str) -> Option<ConnectedClient> {
        self.clients.write().await.remove(conn_id)
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}
