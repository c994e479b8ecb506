use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StugaConfig {
    pub gateway: GatewayConfig,
    pub rooms: RoomsConfig,
}

/// Bind address and port for the HTTP/WebSocket server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Room seeding and history retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Rooms created at startup.
    pub defaults: Vec<String>,

    /// Max messages retained per room. 0 = unlimited.
    pub history_limit: usize,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            defaults: vec!["general".into()],
            history_limit: 0,
        }
    }
}

impl RoomsConfig {
    /// Per-room history cap; `None` when unlimited.
    pub fn history_cap(&self) -> Option<usize> {
        (self.history_limit > 0).then_some(self.history_limit)
    }
}
