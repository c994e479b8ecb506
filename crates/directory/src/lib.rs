//! User directory: registered identities and their login state.
//!
//! The gateway treats identity as an external collaborator behind a trait so
//! a real backend can be swapped in later. The bundled implementation keeps
//! everything in memory, like the rest of the service.

use std::collections::HashMap;

use {async_trait::async_trait, tokio::sync::RwLock};

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("user already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("already logged in: {0}")]
    AlreadyActive(String),
    #[error("{0}")]
    InvalidInput(String),
}

// ── Trait ────────────────────────────────────────────────────────────────────

/// Registered identities and their active-login state.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create a new identity.
    async fn register(&self, username: &str, password: &str) -> Result<(), DirectoryError>;

    /// Mark an identity active. Refused while another login is active.
    async fn login(&self, username: &str, password: &str) -> Result<(), DirectoryError>;

    /// Clear the active login. A no-op for unknown or inactive users.
    async fn logout(&self, username: &str);

    /// Whether the identity exists and currently has an active login.
    async fn is_active(&self, username: &str) -> bool;

    /// All registered usernames, sorted.
    async fn list_users(&self) -> Vec<String>;
}

// ── In-memory implementation ─────────────────────────────────────────────────

struct UserRecord {
    password: String,
    active: bool,
}

/// In-memory reference implementation.
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn register(&self, username: &str, password: &str) -> Result<(), DirectoryError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(DirectoryError::InvalidInput(
                "username and password must not be empty".into(),
            ));
        }
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(DirectoryError::AlreadyExists(username.to_string()));
        }
        users.insert(username.to_string(), UserRecord {
            password: password.to_string(),
            active: false,
        });
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;
        let Some(record) = users.get_mut(username) else {
            return Err(DirectoryError::InvalidCredentials);
        };
        if !safe_equal(&record.password, password) {
            return Err(DirectoryError::InvalidCredentials);
        }
        if record.active {
            return Err(DirectoryError::AlreadyActive(username.to_string()));
        }
        record.active = true;
        Ok(())
    }

    async fn logout(&self, username: &str) {
        if let Some(record) = self.users.write().await.get_mut(username) {
            record.active = false;
        }
    }

    async fn is_active(&self, username: &str) -> bool {
        self.users
            .read()
            .await
            .get(username)
            .is_some_and(|r| r.active)
    }

    async fn list_users(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
