//! Gateway: the WebSocket/HTTP server tying rooms, presence and the user
//! directory together.
//!
//! Lifecycle:
//! 1. Load config, seed default rooms
//! 2. Build shared state (clients table + rooms/presence core)
//! 3. Start the HTTP server (room CRUD, identity, health)
//! 4. Attach the WebSocket upgrade handler
//!
//! Room and presence semantics live in their own crates; this crate decides
//! when a change is announced and to whom.

pub mod broadcast;
pub mod events;
pub mod http;
pub mod server;
pub mod state;
pub mod ws;
