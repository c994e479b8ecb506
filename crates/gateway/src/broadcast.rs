//! Fan-out helpers: stateless routing over the live client table.
//!
//! Delivery is fire-and-forget. Sends are unbounded-channel pushes that
//! never block; a conn id with no live client is skipped. Delivery order
//! across receivers is unspecified, but each receiver sees frames in the
//! order they were sent to it.

use tracing::trace;

use stuga_protocol::{ErrorShape, EventFrame, events};

use crate::state::GatewayState;

/// Deliver an event to the given connection ids, at most once each.
/// Returns how many clients were handed the frame.
pub async fn deliver(
    state: &GatewayState,
    targets: &[String],
    event: &str,
    payload: serde_json::Value,
) -> usize {
    let frame = EventFrame::new(event, payload, state.next_seq());
    let Ok(json) = serde_json::to_string(&frame) else {
        return 0;
    };
    let clients = state.clients.read().await;
    let mut sent = 0;
    for conn_id in targets {
        if let Some(client) = clients.get(conn_id)
            && client.send(&json)
        {
            sent += 1;
        }
    }
    trace!(event, targets = targets.len(), sent, "delivered event");
    sent
}

/// Deliver an event to every connected client, authenticated or not.
pub async fn broadcast_all(
    state: &GatewayState,
    event: &str,
    payload: serde_json::Value,
) -> usize {
    let frame = EventFrame::new(event, payload, state.next_seq());
    let Ok(json) = serde_json::to_string(&frame) else {
        return 0;
    };
    let clients = state.clients.read().await;
    let mut sent = 0;
    for client in clients.values() {
        if client.send(&json) {
            sent += 1;
        }
    }
    trace!(event, sent, "broadcast event");
    sent
}

/// Send an `error` event to a single connection.
pub async fn send_error(state: &GatewayState, conn_id: &str, err: ErrorShape) -> bool {
    let frame = EventFrame::new(
        events::ERROR,
        serde_json::json!({ "code": err.code, "message": err.message }),
        state.next_seq(),
    );
    let Ok(json) = serde_json::to_string(&frame) else {
        return false;
    };
    let clients = state.clients.read().await;
    clients.get(conn_id).is_some_and(|c| c.send(&json))
}
