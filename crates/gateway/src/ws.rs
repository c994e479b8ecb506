//! Per-connection WebSocket lifecycle.
//!
//! Each connection gets an unbounded outbound queue; a spawned writer drains
//! it into the socket so event fan-out never waits on a slow peer.

use std::{net::SocketAddr, sync::Arc, time::Instant};

use {
    axum::extract::ws::{Message, WebSocket},
    futures::{SinkExt, StreamExt},
    tokio::sync::mpsc,
    tokio_stream::wrappers::UnboundedReceiverStream,
    tracing::{debug, info, warn},
    uuid::Uuid,
};

use stuga_protocol::{ClientFrame, ErrorShape, error_codes};

use crate::{
    broadcast::send_error,
    events::{handle_disconnect, handle_frame},
    state::{ConnectedClient, GatewayState},
};

/// Drive one WebSocket connection from upgrade to teardown.
pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, addr: SocketAddr) {
    let conn_id = Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let mut outbound = UnboundedReceiverStream::new(rx);
    let write_task = tokio::spawn(async move {
        while let Some(frame) = outbound.next().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    state
        .register_client(ConnectedClient {
            conn_id: conn_id.clone(),
            sender: tx,
            connected_at: Instant::now(),
            remote_ip: Some(addr.ip()),
        })
        .await;
    state.core.lock().await.presence.connect(&conn_id);
    info!(conn_id = %conn_id, ip = %addr.ip(), "client connected");

    while let Some(result) = ws_rx.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(err) => {
                debug!(conn_id = %conn_id, error = %err, "websocket read error");
                break;
            },
        };
        match msg {
            Message::Text(text) => match ClientFrame::parse(&text) {
                Ok(frame) => handle_frame(&state, &conn_id, frame).await,
                Err(err) => {
                    warn!(conn_id = %conn_id, error = %err, "discarding unparseable frame");
                    send_error(
                        &state,
                        &conn_id,
                        ErrorShape::new(error_codes::INVALID_INPUT, err.to_string()),
                    )
                    .await;
                },
            },
            Message::Close(_) => break,
            // Ping/pong are answered by the socket layer; binary is not part
            // of the protocol.
            _ => {},
        }
    }

    handle_disconnect(&state, &conn_id).await;
    write_task.abort();
    info!(conn_id = %conn_id, "client disconnected");
}
