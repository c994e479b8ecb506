use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{ConnectInfo, State, WebSocketUpgrade},
        response::IntoResponse,
        routing::{delete, get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {
    stuga_directory::{MemoryDirectory, UserDirectory},
    stuga_protocol::PROTOCOL_VERSION,
    stuga_rooms::RoomRegistry,
};

use crate::{http, state::GatewayState, ws::handle_connection};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(http::health))
        .route("/ws", get(ws_upgrade_handler))
        .route("/chatrooms", get(http::list_chatrooms))
        .route("/chatroom", post(http::create_chatroom))
        .route("/chatroom/{name}", delete(http::delete_chatroom))
        .route("/messages/{room}", get(http::get_messages))
        .route("/users", get(http::list_users))
        .route("/register", post(http::register))
        .route("/login", post(http::login))
        .route("/logout", post(http::logout))
        .layer(cors)
        .with_state(state)
}

/// Start the gateway HTTP + WebSocket server.
///
/// Flags override the discovered config; everything else comes from
/// `stuga.{toml,yaml,json}` or defaults.
pub async fn start(bind: Option<&str>, port: Option<u16>) -> anyhow::Result<()> {
    let config = stuga_config::discover_and_load();
    let bind = bind.unwrap_or(&config.gateway.bind);
    let port = port.unwrap_or(config.gateway.port);

    let rooms = RoomRegistry::with_defaults(&config.rooms.defaults)
        .with_history_limit(config.rooms.history_cap());
    let directory: Arc<dyn UserDirectory> = Arc::new(MemoryDirectory::new());
    let state = GatewayState::new(directory, rooms);

    let app = build_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let room_count = state.core.lock().await.rooms.room_count();

    // Startup banner.
    let lines = [
        format!("stuga gateway v{}", state.version),
        format!("protocol v{PROTOCOL_VERSION}, listening on {addr}"),
        format!("{room_count} rooms seeded"),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    // Run the server with ConnectInfo for remote IP extraction.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, addr))
}
