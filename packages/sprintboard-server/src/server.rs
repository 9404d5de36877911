/// HTTP server: builds the router and serves it with axum.
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::api_router;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_router())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process exits. Port 0 picks a free port.
pub async fn run_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = state.bind_address.clone();
    let port = state.port;

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;
    let actual_port = listener.local_addr()?.port();

    log::info!(
        target: "sprintboard.server",
        "HTTP server listening on http://{}:{}",
        bind_addr,
        actual_port
    );

    axum::serve(listener, app(state)).await?;
    Ok(())
}
