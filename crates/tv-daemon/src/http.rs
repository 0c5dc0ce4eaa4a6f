use crate::core::DaemonEvent;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tv_proto::protocol::{Command, TvState};
use tv_proto::registry;
use tv_proto::state::StateManager;

#[derive(Clone)]
struct HttpState {
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<DaemonEvent>,
}

#[derive(Serialize)]
struct RegionInfo {
    code: &'static str,
    label: &'static str,
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<DaemonEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(HttpState {
            state_manager,
            event_tx,
        });

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/regions", get(get_regions))
        .route("/api/next", post(next_channel))
        .route("/api/prev", post(prev_channel))
        .route("/api/region/:code", post(select_region))
        .route("/api/category/:label", post(select_category))
        .route("/api/broken", post(mark_current_broken))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn send(state: &HttpState, cmd: Command) -> StatusCode {
    if state
        .event_tx
        .send(DaemonEvent::ClientCommand(cmd))
        .await
        .is_err()
    {
        error!("Failed to forward HTTP command: event loop gone");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}

async fn get_state(State(state): State<HttpState>) -> Json<TvState> {
    Json(state.state_manager.get_state().await)
}

async fn get_regions() -> Json<Vec<RegionInfo>> {
    Json(
        registry::regions()
            .iter()
            .map(|&(code, label)| RegionInfo { code, label })
            .collect(),
    )
}

async fn next_channel(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: Next");
    send(&state, Command::Next).await
}

async fn prev_channel(State(state): State<HttpState>) -> StatusCode {
    info!("HTTP API: Prev");
    send(&state, Command::Prev).await
}

async fn select_region(State(state): State<HttpState>, Path(code): Path<String>) -> StatusCode {
    info!("HTTP API: Region {}", code);
    send(&state, Command::SelectRegion { code }).await
}

async fn select_category(State(state): State<HttpState>, Path(label): Path<String>) -> StatusCode {
    info!("HTTP API: Category {}", label);
    send(&state, Command::SelectCategory { label }).await
}

async fn mark_current_broken(State(state): State<HttpState>) -> StatusCode {
    let Some(current) = state.state_manager.current().await else {
        return StatusCode::NOT_FOUND;
    };
    info!("HTTP API: Mark broken {}", current.name);
    send(
        &state,
        Command::MarkBroken {
            stream_url: current.stream_url,
        },
    )
    .await
}
