//! Local playlist host for fetcher tests.
//!
//! Serves canned documents by path from an axum app bound to an ephemeral
//! port.  Unknown paths return 404.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tv_proto::config::CatalogConfig;

#[derive(Debug, Clone)]
pub struct Fixture {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Fixture {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct ServerState {
    fixtures: HashMap<String, Fixture>,
    hits: Mutex<Vec<String>>,
    requests: AtomicUsize,
}

pub struct PlaylistServer {
    pub base_url: String,
    state: Arc<ServerState>,
}

impl PlaylistServer {
    pub async fn start(fixtures: Vec<(&str, Fixture)>) -> Self {
        let state = Arc::new(ServerState {
            fixtures: fixtures
                .into_iter()
                .map(|(path, f)| (path.to_string(), f))
                .collect(),
            hits: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
        });

        let app = Router::new().fallback(serve).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Catalog settings pointing at this server.
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            base_url: self.base_url.clone(),
            connect_timeout_secs: 2,
            read_timeout_secs: 2,
            ..CatalogConfig::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.state.hits.lock().expect("hits lock").clone()
    }
}

async fn serve(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    state
        .hits
        .lock()
        .expect("hits lock")
        .push(uri.path().to_string());

    let Some(fixture) = state.fixtures.get(uri.path()).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !fixture.delay.is_zero() {
        tokio::time::sleep(fixture.delay).await;
    }
    let status = StatusCode::from_u16(fixture.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, fixture.body).into_response()
}

/// A playlist document with one entry per `(name, group)`; `None` omits the
/// group-title attribute.
pub fn playlist(host: &str, entries: &[(&str, Option<&str>)]) -> String {
    let mut doc = String::from("#EXTM3U\n");
    for (name, group) in entries {
        let group_attr = group
            .map(|g| format!(" group-title=\"{}\"", g))
            .unwrap_or_default();
        doc.push_str(&format!(
            "#EXTINF:-1 tvg-id=\"{name}.{host}\" tvg-logo=\"https://logos.{host}/{name}.png\"",
        ));
        doc.push_str(&format!("{group_attr},{name}\n"));
        doc.push_str(&format!("https://{host}/live/{name}.m3u8\n"));
    }
    doc
}
