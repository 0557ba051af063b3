//! In-process HTTP server serving lookup maps.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Default)]
struct ServerState {
    routes: Mutex<HashMap<String, (StatusCode, String)>>,
    hits: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Serves configurable bodies per path and records every request.
///
/// Unknown paths answer 404.
pub struct MapServer {
    base_url: String,
    state: Arc<ServerState>,
}

impl MapServer {
    /// Starts a server on a random local port.
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let router = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Returns the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Serves `body` with 200 OK at `path`.
    pub fn set_body(&self, path: &str, body: &str) {
        self.set_response(path, StatusCode::OK, body);
    }

    pub fn set_response(&self, path: &str, status: StatusCode, body: &str) {
        self.state
            .routes
            .lock()
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.lock().last().cloned()
    }
}

async fn handle(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let routes = state.routes.lock();
    routes
        .get(uri.path())
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, "not found".to_string()))
}
