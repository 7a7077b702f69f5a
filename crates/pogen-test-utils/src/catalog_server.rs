//! Local stand-in for a vendor web catalog.
//!
//! Serves canned pages from `/product-search/en?keywords=...`, the one endpoint
//! the catalog client hits for both product searches and pricing pages, and
//! records every keyword asked for. The server runs on its own tokio runtime so
//! it can be used from plain `#[test]` functions and blocking clients.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

/// What the server answers for a keyword
#[derive(Debug, Clone)]
pub enum Page {
    Html(String),
    Status(u16),
}

impl Page {
    pub fn html(body: impl Into<String>) -> Self {
        Page::Html(body.into())
    }
}

#[derive(Clone)]
struct ServerState {
    pages: Arc<HashMap<String, Page>>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, serde::Deserialize)]
struct SearchQuery {
    keywords: String,
}

async fn product_search(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(query.keywords.clone());

    match state.pages.get(&query.keywords) {
        Some(Page::Html(body)) => Html(body.clone()).into_response(),
        Some(Page::Status(code)) => StatusCode::from_u16(*code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub struct CatalogServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _runtime: Runtime,
}

impl CatalogServer {
    /// Start serving `pages` on `127.0.0.1:0`; unknown keywords get a 404.
    pub fn start<K: Into<String>>(pages: impl IntoIterator<Item = (K, Page)>) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("build server runtime");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            pages: Arc::new(pages.into_iter().map(|(k, p)| (k.into(), p)).collect()),
            requests: requests.clone(),
        };
        let app = Router::new()
            .route("/product-search/en", get(product_search))
            .with_state(state);

        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind listener");
        let addr: SocketAddr = listener.local_addr().expect("listener addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        runtime.spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            shutdown_tx: Some(shutdown_tx),
            _runtime: runtime,
        }
    }

    /// e.g. `http://127.0.0.1:12345`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Keywords requested so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for CatalogServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
