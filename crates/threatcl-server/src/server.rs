//! axum server exposing `/graphql` and `/health`

use crate::protocol::{decode_body, GetParams};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use threatcl_core::{QueryEngine, QueryError, QueryRequest, QueryResponse};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Router with every route wired to `engine`
pub fn router(engine: Arc<QueryEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graphql", get(graphql_get).post(graphql_post))
        .with_state(engine)
        .layer(CorsLayer::permissive())
}

/// A running HTTP server; dropping it signals shutdown
pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Server {
    /// Bind `addr` (port 0 picks a free port) and start serving on a task
    pub async fn start(engine: Arc<QueryEngine>, addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let addr = listener
            .local_addr()
            .context("failed to read bound address")?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(engine);

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = served {
                warn!(%error, "http server stopped with an error");
            }
        });

        info!(%addr, "serving GraphQL at http://{addr}/graphql");
        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal graceful shutdown; in-flight requests are allowed to finish
    pub fn shutdown(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }

    /// Signal shutdown and wait until the serving task has exited
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                warn!(%error, "http server task did not finish cleanly");
            }
        }
        info!("http server stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn graphql_get(
    State(engine): State<Arc<QueryEngine>>,
    Query(params): Query<GetParams>,
) -> Response {
    match params.into_request() {
        Ok(request) => execute(engine, request).await,
        Err(message) => bad_request(message),
    }
}

async fn graphql_post(State(engine): State<Arc<QueryEngine>>, body: Bytes) -> Response {
    match decode_body(&body) {
        Ok(request) => execute(engine, request).await,
        Err(message) => bad_request(message),
    }
}

async fn execute(engine: Arc<QueryEngine>, request: QueryRequest) -> Response {
    debug!(
        operation = request.operation_name.as_deref().unwrap_or("<default>"),
        bytes = request.query.len(),
        "graphql request"
    );
    // The snapshot read lock is held for the whole execution
    let result = tokio::task::spawn_blocking(move || engine.execute(&request)).await;
    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            warn!(%error, "query execution panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(QueryResponse::from_error(QueryError::new(
                    "internal error while executing query",
                ))),
            )
                .into_response()
        }
    }
}

fn bad_request(message: String) -> Response {
    debug!(%message, "rejected graphql request");
    (
        StatusCode::BAD_REQUEST,
        Json(QueryResponse::from_error(QueryError::new(message))),
    )
        .into_response()
}
