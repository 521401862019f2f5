// src/test_utils/mock_execution_server.rs
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::core_types::ProviderResponse;

/// One canned reply of the mock execution backend.
#[derive(Debug, Clone)]
pub struct MockReply {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl MockReply {
    pub fn ok(response: ProviderResponse) -> Self {
        Self {
            status: 200,
            body: serde_json::to_string(&response).unwrap(),
            delay: None,
        }
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn delayed(delay: Duration, response: ProviderResponse) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok(response)
        }
    }
}

#[derive(Clone)]
struct MockServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn execute_handler(
    State(state): State<MockServerState>,
    Json(payload): Json<Value>,
) -> Response {
    log::debug!("Mock execution server received request: {}", payload);
    state.requests.lock().unwrap().push(payload);

    let reply = state.replies.lock().unwrap().pop_front();
    match reply {
        Some(reply) => {
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            let status = StatusCode::from_u16(reply.status).unwrap();
            (
                status,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                reply.body,
            )
                .into_response()
        }
        None => {
            log::error!("Mock execution server ran out of replies!");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

pub struct MockExecutionServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    pub recorded_requests: Arc<Mutex<Vec<Value>>>,
}

impl MockExecutionServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = MockServerState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let recorded_requests = state.requests.clone();

        let app = Router::new()
            .route("/v1/execute", post(execute_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();
        log::info!("Mock execution server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock execution server error: {}", e);
                });
        });

        MockExecutionServer {
            addr,
            shutdown_tx,
            recorded_requests,
        }
    }

    pub fn execute_url(&self) -> String {
        format!("http://{}/v1/execute", self.addr)
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock execution server shutdown signal already sent or receiver dropped.");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    pub fn get_requests(&self) -> Vec<Value> {
        self.recorded_requests.lock().unwrap().clone()
    }
}
