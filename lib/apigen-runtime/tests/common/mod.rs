#![allow(
    clippy::missing_errors_doc,
    dead_code,
    missing_docs,
    clippy::expect_used
)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apigen_runtime::{ApiClient, Credentials};
use axum::extract::{RawQuery, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::info;

pub const CLIENT_ID: &str = "my-client";
pub const CLIENT_SECRET: &str = "my-secret";

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

/// A token endpoint call, as seen by the server.
#[derive(Debug, Clone)]
pub struct TokenCall {
    pub form: HashMap<String, String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
struct TokenReply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

#[derive(Debug, Clone)]
struct AuthState {
    reply: Arc<Mutex<TokenReply>>,
    calls: Arc<Mutex<Vec<TokenCall>>>,
}

/// What `/echo` saw of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Echo {
    pub headers: BTreeMap<String, String>,
    pub query: Option<String>,
}

/// Token endpoint double at `/token`, plus an `/echo` resource server.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    state: AuthState,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        init_tracing();

        let state = AuthState {
            reply: Arc::new(Mutex::new(TokenReply {
                status: StatusCode::OK,
                body: r#"{"access_token":"abc","token_type":"Bearer","expires_in":3600}"#
                    .to_string(),
                delay: Duration::ZERO,
            })),
            calls: Arc::default(),
        };

        let router = Router::new()
            .route("/token", post(token))
            .route("/echo", get(echo))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        info!(%addr, "launching test server");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("server running");
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn token_url(&self) -> String {
        self.url("/token")
    }

    /// Sets the status and body of the next token responses.
    pub fn reply_with(&self, status: StatusCode, body: impl Into<String>) {
        let mut reply = self.state.reply.lock().expect("reply lock");
        reply.status = status;
        reply.body = body.into();
    }

    /// Delays every token response.
    pub fn delay_replies(&self, delay: Duration) {
        self.state.reply.lock().expect("reply lock").delay = delay;
    }

    pub fn token_calls(&self) -> Vec<TokenCall> {
        self.state.calls.lock().expect("calls lock").clone()
    }

    /// Creates an API client pointing at this server.
    pub fn client(&self, credentials: Credentials) -> ApiClient {
        ApiClient::builder()
            .with_base_url(self.url("/"))
            .expect("valid base url")
            .with_credentials(credentials)
            .build()
            .expect("client")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn header(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

async fn token(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.calls.lock().expect("calls lock").push(TokenCall {
        form,
        authorization: header(&headers, AUTHORIZATION),
        content_type: header(&headers, CONTENT_TYPE),
        user_agent: header(&headers, USER_AGENT),
    });

    let reply = state.reply.lock().expect("reply lock").clone();
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (
        reply.status,
        [(CONTENT_TYPE, "application/json")],
        reply.body,
    )
}

async fn echo(headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect();

    Json(Echo { headers, query })
}
