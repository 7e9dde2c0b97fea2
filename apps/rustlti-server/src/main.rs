//! rustlti demo tool provider.
//!
//! A small HTTP server that plays the tool-provider side of an LTI 1.1
//! exchange: it accepts `POST` launch requests on `/`, validates the OAuth
//! body signature against a configured consumer key and secret, and reports
//! the outcome as JSON.
//!
//! # Usage
//!
//! ```text
//! LTI_CONSUMER_KEY=12345 LTI_SECRET=secret rustlti-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:5001` | Bind address |
//! | `LTI_CONSUMER_KEY` | `12345` | Expected consumer key |
//! | `LTI_SECRET` | `secret` | Shared secret for the consumer key |
//! | `LTI_LAUNCH_URL` | `http://localhost:5001/` | URL launches are signed against |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod config;

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use rustlti_auth::{
    AuthError, CredentialProvider, HmacSha1Signer, StaticCredentialProvider, verify_launch,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared per-request state: the configuration plus the credential registry.
struct AppState {
    config: ServerConfig,
    credentials: StaticCredentialProvider,
}

impl AppState {
    fn new(config: ServerConfig) -> Self {
        let credentials = StaticCredentialProvider::new(vec![(
            config.consumer_key.clone(),
            config.secret.clone(),
        )]);
        Self {
            config,
            credentials,
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Flatten a form-encoded body into one value per key.
///
/// Repeated fields keep the last value; tool consumers sign flat parameter
/// sets, so anything else is already malformed.
fn form_params(body: &[u8]) -> BTreeMap<String, String> {
    form_urlencoded::parse(body).into_owned().collect()
}

/// Build a JSON response with the given status.
fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response parts are valid")
}

/// Validate an incoming launch body against the configured credentials.
fn validate_launch(state: &AppState, params: &BTreeMap<String, String>) -> Result<(), AuthError> {
    let consumer_key = &state.config.consumer_key;
    let secret = state.credentials.get_secret(consumer_key)?;
    let signer = HmacSha1Signer::new(&secret, "");

    verify_launch(
        params,
        "POST",
        &state.config.launch_url,
        consumer_key,
        &signer,
    )
}

/// Route a single request.
async fn handle(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => json_response(
            StatusCode::OK,
            &serde_json::json!({ "status": "running", "version": VERSION }),
        ),
        (&Method::POST, "/") => {
            let Ok(body) = req.into_body().collect().await else {
                return Ok(json_response(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "error": "unreadable request body" }),
                ));
            };
            let params = form_params(&body.to_bytes());

            match validate_launch(&state, &params) {
                Ok(()) => {
                    let user_id = params.get("user_id").map_or("", String::as_str);
                    info!(user_id = %user_id, "launch request validated");
                    json_response(
                        StatusCode::OK,
                        &serde_json::json!({ "valid": true, "user_id": user_id }),
                    )
                }
                Err(err) => {
                    warn!(error = %err, "rejected launch request");
                    json_response(
                        StatusCode::UNAUTHORIZED,
                        &serde_json::json!({ "valid": false, "error": err.to_string() }),
                    )
                }
            }
        }
        (_, "/") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &serde_json::json!({ "error": "launch requests must be POSTed" }),
        ),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "error": "not found" }),
        ),
    };

    Ok(response)
}

/// Run the accept loop, serving connections until a shutdown signal arrives.
async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let state = Arc::clone(&state);
                let svc = service_fn(move |req| handle(req, Arc::clone(&state)));
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        consumer_key = %config.consumer_key,
        launch_url = %config.launch_url,
        version = VERSION,
        "starting rustlti tool provider",
    );

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for launch requests");

    serve(listener, Arc::new(AppState::new(config))).await
}
