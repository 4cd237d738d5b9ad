//! HTTP Server
//!
//! Serves the host environment over HTTP/1:
//!
//! | route            | response                                         |
//! |------------------|--------------------------------------------------|
//! | `/cache/details` | cluster diagnostics (JSON)                       |
//! | `/healthcheck`   | aggregate health, 200 when healthy, 500 if not   |
//! | `/metrics`       | prometheus text exposition                       |
//! | `/healthz`       | process liveness                                 |
//!
//! Every route is GET-only. One task serves each connection; cancelling the
//! shutdown token stops accepting and lets open connections finish.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::bundle::HostEnvironment;
use crate::error::{Error, Result};

pub const DIAGNOSTICS_PATH: &str = "/cache/details";
pub const HEALTHCHECK_PATH: &str = "/healthcheck";
pub const METRICS_PATH: &str = "/metrics";
pub const LIVENESS_PATH: &str = "/healthz";

const ROUTES: [&str; 4] = [DIAGNOSTICS_PATH, HEALTHCHECK_PATH, METRICS_PATH, LIVENESS_PATH];

const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Bind the listener for [`serve`]
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid listen address {}: {}", addr, e)))?;

    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind HTTP server on {}: {}", addr, e)))
}

/// Accept connections until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    env: Arc<HostEnvironment>,
    shutdown: CancellationToken,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server listening on {}", addr);
    }

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("HTTP server stopped accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => accepted
                .map_err(|e| Error::Internal(format!("HTTP server accept error: {}", e)))?,
        };

        debug!(%peer, "Accepted connection");
        let io = TokioIo::new(stream);
        let env = Arc::clone(&env);
        let shutdown = shutdown.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let env = Arc::clone(&env);
                async move { Ok::<_, Infallible>(handle(&req, &env)) }
            });

            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };
            if let Err(e) = result {
                error!("HTTP connection error: {}", e);
            }
        });
    }
}

fn handle<B>(req: &Request<B>, env: &HostEnvironment) -> Response<Full<Bytes>> {
    route(req.method(), req.uri().path(), env)
}

/// Produce the response for one request
pub fn route(method: &Method, path: &str, env: &HostEnvironment) -> Response<Full<Bytes>> {
    if !ROUTES.contains(&path) {
        return text(StatusCode::NOT_FOUND, "not found");
    }
    if method != Method::GET {
        let mut response = text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET"));
        return response;
    }

    match path {
        DIAGNOSTICS_PATH => match env.diagnostics() {
            Some(resource) => json(StatusCode::OK, &resource.snapshot()),
            None => text(StatusCode::SERVICE_UNAVAILABLE, "cache is not configured"),
        },
        HEALTHCHECK_PATH => {
            let health = env.health_checks().run_all();
            let status = if health.status.is_healthy() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            json(status, &health)
        }
        METRICS_PATH => metrics(env),
        _ => text(StatusCode::OK, "ok"),
    }
}

fn metrics(env: &HostEnvironment) -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&env.metrics().gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return text(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics");
    }
    respond(
        StatusCode::OK,
        HeaderValue::from_static(prometheus::TEXT_FORMAT),
        buffer,
    )
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => respond(status, HeaderValue::from_static(APPLICATION_JSON), body),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "failed to serialize response")
        }
    }
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    respond(status, HeaderValue::from_static(TEXT_PLAIN), body)
}

fn respond(
    status: StatusCode,
    content_type: HeaderValue,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::CacheBundle;
    use crate::config::test_support::clustered;
    use crate::config::{CacheEngineConfig, CacheTopologyType};
    use crate::diagnostics::ClusterDiagnostics;
    use crate::monitoring::{HealthResponse, HealthStatus};
    use http_body_util::BodyExt;

    async fn body(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn started(config: CacheEngineConfig) -> HostEnvironment {
        let env = HostEnvironment::new();
        CacheBundle::new().run(&config, &env).unwrap();
        env.lifecycle().start_all().unwrap();
        env
    }

    #[tokio::test]
    async fn test_diagnostics_route() {
        let env = started(clustered());
        let response = route(&Method::GET, DIAGNOSTICS_PATH, &env);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_JSON);

        let diagnostics: ClusterDiagnostics = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(diagnostics.expected_cluster_size, 3);
        assert_eq!(diagnostics.status, "RUNNING");
        env.lifecycle().stop_all();
    }

    #[tokio::test]
    async fn test_diagnostics_without_bundle() {
        let env = HostEnvironment::new();
        let response = route(&Method::GET, DIAGNOSTICS_PATH, &env);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_healthcheck_status_codes() {
        let env = started(CacheEngineConfig::new(CacheTopologyType::Standalone));
        let response = route(&Method::GET, HEALTHCHECK_PATH, &env);
        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        env.lifecycle().stop_all();

        let env = started(clustered());
        let response = route(&Method::GET, HEALTHCHECK_PATH, &env);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let health: HealthResponse = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(health.checks[0].name, "cache health");
        env.lifecycle().stop_all();
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let env = HostEnvironment::new();
        let manager = CacheBundle::new()
            .run(&CacheEngineConfig::new(CacheTopologyType::Standalone), &env)
            .unwrap();
        env.lifecycle().start_all().unwrap();
        manager.get_cache::<u32>("sessions").unwrap().put("a", &1).unwrap();

        let response = route(&Method::GET, METRICS_PATH, &env);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], prometheus::TEXT_FORMAT);
        let text = String::from_utf8(body(response).await.to_vec()).unwrap();
        assert!(text.contains("cachekeeper_sessions_number_of_entries{cache=\"sessions\"} 1"));
        env.lifecycle().stop_all();
    }

    #[tokio::test]
    async fn test_liveness_and_errors() {
        let env = HostEnvironment::new();

        let response = route(&Method::GET, LIVENESS_PATH, &env);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, Bytes::from("ok"));

        assert_eq!(
            route(&Method::GET, "/nope", &env).status(),
            StatusCode::NOT_FOUND
        );

        let response = route(&Method::POST, DIAGNOSTICS_PATH, &env);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        assert!(bind("not-an-address").await.is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(serve(listener, Arc::new(HostEnvironment::new()), shutdown.clone()));

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }
}
