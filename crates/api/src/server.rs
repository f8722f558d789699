use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use txlookup_access::{AccessService, DEFAULT_NETWORK};

use crate::lookup::handle_lookup;

/// Route the lookup endpoint is mounted on unless configured otherwise.
pub const DEFAULT_ROUTE: &str = "/api/lookup";

/// Fixed route of the liveness endpoint; the lookup route may not reuse it.
pub const HEALTH_ROUTE: &str = "/health";

#[derive(Clone)]
pub struct AppState {
    pub access: Arc<dyn AccessService>,
    pub default_network: String,
}

impl AppState {
    pub fn new(access: Arc<dyn AccessService>) -> Self {
        Self {
            access,
            default_network: DEFAULT_NETWORK.to_string(),
        }
    }

    pub fn with_default_network(mut self, network: impl Into<String>) -> Self {
        self.default_network = network.into();
        self
    }
}

pub(crate) type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    service: &'static str,
    default_network: String,
}

pub async fn start_server(state: AppState, addr: &str, route: &str) -> Result<()> {
    let app = build_router(state, route);
    let listener = bind_listener(addr).await?;
    info!("lookup endpoint listening on {} at {}", addr, route);
    axum::serve(listener, app)
        .await
        .context("lookup server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

pub fn build_router(state: AppState, route: &str) -> Router {
    Router::new()
        .route(route, get(handle_lookup))
        .route(HEALTH_ROUTE, get(handle_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        service: "txlookup",
        default_network: state.default_network.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MISSING_ID_MESSAGE;
    use crate::view::tests::{sample_block, sample_transaction};
    use crate::view::TransactionView;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use txlookup_access::MemoryAccessService;

    fn router(access: &MemoryAccessService) -> Router {
        build_router(AppState::new(Arc::new(access.clone())), DEFAULT_ROUTE)
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body.to_vec())
    }

    fn seeded(network: &str, tx_id: &str) -> MemoryAccessService {
        let access = MemoryAccessService::new();
        access.insert_transaction(network, sample_transaction(tx_id));
        access.insert_block(network, sample_block());
        access
    }

    #[tokio::test]
    async fn test_sealed_transaction_defaults_to_mainnet() {
        let access = seeded("mainnet", "abc123");
        let (status, content_type, body) = send_get(router(&access), "/api/lookup?id=abc123").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let view: TransactionView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.status, "SEALED");
        assert_eq!(view.error, "");
        assert_eq!(view.block.id, "block-1");
        assert_eq!(view.block.height, 77);
        assert_eq!(view.block.timestamp, sample_block().timestamp);
        assert_eq!(access.connected_networks(), vec!["mainnet".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_transaction_reports_error_status() {
        let access = MemoryAccessService::new();
        let mut tx = sample_transaction("abc123");
        tx.error = Some("insufficient funds".into());
        access.insert_transaction("testnet", tx);
        access.insert_block("testnet", sample_block());

        let (status, _, body) =
            send_get(router(&access), "/api/lookup?id=abc123&network=testnet").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["error"], "insufficient funds");
        assert_eq!(access.connected_networks(), vec!["testnet".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_not_found() {
        let access = seeded("mainnet", "abc123");
        let (status, content_type, body) =
            send_get(router(&access), "/api/lookup?id=deadbeef").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(content_type.unwrap().starts_with("text/plain"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("deadbeef"));
        assert!(text.contains("mainnet"));
        assert!(text.starts_with("Cannot find transaction with id deadbeef on network mainnet"));
    }

    #[tokio::test]
    async fn test_missing_id_makes_no_calls() {
        let access = seeded("mainnet", "abc123");
        for uri in ["/api/lookup", "/api/lookup?network=testnet", "/api/lookup?id="] {
            let (status, _, body) = send_get(router(&access), uri).await;
            assert!(status.is_client_error(), "{uri} returned {status}");
            assert_eq!(String::from_utf8(body).unwrap(), MISSING_ID_MESSAGE);
        }
        assert_eq!(access.call_count(), 0);
    }

    #[tokio::test]
    async fn test_configured_default_network() {
        let access = seeded("emulator", "abc123");
        let state =
            AppState::new(Arc::new(access.clone())).with_default_network("emulator");
        let app = build_router(state, "/lookup");

        let (status, _, _) = send_get(app, "/lookup?id=abc123&network=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(access.connected_networks(), vec!["emulator".to_string()]);
    }

    #[tokio::test]
    async fn test_requests_are_independent() {
        let access = seeded("mainnet", "abc123");
        let app = router(&access);
        let (_, _, first) = send_get(app.clone(), "/api/lookup?id=abc123").await;
        let (_, _, second) = send_get(app, "/api/lookup?id=abc123").await;
        assert_eq!(first, second);
        assert_eq!(access.call_count(), 6);
    }

    #[tokio::test]
    async fn test_health() {
        let access = MemoryAccessService::new();
        let (status, _, body) = send_get(router(&access), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["default_network"], "mainnet");
    }
}
