//! Minimal HTTP gateway.
//!
//! Starts by default; set `GEOSCOUT_GATEWAY=0` to disable.  Serves:
//! - `GET /api/status`    — returns `{ "status": "ok" }`
//! - `GET /api/health`    — version / uptime / catalog state
//! - `POST /api/discover` — run one discovery turn for a user query

mod auth;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::agent::Coordinator;
use crate::catalog::CatalogService;

// ---------------------------------------------------------------------------
// Gateway handle
// ---------------------------------------------------------------------------

/// Handle returned by [`start_gateway`].
pub struct Gateway {
    /// Server task handle.
    pub handle: JoinHandle<()>,
    /// The address the server is actually listening on.
    pub addr: SocketAddr,
}

// ---------------------------------------------------------------------------
// Shared state injected into axum handlers
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) catalog: Arc<CatalogService>,
    pub(crate) api_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Server startup
// ---------------------------------------------------------------------------

/// Start the gateway HTTP server on `addr`.
///
/// Reads `GEOSCOUT_API_TOKEN` from the environment for API auth.
pub async fn start_gateway(
    addr: SocketAddr,
    coordinator: Arc<Coordinator>,
    catalog: Arc<CatalogService>,
) -> std::io::Result<Gateway> {
    let api_token = std::env::var("GEOSCOUT_API_TOKEN")
        .ok()
        .filter(|s| !s.is_empty());
    start_gateway_with_token(addr, coordinator, catalog, api_token).await
}

/// Start the gateway HTTP server on `addr` with an explicit API token
/// (useful for testing without env-var races).
pub async fn start_gateway_with_token(
    addr: SocketAddr,
    coordinator: Arc<Coordinator>,
    catalog: Arc<CatalogService>,
    api_token: Option<String>,
) -> std::io::Result<Gateway> {
    let state = AppState {
        coordinator,
        catalog,
        api_token,
    };

    if state.api_token.is_some() {
        info!("API authentication enabled (GEOSCOUT_API_TOKEN set)");
    } else {
        warn!("API authentication disabled (GEOSCOUT_API_TOKEN not set)");
    }

    let _ = handlers::health::STARTUP_TIME.set(std::time::Instant::now());

    let api_router = Router::new()
        .route("/status", get(handlers::health::status_handler))
        .route("/health", get(handlers::health::api_health))
        .route("/discover", post(handlers::discover::api_discover))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let app = Router::new()
        .nest("/api", api_router)
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("gateway server error: {e}");
        }
    });

    info!(%bound_addr, "gateway started");

    Ok(Gateway {
        handle,
        addr: bound_addr,
    })
}

/// Convenience: start the gateway unless `GEOSCOUT_GATEWAY=0`.
///
/// Listens on `GEOSCOUT_GATEWAY_ADDR` (default `127.0.0.1:3000`).
/// Returns `None` if the gateway is explicitly disabled.
pub async fn spawn_gateway_if_enabled(
    coordinator: Arc<Coordinator>,
    catalog: Arc<CatalogService>,
) -> Option<Gateway> {
    if std::env::var("GEOSCOUT_GATEWAY").as_deref() == Ok("0") {
        info!("gateway disabled (GEOSCOUT_GATEWAY=0)");
        return None;
    }

    let addr: SocketAddr = match std::env::var("GEOSCOUT_GATEWAY_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
    {
        Ok(a) => a,
        Err(e) => {
            error!("invalid GEOSCOUT_GATEWAY_ADDR: {e}");
            return None;
        }
    };

    // Try up to 10 consecutive ports so a stale process doesn't block startup.
    for candidate in bind_candidates(addr, 10) {
        match start_gateway(candidate, Arc::clone(&coordinator), Arc::clone(&catalog)).await {
            Ok(gw) => {
                if gw.addr.port() != addr.port() {
                    info!(
                        original = %addr,
                        bound = %gw.addr,
                        "port {} in use, auto-bound to {}",
                        addr.port(),
                        gw.addr.port(),
                    );
                }
                info!(addr = %gw.addr, "gateway enabled");
                return Some(gw);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                debug!(port = candidate.port(), "port in use, trying next");
            }
            Err(e) => {
                error!("failed to start gateway: {e}");
                return None;
            }
        }
    }
    error!(base = %addr, "no free port found for the gateway");
    None
}

/// Addresses to try when auto-binding: `base` plus the next consecutive
/// ports, stopping at the top of the port space rather than wrapping.
pub fn bind_candidates(base: SocketAddr, attempts: u16) -> Vec<SocketAddr> {
    (0..attempts)
        .filter_map(|offset| {
            base.port().checked_add(offset).map(|port| {
                let mut candidate = base;
                candidate.set_port(port);
                candidate
            })
        })
        .collect()
}
