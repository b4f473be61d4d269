//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gate in front of downstream routes
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind the server to a listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Extension, Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::Authenticator;
use crate::config::GateConfig;
use crate::error::Rejection;
use crate::http::context::ConnectionContext;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};

/// Application state injected into the gate middleware.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub config: Arc<GateConfig>,
}

/// HTTP server fronted by the authentication gate.
pub struct GateServer {
    router: Router,
    config: Arc<GateConfig>,
}

impl GateServer {
    /// Create a server whose downstream is the built-in inspect handler.
    pub fn new(config: GateConfig, authenticator: Arc<Authenticator>) -> Self {
        let downstream = Router::new()
            .route("/{*path}", any(inspect_handler))
            .route("/", any(inspect_handler));
        Self::with_downstream(config, authenticator, downstream)
    }

    /// Create a server gating the given downstream routes.
    pub fn with_downstream(config: GateConfig, authenticator: Arc<Authenticator>, downstream: Router) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            authenticator,
            config: config.clone(),
        };
        let router = Self::build_router(&config, state, downstream);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState, downstream: Router) -> Router {
        downstream
            .layer(middleware::from_fn_with_state(state, gate_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            method = %self.config.auth.method,
            realm = %self.config.auth.realm,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Builds the connection context and authenticates it.
///
/// Downstream handlers receive the context as a request extension; the body
/// stays in the context's cache and the forwarded request carries none.
pub async fn gate_middleware(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let mut ctx = match ConnectionContext::from_parts(&parts, body, peer, &state.config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!(
                request_id = %parts.headers.request_id(),
                method = %parts.method,
                error = %e,
                "Rejecting request"
            );
            return e.into_response();
        }
    };

    match state.authenticator.authenticate(&mut ctx, None).await {
        Ok(_) => {
            let mut request = Request::from_parts(parts, Body::empty());
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(Rejection::Auth(failure)) => {
            state.authenticator.reject(&mut ctx, failure);
            ctx.into_response()
        }
        Err(Rejection::Request(e)) => e.into_response(),
    }
}

/// Echo the authenticated context as JSON.
async fn inspect_handler(Extension(mut ctx): Extension<ConnectionContext>) -> Response {
    let params = match ctx.params().await {
        Ok(params) => params,
        Err(e) => return e.into_response(),
    };

    if let Some(entry) = ctx.accepted().first().cloned() {
        if entry.main != "*" && entry.sub != "*" {
            ctx.serialization().media_type = Some(format!("{}/{}", entry.main, entry.sub));
        }
    }

    Json(json!({
        "request_id": ctx.request_id(),
        "identity": ctx.identity(),
        "path": ctx.path(),
        "method": ctx.method(),
        "client": ctx.client_address(),
        "accept": ctx.accepted(),
        "params": params.to_json(),
        "serialization": ctx.serialization_options(),
    }))
    .into_response()
}
