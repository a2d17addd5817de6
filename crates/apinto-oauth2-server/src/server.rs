use std::{net::SocketAddr, sync::Arc};

use apinto_oauth2::{
    AdminState, BearerClient, BearerState, BulkTokens, CacheRegistry, Clock, GrantProcessor,
    StaticClientRegistry, SystemClock, TokenState, TokenValidator, import_tokens_handler,
    list_tokens_handler, token_handler,
};
use axum::{
    Json, Router,
    extract::FromRef,
    routing::get,
};
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;

/// Shared application state.
///
/// Each handler group pulls its own slice through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub token: TokenState,
    pub admin: AdminState,
    pub bearer: BearerState,
}

impl AppState {
    /// Wire the grant processor, validator and bulk tools over one registry.
    pub fn new(config: &AppConfig, caches: CacheRegistry, clock: Arc<dyn Clock>) -> Self {
        let namespace = config.namespace.key_namespace();
        let clients = Arc::new(StaticClientRegistry::new(config.clients.iter().cloned()));

        let processor = GrantProcessor::new(caches.clone(), namespace.clone(), clock.clone());
        let validator = TokenValidator::new(caches.clone(), namespace.clone(), clock.clone());
        let bulk = BulkTokens::new(caches, namespace, clock);

        Self {
            token: TokenState::new(processor, clients),
            admin: AdminState::new(bulk),
            bearer: BearerState::new(validator),
        }
    }

    /// Connect the configured caches and build the state on the system clock.
    pub async fn from_config(config: &AppConfig) -> Self {
        let caches = crate::create_cache_registry(&config.caches).await;
        Self::new(config, caches, Arc::new(SystemClock))
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(state: &AppState) -> Self {
        state.token.clone()
    }
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}

impl FromRef<AppState> for BearerState {
    fn from_ref(state: &AppState) -> Self {
        state.bearer.clone()
    }
}

pub fn build_app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/oauth2/token", get(token_handler).post(token_handler))
        .route("/oauth2/validate", get(validate))
        .route(
            "/oauth_tokens/",
            get(list_tokens_handler).post(import_tokens_handler),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Resolve the presented bearer token to its client.
async fn validate(BearerClient(client_id): BearerClient) -> Json<serde_json::Value> {
    Json(json!({ "client_id": client_id }))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> OAuth2Server {
        let state = AppState::from_config(&self.config).await;
        let app = build_app(state, self.config.server.body_limit_bytes);

        OAuth2Server {
            addr: self.addr,
            app,
        }
    }
}

pub struct OAuth2Server {
    addr: SocketAddr,
    app: Router,
}

impl OAuth2Server {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
