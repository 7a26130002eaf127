//! HTTP server combining the health, document, and snapshot routers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::observability::Logger;

use super::config::HttpServerConfig;
use super::routes::{database_routes, health_routes, snapshot_routes, DatabaseState};

/// HTTP server for the document database's JSON API.
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Creates a server wired to `engine`, using `config` for bind address
    /// and CORS policy.
    pub fn new(engine: Arc<Engine>, config: HttpServerConfig) -> Self {
        let router = Self::build_router(&config, engine);
        Self { config, router }
    }

    fn build_router(config: &HttpServerConfig, engine: Arc<Engine>) -> Router {
        let state = Arc::new(DatabaseState::new(engine));

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            let origins: Vec<_> = config.cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
        };

        Router::new()
            .merge(health_routes())
            .nest("/collections", database_routes(state.clone()))
            .nest("/snapshots", snapshot_routes(state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Returns the underlying router, for use in tests.
    pub fn router(self) -> Router {
        self.router
    }

    /// Binds and serves until the process is asked to shut down.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().expect("invalid socket address");

        Logger::info("HTTP_SERVER_STARTING", &[("addr", &addr.to_string())]);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
