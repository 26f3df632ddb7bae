//! Standalone probe server.
//!
//! # Responsibilities
//! - Own a listener dedicated to health probes
//! - Answer the configured method + path, 404 everything else
//! - Stop accepting on the shutdown signal

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProbeConfig;
use crate::health::HealthMonitor;
use crate::probe::handlers::ProbeState;
use crate::probe::middleware::probe_middleware;

/// HTTP server exposing a single health probe.
pub struct ProbeServer {
    router: Router,
    state: ProbeState,
}

impl ProbeServer {
    /// Create a new probe server for `monitor`.
    pub fn new(monitor: HealthMonitor, config: ProbeConfig) -> Self {
        let state = ProbeState::new(monitor, config);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Everything the middleware does not answer falls through to 404.
    fn build_router(state: ProbeState) -> Router {
        Router::new()
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(state, probe_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.state.monitor
    }

    /// Serve probes on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            method = %self.state.config.method,
            path = %self.state.config.path,
            "Probe server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Probe server received shutdown signal");
            })
            .await?;

        tracing::info!("Probe server stopped");
        Ok(())
    }
}

async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::MonitorConfig;
    use crate::health::HealthState;

    fn server() -> ProbeServer {
        let monitor = HealthMonitor::new(MonitorConfig {
            grace_period: 0,
            log_enabled: false,
            ..MonitorConfig::default()
        })
        .unwrap();
        ProbeServer::new(monitor, ProbeConfig::default())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn router_answers_probe_and_404s_the_rest() {
        let server = server();

        let res = server.router().oneshot(get("/_health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = server.router().oneshot(get("/other")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn router_follows_the_served_monitor() {
        let server = server();
        server.monitor().set_state(HealthState::Unhappy);

        let res = server.router().oneshot(get("/_health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
