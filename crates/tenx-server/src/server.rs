//! `TenxServer`: the Axum HTTP server.

use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::response::Json;
use axum::routing::{get, post};
use tenx_settings::ServerSettings;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::health::{self, HealthResponse};
use crate::routes::{auth, chat_logs, configurations, user_settings};
use crate::shutdown::ShutdownCoordinator;
use crate::state::AppState;

/// The tenx REST server.
pub struct TenxServer {
    settings: ServerSettings,
    state: AppState,
    shutdown: ShutdownCoordinator,
}

impl TenxServer {
    /// Create a new server.
    pub fn new(settings: ServerSettings, state: AppState) -> Self {
        Self {
            settings,
            state,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Build the Axum router with all routes and layers.
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.settings)
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Get the server settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind((self.settings.host.as_str(), self.settings.port)).await
    }

    /// Serve on `listener` until the shutdown token is cancelled, then drain
    /// in-flight requests.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, environment = ?self.settings.environment, "tenx server listening");
        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;
        info!("tenx server stopped");
        Ok(())
    }
}

/// Router over `state`.
pub fn build_router(state: AppState, settings: &ServerSettings) -> Router {
    let api = Router::new()
        .route(
            "/chat-logs",
            get(chat_logs::list)
                .post(chat_logs::create)
                .delete(chat_logs::delete_many),
        )
        .route(
            "/chat-logs/{chat_id}",
            get(chat_logs::get)
                .patch(chat_logs::patch)
                .delete(chat_logs::delete),
        )
        .route("/user-settings", get(user_settings::get).put(user_settings::put))
        .route(
            "/configurations",
            get(configurations::list)
                .post(configurations::create)
                .put(configurations::update),
        )
        .route("/auth/send-otp", post(auth::send_otp))
        .route("/auth/verify-otp", post(auth::verify_otp));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(settings.body_limit_bytes))
        .layer(cors_layer(&settings.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = state
        .db(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
        .await
        .is_ok();
    Json(health::health_check(state.start_time, database_ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tenx_auth::{DeliveryRouter, LogOnlyDelivery};
    use tower::ServiceExt;

    fn make_server() -> TenxServer {
        let pool = tenx_store::open_in_memory().unwrap();
        let delivery = DeliveryRouter::new(
            Arc::new(LogOnlyDelivery::new("email")),
            Arc::new(LogOnlyDelivery::new("sms")),
        );
        TenxServer::new(ServerSettings::default(), AppState::new(pool, delivery, 600))
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = make_server().router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let pool = tenx_store::open_in_memory().unwrap();
        let delivery = DeliveryRouter::new(
            Arc::new(LogOnlyDelivery::new("email")),
            Arc::new(LogOnlyDelivery::new("sms")),
        );
        let settings = ServerSettings {
            body_limit_bytes: 16,
            ..ServerSettings::default()
        };
        let app = build_router(AppState::new(pool, delivery, 600), &settings);
        let body = format!("{{\"topic\":\"{}\"}}", "x".repeat(64));
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat-logs")
            .header("user-id", "u1")
            .header("content-type", "application/json")
            .header("content-length", body.len())
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let server = Arc::new(make_server());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let s = Arc::clone(&server);
        let handle = tokio::spawn(async move { s.serve(listener).await });
        server.shutdown().shutdown();
        handle.await.unwrap().unwrap();
    }
}
