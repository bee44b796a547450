//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{self, AllowedOrigins};
use super::openapi::openapi_json;
use super::routes::{dashboard, health};
use crate::core::CoreApp;
use crate::data::RecorderService;
use crate::domain::statistics::RecorderSchema;

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self {
            app,
            allowed_origins,
        }
    }

    /// Serve until shutdown is triggered; returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = router(
            app.recorder.clone(),
            Arc::new(app.config.schema.clone()),
            &allowed_origins,
        );

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "Listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

/// Build the full application router
pub fn router(
    recorder: Arc<RecorderService>,
    schema: Arc<RecorderSchema>,
    allowed_origins: &AllowedOrigins,
) -> Router {
    let backend = recorder.backend();

    Router::new()
        .route("/api/v1/health", get(health::health).with_state(backend))
        .route("/api/openapi.json", get(openapi_json))
        .nest("/api/v1", dashboard::routes(recorder, schema))
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors(allowed_origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::data::DuckdbRecorder;

    fn test_router() -> Router {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let recorder = RecorderService::Duckdb(Arc::new(DuckdbRecorder::from_connection(conn)));
        router(
            Arc::new(recorder),
            Arc::new(RecorderSchema::default()),
            &AllowedOrigins::new("127.0.0.1", 5390),
        )
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = test_router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_backend() {
        let (status, body) = get_json("/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "duckdb");
    }

    #[tokio::test]
    async fn test_unknown_route_returns_json_404() {
        let (status, body) = get_json("/api/v1/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_openapi_json_served() {
        let (status, body) = get_json("/api/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "IoT Stats API");
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let response = test_router()
            .oneshot(
                Request::get("/api/v1/health")
                    .header(header::ORIGIN, "http://localhost:5390")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5390"
        );
    }
}
