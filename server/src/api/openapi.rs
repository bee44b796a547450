//! OpenAPI document

use axum::http::header;
use axum::response::{IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{dashboard, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "IoT Stats API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Time-bucketed statistics over IoT recorder data"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "dashboard", description = "Daily trends per recorder, device and channel")
    ),
    paths(
        // Health
        health::health,
        // Dashboard
        dashboard::dashboard_redirect,
        dashboard::get_dashboard,
        dashboard::devices_redirect,
        dashboard::get_devices,
        dashboard::get_device_detail,
    ),
    components(schemas(
        health::HealthResponse,
        dashboard::DayDto,
        dashboard::DashboardResponse,
        dashboard::DevicesResponse,
        dashboard::DeviceDetailResponse,
    ))
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}
