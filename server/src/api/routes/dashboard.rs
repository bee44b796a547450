//! Dashboard API endpoints
//!
//! Each handler builds one generator per request and one view per result
//! set; nothing is shared between requests except the recorder pool.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::api::types::{ApiError, TrendQuery, parse_day_param};
use crate::core::constants::DETAIL_MINUTE_BUCKET_SIZE;
use crate::data::RecorderService;
use crate::domain::statistics::{
    ChartGroups, DataSet, GroupingLevel, QuerySpec, QuerySpecBuilder, RecorderSchema,
    StatisticRecord, StatisticsGenerator, StatisticsView, TrendOptions,
};
use crate::utils::time::{format_day_path, format_ev_day, resolve_ev_day};

/// Mount point of [`routes`], used to build redirect targets
const API_BASE: &str = "http://localhost/api/v1";

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct DashboardApiState {
    pub recorder: Arc<RecorderService>,
    pub schema: Arc<RecorderSchema>,
}

impl DashboardApiState {
    fn generator(&self) -> StatisticsGenerator<'_> {
        StatisticsGenerator::new(self.recorder.executor(), &self.schema)
    }

    fn view(&self, records: Vec<StatisticRecord>) -> StatisticsView {
        StatisticsView::new(records).with_sub_entity_prefix(self.schema.sub_entity_prefix.clone())
    }

    async fn entity_list(&self, day: NaiveDate) -> Result<Vec<String>, ApiError> {
        let records = self.generator().entities(day).await?;
        Ok(self.view(records).entities().to_vec())
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Day picker parameters
#[derive(Debug, Deserialize)]
pub struct DayPickerQuery {
    /// Selected day (DD.MM.YYYY), today when absent
    pub ev_day: Option<String>,
    /// Days to move from `ev_day`
    #[serde(default)]
    pub ev_offset: i64,
    /// Device whose detail page to open
    pub device: Option<String>,
}

/// Day being shown plus its navigation targets
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayDto {
    pub date: NaiveDate,
    /// DD.MM.YYYY
    pub display: String,
    /// YYYYMMDD of the previous day
    pub previous: Option<String>,
    /// YYYYMMDD of the next day
    pub next: Option<String>,
}

impl DayDto {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            display: format_ev_day(date),
            previous: date.pred_opt().map(format_day_path),
            next: date.succ_opt().map(format_day_path),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub day: DayDto,
    pub entities: Vec<String>,
    pub labels: Vec<String>,
    /// Comma-joined minima, one per label
    pub minima: String,
    pub maxima: String,
    pub averages: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevicesResponse {
    pub day: DayDto,
    pub entities: Vec<String>,
    pub labels: Vec<String>,
    /// Minimum/Average/Maximum chart per device
    #[schema(value_type = Object)]
    pub device_trends: ChartGroups,
    /// One average line per device, for a combined chart
    #[schema(value_type = Vec<Object>)]
    pub device_averages: Vec<DataSet>,
    /// Average per channel, one chart per device
    #[schema(value_type = Object)]
    pub channel_averages: ChartGroups,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetailResponse {
    pub day: DayDto,
    pub device: String,
    pub entities: Vec<String>,
    pub labels: Vec<String>,
    /// Minimum/Average/Maximum chart per channel
    #[schema(value_type = Object)]
    pub channel_trends: ChartGroups,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(recorder: Arc<RecorderService>, schema: Arc<RecorderSchema>) -> Router<()> {
    let state = DashboardApiState { recorder, schema };
    Router::new()
        .route("/dashboard", get(dashboard_redirect))
        .route("/dashboard/{day}", get(get_dashboard))
        .route("/devices", get(devices_redirect))
        .route("/devices/{day}", get(get_devices))
        .route("/devices/{day}/{device}", get(get_device_detail))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Resolve the day picker and redirect to the overall dashboard of that day
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "dashboard",
    params(
        ("ev_day" = Option<String>, Query, description = "Day (DD.MM.YYYY), today when absent"),
        ("ev_offset" = Option<i64>, Query, description = "Days to add to ev_day"),
        ("attribute" = Option<String>, Query, description = "Attribute to aggregate"),
        ("minutes" = Option<u32>, Query, description = "Minute bucket size")
    ),
    responses(
        (status = 307, description = "Redirect to /api/v1/dashboard/{day}"),
        (status = 400, description = "Invalid day")
    )
)]
pub async fn dashboard_redirect(
    Query(picker): Query<DayPickerQuery>,
    Query(trend): Query<TrendQuery>,
) -> Result<Redirect, ApiError> {
    let day = picked_day(&picker)?;
    redirect_to(&["dashboard", &format_day_path(day)], &trend)
}

/// Overall trend of one day plus the devices that published on it
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/{day}",
    tag = "dashboard",
    params(
        ("day" = String, Path, description = "Day (YYYYMMDD)"),
        ("attribute" = Option<String>, Query, description = "Attribute to aggregate"),
        ("minutes" = Option<u32>, Query, description = "Minute bucket size (default hourly)")
    ),
    responses(
        (status = 200, description = "Overall trend", body = DashboardResponse),
        (status = 400, description = "Invalid day or trend parameters"),
        (status = 500, description = "Recorder query failed")
    )
)]
pub async fn get_dashboard(
    State(state): State<DashboardApiState>,
    Path(day): Path<String>,
    Query(trend): Query<TrendQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let day = parse_day_param(&day)?;
    let records = state
        .generator()
        .overall_trend(day, GroupingLevel::Overall, &trend.options(0))
        .await?;
    let view = state.view(records);

    Ok(Json(DashboardResponse {
        day: DayDto::new(day),
        entities: state.entity_list(day).await?,
        labels: view.labels(),
        minima: view.minima(),
        maxima: view.maxima(),
        averages: view.averages(),
    }))
}

/// Resolve the day picker and redirect to the device overview or, with
/// `device`, to that device's detail page
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    tag = "dashboard",
    params(
        ("ev_day" = Option<String>, Query, description = "Day (DD.MM.YYYY), today when absent"),
        ("ev_offset" = Option<i64>, Query, description = "Days to add to ev_day"),
        ("device" = Option<String>, Query, description = "Open the detail page of this device"),
        ("attribute" = Option<String>, Query, description = "Attribute to aggregate"),
        ("minutes" = Option<u32>, Query, description = "Minute bucket size")
    ),
    responses(
        (status = 307, description = "Redirect to the device pages of the day"),
        (status = 400, description = "Invalid day")
    )
)]
pub async fn devices_redirect(
    Query(picker): Query<DayPickerQuery>,
    Query(trend): Query<TrendQuery>,
) -> Result<Redirect, ApiError> {
    let day = format_day_path(picked_day(&picker)?);
    match picker.device.as_deref().filter(|d| !d.is_empty()) {
        Some(device) => redirect_to(&["devices", &day, device], &trend),
        None => redirect_to(&["devices", &day], &trend),
    }
}

/// Per-device trends and per-device channel averages of one day
#[utoipa::path(
    get,
    path = "/api/v1/devices/{day}",
    tag = "dashboard",
    params(
        ("day" = String, Path, description = "Day (YYYYMMDD)"),
        ("attribute" = Option<String>, Query, description = "Attribute to aggregate"),
        ("minutes" = Option<u32>, Query, description = "Minute bucket size (default hourly)")
    ),
    responses(
        (status = 200, description = "Device overview", body = DevicesResponse),
        (status = 400, description = "Invalid day or trend parameters"),
        (status = 500, description = "Recorder query failed")
    )
)]
pub async fn get_devices(
    State(state): State<DashboardApiState>,
    Path(day): Path<String>,
    Query(trend): Query<TrendQuery>,
) -> Result<Json<DevicesResponse>, ApiError> {
    let day = parse_day_param(&day)?;
    let options = trend.options(0);
    let generator = state.generator();

    let overall = generator
        .overall_trend(day, GroupingLevel::Overall, &options)
        .await?;
    let by_entity = generator
        .overall_trend(day, GroupingLevel::ByEntity, &options)
        .await?;
    let by_sub_entity = generator
        .overall_trend(day, GroupingLevel::ByEntityAndSubEntity, &options)
        .await?;

    let device_view = state.view(by_entity);
    let channel_view = state.view(by_sub_entity);

    Ok(Json(DevicesResponse {
        day: DayDto::new(day),
        entities: state.entity_list(day).await?,
        labels: state.view(overall).labels(),
        device_trends: device_view.trends_by_entity().clone(),
        device_averages: device_view.averages_by_entity(),
        channel_averages: channel_view.subs_by_entity().clone(),
    }))
}

/// Channel trends of one device in fine-grained buckets
#[utoipa::path(
    get,
    path = "/api/v1/devices/{day}/{device}",
    tag = "dashboard",
    params(
        ("day" = String, Path, description = "Day (YYYYMMDD)"),
        ("device" = String, Path, description = "Device ID"),
        ("attribute" = Option<String>, Query, description = "Attribute to aggregate"),
        ("minutes" = Option<u32>, Query, description = "Minute bucket size (default 5)")
    ),
    responses(
        (status = 200, description = "Device detail", body = DeviceDetailResponse),
        (status = 400, description = "Invalid day or trend parameters"),
        (status = 500, description = "Recorder query failed")
    )
)]
pub async fn get_device_detail(
    State(state): State<DashboardApiState>,
    Path((day, device)): Path<(String, String)>,
    Query(trend): Query<TrendQuery>,
) -> Result<Json<DeviceDetailResponse>, ApiError> {
    let day = parse_day_param(&day)?;
    let options = trend.options(DETAIL_MINUTE_BUCKET_SIZE);
    let generator = state.generator();

    let channels = generator.sub_entity_values(&device, day, &options).await?;
    let device_trend = generator
        .run(&device_spec(&state.schema, day, &device, &options)?)
        .await?;

    let channel_view = state.view(channels);

    Ok(Json(DeviceDetailResponse {
        day: DayDto::new(day),
        entities: state.entity_list(day).await?,
        labels: state.view(device_trend).labels(),
        channel_trends: channel_view.trends_by_sub_entity().clone(),
        device,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn picked_day(picker: &DayPickerQuery) -> Result<NaiveDate, ApiError> {
    let today = Local::now().date_naive();
    resolve_ev_day(picker.ev_day.as_deref(), picker.ev_offset, today)
        .map_err(|message| ApiError::bad_request("INVALID_DATE", message))
}

/// Single-device trend, used as the x-axis of its channel charts
fn device_spec(
    schema: &RecorderSchema,
    day: NaiveDate,
    device: &str,
    options: &TrendOptions,
) -> Result<QuerySpec, ApiError> {
    let mut builder = QuerySpecBuilder::new(GroupingLevel::ByEntity, day)
        .minute_bucket_size(options.minute_bucket_size)
        .entity_filter(device);
    if let Some(attr) = &options.target_attribute {
        builder = builder.target_attribute(attr.clone());
    }
    Ok(builder.build(schema)?)
}

/// Redirect below the API mount point, keeping the trend parameters
fn redirect_to(segments: &[&str], trend: &TrendQuery) -> Result<Redirect, ApiError> {
    let mut url = Url::parse(API_BASE).map_err(|e| ApiError::internal(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::internal("API base URL cannot have path segments"))?
        .extend(segments);

    if trend.attribute.is_some() || trend.minutes.is_some() {
        let mut pairs = url.query_pairs_mut();
        if let Some(attribute) = &trend.attribute {
            pairs.append_pair("attribute", attribute);
        }
        if let Some(minutes) = trend.minutes {
            pairs.append_pair("minutes", &minutes.to_string());
        }
    }

    let location = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    tracing::debug!(location = %location, "Redirecting day picker");
    Ok(Redirect::temporary(&location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    use crate::data::SqliteRecorder;

    const FIXTURE: &[(&str, &str, i64, i64)] = &[
        ("2024-03-01 10:02:00", "dev-a", 1, 4),
        ("2024-03-01 10:07:00", "dev-a", 2, 10),
        ("2024-03-01 10:59:59", "dev-a", 2, 20),
        ("2024-03-01 11:00:00", "dev-b", 1, 1),
        ("2024-03-01 11:31:00", "dev-b", 1, 3),
        ("2024-03-02 09:00:00", "dev-c", 1, 100),
    ];

    async fn app() -> Router {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE iot_recorder_input_probe (
                probe_time TEXT NOT NULL, device_id TEXT, channel_no INTEGER, value INTEGER
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (ts, dev, ch, value) in FIXTURE {
            sqlx::query("INSERT INTO iot_recorder_input_probe VALUES (?, ?, ?, ?)")
                .bind(*ts)
                .bind(*dev)
                .bind(*ch)
                .bind(*value)
                .execute(&pool)
                .await
                .unwrap();
        }
        let recorder = RecorderService::Sqlite(Arc::new(SqliteRecorder::from_pool(pool)));
        routes(Arc::new(recorder), Arc::new(RecorderSchema::default()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn location(app: Router, uri: &str) -> String {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_dashboard_redirect_applies_offset() {
        let target = location(app().await, "/dashboard?ev_day=01.03.2024&ev_offset=-1").await;
        assert_eq!(target, "/api/v1/dashboard/20240229");
    }

    #[tokio::test]
    async fn test_dashboard_redirect_keeps_trend_params() {
        let target = location(app().await, "/dashboard?ev_day=01.03.2024&minutes=15").await;
        assert_eq!(target, "/api/v1/dashboard/20240301?minutes=15");
    }

    #[tokio::test]
    async fn test_dashboard_redirect_without_day_uses_today() {
        let today = format_day_path(Local::now().date_naive());
        let target = location(app().await, "/dashboard").await;
        // The day may roll over between the two clock reads
        assert!(target.starts_with("/api/v1/dashboard/"));
        assert_eq!(target.len(), "/api/v1/dashboard/".len() + today.len());
    }

    #[tokio::test]
    async fn test_dashboard_redirect_rejects_bad_day() {
        let (status, body) = get_json(app().await, "/dashboard?ev_day=2024-03-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_DATE");
    }

    #[tokio::test]
    async fn test_devices_redirect_encodes_device() {
        let target = location(app().await, "/devices?ev_day=01.03.2024&device=dev%20a/1").await;
        assert_eq!(target, "/api/v1/devices/20240301/dev%20a%2F1");
    }

    #[tokio::test]
    async fn test_get_dashboard() {
        let (status, body) = get_json(app().await, "/dashboard/20240301").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["day"]["display"], "01.03.2024");
        assert_eq!(body["day"]["previous"], "20240229");
        assert_eq!(body["entities"], serde_json::json!(["dev-a", "dev-b"]));
        assert_eq!(body["labels"], serde_json::json!(["10:00", "11:00"]));
        assert_eq!(body["minima"], "4,1");
        assert_eq!(body["maxima"], "20,3");
    }

    #[tokio::test]
    async fn test_get_dashboard_bad_day_and_bucket() {
        let (status, body) = get_json(app().await, "/dashboard/2024-03-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_DATE");

        let (status, body) = get_json(app().await, "/dashboard/20240301?minutes=90").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");

        let (status, _) = get_json(app().await, "/dashboard/20240301?attribute=secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_devices() {
        let (status, body) = get_json(app().await, "/devices/20240301").await;
        assert_eq!(status, StatusCode::OK);

        let trends = body["deviceTrends"].as_object().unwrap();
        assert_eq!(trends.keys().collect::<Vec<_>>(), vec!["dev-a", "dev-b"]);
        assert_eq!(trends["dev-a"]["chartId"], 1);
        assert_eq!(trends["dev-a"]["dataSets"][0]["label"], "Minimum");

        let averages = body["deviceAverages"].as_array().unwrap();
        assert_eq!(averages[0]["label"], "dev-a");
        assert_eq!(averages[1]["borderColor"], "#00ff00");

        let channels = body["channelAverages"].as_object().unwrap();
        let dev_a = channels["dev-a"]["dataSets"].as_array().unwrap();
        assert_eq!(dev_a.len(), 2);
        assert_eq!(dev_a[0]["label"], "Channel: 01");
        assert_eq!(dev_a[1]["label"], "Channel: 02");
    }

    #[tokio::test]
    async fn test_get_device_detail_uses_five_minute_buckets() {
        let (status, body) = get_json(app().await, "/devices/20240301/dev-a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"], "dev-a");
        assert_eq!(
            body["labels"],
            serde_json::json!(["10:00", "10:05", "10:55"])
        );
        let channels = body["channelTrends"].as_object().unwrap();
        assert_eq!(
            channels.keys().collect::<Vec<_>>(),
            vec!["Channel: 01", "Channel: 02"]
        );
    }

    #[tokio::test]
    async fn test_get_device_detail_unknown_device_is_empty() {
        let (status, body) = get_json(app().await, "/devices/20240301/dev-z").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["labels"], serde_json::json!([]));
        assert!(body["channelTrends"].as_object().unwrap().is_empty());
    }
}
