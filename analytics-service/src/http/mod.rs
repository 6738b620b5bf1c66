//! JSON-over-HTTP shell around [`AnalyticsService`].

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use wattlab_client::domain::{ApplianceId, ConsumptionSeries, UserId};
use wattlab_client::AnalyticsError;

use crate::service::AnalyticsService;

const SERVICE_NAME: &str = "wattlab-analytics";

const ENDPOINTS: [&str; 5] = [
    "/api/predict",
    "/api/predict-bill",
    "/api/detect-anomaly",
    "/api/recommendations",
    "/api/health",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictRequest {
    appliance_id: ApplianceId,
    historical_data: ConsumptionSeries,
    #[serde(default)]
    horizon_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillRequest {
    user_id: UserId,
    month: u8,
    year: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest {
    appliance_id: ApplianceId,
    consumption_data: ConsumptionSeries,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationsRequest {
    user_id: UserId,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

/// Failure response: `{success: false, error, kind}`.
#[derive(Debug)]
pub struct ApiError(AnalyticsError);

pub fn status_for(err: &AnalyticsError) -> StatusCode {
    match err {
        AnalyticsError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AnalyticsError::InsufficientData { .. }
        | AnalyticsError::ExcessiveGap { .. }
        | AnalyticsError::UnknownTariff(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AnalyticsError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        metrics::counter!("http_api_errors_total", "kind" => kind).increment(1);
        let body = json!({
            "success": false,
            "error": self.0.to_string(),
            "kind": kind,
        });
        (status_for(&self.0), Json(body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub fn router(service: AnalyticsService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/predict", post(predict))
        .route("/api/predict-bill", post(predict_bill))
        .route("/api/detect-anomaly", post(detect_anomaly))
        .route("/api/recommendations", post(recommendations))
        .with_state(service)
}

pub async fn serve(bind_addr: &str, service: AnalyticsService) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.http_bind_addr {bind_addr}: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "analytics HTTP listener started");
    axum::serve(listener, router(service).into_make_service()).await?;
    Ok(())
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "WattLab analytics service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: OffsetDateTime::now_utc(),
    })
}

async fn predict(
    State(service): State<AnalyticsService>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult {
    metrics::counter!("http_api_requests_total", "route" => "predict").increment(1);
    let Json(req) = payload?;
    let forecast = service
        .engine()
        .predict(&req.appliance_id, &req.historical_data, req.horizon_length)?;
    Ok(Json(json!({ "success": true, "prediction": forecast })))
}

async fn predict_bill(
    State(service): State<AnalyticsService>,
    payload: Result<Json<BillRequest>, JsonRejection>,
) -> ApiResult {
    metrics::counter!("http_api_requests_total", "route" => "predict_bill").increment(1);
    let Json(req) = payload?;
    let bill = service.predict_bill_for_month(&req.user_id, req.month, req.year)?;
    Ok(Json(json!({ "success": true, "prediction": bill })))
}

async fn detect_anomaly(
    State(service): State<AnalyticsService>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> ApiResult {
    metrics::counter!("http_api_requests_total", "route" => "detect_anomaly").increment(1);
    let Json(req) = payload?;
    let report = service
        .engine()
        .detect(&req.appliance_id, &req.consumption_data)?;
    Ok(Json(json!({ "success": true, "result": report })))
}

async fn recommendations(
    State(service): State<AnalyticsService>,
    payload: Result<Json<RecommendationsRequest>, JsonRejection>,
) -> ApiResult {
    metrics::counter!("http_api_requests_total", "route" => "recommendations").increment(1);
    let Json(req) = payload?;
    let recs = service.recommendations_for_user(&req.user_id)?;
    Ok(Json(json!({ "success": true, "recommendations": recs })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use time::macros::datetime;
    use time::Duration;
    use tower::ServiceExt;
    use wattlab_client::domain::{
        Appliance, ApplianceCategory, TariffSchedule, User,
    };
    use wattlab_client::history::SnapshotStore;

    use crate::engine::Engine;

    fn alternating(n: usize) -> ConsumptionSeries {
        let values: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { 1.2 }).collect();
        ConsumptionSeries::from_values(datetime!(2024-05-30 00:00:00 UTC), Duration::hours(1), &values)
            .expect("series")
    }

    fn user(id: &str, tariff: TariffSchedule) -> User {
        User {
            id: UserId::new(id),
            tariff,
            appliances: [ApplianceId::new("A1")].into_iter().collect(),
        }
    }

    fn app() -> Router {
        let broken_tariff = TariffSchedule {
            tiers: Vec::new(),
            service_charge: 0.0,
        };
        let store = SnapshotStore::from_parts(
            vec![
                user("u1", TariffSchedule::flat(0.12, 4.0).expect("tariff")),
                user("u2", broken_tariff),
            ],
            vec![Appliance::new("A1", ApplianceCategory::Hvac)],
            BTreeMap::from([(ApplianceId::new("A1"), alternating(48))]),
        );
        router(AnalyticsService::new(Arc::new(Engine::default()), Arc::new(store)))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).expect("json body");
        (status, body)
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        send(request).await
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let request = Request::builder().uri("/").body(Body::empty()).expect("request");
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        let endpoints = body["endpoints"].as_array().expect("endpoints");
        assert!(endpoints.iter().any(|e| e == "/api/predict-bill"));
    }

    #[tokio::test]
    async fn predict_returns_requested_horizon() {
        let (status, body) = post_json(
            "/api/predict",
            json!({
                "applianceId": "A1",
                "historicalData": alternating(48),
                "horizonLength": 24,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["prediction"]["horizon"].as_array().map(Vec::len), Some(24));
        assert_eq!(body["prediction"]["applianceId"], "A1");
    }

    #[tokio::test]
    async fn huge_horizon_is_bad_request() {
        let (status, body) = post_json(
            "/api/predict",
            json!({
                "applianceId": "A1",
                "historicalData": alternating(48),
                "horizonLength": usize::MAX / 2,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn short_history_is_unprocessable() {
        let (status, body) = post_json(
            "/api/predict",
            json!({ "applianceId": "A1", "historicalData": alternating(3) }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "insufficient_data");
    }

    #[tokio::test]
    async fn negative_reading_is_bad_request() {
        let (status, body) = post_json(
            "/api/detect-anomaly",
            json!({
                "applianceId": "A1",
                "consumptionData": [
                    {"timestamp": "2024-01-01T00:00:00Z", "value": 1.0},
                    {"timestamp": "2024-01-01T01:00:00Z", "value": -2.0}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn detect_on_steady_series_is_empty() {
        let (status, body) = post_json(
            "/api/detect-anomaly",
            json!({ "applianceId": "A1", "consumptionData": alternating(48) }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["result"]["anomalies"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn bill_for_known_user() {
        let (status, body) = post_json(
            "/api/predict-bill",
            json!({ "userId": "u1", "month": 6, "year": 2024 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["prediction"]["periodStart"], "2024-06-01T00:00:00Z");
        assert!(body["prediction"]["projectedCost"].as_f64().unwrap_or(0.0) > 4.0);
    }

    #[tokio::test]
    async fn bill_error_kinds_map_to_statuses() {
        let (status, body) = post_json(
            "/api/predict-bill",
            json!({ "userId": "u2", "month": 6, "year": 2024 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "unknown_tariff");

        let (status, body) = post_json(
            "/api/predict-bill",
            json!({ "userId": "ghost", "month": 6, "year": 2024 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");

        let (status, _) = post_json(
            "/api/predict-bill",
            json!({ "userId": "u1", "month": 13, "year": 2024 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommendations_for_known_user() {
        let (status, body) =
            post_json("/api/recommendations", json!({ "userId": "u1" })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let recs = body["recommendations"].as_array().expect("array");
        assert!(!recs.is_empty());
        assert_eq!(recs[0]["priority"], 1);
    }
}
