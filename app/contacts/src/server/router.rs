use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method, Request, StatusCode},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info_span, warn, Span};

use super::middleware::{tracing_middleware, TracingConfig};
use super::server::HttpServer;
use crate::biz::RecordRepo;

/// 请求 ID 生成器
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = uuid::Uuid::new_v4().to_string();
        Some(RequestId::new(request_id.parse().ok()?))
    }
}

impl<R: RecordRepo + 'static> HttpServer<R> {
    pub fn create_router(&self) -> Router {
        self.create_router_with_config(TracingConfig::default())
    }

    pub fn create_router_with_config(&self, tracing_config: TracingConfig) -> Router {
        let records = Arc::clone(&self.record_service);

        Router::new()
            .route("/health", get(health_check))
            .route(
                "/",
                get({
                    let service = records.clone();
                    move || async move { service.list().await }
                }),
            )
            .route(
                "/create",
                post({
                    let service = records.clone();
                    move |payload| async move { service.create(payload).await }
                }),
            )
            .route(
                "/update",
                put({
                    let service = records.clone();
                    move |payload| async move { service.update(payload).await }
                }),
            )
            .route(
                "/delete/{id}",
                delete({
                    let service = records.clone();
                    move |id| async move { service.delete(id).await }
                }),
            )
            // 中间件层：后添加的在外层
            .layer(axum::middleware::from_fn_with_state(
                tracing_config,
                tracing_middleware,
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.cfg.request_timeout(),
            ))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request<_>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("");

                        info_span!(
                            "http_request",
                            "http.method" = %request.method(),
                            "http.route" = %request.uri().path(),
                            "request.id" = %request_id,
                        )
                    })
                    .on_request(|_request: &Request<_>, _span: &Span| {
                        tracing::info!("Processing HTTP request");
                    })
                    .on_response(
                        |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                            tracing::info!(
                                "http.response.status_code" = %response.status(),
                                duration_ms = %latency.as_millis(),
                                "HTTP request completed"
                            );
                        },
                    )
                    .on_failure(
                        |error: tower_http::classify::ServerErrorsFailureClass,
                         latency: Duration,
                         _span: &Span| {
                            tracing::error!(
                                error = %error,
                                duration_ms = %latency.as_millis(),
                                "HTTP request failed"
                            );
                        },
                    ),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(cors_layer(&self.cfg.allowed_origins))
    }
}

/// 只放行配置中的来源，允许携带凭据
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            let origin = origin.trim().trim_end_matches('/');
            match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin, "Ignoring invalid CORS origin");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// 健康检查端点
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "contacts",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
