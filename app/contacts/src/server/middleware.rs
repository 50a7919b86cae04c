use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use opentelemetry::{
    propagation::{Extractor, Injector},
    trace::TraceContextExt,
};
use tracing::{error, warn, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

const HTTP_STATUS_CODE: &str = "http.status_code";

/// 从请求头读取上游 trace context
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// 向响应头写入 trace context
struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(header_name) = HeaderName::try_from(key) {
            if let Ok(header_value) = value.parse() {
                self.0.insert(header_name, header_value);
            }
        }
    }
}

/// Tracing 中间件配置
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 慢请求阈值（毫秒）
    pub slow_request_threshold_ms: u64,
    /// 是否在响应头中包含 trace_id
    pub include_trace_id_header: bool,
    /// trace_id 响应头名称
    pub trace_id_header_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            slow_request_threshold_ms: 1000,
            include_trace_id_header: true,
            trace_id_header_name: "x-trace-id".to_string(),
        }
    }
}

/// 运行在 TraceLayer 的 span 内：
/// 关联上游 trace context，按状态码记录结果，并把 trace_id 写回响应头。
pub async fn tracing_middleware(
    State(config): State<TracingConfig>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    let parent_cx = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(request.headers()))
    });
    let span = Span::current();
    span.set_parent(parent_cx);

    let mut response = next.run(request).await;

    let duration_ms = start_time.elapsed().as_millis() as u64;
    let status = response.status();
    span.set_attribute(HTTP_STATUS_CODE, status.as_u16() as i64);

    if status.is_server_error() {
        error!(status_code = %status.as_u16(), duration_ms, "Server error occurred");
    } else if status.is_client_error() {
        warn!(status_code = %status.as_u16(), duration_ms, "Client error occurred");
    } else if duration_ms >= config.slow_request_threshold_ms {
        warn!(status_code = %status.as_u16(), duration_ms, "Slow request completed");
    }

    let cx = span.context();
    let headers = response.headers_mut();
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HeaderInjector(headers))
    });

    // 未启用 OpenTelemetry 时 span context 无效，不写响应头
    let span_context = cx.span().span_context().clone();
    if config.include_trace_id_header && span_context.is_valid() {
        if let (Ok(header_name), Ok(header_value)) = (
            HeaderName::try_from(config.trace_id_header_name.as_str()),
            span_context.trace_id().to_string().parse(),
        ) {
            headers.insert(header_name, header_value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    fn app(config: TracingConfig) -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/boom",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .layer(axum::middleware::from_fn_with_state(
                config,
                tracing_middleware,
            ))
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        let response = app(TracingConfig::default())
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_server_error_status_is_preserved() {
        let response = app(TracingConfig::default())
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_no_trace_header_without_exporter() {
        // 测试中没有安装 tracer provider，span context 无效
        let response = app(TracingConfig::default())
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!response.headers().contains_key("x-trace-id"));
    }
}
