use std::env;

use anyhow::Result;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::{error, info};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Registry,
};

use crate::SharedError;

/// Tracing 配置结构
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 服务名称
    pub service_name: String,
    /// 服务版本
    pub service_version: String,
    /// 服务环境 (dev, staging, prod)
    pub environment: String,
    /// 采样率 (0.0-1.0)
    pub sample_rate: f64,
    /// OTLP collector endpoint，未配置时不导出 span
    pub otlp_endpoint: Option<String>,
    /// 没有 OTLP 时把 span 打到 stdout，开发调试用
    pub stdout_spans: bool,
    /// 日志级别
    pub log_level: String,
    /// 是否启用JSON格式
    pub json_format: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "contacts".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            sample_rate: env::var("TRACE_SAMPLE_RATE")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()
                .unwrap_or(1.0),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            stdout_spans: env::var("OTEL_STDOUT")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_format: env::var("JSON_FORMAT")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }
}

impl TracingConfig {
    fn sampler(&self) -> Sampler {
        if self.sample_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sample_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sample_rate)
        }
    }
}

/// 初始化 OpenTelemetry tracer，没有导出目标时返回 None
fn init_opentelemetry(config: &TracingConfig) -> Result<Option<SdkTracerProvider>> {
    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", config.service_version.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
            KeyValue::new("service.instance.id", uuid::Uuid::new_v4().to_string()),
        ])
        .build();

    let provider = if let Some(otlp_endpoint) = &config.otlp_endpoint {
        let exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint)
            .build()
            .map_err(|e| SharedError::TracingError(e.to_string()))?;

        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .with_sampler(config.sampler())
            .build()
    } else if config.stdout_spans {
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .with_sampler(config.sampler())
            .build()
    } else {
        return Ok(None);
    };

    Ok(Some(provider))
}

/// 统一的 tracing 初始化入口
pub fn init_tracing() -> Result<TracingCleanup> {
    init_tracing_with_config(TracingConfig::default())
}

/// 使用自定义配置初始化 tracing
pub fn init_tracing_with_config(config: TracingConfig) -> Result<TracingCleanup> {
    let mut cleanup = TracingCleanup::default();

    // 1. 初始化 OpenTelemetry
    let tracer_provider = init_opentelemetry(&config)?;
    let trace_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer()
            .with_error_records_to_exceptions(true)
            .with_tracer(provider.tracer(config.service_name.clone()))
    });

    // 2. 创建环境过滤器
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    // 3. 构建 subscriber
    let registry = Registry::default().with(env_filter).with(trace_layer);

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_target(false)
            .with_level(true)
            .with_thread_ids(true);
        registry
            .with(fmt_layer)
            .try_init()
            .map_err(|e| SharedError::TracingError(e.to_string()))?;
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_target(false)
            .with_level(true);
        registry
            .with(fmt_layer)
            .try_init()
            .map_err(|e| SharedError::TracingError(e.to_string()))?;
    }

    // W3C traceparent，中间件据此透传上下文
    global::set_text_map_propagator(TraceContextPropagator::new());

    // 设置全局 tracer provider
    if let Some(provider) = tracer_provider {
        global::set_tracer_provider(provider.clone());
        cleanup.tracer_provider = Some(provider);
    }

    info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        environment = %config.environment,
        sample_rate = %config.sample_rate,
        otlp = config.otlp_endpoint.is_some(),
        "Tracing initialized successfully"
    );

    Ok(cleanup)
}

/// 清理资源的结构体
#[derive(Default)]
pub struct TracingCleanup {
    tracer_provider: Option<SdkTracerProvider>,
}

impl TracingCleanup {
    /// 执行清理操作
    pub fn cleanup(self) {
        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                error!("Failed to shutdown tracer provider: {:?}", e);
            } else {
                info!("Tracer provider shutdown successfully");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_from_rate() {
        let mut cfg = TracingConfig::default();
        cfg.sample_rate = 1.0;
        assert!(matches!(cfg.sampler(), Sampler::AlwaysOn));
        cfg.sample_rate = 0.0;
        assert!(matches!(cfg.sampler(), Sampler::AlwaysOff));
        cfg.sample_rate = 0.25;
        assert!(matches!(cfg.sampler(), Sampler::TraceIdRatioBased(r) if r == 0.25));
    }

    #[test]
    fn test_no_exporter_without_endpoint() {
        let mut cfg = TracingConfig::default();
        cfg.otlp_endpoint = None;
        cfg.stdout_spans = false;
        assert!(init_opentelemetry(&cfg).unwrap().is_none());
    }
}
