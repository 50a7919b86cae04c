use std::sync::Arc;

use shared::config::AppConfig;
use tracing::info;

use crate::biz::{NotFoundPolicy, RecordRepo, RecordUseCase};
use crate::service::RecordService;
use crate::{ContactError, Result};

pub struct HttpServer<R: RecordRepo> {
    pub cfg: Arc<AppConfig>,
    pub record_service: Arc<RecordService<R>>,
}

impl<R: RecordRepo + 'static> HttpServer<R> {
    /// 按配置组装 用例 -> 服务 两层
    pub fn new(cfg: Arc<AppConfig>, repo: Arc<R>) -> Result<Self> {
        let codec = cfg.date_codec()?;
        let policy = NotFoundPolicy::from_strict(cfg.strict_not_found);
        let uc = Arc::new(RecordUseCase::new(repo, codec, policy));
        let record_service = Arc::new(RecordService::new(uc));
        Ok(Self {
            cfg,
            record_service,
        })
    }

    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.cfg.listen_addr()).await?;
        info!("Server is running on {}", listener.local_addr()?);

        let app = self.create_router();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ContactError::ServerError(e.to_string()))?;

        Ok(())
    }
}
