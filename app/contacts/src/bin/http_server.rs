use std::sync::Arc;

use anyhow::{Context, Result};
use shared::config::{AppConfig, StorageKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use contacts::biz::RecordRepo;
use contacts::data::{InMemoryRecordRepo, MySqlRecordRepo};
use contacts::server::HttpServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 初始化环境变量
    shared::init_env();

    // 2. 初始化 tracing
    let tracing_cleanup = shared::init_tracing()?;

    info!("Contacts HTTP Server starting...");

    // 3. 加载配置
    let cfg = Arc::new(AppConfig::load().context("failed to load configuration")?);

    // 4. 设置优雅关闭
    let cancel_token = CancellationToken::new();
    let signal_cancel_token = cancel_token.clone();
    let shutdown_future = cancel_token.cancelled_owned();

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, initiating graceful shutdown...");
        signal_cancel_token.cancel();
    });

    // 5. 按配置选择存储并启动服务器
    let server_result = match cfg.storage {
        StorageKind::Mysql => {
            // 连不上数据库直接退出
            let repo = Arc::new(
                MySqlRecordRepo::connect(&cfg.database())
                    .await
                    .context("Error connecting to MySQL")?,
            );
            let result = serve(cfg.clone(), repo.clone(), shutdown_future).await;
            repo.close().await;
            result
        }
        StorageKind::Memory => {
            warn!("Using in-memory storage, data will not survive a restart");
            serve(cfg.clone(), Arc::new(InMemoryRecordRepo::new()), shutdown_future).await
        }
    };

    // 6. 清理资源
    info!("Cleaning up resources...");
    tracing_cleanup.cleanup();

    if let Err(e) = server_result {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("Contacts HTTP Server shutdown complete");
    Ok(())
}

async fn serve<R: RecordRepo + 'static>(
    cfg: Arc<AppConfig>,
    repo: Arc<R>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let server = HttpServer::new(cfg, repo)?;
    info!("Starting main HTTP server...");
    server.run_with_shutdown(shutdown).await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    warn!("Failed to install signal handlers, falling back to CTRL+C");
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for CTRL+C: {}", e);
                    }
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
            _ = tokio::signal::ctrl_c() => info!("Received CTRL+C, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for CTRL+C: {}", e);
        }
        info!("Received CTRL+C, shutting down...");
    }
}
