use std::env;

use anyhow::{Context, Result};
use shared::traces::{init_tracing_with_config, TracingConfig};
use shared::DateCodec;
use tracing::info;

use contacts_console::prompt::TerminalPrompt;
use contacts_console::{ConsoleApp, ContactStore, HttpRecordApi};

const DEFAULT_API_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 初始化环境变量
    shared::init_env();

    // 2. 初始化 tracing，默认只输出 warn 以上，避免干扰交互界面
    let mut tracing_config = TracingConfig {
        service_name: "contacts-console".to_string(),
        ..TracingConfig::default()
    };
    if env::var("RUST_LOG").is_err() {
        tracing_config.log_level = "warn".to_string();
    }
    let tracing_cleanup = init_tracing_with_config(tracing_config)?;

    // 3. 客户端配置
    let base_url = env::var("CONTACTS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let codec = match env::var("DISPLAY_TIMEZONE") {
        Ok(offset) => DateCodec::from_offset_str(&offset).context("invalid DISPLAY_TIMEZONE")?,
        Err(_) => DateCodec::utc(),
    };
    info!(%base_url, "Contacts console starting...");

    // 4. 运行交互循环
    let api = HttpRecordApi::new(base_url)?;
    let mut app = ConsoleApp::new(ContactStore::new(api, codec), TerminalPrompt::default());
    let result = app.run().await;

    tracing_cleanup.cleanup();
    result
}
