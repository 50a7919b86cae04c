use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{DateCodec, SharedError};

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Mysql,
    /// 进程内存储，仅用于开发和测试
    Memory,
}

/// 服务配置
///
/// 加载顺序：内置默认值 -> `config/default`、`config/local` 文件 -> 进程环境变量。
/// 环境变量名为字段名的大写形式，例如 `DB_HOST`、`ALLOWED_ORIGINS`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub addr: String,
    pub port: u16,

    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    /// 连接池上限，默认 1 个长连接
    pub db_max_connections: u32,

    /// CORS 白名单，逗号分隔
    #[serde(deserialize_with = "comma_list")]
    pub allowed_origins: Vec<String>,
    /// 由时间戳推导展示日期时使用的 UTC 偏移，例如 `+05:30`。
    /// 只作用于时间戳形式的线上日期（客户端编辑表单预填）；DATE 列按原样展示
    pub display_timezone: String,
    /// update/delete 没有命中任何行时是否返回 404
    pub strict_not_found: bool,
    pub request_timeout_secs: u64,
    pub storage: StorageKind,
}

/// 列表既可以来自配置文件里的数组，也可以来自逗号分隔的环境变量
fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        Items(Vec<String>),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::Joined(value) => value.split(',').map(str::to_string).collect(),
        Raw::Items(items) => items,
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// 数据库连接参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl AppConfig {
    pub fn load() -> Result<Self, SharedError> {
        Self::load_with(config::Environment::default())
    }

    /// 使用给定的环境变量源加载，测试中可以传入固定的 map
    pub fn load_with(environment: config::Environment) -> Result<Self, SharedError> {
        let cfg = config::Config::builder()
            .set_default("addr", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("db_host", "localhost")?
            .set_default("db_port", 3306)?
            .set_default("db_user", "root")?
            .set_default("db_password", "")?
            .set_default("db_name", "contacts")?
            .set_default("db_max_connections", 1)?
            .set_default("allowed_origins", vec!["http://localhost:3000"])?
            .set_default("display_timezone", "+00:00")?
            .set_default("strict_not_found", false)?
            .set_default("request_timeout_secs", 30)?
            .set_default("storage", "mysql")?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // 环境变量保持字符串，数值和布尔在反序列化时转换
            .add_source(environment)
            .build()?;

        let app: AppConfig = cfg.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<(), SharedError> {
        if self.db_max_connections == 0 {
            return Err(SharedError::ConfigurationError(
                "db_max_connections must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SharedError::ConfigurationError(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.date_codec()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
            max_connections: self.db_max_connections,
        }
    }

    pub fn date_codec(&self) -> Result<DateCodec, SharedError> {
        DateCodec::from_offset_str(&self.display_timezone)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn default_for_test() -> Self {
        Self {
            addr: "127.0.0.1".to_string(),
            port: 8080,
            db_host: "localhost".to_string(),
            db_port: 3306,
            db_user: "root".to_string(),
            db_password: String::new(),
            db_name: "contacts_test".to_string(),
            db_max_connections: 1,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            display_timezone: "+00:00".to_string(),
            strict_not_found: false,
            request_timeout_secs: 30,
            storage: StorageKind::Memory,
        }
    }
}
