use chrono::NaiveDate;
use shared::config::DatabaseConfig;
use shared::proto::MutationResult;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{error, info, instrument};

use crate::biz::{NewRecord, Record, RecordRepo};
use crate::ContactError;

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: u64,
    name: String,
    email: String,
    mobile: String,
    date_of_birth: NaiveDate,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            date_of_birth: row.date_of_birth,
        }
    }
}

/// MySQL 存储，表结构见 sql/users.sql
///
/// 连接池默认只保留一个长连接，所有请求复用。每条语句自动提交。
#[derive(Debug, Clone)]
pub struct MySqlRecordRepo {
    pool: MySqlPool,
}

impl MySqlRecordRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, ContactError> {
        let options = MySqlConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!(host = %cfg.host, database = %cfg.database, "Error connecting to MySQL: {}", e);
                ContactError::Storage(e.to_string())
            })?;

        info!(host = %cfg.host, database = %cfg.database, "Connected to MySQL");
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RecordRepo for MySqlRecordRepo {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Record>, ContactError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, name, email, mobile, date_of_birth
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    #[instrument(skip(self, record))]
    async fn create(&self, record: &NewRecord) -> Result<MutationResult, ContactError> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, mobile, date_of_birth) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.mobile)
        .bind(record.date_of_birth)
        .execute(&self.pool)
        .await?;

        Ok(MutationResult {
            insert_id: result.last_insert_id(),
            affected_rows: result.rows_affected(),
        })
    }

    #[instrument(skip(self, record))]
    async fn update(&self, id: u64, record: &NewRecord) -> Result<MutationResult, ContactError> {
        // sqlx 以 CLIENT_FOUND_ROWS 建连，rows_affected 是匹配行数而不是变更行数
        let result = sqlx::query(
            "UPDATE users SET name = ?, email = ?, mobile = ?, date_of_birth = ? WHERE id = ?",
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.mobile)
        .bind(record.date_of_birth)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(MutationResult {
            insert_id: result.last_insert_id(),
            affected_rows: result.rows_affected(),
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: u64) -> Result<MutationResult, ContactError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(MutationResult {
            insert_id: result.last_insert_id(),
            affected_rows: result.rows_affected(),
        })
    }
}
