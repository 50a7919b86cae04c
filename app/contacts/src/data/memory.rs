use std::collections::BTreeMap;

use shared::proto::MutationResult;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::biz::{NewRecord, Record, RecordRepo};
use crate::ContactError;

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<u64, Record>,
    /// 自增 id，删除后不复用
    last_id: u64,
}

/// 进程内存储，STORAGE=memory 时使用，也用于测试
#[derive(Debug, Default)]
pub struct InMemoryRecordRepo {
    table: RwLock<Table>,
}

impl InMemoryRecordRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordRepo for InMemoryRecordRepo {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Record>, ContactError> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    #[instrument(skip(self, record))]
    async fn create(&self, record: &NewRecord) -> Result<MutationResult, ContactError> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(id, Record::new(id, record.clone()));
        Ok(MutationResult {
            insert_id: id,
            affected_rows: 1,
        })
    }

    #[instrument(skip(self, record))]
    async fn update(&self, id: u64, record: &NewRecord) -> Result<MutationResult, ContactError> {
        let mut table = self.table.write().await;
        let affected_rows = match table.rows.get_mut(&id) {
            Some(row) => {
                *row = Record::new(id, record.clone());
                1
            }
            None => 0,
        };
        Ok(MutationResult {
            insert_id: 0,
            affected_rows,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: u64) -> Result<MutationResult, ContactError> {
        let mut table = self.table.write().await;
        let affected_rows = u64::from(table.rows.remove(&id).is_some());
        Ok(MutationResult {
            insert_id: 0,
            affected_rows,
        })
    }
}
