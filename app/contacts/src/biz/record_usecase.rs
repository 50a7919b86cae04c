use std::sync::Arc;

use shared::proto::{MutationResult, RecordForm, RecordView, UpdateRecordRequest};
use shared::DateCodec;
use tracing::{instrument, warn};

use super::models::{NewRecord, NotFoundPolicy, Record};
use crate::ContactError;

/// 记录存储。每个方法对应一条自动提交的 SQL 语句
pub trait RecordRepo: Send + Sync + std::fmt::Debug {
    /// 按 id 升序返回全部记录
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Record>, ContactError>> + Send;

    fn create(
        &self,
        record: &NewRecord,
    ) -> impl std::future::Future<Output = Result<MutationResult, ContactError>> + Send;

    fn update(
        &self,
        id: u64,
        record: &NewRecord,
    ) -> impl std::future::Future<Output = Result<MutationResult, ContactError>> + Send;

    fn delete(
        &self,
        id: u64,
    ) -> impl std::future::Future<Output = Result<MutationResult, ContactError>> + Send;
}

/// 记录业务逻辑用例：校验、日期转换、未命中策略
#[derive(Debug)]
pub struct RecordUseCase<R: RecordRepo> {
    repo: Arc<R>,
    codec: DateCodec,
    policy: NotFoundPolicy,
}

impl<R: RecordRepo> RecordUseCase<R> {
    pub fn new(repo: Arc<R>, codec: DateCodec, policy: NotFoundPolicy) -> Self {
        Self {
            repo,
            codec,
            policy,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<RecordView>, ContactError> {
        let records = self.repo.list().await?;
        Ok(records.iter().map(|r| r.to_view(&self.codec)).collect())
    }

    #[instrument(skip(self, form))]
    pub async fn create(&self, form: &RecordForm) -> Result<MutationResult, ContactError> {
        let record = NewRecord::from_form(form, &self.codec)?;
        self.repo.create(&record).await
    }

    #[instrument(skip(self, req), fields(record_id = req.id))]
    pub async fn update(&self, req: &UpdateRecordRequest) -> Result<MutationResult, ContactError> {
        let record = match (check_id(req.id), NewRecord::from_form(&req.fields, &self.codec)) {
            (Ok(()), Ok(record)) => record,
            (Err(ContactError::Validation(mut a)), Err(ContactError::Validation(b))) => {
                a.extend(b);
                a.sort_by(|x, y| x.field.cmp(&y.field));
                return Err(ContactError::Validation(a));
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };

        let result = self.repo.update(req.id, &record).await?;
        self.apply_policy(req.id, result)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<MutationResult, ContactError> {
        check_id(id)?;
        let result = self.repo.delete(id).await?;
        self.apply_policy(id, result)
    }

    fn apply_policy(&self, id: u64, result: MutationResult) -> Result<MutationResult, ContactError> {
        if result.affected_rows > 0 {
            return Ok(result);
        }
        match self.policy {
            NotFoundPolicy::Surface => Err(ContactError::NotFound(id)),
            NotFoundPolicy::Ignore => {
                warn!(record_id = id, "no row matched, reporting success");
                Ok(result)
            }
        }
    }
}

fn check_id(id: u64) -> Result<(), ContactError> {
    if id == 0 {
        return Err(ContactError::validation("id", "id must be a positive integer"));
    }
    Ok(())
}
