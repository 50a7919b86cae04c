use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::response::Json;
use shared::proto::{
    Envelope, MutationResult, RecordForm, RecordView, UpdateRecordRequest, MSG_CREATED,
    MSG_DELETED, MSG_UPDATED,
};
use tracing::{info, warn};

use crate::biz::{RecordRepo, RecordUseCase};
use crate::ContactError;

type ApiResult<T> = Result<Json<Envelope<T>>, ContactError>;

/// HTTP 层：解析请求、调用用例、组装响应信封
#[derive(Debug)]
pub struct RecordService<R: RecordRepo> {
    uc: Arc<RecordUseCase<R>>,
}

impl<R: RecordRepo> RecordService<R> {
    pub fn new(uc: Arc<RecordUseCase<R>>) -> Self {
        Self { uc }
    }

    #[tracing::instrument(skip(self), fields(operation = "list_records"))]
    pub async fn list(&self) -> ApiResult<Vec<RecordView>> {
        let records = self.uc.list().await?;
        info!(count = records.len(), "Listed records");
        Ok(Json(Envelope::success(records)))
    }

    #[tracing::instrument(skip(self, payload), fields(operation = "create_record"))]
    pub async fn create(
        &self,
        payload: Result<Json<RecordForm>, JsonRejection>,
    ) -> ApiResult<MutationResult> {
        let Json(form) = payload.map_err(body_error)?;
        let result = self.uc.create(&form).await?;
        info!(record_id = result.insert_id, "Record created");
        Ok(Json(Envelope::with_message(MSG_CREATED, result)))
    }

    #[tracing::instrument(skip(self, payload), fields(operation = "update_record"))]
    pub async fn update(
        &self,
        payload: Result<Json<UpdateRecordRequest>, JsonRejection>,
    ) -> ApiResult<MutationResult> {
        let Json(req) = payload.map_err(body_error)?;
        let result = self.uc.update(&req).await?;
        info!(record_id = req.id, affected_rows = result.affected_rows, "Record updated");
        Ok(Json(Envelope::with_message(MSG_UPDATED, result)))
    }

    #[tracing::instrument(skip(self, id), fields(operation = "delete_record"))]
    pub async fn delete(&self, id: Result<Path<u64>, PathRejection>) -> ApiResult<MutationResult> {
        let Path(id) = id.map_err(|rejection| {
            warn!(error = %rejection, "Invalid record id in path");
            ContactError::validation("id", rejection.body_text())
        })?;
        let result = self.uc.delete(id).await?;
        info!(record_id = id, affected_rows = result.affected_rows, "Record deleted");
        Ok(Json(Envelope::with_message(MSG_DELETED, result)))
    }
}

fn body_error(rejection: JsonRejection) -> ContactError {
    warn!(error = %rejection, "Rejected request body");
    ContactError::validation("body", rejection.body_text())
}
