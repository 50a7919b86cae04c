use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::proto::{RecordForm, RecordView};
use shared::{date, DateCodec};

use crate::ContactError;

/// users 表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub date_of_birth: NaiveDate,
}

impl Record {
    pub fn new(id: u64, fields: NewRecord) -> Self {
        Self {
            id,
            name: fields.name,
            email: fields.email,
            mobile: fields.mobile,
            date_of_birth: fields.date_of_birth,
        }
    }

    /// 读取时计算展示日期，不重复存储
    pub fn to_view(&self, codec: &DateCodec) -> RecordView {
        RecordView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
            date_of_birth: date::to_iso(self.date_of_birth),
            formatted_date: codec.to_display(self.date_of_birth),
        }
    }
}

/// 校验并完成日期转换后的写入数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub date_of_birth: NaiveDate,
}

impl NewRecord {
    pub fn from_form(form: &RecordForm, codec: &DateCodec) -> Result<Self, ContactError> {
        form.check().map_err(ContactError::Validation)?;

        let date_of_birth = codec
            .to_storage(&form.date_of_birth)
            .map_err(|e| ContactError::validation("date_of_birth", e.to_string()))?;

        Ok(Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            mobile: form.mobile.clone(),
            date_of_birth,
        })
    }
}

/// update/delete 没有命中任何行时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFoundPolicy {
    /// 视为成功，保持原有接口行为
    #[default]
    Ignore,
    /// 返回 404
    Surface,
}

impl NotFoundPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            NotFoundPolicy::Surface
        } else {
            NotFoundPolicy::Ignore
        }
    }
}
