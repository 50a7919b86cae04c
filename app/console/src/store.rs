use shared::proto::{RecordForm, RecordView, UpdateRecordRequest};
use shared::{date, DateCodec};
use tracing::{error, warn};

use crate::api::{ClientError, RecordApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Add,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Mobile,
    DateOfBirth,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::Email, Field::Mobile, Field::DateOfBirth];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Mobile => "Mobile",
            Field::DateOfBirth => "Date of Birth (dd/mm/yyyy)",
        }
    }
}

/// 表单缓冲区。编辑表单额外带上被编辑记录的 id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBuffer {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub date_of_birth: String,
    /// 日期格式错误标记，每次修改日期时重新计算
    pub date_error: bool,
}

impl FormBuffer {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Mobile => &self.mobile,
            Field::DateOfBirth => &self.date_of_birth,
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Mobile => self.mobile = value,
            Field::DateOfBirth => {
                self.date_error = date::to_storage(&value).is_err();
                self.date_of_birth = value;
            }
        }
    }

    fn to_form(&self) -> RecordForm {
        RecordForm {
            name: self.name.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
            date_of_birth: self.date_of_birth.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 表单未打开，什么也没做
    NotOpen,
    /// 日期不合法，没有发出请求
    InvalidDate,
    Saved(String),
    /// 表单保持打开
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted(String),
    Failed(String),
}

/// 客户端状态：记录列表、两份表单缓冲、显示标记和最近一条提示
#[derive(Debug)]
pub struct ContactStore<A: RecordApi> {
    api: A,
    codec: DateCodec,
    records: Vec<RecordView>,
    add: FormBuffer,
    edit: FormBuffer,
    add_open: bool,
    edit_open: bool,
    alert: Option<String>,
}

impl<A: RecordApi> ContactStore<A> {
    pub fn new(api: A, codec: DateCodec) -> Self {
        Self {
            api,
            codec,
            records: Vec::new(),
            add: FormBuffer::default(),
            edit: FormBuffer::default(),
            add_open: false,
            edit_open: false,
            alert: None,
        }
    }

    pub fn records(&self) -> &[RecordView] {
        &self.records
    }

    pub fn is_open(&self, form: FormKind) -> bool {
        match form {
            FormKind::Add => self.add_open,
            FormKind::Edit => self.edit_open,
        }
    }

    pub fn buffer(&self, form: FormKind) -> &FormBuffer {
        match form {
            FormKind::Add => &self.add,
            FormKind::Edit => &self.edit,
        }
    }

    fn buffer_mut(&mut self, form: FormKind) -> &mut FormBuffer {
        match form {
            FormKind::Add => &mut self.add,
            FormKind::Edit => &mut self.edit,
        }
    }

    /// 取走最近一条提示
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// 整表重新拉取；失败时保留旧列表
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match self.api.list().await {
            Ok(records) => {
                self.records = records;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch records");
                Err(e)
            }
        }
    }

    pub fn open_add(&mut self) {
        self.add = FormBuffer::default();
        self.add_open = true;
    }

    pub fn close_add(&mut self) {
        self.add = FormBuffer::default();
        self.add_open = false;
    }

    /// 用选中记录填充编辑表单；id 不在列表中时返回 false
    pub fn open_edit(&mut self, id: u64) -> bool {
        let Some(record) = self.records.iter().find(|r| r.id == id) else {
            return false;
        };
        let date_of_birth = self
            .codec
            .display_from_wire(&record.date_of_birth)
            .unwrap_or_else(|_| record.formatted_date.clone());

        self.edit = FormBuffer {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            mobile: record.mobile.clone(),
            date_of_birth,
            date_error: false,
        };
        self.edit_open = true;
        true
    }

    pub fn close_edit(&mut self) {
        self.edit = FormBuffer::default();
        self.edit_open = false;
    }

    pub fn close(&mut self, form: FormKind) {
        match form {
            FormKind::Add => self.close_add(),
            FormKind::Edit => self.close_edit(),
        }
    }

    pub fn set_field(&mut self, form: FormKind, field: Field, value: impl Into<String>) {
        self.buffer_mut(form).set(field, value.into());
    }

    pub async fn submit_add(&mut self) -> SubmitOutcome {
        if !self.add_open {
            return SubmitOutcome::NotOpen;
        }
        if !self.check_date(FormKind::Add) {
            return SubmitOutcome::InvalidDate;
        }

        let result = self.api.create(&self.add.to_form()).await;
        self.finish_submit(FormKind::Add, result).await
    }

    pub async fn submit_edit(&mut self) -> SubmitOutcome {
        if !self.edit_open {
            return SubmitOutcome::NotOpen;
        }
        if !self.check_date(FormKind::Edit) {
            return SubmitOutcome::InvalidDate;
        }

        let req = UpdateRecordRequest {
            id: self.edit.id,
            fields: self.edit.to_form(),
        };
        let result = self.api.update(&req).await;
        self.finish_submit(FormKind::Edit, result).await
    }

    pub async fn submit(&mut self, form: FormKind) -> SubmitOutcome {
        match form {
            FormKind::Add => self.submit_add().await,
            FormKind::Edit => self.submit_edit().await,
        }
    }

    /// 未经确认不做任何事
    pub async fn delete(&mut self, id: u64, confirmed: bool) -> DeleteOutcome {
        if !confirmed {
            return DeleteOutcome::Cancelled;
        }

        match self.api.delete(id).await {
            Ok(message) => {
                self.refresh_after_write(&message).await;
                DeleteOutcome::Deleted(message)
            }
            Err(e) => {
                error!(record_id = id, error = %e, "Error deleting data");
                let message = e.to_string();
                self.alert = Some(message.clone());
                DeleteOutcome::Failed(message)
            }
        }
    }

    /// 写成功后整表重拉；重拉失败时原因追加在成功提示之后
    async fn refresh_after_write(&mut self, message: &str) {
        let alert = match self.refresh().await {
            Ok(()) => message.to_string(),
            Err(e) => format!("{message}\nThe list could not be refreshed: {e}"),
        };
        self.alert = Some(alert);
    }

    /// 提交前重新校验日期，结果写回标记
    fn check_date(&mut self, form: FormKind) -> bool {
        let buffer = self.buffer_mut(form);
        buffer.date_error = date::to_storage(&buffer.date_of_birth).is_err();
        !buffer.date_error
    }

    async fn finish_submit(
        &mut self,
        form: FormKind,
        result: Result<String, ClientError>,
    ) -> SubmitOutcome {
        match result {
            Ok(message) => {
                self.close(form);
                self.refresh_after_write(&message).await;
                SubmitOutcome::Saved(message)
            }
            Err(e) => {
                error!(form = ?form, error = %e, "Failed to save record");
                let message = e.to_string();
                self.alert = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use shared::proto::MSG_CREATED;

    use super::*;

    /// 内存版服务端，记录收到的写请求次数
    #[derive(Debug, Default)]
    pub(crate) struct FakeApi {
        pub rows: Mutex<Vec<RecordView>>,
        pub writes: AtomicUsize,
        pub fail_writes: bool,
        /// 有过写请求之后 list 失败
        pub fail_list_after_write: bool,
    }

    impl FakeApi {
        pub(crate) fn with_rows(rows: Vec<RecordView>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        fn view(id: u64, form: &RecordForm) -> RecordView {
            let stored = date::to_storage(&form.date_of_birth).unwrap();
            RecordView {
                id,
                name: form.name.clone(),
                email: form.email.clone(),
                mobile: form.mobile.clone(),
                date_of_birth: date::to_iso(stored),
                formatted_date: date::to_display(stored),
            }
        }

        fn write(&self) -> Result<(), ClientError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(ClientError::Transport("connection refused".to_string()));
            }
            Ok(())
        }
    }

    impl RecordApi for FakeApi {
        async fn list(&self) -> Result<Vec<RecordView>, ClientError> {
            if self.fail_list_after_write && self.writes.load(Ordering::SeqCst) > 0 {
                return Err(ClientError::Transport("connection reset".to_string()));
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn create(&self, form: &RecordForm) -> Result<String, ClientError> {
            self.write()?;
            let mut rows = self.rows.lock().unwrap();
            let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
            rows.push(Self::view(id, form));
            Ok(MSG_CREATED.to_string())
        }

        async fn update(&self, req: &UpdateRecordRequest) -> Result<String, ClientError> {
            self.write()?;
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == req.id) {
                *row = Self::view(req.id, &req.fields);
            }
            Ok("Data updated successfully!".to_string())
        }

        async fn delete(&self, id: u64) -> Result<String, ClientError> {
            self.write()?;
            self.rows.lock().unwrap().retain(|r| r.id != id);
            Ok("Data deleted successfully!".to_string())
        }
    }

    pub(crate) fn alice_view() -> RecordView {
        RecordView {
            id: 1,
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            mobile: "9999999999".to_string(),
            date_of_birth: "1990-06-15".to_string(),
            formatted_date: "15/06/1990".to_string(),
        }
    }

    fn fill(store: &mut ContactStore<FakeApi>, form: FormKind, date: &str) {
        store.set_field(form, Field::Name, "Bob");
        store.set_field(form, Field::Email, "b@x.com");
        store.set_field(form, Field::Mobile, "8888888888");
        store.set_field(form, Field::DateOfBirth, date);
    }

    #[test]
    fn test_date_flag_tracks_every_change() {
        let mut store = ContactStore::new(FakeApi::default(), DateCodec::utc());
        store.open_add();
        assert!(!store.buffer(FormKind::Add).date_error);

        store.set_field(FormKind::Add, Field::DateOfBirth, "1");
        assert!(store.buffer(FormKind::Add).date_error);
        store.set_field(FormKind::Add, Field::DateOfBirth, "01/01/2000");
        assert!(!store.buffer(FormKind::Add).date_error);
        store.set_field(FormKind::Add, Field::DateOfBirth, "31/02/2000");
        assert!(store.buffer(FormKind::Add).date_error);
    }

    #[tokio::test]
    async fn test_invalid_date_issues_no_request() {
        let mut store = ContactStore::new(FakeApi::default(), DateCodec::utc());
        store.open_add();
        fill(&mut store, FormKind::Add, "2000-01-01");

        assert_eq!(store.submit_add().await, SubmitOutcome::InvalidDate);
        assert_eq!(store.api.writes.load(Ordering::SeqCst), 0);
        assert!(store.buffer(FormKind::Add).date_error);
        assert!(store.is_open(FormKind::Add));
    }

    #[tokio::test]
    async fn test_untouched_empty_date_is_rejected_on_submit() {
        let mut store = ContactStore::new(FakeApi::default(), DateCodec::utc());
        store.open_add();
        assert_eq!(store.submit_add().await, SubmitOutcome::InvalidDate);
        assert!(store.buffer(FormKind::Add).date_error);
        assert_eq!(store.api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_add_closes_clears_and_refetches() {
        let mut store = ContactStore::new(FakeApi::default(), DateCodec::utc());
        store.open_add();
        fill(&mut store, FormKind::Add, "01/01/1980");

        assert_eq!(
            store.submit_add().await,
            SubmitOutcome::Saved(MSG_CREATED.to_string())
        );
        assert!(!store.is_open(FormKind::Add));
        assert_eq!(store.buffer(FormKind::Add), &FormBuffer::default());
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].formatted_date, "01/01/1980");
        assert_eq!(store.take_alert().as_deref(), Some(MSG_CREATED));
        assert_eq!(store.take_alert(), None);
    }

    #[tokio::test]
    async fn test_failed_add_keeps_form_open_and_alerts() {
        let api = FakeApi {
            fail_writes: true,
            ..Default::default()
        };
        let mut store = ContactStore::new(api, DateCodec::utc());
        store.open_add();
        fill(&mut store, FormKind::Add, "01/01/1980");

        match store.submit_add().await {
            SubmitOutcome::Failed(message) => assert!(message.contains("connection refused")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(store.is_open(FormKind::Add));
        assert_eq!(store.buffer(FormKind::Add).name, "Bob");
        assert!(store.take_alert().is_some());
    }

    #[tokio::test]
    async fn test_submit_on_closed_form_does_nothing() {
        let mut store = ContactStore::new(FakeApi::default(), DateCodec::utc());
        assert_eq!(store.submit_add().await, SubmitOutcome::NotOpen);
        assert_eq!(store.submit_edit().await, SubmitOutcome::NotOpen);
        assert_eq!(store.api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_edit_prefills_display_date() {
        let mut store = ContactStore::new(
            FakeApi::with_rows(vec![alice_view()]),
            DateCodec::utc(),
        );
        store.refresh().await.unwrap();

        assert!(!store.open_edit(42));
        assert!(!store.is_open(FormKind::Edit));

        assert!(store.open_edit(1));
        let buffer = store.buffer(FormKind::Edit);
        assert_eq!(buffer.id, 1);
        assert_eq!(buffer.name, "Alice");
        assert_eq!(buffer.date_of_birth, "15/06/1990");
    }

    #[tokio::test]
    async fn test_edit_validates_date_and_updates() {
        let mut store = ContactStore::new(
            FakeApi::with_rows(vec![alice_view()]),
            DateCodec::utc(),
        );
        store.refresh().await.unwrap();
        store.open_edit(1);

        store.set_field(FormKind::Edit, Field::DateOfBirth, "15-06-1990");
        assert_eq!(store.submit_edit().await, SubmitOutcome::InvalidDate);
        assert_eq!(store.api.writes.load(Ordering::SeqCst), 0);

        store.set_field(FormKind::Edit, Field::Name, "Alicia");
        store.set_field(FormKind::Edit, Field::DateOfBirth, "16/06/1990");
        assert!(matches!(store.submit_edit().await, SubmitOutcome::Saved(_)));
        assert!(!store.is_open(FormKind::Edit));
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].name, "Alicia");
        assert_eq!(store.records()[0].formatted_date, "16/06/1990");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut store = ContactStore::new(
            FakeApi::with_rows(vec![alice_view()]),
            DateCodec::utc(),
        );
        store.refresh().await.unwrap();

        assert_eq!(store.delete(1, false).await, DeleteOutcome::Cancelled);
        assert_eq!(store.api.writes.load(Ordering::SeqCst), 0);
        assert_eq!(store.records().len(), 1);

        assert!(matches!(store.delete(1, true).await, DeleteOutcome::Deleted(_)));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refetch_after_save_is_reported() {
        let api = FakeApi {
            fail_list_after_write: true,
            ..Default::default()
        };
        let mut store = ContactStore::new(api, DateCodec::utc());
        store.open_add();
        fill(&mut store, FormKind::Add, "01/01/1980");

        assert_eq!(
            store.submit_add().await,
            SubmitOutcome::Saved(MSG_CREATED.to_string())
        );
        assert!(store.records().is_empty());
        let alert = store.take_alert().unwrap();
        assert!(alert.starts_with(MSG_CREATED));
        assert!(alert.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_failed_refetch_after_delete_is_reported() {
        let api = FakeApi {
            fail_list_after_write: true,
            ..FakeApi::with_rows(vec![alice_view()])
        };
        let mut store = ContactStore::new(api, DateCodec::utc());
        store.refresh().await.unwrap();

        assert!(matches!(store.delete(1, true).await, DeleteOutcome::Deleted(_)));
        assert_eq!(store.records().len(), 1);
        let alert = store.take_alert().unwrap();
        assert!(alert.starts_with("Data deleted successfully!"));
        assert!(alert.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_close_discards_buffer() {
        let mut store = ContactStore::new(FakeApi::default(), DateCodec::utc());
        store.open_add();
        fill(&mut store, FormKind::Add, "01/01/1980");
        store.close_add();
        assert!(!store.is_open(FormKind::Add));

        store.open_add();
        assert_eq!(store.buffer(FormKind::Add), &FormBuffer::default());
    }
}
