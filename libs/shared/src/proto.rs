// 服务端与客户端共用的 HTTP/JSON 报文
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::date;

pub const MSG_CREATED: &str = "Data saved successfully!";
pub const MSG_UPDATED: &str = "Data updated successfully!";
pub const MSG_DELETED: &str = "Data deleted successfully!";
pub const MSG_INTERNAL: &str = "Internal server error";
pub const MSG_DATE_FORMAT: &str = "Please enter the date in the format dd/mm/yyyy";

/// 所有接口共用的响应信封 `{success, message?, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 400 响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub errors: Vec<FieldError>,
}

impl ErrorBody {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            errors,
        }
    }
}

/// 列表接口返回的单条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub mobile: String,
    /// 存储形式 yyyy-mm-dd
    pub date_of_birth: String,
    /// 展示形式 dd/mm/yyyy
    pub formatted_date: String,
}

/// 写操作返回的行信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub insert_id: u64,
    pub affected_rows: u64,
}

/// 新增/修改表单
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RecordForm {
    #[validate(custom(function = "validate_name"))]
    #[serde(default)]
    pub name: String,

    #[validate(email(message = "Please enter a valid email address"))]
    #[serde(default)]
    pub email: String,

    #[validate(custom(function = "validate_mobile"))]
    #[serde(default)]
    pub mobile: String,

    #[validate(custom(function = "validate_display_date"))]
    #[serde(default)]
    pub date_of_birth: String,
}

/// PUT /update 的请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub id: u64,
    #[serde(flatten)]
    pub fields: RecordForm,
}

pub const NAME_MAX_LEN: usize = 100;
pub const MOBILE_MIN_DIGITS: usize = 7;
pub const MOBILE_MAX_DIGITS: usize = 15;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("required", "Name is required"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(invalid("length", "Name must be at most 100 characters"));
    }
    Ok(())
}

fn validate_mobile(mobile: &str) -> Result<(), ValidationError> {
    let digits_only = !mobile.is_empty() && mobile.bytes().all(|b| b.is_ascii_digit());
    if !digits_only || !(MOBILE_MIN_DIGITS..=MOBILE_MAX_DIGITS).contains(&mobile.len()) {
        return Err(invalid("mobile", "Mobile must be 7 to 15 digits"));
    }
    Ok(())
}

fn validate_display_date(value: &str) -> Result<(), ValidationError> {
    if !date::is_display_format(value) {
        return Err(invalid("date_format", MSG_DATE_FORMAT));
    }
    date::to_storage(value)
        .map(|_| ())
        .map_err(|_| invalid("date_calendar", "Date of birth is not a valid calendar date"))
}

/// 把 validator 的错误展开成按字段排序的列表
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                FieldError::new(field.clone(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
    out
}

impl RecordForm {
    /// 校验并返回按字段排序的错误列表
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate().map_err(|e| field_errors(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> RecordForm {
        RecordForm {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            mobile: "9999999999".to_string(),
            date_of_birth: "15/06/1990".to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        assert!(alice().check().is_ok());
    }

    #[test]
    fn test_every_field_reported() {
        let form = RecordForm {
            name: "   ".to_string(),
            email: "not-an-email".to_string(),
            mobile: "12ab".to_string(),
            date_of_birth: "1990-06-15".to_string(),
        };
        let errors = form.check().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["date_of_birth", "email", "mobile", "name"]);
        assert_eq!(errors[0].message, MSG_DATE_FORMAT);
    }

    #[test]
    fn test_calendar_date_is_checked() {
        let form = RecordForm {
            date_of_birth: "31/02/1990".to_string(),
            ..alice()
        };
        let errors = form.check().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "date_of_birth");
    }

    #[test]
    fn test_mobile_length_bounds() {
        for (mobile, ok) in [
            ("123456", false),
            ("1234567", true),
            ("123456789012345", true),
            ("1234567890123456", false),
            ("+919999999999", false),
        ] {
            let form = RecordForm {
                mobile: mobile.to_string(),
                ..alice()
            };
            assert_eq!(form.check().is_ok(), ok, "mobile {mobile:?}");
        }
    }

    #[test]
    fn test_update_request_wire_shape() {
        let json = serde_json::json!({
            "id": 7,
            "name": "Alice",
            "email": "a@x.com",
            "mobile": "9999999999",
            "date_of_birth": "15/06/1990"
        });
        let req: UpdateRecordRequest = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(req.id, 7);
        assert_eq!(req.fields, alice());
        assert_eq!(serde_json::to_value(&req).unwrap(), json);
    }

    #[test]
    fn test_envelope_omits_empty_parts() {
        let value = serde_json::to_value(Envelope::success(vec![1, 2])).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "data": [1, 2]}));

        let value = serde_json::to_value(Envelope::<()>::failed(MSG_INTERNAL)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"success": false, "message": "Internal server error"})
        );
    }
}
