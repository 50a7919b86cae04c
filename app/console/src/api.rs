use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::proto::{
    Envelope, ErrorBody, FieldError, MutationResult, RecordForm, RecordView, UpdateRecordRequest,
};
use thiserror::Error;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("{message}")]
    Rejected {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    fn rejected(message: impl Into<String>) -> Self {
        ClientError::Rejected {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// 400 的字段错误拼成一条提示
    fn from_field_errors(errors: Vec<FieldError>) -> Self {
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("\n");
        ClientError::Rejected { message, errors }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// 对记录服务的调用。写操作返回服务端的提示消息
pub trait RecordApi: Send + Sync {
    fn list(&self) -> impl Future<Output = Result<Vec<RecordView>, ClientError>> + Send;

    fn create(&self, form: &RecordForm)
        -> impl Future<Output = Result<String, ClientError>> + Send;

    fn update(
        &self,
        req: &UpdateRecordRequest,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    fn delete(&self, id: u64) -> impl Future<Output = Result<String, ClientError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpRecordApi {
    client: Client,
    base_url: String,
}

impl HttpRecordApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(%status, len = bytes.len(), "Received response");
        decode_envelope(status, &bytes)
    }
}

/// 解析响应信封；非 success 的信封、400 字段错误与无法解析的错误响应都视为拒绝
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
) -> Result<Envelope<T>, ClientError> {
    if status == StatusCode::BAD_REQUEST {
        if let Ok(body) = serde_json::from_slice::<ErrorBody>(bytes) {
            return Err(ClientError::from_field_errors(body.errors));
        }
    }

    let envelope: Envelope<T> = match serde_json::from_slice(bytes) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(ClientError::Decode(e.to_string())),
        Err(_) => return Err(ClientError::rejected(format!("Server replied {status}"))),
    };

    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| format!("Server replied {status}"));
        return Err(ClientError::rejected(message));
    }
    Ok(envelope)
}

fn message_of(envelope: Envelope<MutationResult>) -> String {
    envelope.message.unwrap_or_default()
}

impl RecordApi for HttpRecordApi {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<RecordView>, ClientError> {
        let response = self.client.get(self.url("/")).send().await?;
        let envelope = Self::read::<Vec<RecordView>>(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self, form))]
    async fn create(&self, form: &RecordForm) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.url("/create"))
            .json(form)
            .send()
            .await?;
        Ok(message_of(Self::read(response).await?))
    }

    #[instrument(skip(self, req), fields(record_id = req.id))]
    async fn update(&self, req: &UpdateRecordRequest) -> Result<String, ClientError> {
        let response = self
            .client
            .put(self.url("/update"))
            .json(req)
            .send()
            .await?;
        Ok(message_of(Self::read(response).await?))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: u64) -> Result<String, ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/delete/{id}")))
            .send()
            .await?;
        Ok(message_of(Self::read(response).await?))
    }
}
