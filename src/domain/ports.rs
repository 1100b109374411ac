use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// 單次送往供應商的 POST
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub timeout: Duration,
}

/// 未解讀的回應；狀態碼與原始內容交給正規化處理
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("provider did not answer within the timeout")]
    Timeout,

    #[error("{0}")]
    Connection(String),
}

/// HTTP 傳輸層。實作只負責送出一次請求，不重試
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<RawResponse, TransportFailure>;
}
