use crate::domain::ports::{RawResponse, Transport, TransportFailure, TransportRequest};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;

/// 以 reqwest 連線池實作的傳輸層；`Client` 內部為引用計數，可任意 clone
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self { client })
    }
}

fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Connection(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<RawResponse, TransportFailure> {
        let mut builder = self.client.post(&request.url);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        // 逾時涵蓋連線到讀完 body 的整段時間
        let response = builder
            .timeout(request.timeout)
            .json(&request.body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        tracing::debug!("Provider response status: {}", status);

        Ok(RawResponse::new(status, body))
    }
}
