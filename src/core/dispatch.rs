use crate::core::outcome::{normalize, Outcome};
use crate::core::registry::EndpointDescriptor;
use crate::domain::ports::{Transport, TransportRequest};
use serde_json::Value;
use std::time::Instant;

/// 送出一次請求並正規化結果。不重試；future 被丟棄時外送請求隨之中止
pub async fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &EndpointDescriptor,
    envelope: Value,
) -> Outcome {
    tracing::info!(
        "📡 {} {} → {} {}",
        endpoint.operation,
        endpoint.version,
        endpoint.method,
        endpoint.url
    );
    if !endpoint.sensitive {
        tracing::debug!("Envelope: {}", envelope);
    }

    let started = Instant::now();
    let response = transport
        .post_json(TransportRequest {
            url: endpoint.url.clone(),
            headers: endpoint.headers.clone(),
            body: envelope,
            timeout: endpoint.timeout,
        })
        .await;

    let outcome = normalize(&endpoint.rules(), response);
    let elapsed_ms = started.elapsed().as_millis();

    match &outcome {
        Outcome::Success { .. } => {
            tracing::info!("✅ {} succeeded in {}ms", endpoint.operation, elapsed_ms)
        }
        Outcome::NotFound { .. } => {
            tracing::info!("🔍 {} found no records ({}ms)", endpoint.operation, elapsed_ms)
        }
        Outcome::UpstreamRejected {
            status,
            code,
            description,
        } => tracing::warn!(
            "⚠️ {} rejected by provider: HTTP {} {} {}",
            endpoint.operation,
            status,
            code,
            description
        ),
        Outcome::Timeout => tracing::error!(
            "⏱️ {} timed out after {}ms",
            endpoint.operation,
            elapsed_ms
        ),
        Outcome::TransportError { detail } => {
            tracing::error!("❌ {} transport error: {}", endpoint.operation, detail)
        }
        Outcome::ValidationFailed { .. } => {}
    }

    outcome
}
