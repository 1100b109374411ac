//! 請求到結果的完整流程：驗證與對應 → 選擇變體 → 建立內容 → 送出 → 正規化。
//!
//! 每次呼叫都是獨立的；`SmAdapter` 本身只持有唯讀的設定、registry 與傳輸層，
//! 可以放進 `Arc` 在多個 task 之間共用。

use crate::adapters::ReqwestTransport;
use crate::config::settings::Settings;
use crate::core::catalog::{self, Template};
use crate::core::dispatch::dispatch;
use crate::core::mapper::{self, FieldSet};
use crate::core::outcome::Outcome;
use crate::core::registry::{ApiVersion, EndpointRegistry, Operation};
use crate::core::variant::{
    select_notification, select_otp_instrument, select_payment_instrument, VariantPayload,
};
use crate::domain::model::{
    CreatePersonRequest, ExchangeRateRequest, GlobalQuotationRequest, IncludeAnnexRequest,
    IssuePolicyRequest, NotifyPaymentRequest, OtpRequest, PolicyScheduleRequest,
    QueryPersonRequest, QueryPolicyRequest, QueryQuotationRequest, QueryReceiptsRequest,
    QuotationRequest, RegisterPaymentRequest,
};
use crate::domain::ports::Transport;
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::Validate;
use serde::de::DeserializeOwned;
use serde_json::Value;

type Prepared = (FieldSet, Option<VariantPayload>);

pub struct SmAdapter<T: Transport = ReqwestTransport> {
    settings: Settings,
    registry: EndpointRegistry,
    transport: T,
}

impl SmAdapter<ReqwestTransport> {
    /// 以預設的 reqwest 傳輸層建立
    pub fn from_settings(settings: Settings) -> Result<Self> {
        Self::new(settings, ReqwestTransport::new()?)
    }
}

impl<T: Transport> SmAdapter<T> {
    pub fn new(settings: Settings, transport: T) -> Result<Self> {
        settings.validate()?;
        let registry = EndpointRegistry::from_settings(&settings)?;
        tracing::debug!(
            "Endpoint registry ready with {} endpoints",
            registry.descriptors().len()
        );

        Ok(Self {
            settings,
            registry,
            transport,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// 以未分型的 JSON 請求執行任一操作；請求格式錯誤時回傳 `ValidationFailed`
    pub async fn execute(&self, operation: Operation, version: ApiVersion, request: Value) -> Outcome {
        if let Err(e) = self.registry.resolve(operation, version) {
            return e.into();
        }

        let prepared = self.prepare_untyped(operation, version, request);
        self.send(operation, version, prepared).await
    }

    fn prepare_untyped(
        &self,
        operation: Operation,
        version: ApiVersion,
        request: Value,
    ) -> Result<Prepared> {
        match (operation, version) {
            (Operation::CreatePerson, _) => prepare_create_person(&parse(request)?),
            (Operation::QueryPerson, _) => plain(mapper::query_person(&parse(request)?)),
            (Operation::CreateQuotation, ApiVersion::V1) => plain(mapper::quotation(
                &parse(request)?,
                self.settings.provider.default_insured_sum,
            )),
            (Operation::CreateQuotation, ApiVersion::V2) => {
                plain(mapper::global_quotation(&parse(request)?))
            }
            (Operation::IssuePolicy, _) => Ok((mapper::issue_policy(&parse(request)?), None)),
            (Operation::QueryPolicy, _) => Ok((mapper::query_policy(&parse(request)?), None)),
            (Operation::QueryReceipts, _) => Ok((mapper::query_receipts(&parse(request)?), None)),
            (Operation::QueryQuotation, _) => {
                Ok((mapper::query_quotation(&parse(request)?), None))
            }
            (Operation::IncludeAnnex, _) => plain(mapper::include_annex(&parse(request)?)),
            (Operation::PolicySchedule, _) => plain(mapper::policy_schedule(&parse(request)?)),
            (Operation::RegisterPayment, _) => prepare_register_payment(&parse(request)?),
            (Operation::GenerateOtp, _) => prepare_generate_otp(&parse(request)?),
            (Operation::QueryExchangeRate, _) => plain(mapper::exchange_rate(&parse(request)?)),
            (Operation::NotifyPayment, _) => prepare_notify_payment(&parse(request)?),
        }
    }

    async fn send(
        &self,
        operation: Operation,
        version: ApiVersion,
        prepared: Result<Prepared>,
    ) -> Outcome {
        let endpoint = match self.registry.resolve(operation, version) {
            Ok(endpoint) => endpoint,
            Err(e) => return e.into(),
        };

        let envelope = prepared.and_then(|(fields, variant)| {
            self.envelope(endpoint.template, fields, variant.as_ref())
        });

        match envelope {
            Ok(envelope) => dispatch(&self.transport, endpoint, envelope).await,
            Err(e @ AdapterError::TemplateError { .. }) => {
                tracing::error!("❌ {} {} payload could not be built: {}", operation, version, e);
                e.into()
            }
            Err(e) => {
                tracing::warn!(
                    "🚫 {} {} rejected before dispatch: {}",
                    operation,
                    version,
                    rejection_reason(endpoint.sensitive, &e)
                );
                e.into()
            }
        }
    }

    fn envelope(
        &self,
        template: Template,
        mut fields: FieldSet,
        variant: Option<&VariantPayload>,
    ) -> Result<Value> {
        if template.carries_identity() {
            fields
                .set("/aplicacion", self.settings.provider.application.as_str())
                .set("/usuario", self.settings.provider.user.as_str());
        }
        catalog::build(template, &fields, variant)
    }

    pub async fn create_person(&self, request: &CreatePersonRequest) -> Outcome {
        self.send(
            Operation::CreatePerson,
            ApiVersion::V1,
            prepare_create_person(request),
        )
        .await
    }

    pub async fn query_person(&self, request: &QueryPersonRequest) -> Outcome {
        self.send(
            Operation::QueryPerson,
            ApiVersion::V1,
            plain(mapper::query_person(request)),
        )
        .await
    }

    /// 個人意外險報價 (v1)
    pub async fn create_quotation(&self, request: &QuotationRequest) -> Outcome {
        let fields = mapper::quotation(request, self.settings.provider.default_insured_sum);
        self.send(Operation::CreateQuotation, ApiVersion::V1, plain(fields))
            .await
    }

    /// 全球健康險報價 (v2)
    pub async fn create_global_quotation(&self, request: &GlobalQuotationRequest) -> Outcome {
        self.send(
            Operation::CreateQuotation,
            ApiVersion::V2,
            plain(mapper::global_quotation(request)),
        )
        .await
    }

    pub async fn issue_policy(&self, request: &IssuePolicyRequest) -> Outcome {
        let fields = mapper::issue_policy(request);
        self.send(Operation::IssuePolicy, ApiVersion::V1, Ok((fields, None)))
            .await
    }

    pub async fn query_policy(&self, request: &QueryPolicyRequest) -> Outcome {
        let fields = mapper::query_policy(request);
        self.send(Operation::QueryPolicy, ApiVersion::V1, Ok((fields, None)))
            .await
    }

    pub async fn query_receipts(&self, request: &QueryReceiptsRequest) -> Outcome {
        let fields = mapper::query_receipts(request);
        self.send(Operation::QueryReceipts, ApiVersion::V1, Ok((fields, None)))
            .await
    }

    pub async fn query_quotation(&self, request: &QueryQuotationRequest) -> Outcome {
        let fields = mapper::query_quotation(request);
        self.send(Operation::QueryQuotation, ApiVersion::V1, Ok((fields, None)))
            .await
    }

    pub async fn include_annex(&self, request: &IncludeAnnexRequest) -> Outcome {
        self.send(
            Operation::IncludeAnnex,
            ApiVersion::V1,
            plain(mapper::include_annex(request)),
        )
        .await
    }

    /// 取得 base64 編碼的保單明細表
    pub async fn policy_schedule(&self, request: &PolicyScheduleRequest) -> Outcome {
        self.send(
            Operation::PolicySchedule,
            ApiVersion::V1,
            plain(mapper::policy_schedule(request)),
        )
        .await
    }

    pub async fn register_payment(&self, request: &RegisterPaymentRequest) -> Outcome {
        self.send(
            Operation::RegisterPayment,
            ApiVersion::V1,
            prepare_register_payment(request),
        )
        .await
    }

    pub async fn generate_otp(&self, request: &OtpRequest) -> Outcome {
        self.send(
            Operation::GenerateOtp,
            ApiVersion::V1,
            prepare_generate_otp(request),
        )
        .await
    }

    pub async fn query_exchange_rate(&self, request: &ExchangeRateRequest) -> Outcome {
        self.send(
            Operation::QueryExchangeRate,
            ApiVersion::V1,
            plain(mapper::exchange_rate(request)),
        )
        .await
    }

    pub async fn notify_payment(&self, request: &NotifyPaymentRequest) -> Outcome {
        self.send(
            Operation::NotifyPayment,
            ApiVersion::V1,
            prepare_notify_payment(request),
        )
        .await
    }
}

/// 付款類端點的請求值不寫進日誌，只留欄位名稱
fn rejection_reason(sensitive: bool, err: &AdapterError) -> String {
    if sensitive {
        err.redacted()
    } else {
        err.to_string()
    }
}

fn parse<R: DeserializeOwned>(request: Value) -> Result<R> {
    Ok(serde_json::from_value(request)?)
}

fn plain(fields: Result<FieldSet>) -> Result<Prepared> {
    fields.map(|fields| (fields, None))
}

fn prepare_create_person(request: &CreatePersonRequest) -> Result<Prepared> {
    plain(mapper::create_person(request))
}

fn prepare_register_payment(request: &RegisterPaymentRequest) -> Result<Prepared> {
    let instrument = select_payment_instrument(&request.pago)?;
    let fields = mapper::register_payment(request, instrument.kind())?;
    Ok((fields, Some(instrument.to_variant()?)))
}

fn prepare_generate_otp(request: &OtpRequest) -> Result<Prepared> {
    let instrument = select_otp_instrument(request)?;
    let fields = mapper::generate_otp(instrument.kind());
    Ok((fields, Some(instrument.to_variant()?)))
}

fn prepare_notify_payment(request: &NotifyPaymentRequest) -> Result<Prepared> {
    let fields = mapper::notify_payment(request)?;
    let notification = select_notification(request)?;
    Ok((fields, Some(notification.to_variant()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::tests::sample_toml;
    use crate::domain::ports::{RawResponse, TransportFailure, TransportRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 不應該被呼叫到的傳輸層
    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn post_json(
            &self,
            _request: TransportRequest,
        ) -> std::result::Result<RawResponse, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportFailure::Connection("offline".to_string()))
        }
    }

    fn adapter() -> SmAdapter<CountingTransport> {
        let settings = Settings::from_toml_str(&sample_toml("https://api.example.com")).unwrap();
        SmAdapter::new(settings, CountingTransport::default()).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_request_never_reaches_network() {
        let adapter = adapter();

        let outcome = adapter
            .execute(
                Operation::QueryPerson,
                ApiVersion::V1,
                json!({"documento": "V-123"}),
            )
            .await;

        assert!(matches!(outcome, Outcome::ValidationFailed { .. }));
        assert_eq!(adapter.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_document_never_reaches_network() {
        let adapter = adapter();

        let outcome = adapter
            .query_person(&QueryPersonRequest {
                num_documento: "J-123456789".to_string(),
            })
            .await;

        assert_eq!(outcome.http_status(), 422);
        assert_eq!(adapter.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_version_is_validation_failure() {
        let adapter = adapter();

        let outcome = adapter
            .execute(
                Operation::IssuePolicy,
                ApiVersion::V2,
                json!({"cd_entidad": 1, "nu_cotizacion": 2}),
            )
            .await;

        assert!(matches!(outcome, Outcome::ValidationFailed { ref detail } if detail.contains("v2")));
        assert_eq!(adapter.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_request_is_dispatched_once() {
        let adapter = adapter();

        let outcome = adapter
            .execute(
                Operation::IssuePolicy,
                ApiVersion::V1,
                json!({"cd_entidad": 1, "nu_cotizacion": 2}),
            )
            .await;

        assert!(matches!(outcome, Outcome::TransportError { ref detail } if detail == "offline"));
        assert_eq!(adapter.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sensitive_rejections_keep_only_the_field() {
        let err = AdapterError::validation(
            "instrumento_tdd.fe_vencimiento",
            "'2027-09' does not match MM-YYYY",
        );

        let logged = rejection_reason(true, &err);
        assert!(logged.contains("instrumento_tdd.fe_vencimiento"));
        assert!(!logged.contains("2027-09"));

        assert!(rejection_reason(false, &err).contains("2027-09"));
    }

    #[test]
    fn test_core_envelopes_carry_identity() {
        let adapter = adapter();
        let envelope = adapter
            .envelope(Template::QueryPerson, FieldSet::new(), None)
            .unwrap();
        assert_eq!(envelope["aplicacion"], "PORTAL");
        assert_eq!(envelope["usuario"], "INTEGRADOR");

        let envelope = adapter
            .envelope(Template::ExchangeRate, FieldSet::new(), None)
            .unwrap();
        assert!(envelope.get("aplicacion").is_none());
    }
}
