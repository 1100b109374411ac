use crate::config::settings::{ServiceEndpoint, Settings};
use crate::core::catalog::Template;
use crate::core::outcome::ResponseRules;
use crate::utils::error::{AdapterError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    CreatePerson,
    QueryPerson,
    CreateQuotation,
    IssuePolicy,
    QueryPolicy,
    QueryReceipts,
    QueryQuotation,
    IncludeAnnex,
    PolicySchedule,
    RegisterPayment,
    GenerateOtp,
    QueryExchangeRate,
    NotifyPayment,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::CreatePerson,
        Operation::QueryPerson,
        Operation::CreateQuotation,
        Operation::IssuePolicy,
        Operation::QueryPolicy,
        Operation::QueryReceipts,
        Operation::QueryQuotation,
        Operation::IncludeAnnex,
        Operation::PolicySchedule,
        Operation::RegisterPayment,
        Operation::GenerateOtp,
        Operation::QueryExchangeRate,
        Operation::NotifyPayment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatePerson => "create-person",
            Self::QueryPerson => "query-person",
            Self::CreateQuotation => "create-quotation",
            Self::IssuePolicy => "issue-policy",
            Self::QueryPolicy => "query-policy",
            Self::QueryReceipts => "query-receipts",
            Self::QueryQuotation => "query-quotation",
            Self::IncludeAnnex => "include-annex",
            Self::PolicySchedule => "policy-schedule",
            Self::RegisterPayment => "register-payment",
            Self::GenerateOtp => "generate-otp",
            Self::QueryExchangeRate => "query-exchange-rate",
            Self::NotifyPayment => "notify-payment",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| AdapterError::UnknownOperation {
                operation: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(AdapterError::ValidationError {
                field: "api_version".to_string(),
                message: format!("unknown API version '{}', expected v1 or v2", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Core,
    PaymentGateway,
    Subscription,
    PaymentNotification,
}

impl Service {
    fn endpoint<'a>(&self, settings: &'a Settings) -> &'a ServiceEndpoint {
        match self {
            Self::Core => &settings.services.core,
            Self::PaymentGateway => &settings.services.payment_gateway,
            Self::Subscription => &settings.services.subscription,
            Self::PaymentNotification => &settings.services.payment_notification,
        }
    }
}

/// 成功時要從供應商回應中取出的部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSelector {
    Key(&'static str),
    FirstOf(&'static str),
    /// `cotizacion` 的第一筆，只保留摘要欄位
    QuotationSummary,
    WholeBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    pub operation: Operation,
    pub version: ApiVersion,
    pub service: Service,
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub template: Template,
    pub result: ResultSelector,
    /// 回應 EXITO 但 `mensajes` 非空時視為查無資料
    pub messages_mean_not_found: bool,
    /// 含卡號或 OTP，不得寫入日誌
    pub sensitive: bool,
}

impl EndpointDescriptor {
    pub fn rules(&self) -> ResponseRules {
        ResponseRules {
            result: self.result,
            messages_mean_not_found: self.messages_mean_not_found,
        }
    }
}

struct Route {
    operation: Operation,
    version: ApiVersion,
    service: Service,
    path: &'static str,
    template: Template,
    result: ResultSelector,
}

const fn route(
    operation: Operation,
    version: ApiVersion,
    service: Service,
    path: &'static str,
    template: Template,
    result: ResultSelector,
) -> Route {
    Route {
        operation,
        version,
        service,
        path,
        template,
        result,
    }
}

const SCHEDULE_PATH_PRODUCTION: &str = "/swrep/executeRep";
const SCHEDULE_PATH_TESTING: &str = "/swrep/ve/pru/executeRep";

#[rustfmt::skip]
const ROUTES: [Route; 14] = [
    route(Operation::CreatePerson, ApiVersion::V1, Service::Core, "/crearpersona", Template::CreatePerson, ResultSelector::Key("persona")),
    route(Operation::QueryPerson, ApiVersion::V1, Service::Core, "/consultarpersona", Template::QueryPerson, ResultSelector::Key("persona")),
    route(Operation::CreateQuotation, ApiVersion::V1, Service::Core, "/cotizaraccpersonales", Template::AccidentQuotation, ResultSelector::Key("cotizacion")),
    route(Operation::CreateQuotation, ApiVersion::V2, Service::Core, "/cotizarglobal", Template::GlobalQuotation, ResultSelector::Key("cotizacion")),
    route(Operation::IssuePolicy, ApiVersion::V1, Service::Core, "/emitirpoliza", Template::IssuePolicy, ResultSelector::Key("emision")),
    route(Operation::QueryPolicy, ApiVersion::V1, Service::Core, "/consultarpoliza", Template::QueryPolicy, ResultSelector::WholeBody),
    route(Operation::QueryReceipts, ApiVersion::V1, Service::Core, "/consultarpoliza", Template::QueryPolicy, ResultSelector::Key("polizas")),
    route(Operation::QueryQuotation, ApiVersion::V1, Service::Core, "/consultarcotizacion", Template::QueryQuotation, ResultSelector::QuotationSummary),
    route(Operation::IncludeAnnex, ApiVersion::V1, Service::Core, "/incanexpolivig", Template::IncludeAnnex, ResultSelector::Key("anexo")),
    route(Operation::PolicySchedule, ApiVersion::V1, Service::Core, SCHEDULE_PATH_TESTING, Template::PolicySchedule, ResultSelector::Key("reporte_codificado")),
    route(Operation::RegisterPayment, ApiVersion::V1, Service::PaymentGateway, "/registrarpago", Template::RegisterPayment, ResultSelector::Key("datos")),
    route(Operation::GenerateOtp, ApiVersion::V1, Service::PaymentGateway, "/otpmbu", Template::GenerateOtp, ResultSelector::Key("datos")),
    route(Operation::QueryExchangeRate, ApiVersion::V1, Service::Subscription, "/tasabcv", Template::ExchangeRate, ResultSelector::FirstOf("tasa")),
    route(Operation::NotifyPayment, ApiVersion::V1, Service::PaymentNotification, "/notificacionpago", Template::NotifyPayment, ResultSelector::Key("datos")),
];

/// (operation, version) → endpoint。啟動時由設定建立，之後不再變動
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    entries: HashMap<(Operation, ApiVersion), EndpointDescriptor>,
}

impl EndpointRegistry {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        for key in settings.paths.keys() {
            let known = ROUTES
                .iter()
                .any(|r| format!("{}.{}", r.operation, r.version) == *key);
            if !known {
                return Err(AdapterError::ConfigValidationError {
                    field: format!("paths.{}", key),
                    message: "No such operation and version".to_string(),
                });
            }
        }

        let entries = ROUTES
            .iter()
            .map(|r| {
                let descriptor = Self::describe(settings, r);
                ((r.operation, r.version), descriptor)
            })
            .collect();
        Ok(Self { entries })
    }

    fn describe(settings: &Settings, r: &Route) -> EndpointDescriptor {
        let service = r.service.endpoint(settings);
        let default_path = match r.operation {
            Operation::PolicySchedule if settings.is_production() => SCHEDULE_PATH_PRODUCTION,
            _ => r.path,
        };
        let path = settings
            .path_override(r.operation.as_str(), r.version.as_str())
            .unwrap_or(default_path);

        EndpointDescriptor {
            operation: r.operation,
            version: r.version,
            service: r.service,
            method: "POST",
            url: format!("{}{}", service.endpoint.trim_end_matches('/'), path),
            headers: vec![
                (
                    "Ocp-Apim-Subscription-Key".to_string(),
                    service.subscription_key.clone(),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Cache-Control".to_string(), "no-cache".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
            ],
            timeout: settings.timeout(),
            template: r.template,
            result: r.result,
            messages_mean_not_found: r.operation == Operation::QueryQuotation,
            sensitive: matches!(
                r.operation,
                Operation::RegisterPayment | Operation::GenerateOtp
            ),
        }
    }

    pub fn resolve(&self, operation: Operation, version: ApiVersion) -> Result<&EndpointDescriptor> {
        self.entries
            .get(&(operation, version))
            .ok_or_else(|| AdapterError::UnsupportedOperation {
                operation: operation.to_string(),
                version: version.to_string(),
            })
    }

    /// 依 (operation, version) 排序列出所有端點
    pub fn descriptors(&self) -> Vec<&EndpointDescriptor> {
        let mut all: Vec<_> = self.entries.values().collect();
        all.sort_by_key(|d| (d.operation, d.version));
        all
    }
}
