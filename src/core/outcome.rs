use crate::core::registry::ResultSelector;
use crate::domain::ports::{RawResponse, TransportFailure};
use crate::utils::error::{AdapterError, ErrorCategory};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 供應商表示「查無資料」的固定描述
pub const NOT_FOUND_DESCRIPTION: &str =
    "No se ha encontrado informacion para los criterios de busqueda indicados.";

pub const SUCCESS_CODE: &str = "EXITO";

/// 每次呼叫只建立一次的正規化結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        data: Value,
    },
    NotFound {
        description: String,
    },
    ValidationFailed {
        detail: String,
    },
    UpstreamRejected {
        status: u16,
        code: String,
        description: String,
    },
    Timeout,
    TransportError {
        detail: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// 給 HTTP 路由層使用的對應狀態碼
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success { .. } => 200,
            Self::NotFound { .. } => 404,
            Self::ValidationFailed { .. } => 422,
            Self::UpstreamRejected { status, .. } if *status >= 400 => *status,
            Self::UpstreamRejected { .. } => 400,
            Self::Timeout => 408,
            Self::TransportError { .. } => 502,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NotFound { .. } => "not_found",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::Timeout => "timeout",
            Self::TransportError { .. } => "transport_error",
        }
    }

    fn malformed(reason: &str) -> Self {
        Self::TransportError {
            detail: format!("malformed provider response: {}", reason),
        }
    }
}

impl From<AdapterError> for Outcome {
    fn from(err: AdapterError) -> Self {
        match (&err, err.category()) {
            (_, ErrorCategory::Validation)
            | (AdapterError::UnknownOperation { .. }, _)
            | (AdapterError::UnsupportedOperation { .. }, _)
            | (AdapterError::SerializationError(_), _) => Self::ValidationFailed {
                detail: err.to_string(),
            },
            // 樣板缺槽位是本程式的錯，不是供應商的
            (AdapterError::TemplateError { .. }, _) => Self::TransportError {
                detail: format!("internal adapter error: {}", err),
            },
            _ => Self::TransportError {
                detail: err.to_string(),
            },
        }
    }
}

/// 回應解讀規則，來自 endpoint descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseRules {
    pub result: ResultSelector,
    pub messages_mean_not_found: bool,
}

struct ProviderStatus<'a> {
    code: Option<&'a str>,
    description: Option<&'a str>,
}

impl<'a> ProviderStatus<'a> {
    /// 供應商的描述欄位有 `descripcion` 與 `description` 兩種拼法
    fn read(body: &'a Value) -> Option<Self> {
        let status = body.get("status")?;
        Some(Self {
            code: status.get("code").and_then(Value::as_str),
            description: status
                .get("descripcion")
                .or_else(|| status.get("description"))
                .and_then(Value::as_str),
        })
    }
}

fn first_message(messages: &[Value]) -> String {
    messages
        .first()
        .and_then(|m| m.get("mensaje").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| Value::Array(messages.to_vec()).to_string())
}

const QUOTATION_SUMMARY_FIELDS: [&str; 16] = [
    "de_plan_pago",
    "fe_desde",
    "fe_hasta",
    "cd_entidad",
    "nu_cotizacion",
    "nu_documento_contratante",
    "tp_documento_contratante",
    "nu_documento",
    "tp_documento",
    "nu_poliza",
    "mt_prima_total",
    "cd_region",
    "nu_total_cuota",
    "cd_area",
    "nm_cliente",
    "de_st_cotizacion",
];

// 每個 bien 中不回傳給呼叫端的內部欄位
const HIDDEN_ASSET_FIELDS: [&str; 5] = [
    "fe_fallecimiento",
    "datos",
    "fe_exclusion",
    "preguntas",
    "nu_consec_tp_doc_asegurado",
];

fn first_of(body: &mut Value, key: &str) -> Option<Value> {
    match body.as_object_mut()?.remove(key)? {
        Value::Array(items) => items.into_iter().next(),
        _ => None,
    }
}

/// 報價摘要：供應商沒給的欄位直接略過，不補空值
fn quotation_summary(quotation: Value) -> Option<Value> {
    let Value::Object(mut quotation) = quotation else {
        return None;
    };

    let mut summary = Map::new();
    for field in QUOTATION_SUMMARY_FIELDS {
        if let Some(value) = quotation.remove(field) {
            summary.insert(field.to_string(), value);
        }
    }

    if let Some(Value::Array(assets)) = quotation.remove("bienes") {
        let assets = assets
            .into_iter()
            .map(|mut asset| {
                if let Some(fields) = asset.as_object_mut() {
                    for hidden in HIDDEN_ASSET_FIELDS {
                        fields.remove(hidden);
                    }
                }
                asset
            })
            .collect();
        summary.insert("bienes".to_string(), Value::Array(assets));
    }
    Some(Value::Object(summary))
}

impl ResultSelector {
    pub fn select(&self, mut body: Value) -> Option<Value> {
        match self {
            Self::WholeBody => Some(body),
            Self::Key(key) => body.as_object_mut()?.remove(*key),
            Self::FirstOf(key) => first_of(&mut body, key),
            Self::QuotationSummary => quotation_summary(first_of(&mut body, "cotizacion")?),
        }
    }
}

/// 依固定順序解讀一次傳輸結果：
/// 傳輸失敗 → 非 200 → 查無資料描述 → 非 EXITO → `mensajes` → 取出結果
pub fn normalize(
    rules: &ResponseRules,
    response: std::result::Result<RawResponse, TransportFailure>,
) -> Outcome {
    let raw = match response {
        Ok(raw) => raw,
        Err(TransportFailure::Timeout) => return Outcome::Timeout,
        Err(TransportFailure::Connection(detail)) => return Outcome::TransportError { detail },
    };

    let parsed: Option<Value> = serde_json::from_str(&raw.body).ok();
    let status = parsed.as_ref().and_then(ProviderStatus::read);

    if raw.status != 200 {
        let code = status
            .as_ref()
            .and_then(|s| s.code)
            .map(str::to_string)
            .unwrap_or_else(|| raw.status.to_string());
        let description = status
            .as_ref()
            .and_then(|s| s.description)
            .map(str::to_string)
            .unwrap_or_else(|| raw.body.clone());
        return Outcome::UpstreamRejected {
            status: raw.status,
            code,
            description,
        };
    }

    let Some(status) = status else {
        return Outcome::malformed("missing status block");
    };

    if status.description == Some(NOT_FOUND_DESCRIPTION) {
        return Outcome::NotFound {
            description: NOT_FOUND_DESCRIPTION.to_string(),
        };
    }

    if status.code != Some(SUCCESS_CODE) {
        return Outcome::UpstreamRejected {
            status: raw.status,
            code: status.code.unwrap_or_default().to_string(),
            description: status
                .description
                .map(str::to_string)
                .unwrap_or_else(|| raw.body.clone()),
        };
    }

    let Some(body) = parsed else {
        return Outcome::malformed("body is not JSON");
    };

    if rules.messages_mean_not_found {
        if let Some(messages) = body.get("mensajes").and_then(Value::as_array) {
            if !messages.is_empty() {
                return Outcome::NotFound {
                    description: first_message(messages),
                };
            }
        }
    }

    match rules.result.select(body) {
        Some(data) => Outcome::Success { data },
        None => Outcome::malformed("documented result key is missing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PERSONA: ResponseRules = ResponseRules {
        result: ResultSelector::Key("persona"),
        messages_mean_not_found: false,
    };

    fn ok(body: Value) -> std::result::Result<RawResponse, TransportFailure> {
        Ok(RawResponse::new(200, body.to_string()))
    }

    #[test]
    fn test_success_wraps_result_key() {
        let outcome = normalize(
            &PERSONA,
            ok(json!({"status": {"code": "EXITO"}, "persona": [{"cd_persona": 42}]})),
        );
        assert_eq!(
            outcome,
            Outcome::Success {
                data: json!([{"cd_persona": 42}])
            }
        );
        assert_eq!(outcome.http_status(), 200);
    }

    #[test]
    fn test_not_found_description_wins_over_code() {
        for code in ["ERROR", "EXITO"] {
            let outcome = normalize(
                &PERSONA,
                ok(json!({"status": {"code": code, "descripcion": NOT_FOUND_DESCRIPTION}})),
            );
            assert!(matches!(outcome, Outcome::NotFound { .. }), "{}", code);
            assert_eq!(outcome.http_status(), 404);
        }
    }

    #[test]
    fn test_business_rejection_keeps_provider_text() {
        let outcome = normalize(
            &PERSONA,
            ok(json!({"status": {"code": "ERROR", "description": "Persona ya existe"}})),
        );
        assert_eq!(
            outcome,
            Outcome::UpstreamRejected {
                status: 200,
                code: "ERROR".to_string(),
                description: "Persona ya existe".to_string(),
            }
        );
        assert_eq!(outcome.http_status(), 400);
    }

    #[test]
    fn test_http_error_uses_raw_body_without_status() {
        let outcome = normalize(
            &PERSONA,
            Ok(RawResponse::new(503, "Service Unavailable")),
        );
        assert_eq!(
            outcome,
            Outcome::UpstreamRejected {
                status: 503,
                code: "503".to_string(),
                description: "Service Unavailable".to_string(),
            }
        );
        assert_eq!(outcome.http_status(), 503);

        let outcome = normalize(
            &PERSONA,
            Ok(RawResponse::new(
                401,
                json!({"status": {"code": "AUTH", "descripcion": "Clave invalida"}}).to_string(),
            )),
        );
        assert!(matches!(
            outcome,
            Outcome::UpstreamRejected { status: 401, ref code, ref description }
                if code == "AUTH" && description == "Clave invalida"
        ));
    }

    #[test]
    fn test_transport_failures() {
        assert_eq!(
            normalize(&PERSONA, Err(TransportFailure::Timeout)),
            Outcome::Timeout
        );
        assert_eq!(Outcome::Timeout.http_status(), 408);

        let outcome = normalize(
            &PERSONA,
            Err(TransportFailure::Connection("connection refused".to_string())),
        );
        assert_eq!(outcome.http_status(), 502);
    }

    #[test]
    fn test_malformed_success_is_never_empty_data() {
        let outcome = normalize(&PERSONA, ok(json!({"status": {"code": "EXITO"}})));
        assert!(matches!(outcome, Outcome::TransportError { ref detail } if detail.contains("malformed")));

        let outcome = normalize(&PERSONA, Ok(RawResponse::new(200, "<html>")));
        assert!(matches!(outcome, Outcome::TransportError { .. }));
    }

    #[test]
    fn test_quotation_messages_mean_not_found() {
        let rules = ResponseRules {
            result: ResultSelector::QuotationSummary,
            messages_mean_not_found: true,
        };
        let outcome = normalize(
            &rules,
            ok(json!({
                "status": {"code": "EXITO"},
                "mensajes": [{"mensaje": "Cotizacion no existe"}],
                "cotizacion": []
            })),
        );
        assert_eq!(
            outcome,
            Outcome::NotFound {
                description: "Cotizacion no existe".to_string()
            }
        );

        let outcome = normalize(
            &rules,
            ok(json!({
                "status": {"code": "EXITO"},
                "mensajes": [],
                "cotizacion": [{"nu_cotizacion": 7}, {"nu_cotizacion": 8}]
            })),
        );
        assert_eq!(
            outcome,
            Outcome::Success {
                data: json!({"nu_cotizacion": 7})
            }
        );
    }

    #[test]
    fn test_quotation_summary_hides_internal_asset_fields() {
        let rules = ResponseRules {
            result: ResultSelector::QuotationSummary,
            messages_mean_not_found: true,
        };
        let outcome = normalize(
            &rules,
            ok(json!({
                "status": {"code": "EXITO"},
                "cotizacion": [{
                    "nu_cotizacion": 5150,
                    "cd_entidad": 1,
                    "mt_prima_total": 312.5,
                    "de_st_cotizacion": "VIGENTE",
                    "cd_usuario": "S3916",
                    "coll_datos": [],
                    "bienes": [{
                        "nu_bien": 1,
                        "de_bien": "LUIS ROJAS",
                        "fe_fallecimiento": null,
                        "datos": [{"cd_dato": 990150}],
                        "fe_exclusion": null,
                        "preguntas": [],
                        "nu_consec_tp_doc_asegurado": 0
                    }]
                }]
            })),
        );

        assert_eq!(
            outcome,
            Outcome::Success {
                data: json!({
                    "nu_cotizacion": 5150,
                    "cd_entidad": 1,
                    "mt_prima_total": 312.5,
                    "de_st_cotizacion": "VIGENTE",
                    "bienes": [{"nu_bien": 1, "de_bien": "LUIS ROJAS"}]
                })
            }
        );
    }

    #[test]
    fn test_quotation_summary_needs_an_object() {
        let selector = ResultSelector::QuotationSummary;
        assert_eq!(selector.select(json!({"cotizacion": [7]})), None);
        assert_eq!(selector.select(json!({"cotizacion": []})), None);
    }

    #[test]
    fn test_adapter_errors_become_outcomes() {
        let outcome = Outcome::from(AdapterError::validation("cd_banco", "unknown bank"));
        assert!(matches!(outcome, Outcome::ValidationFailed { ref detail } if detail.contains("cd_banco")));

        let outcome = Outcome::from(AdapterError::UnsupportedOperation {
            operation: "issue-policy".to_string(),
            version: "v2".to_string(),
        });
        assert_eq!(outcome.http_status(), 422);

        let outcome = Outcome::from(AdapterError::TemplateError {
            pointer: "/datos".to_string(),
        });
        assert_eq!(outcome.kind(), "transport_error");
        assert!(matches!(
            outcome,
            Outcome::TransportError { ref detail }
                if detail.starts_with("internal adapter error:") && detail.contains("/datos")
        ));

        let outcome = Outcome::from(AdapterError::UnknownOperation {
            operation: "cancel-policy".to_string(),
        });
        assert_eq!(outcome.http_status(), 422);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let value = serde_json::to_value(Outcome::Timeout).unwrap();
        assert_eq!(value, json!({"outcome": "timeout"}));

        let value = serde_json::to_value(Outcome::ValidationFailed {
            detail: "bad".to_string(),
        })
        .unwrap();
        assert_eq!(value["outcome"], "validation_failed");
    }
}
