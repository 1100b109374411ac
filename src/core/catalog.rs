//! 供應商各操作的樣板。
//!
//! 樣板是行程層級的唯讀常數；`build` 每次都先深拷貝再寫入欄位，
//! 所以同時進行的呼叫之間不可能互相污染。

use crate::core::mapper::FieldSet;
use crate::core::variant::VariantPayload;
use crate::utils::error::{AdapterError, Result};
use serde_json::{json, Value};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    CreatePerson,
    QueryPerson,
    AccidentQuotation,
    GlobalQuotation,
    IssuePolicy,
    QueryPolicy,
    QueryQuotation,
    IncludeAnnex,
    PolicySchedule,
    RegisterPayment,
    GenerateOtp,
    ExchangeRate,
    NotifyPayment,
}

impl Template {
    pub fn skeleton(&self) -> &'static Value {
        match self {
            Self::CreatePerson => &CREATE_PERSON,
            Self::QueryPerson => &QUERY_PERSON,
            Self::AccidentQuotation => &ACCIDENT_QUOTATION,
            Self::GlobalQuotation => &GLOBAL_QUOTATION,
            Self::IssuePolicy => &ISSUE_POLICY,
            Self::QueryPolicy => &QUERY_POLICY,
            Self::QueryQuotation => &QUERY_QUOTATION,
            Self::IncludeAnnex => &INCLUDE_ANNEX,
            Self::PolicySchedule => &POLICY_SCHEDULE,
            Self::RegisterPayment => &REGISTER_PAYMENT,
            Self::GenerateOtp => &GENERATE_OTP,
            Self::ExchangeRate => &EXCHANGE_RATE,
            Self::NotifyPayment => &NOTIFY_PAYMENT,
        }
    }

    /// 核心服務的樣板帶有 `aplicacion` / `usuario`，由設定檔填入
    pub fn carries_identity(&self) -> bool {
        self.skeleton().get("aplicacion").is_some()
    }
}

/// 依樣板建立送出的內容：深拷貝、寫入欄位、移除互斥的 key、最後插入唯一的變體區段
pub fn build(
    template: Template,
    fields: &FieldSet,
    variant: Option<&VariantPayload>,
) -> Result<Value> {
    let mut envelope = template.skeleton().clone();
    fields.apply(&mut envelope)?;

    if let Some(variant) = variant {
        match envelope.pointer_mut(variant.parent()) {
            Some(Value::Object(section)) => {
                for sibling in variant.siblings() {
                    section.remove(sibling);
                }
                section.insert(variant.key().to_string(), variant.section().clone());
            }
            _ => {
                return Err(AdapterError::TemplateError {
                    pointer: variant.parent().to_string(),
                })
            }
        }
    }
    Ok(envelope)
}

static CREATE_PERSON: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "aplicacion": "",
        "funcionalidad": "CREAR_PERSONA_V",
        "persona": [
            {
                "cd_estado_civil": "S",
                "nm_segundo_nombre": "",
                "nm_segundo_apellido": "",
                "cd_ocupacion": 999,
                "cd_oficio_riesgo": 1,
                "cd_pais_residencia": 29,
                "cd_profesion": 999,
                "persona_direccion": [
                    {
                        "nm_calle": "Noidentificada",
                        "cd_pais": "29",
                        "cd_provincia": "10",
                        "cd_zona": "129",
                        "cd_municipio": "1",
                        "tp_direccion": "2",
                        "cd_ciudad": "1",
                        "tp_vivienda": "2"
                    }
                ],
                "persona_rol": [{ "cd_rol": 1 }],
                "persona_telefono": [{ "cd_pais": "29", "tp_telefono": "7" }],
                "persona_email": [{ "tp_email": "13" }],
                "persona_contacto": [],
                "persona_riesgo": [],
                "relacion_Personas_Juridicas": [],
                "pregunta_riesgo": [],
                "tp_persona": 1
            }
        ],
        "usuario": ""
    })
});

static QUERY_PERSON: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "aplicacion": "",
        "funcionalidad": "CONSULTAR_PERSONA_V",
        "usuario": "",
        "persona": { "tp_documento": "", "nu_documento": "" }
    })
});

// datos[0] = 990150 保額, datos[3] = 990160 出生日期
static ACCIDENT_QUOTATION: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "persona": [],
        "funcionalidad": "COTIZAR_ACCD_PERS_V",
        "aplicacion": "",
        "usuario": "",
        "coll_datos": {
            "datos": [
                { "cd_dato": 990150, "nu_bien": 1, "valor": 0 },
                { "cd_dato": 990140, "nu_bien": 1, "valor": "29" },
                { "cd_dato": 990141, "nu_bien": 1, "valor": "29" },
                { "cd_dato": 990160, "nu_bien": 1, "valor": "" },
                { "cd_dato": 990205, "nu_bien": 1, "valor": "S" },
                { "cd_dato": 100130, "nu_bien": 1, "valor": "0" },
                { "cd_dato": 100135, "nu_bien": 1, "valor": "1" }
            ]
        },
        "coll_bienes": {
            "bienes": [
                {
                    "in_seleccion": 1,
                    "in_grupo_asegurado": 1,
                    "nu_bien": 1,
                    "in_asegurado": 1,
                    "de_bien": ""
                }
            ]
        },
        "coll_generales": {
            "generales": [
                {
                    "cd_clase_riesgo": "N",
                    "fe_desde": "",
                    "fe_hasta": "",
                    "cd_producto": 100100,
                    "cd_persona_med": 11626,
                    "di_ip": "0.0.0.0",
                    "in_solo_preparar": 0,
                    "cd_usuario": "S3916",
                    "cd_moneda": 2,
                    "cd_entidad": "1",
                    "cd_plan_pago": 0,
                    "cd_frecuencia_cuota": "",
                    "ca_cuota": "",
                    "cd_canal_venta": 46,
                    "cd_sucursal": "1",
                    "nu_documento_contratante": "",
                    "tp_documento_contratante": "",
                    "nu_documento": "",
                    "tp_documento": "",
                    "in_todos": 0,
                    "in_grabar": 1,
                    "cd_region": 1,
                    "nm_cliente": "",
                    "cd_vigencia": "A",
                    "cd_area": "1"
                }
            ]
        },
        "coll_grpaseg": { "grpaseg": [] }
    })
});

fn fixed_datum(code: &str, value: &str) -> Value {
    json!({ "cd_dato": code, "nu_bien": "1", "valor": value })
}

// 固定資料；依請求而變的 710003/7100xx 由 mapper 附加在後
static GLOBAL_QUOTATION: LazyLock<Value> = LazyLock::new(|| {
    let fixed = [
        ("710055", "19"),
        ("710001", "29"),
        ("710038", "1"),
        ("710034", "0"),
        ("710035", "0"),
        ("710054", "0"),
        ("710096", "0"),
        ("710032", "10"),
        ("710200", "0"),
        ("710201", "0"),
        ("710202", "0"),
        ("710203", "0"),
        ("710204", "0"),
        ("710205", "0"),
        ("710206", "0"),
        ("710207", "0"),
        ("710216", "1"),
        ("710089", "0"),
    ];
    let datos: Vec<Value> = fixed
        .iter()
        .map(|(code, value)| fixed_datum(code, value))
        .collect();

    json!({
        "coll_preguntas": { "preguntas": [] },
        "persona": [],
        "funcionalidad": "COTIZAR_GLOBAL_IND_V",
        "aplicacion": "",
        "usuario": "",
        "coll_datos": { "datos": datos },
        "coll_bienes": {
            "bienes": [{ "in_seleccion": 1, "nu_bien": 1, "de_bien": "" }]
        },
        "coll_generales": {
            "generales": [
                {
                    "nu_solicitud": "",
                    "nu_cotizacion_mod": "",
                    "cd_clase_riesgo": "S",
                    "cd_plan_pago": "",
                    "fe_desde": "",
                    "cd_producto": "710100",
                    "cd_persona_med": "11626",
                    "di_ip": "0.0.0.0",
                    "in_web_externa": "",
                    "nu_poliza_relacionada": "",
                    "in_solo_preparar": "0",
                    "fe_hasta": "",
                    "cd_usuario": "INTERFAZSIRWEB",
                    "cd_moneda": "2",
                    "cd_persona_med_agrupador": "",
                    "cd_entidad": "1",
                    "de_observacion": "Plan Cuida Salud",
                    "ca_cuota": "1",
                    "nu_sec_estructura": "",
                    "cd_canal_venta": "39",
                    "cd_sucursal": "1",
                    "nu_inspeccion": "",
                    "nu_documento_contratante": "",
                    "cd_persona_med_especial": "",
                    "nu_documento": "",
                    "cd_frecuencia_cuota": "",
                    "nu_cot_relacionada": "",
                    "in_todos": "1",
                    "in_grabar": "1",
                    "tp_mediador_especial": "",
                    "nu_cotizacion_copia": "",
                    "cd_region": "1",
                    "nm_cliente": "",
                    "cd_vigencia": "A",
                    "tp_documento": "",
                    "cd_area": "71",
                    "tp_documento_contratante": ""
                }
            ]
        },
        "coll_grpaseg": { "grpaseg": [] }
    })
});

static ISSUE_POLICY: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "aplicacion": "",
        "funcionalidad": "EMITIR_POLIZA_V",
        "usuario": "",
        "coll_generales": {
            "generales": [
                {
                    "cd_entidad": 0,
                    "nu_cotizacion": 0,
                    "nu_item": 0,
                    "in_orden_pago": 0,
                    "in_emitir_futuro": 0
                }
            ]
        }
    })
});

// `nu_recibo` 只在呼叫端提供時才加入
static QUERY_POLICY: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "aplicacion": "",
        "funcionalidad": "CONSULTAR_POLIZA_V",
        "usuario": "",
        "polizas-recibos": [
            { "cd_entidad": 0, "cd_area": 0, "poliza": 0, "certificado": 0 }
        ]
    })
});

static QUERY_QUOTATION: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "aplicacion": "",
        "funcionalidad": "CONSULTAR_COTIZACION_V",
        "usuario": "",
        "cd_entidad": 0,
        "nu_cotizacion": 0,
        "cd_persona": "",
        "tp_documento": "",
        "nu_documento": "",
        "cd_persona_mediador": "",
        "cd_persona_mediador_especial": "",
        "cd_mediador": "",
        "cd_mediador_especial": "",
        "nu_secuencia_estructura": "",
        "cd_agente_bancario": "",
        "datos_cotizacion": [{ "cd_dato": "", "va_dato": "" }]
    })
});

static INCLUDE_ANNEX: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "aplicacion": "",
        "funcionalidad": "INCLUIR_ANEXO_POLIZA_V",
        "usuario": "",
        "cd_entidad": 0,
        "cd_area": 0,
        "nu_poliza": 0,
        "datos_dinamicos": [
            { "cd_dato": "&NU_POLIZA", "va_dato": "" },
            { "cd_dato": "&NM_ASEGURADO", "va_dato": "" }
        ]
    })
});

static POLICY_SCHEDULE: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "funcionalidad": "OBTENER_CUADRO_POLIZA",
        "aplicacion": "",
        "usuario": "",
        "datos_poliza": {
            "cd_entidad": 0,
            "cd_area": 0,
            "nu_poliza": 0,
            "nu_certificado": 0,
            "nu_endoso": 0
        }
    })
});

// 支付閘道的樣板沒有任何 instrumento_* 區段
static REGISTER_PAYMENT: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "datos": {
            "poliza_recibo_cuota": [],
            "tipo_instrumento_pago": "",
            "moneda_pago": ""
        }
    })
});

static GENERATE_OTP: LazyLock<Value> =
    LazyLock::new(|| json!({ "datos": { "tipo_instrumento_pago": "" } }));

static EXCHANGE_RATE: LazyLock<Value> = LazyLock::new(|| json!({ "tasa": { "fe_tasa": "" } }));

static NOTIFY_PAYMENT: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "datos": {
            "poliza_recibo_cuota": [],
            "tipo_instrumento_pago": "",
            "nombre_pagador": ""
        }
    })
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapper;
    use crate::core::variant::{select_payment_instrument, InstrumentKind};
    use crate::domain::model::{
        AccountType, Currency, DebitCardInput, InstrumentSlots, MobilePaymentInput, PaymentData,
        PaymentReceipt, RegisterPaymentRequest,
    };

    const ALL: [Template; 13] = [
        Template::CreatePerson,
        Template::QueryPerson,
        Template::AccidentQuotation,
        Template::GlobalQuotation,
        Template::IssuePolicy,
        Template::QueryPolicy,
        Template::QueryQuotation,
        Template::IncludeAnnex,
        Template::PolicySchedule,
        Template::RegisterPayment,
        Template::GenerateOtp,
        Template::ExchangeRate,
        Template::NotifyPayment,
    ];

    fn payment_request(kind: &str) -> RegisterPaymentRequest {
        RegisterPaymentRequest {
            recibo_poliza_pago: PaymentReceipt {
                cd_entidad: 1,
                cd_area: 71,
                nu_poliza: 100200,
                nu_certificado: 1,
                cd_recibo: 555,
                nu_convenio_pago: 9,
                nu_cuota: 1,
            },
            pago: PaymentData {
                moneda_pago: Currency::Bs,
                tipo_instrumento_pago: kind.to_string(),
                instrumento_pago: InstrumentSlots {
                    instrumento_tdd: Some(DebitCardInput {
                        numero: 5412345678901234,
                        fe_vencimiento: "09-2027".to_string(),
                        cd_verificacion: 123,
                        nombre_tarjeta: "ANA PEREZ".to_string(),
                        tp_identidad: "V".to_string(),
                        doc_identidad: "19909380".to_string(),
                        tp_cuenta: AccountType::Ca,
                        otp: "654321".to_string(),
                    }),
                    instrumento_tdc: None,
                    instrumento_c2p: Some(MobilePaymentInput {
                        numero: None,
                        tp_identidad: "V".to_string(),
                        doc_identidad: "19909380".to_string(),
                        nu_telefono: "584141234567".to_string(),
                        cd_banco: "0105".to_string(),
                        otp: "123456".to_string(),
                    }),
                },
            },
        }
    }

    fn build_payment(kind: &str) -> Value {
        let request = payment_request(kind);
        let instrument = select_payment_instrument(&request.pago).unwrap();
        let fields = mapper::register_payment(&request, instrument.kind()).unwrap();
        build(
            Template::RegisterPayment,
            &fields,
            Some(&instrument.to_variant().unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_tdd_after_c2p_carries_only_tdd() {
        let first = build_payment("C2P");
        assert!(first["datos"].get("instrumento_c2p").is_some());

        let second = build_payment("TDD");
        let datos = second["datos"].as_object().unwrap();
        assert!(datos.contains_key("instrumento_tdd"));
        assert!(!datos.contains_key("instrumento_c2p"));
        assert!(!datos.contains_key("instrumento_tdc"));
        assert_eq!(datos["tipo_instrumento_pago"], "TDD");
        assert_eq!(datos["moneda_pago"], "BS");
        assert_eq!(datos["poliza_recibo_cuota"][0]["cd_recibo"], 555);

        // 樣板本身不受影響
        assert!(Template::RegisterPayment.skeleton()["datos"]
            .get("instrumento_c2p")
            .is_none());
    }

    #[test]
    fn test_variant_clears_sibling_sections() {
        let request = payment_request("TDD");
        let instrument = select_payment_instrument(&request.pago).unwrap();
        let mut fields = mapper::register_payment(&request, instrument.kind()).unwrap();
        fields
            .set("/datos/instrumento_c2p", json!({ "otp": "111111" }))
            .set("/datos/instrumento_tdc", json!({ "numero": 4111111111111111u64 }));

        let envelope = build(
            Template::RegisterPayment,
            &fields,
            Some(&instrument.to_variant().unwrap()),
        )
        .unwrap();

        let datos = envelope["datos"].as_object().unwrap();
        assert!(datos.contains_key("instrumento_tdd"));
        assert!(!datos.contains_key("instrumento_c2p"));
        assert!(!datos.contains_key("instrumento_tdc"));
        assert_eq!(datos["tipo_instrumento_pago"], "TDD");
    }

    #[test]
    fn test_build_leaves_skeleton_untouched() {
        let mut fields = FieldSet::new();
        fields.set("/persona/nu_documento", "V-19909380");
        let envelope = build(Template::QueryPerson, &fields, None).unwrap();

        assert_eq!(envelope["persona"]["nu_documento"], "V-19909380");
        assert_eq!(Template::QueryPerson.skeleton()["persona"]["nu_documento"], "");
    }

    #[test]
    fn test_accident_quotation_slot_positions() {
        let datos = &Template::AccidentQuotation.skeleton()["coll_datos"]["datos"];
        assert_eq!(datos[0]["cd_dato"], 990150);
        assert_eq!(datos[3]["cd_dato"], 990160);
    }

    #[test]
    fn test_global_quotation_has_no_variable_datos() {
        let datos = Template::GlobalQuotation.skeleton()["coll_datos"]["datos"]
            .as_array()
            .unwrap();
        assert_eq!(datos.len(), 18);
        for variable in ["710000", "710003", "710036", "710037", "710051"] {
            assert!(datos.iter().all(|d| d["cd_dato"] != variable));
        }
    }

    #[test]
    fn test_identity_slots() {
        for template in ALL {
            let expected = !matches!(
                template,
                Template::RegisterPayment
                    | Template::GenerateOtp
                    | Template::ExchangeRate
                    | Template::NotifyPayment
            );
            assert_eq!(template.carries_identity(), expected, "{:?}", template);
        }
    }

    #[test]
    fn test_variant_needs_an_object_parent() {
        let instrument = select_payment_instrument(&payment_request("TDD").pago).unwrap();
        let variant = instrument.to_variant().unwrap();
        let err = build(Template::ExchangeRate, &FieldSet::new(), Some(&variant)).unwrap_err();
        assert!(matches!(err, AdapterError::TemplateError { .. }));
        assert_eq!(instrument.kind(), InstrumentKind::Tdd);
    }
}
