use crate::core::variant::{InstrumentKind, Relationship};
use crate::domain::model::{
    Beneficiary, CreatePersonRequest, DateValue, ExchangeRateRequest, Frequency,
    GlobalQuotationRequest, IncludeAnnexRequest, IssuePolicyRequest, NotifyPaymentRequest,
    PolicyScheduleRequest, QueryPersonRequest, QueryPolicyRequest, QueryQuotationRequest,
    QueryReceiptsRequest, QuotationRequest, RegisterPaymentRequest,
};
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::{validate_date_text, validate_document, validate_required_text};
use chrono::NaiveDate;
use serde_json::{json, Value};

pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq)]
enum FieldOp {
    Set(String, Value),
    Append(String, Value),
}

/// 要寫入樣板的值，以 JSON pointer 定位。
///
/// `set` 取代或新增 pointer 所指的欄位；`append` 在 pointer 所指的陣列尾端加入元素。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    ops: Vec<FieldOp>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, pointer: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.ops.push(FieldOp::Set(pointer.into(), value.into()));
        self
    }

    pub fn append(&mut self, pointer: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.ops.push(FieldOp::Append(pointer.into(), value.into()));
        self
    }

    /// 最後一次 `set` 到此 pointer 的值
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.ops.iter().rev().find_map(|op| match op {
            FieldOp::Set(p, v) if p == pointer => Some(v),
            _ => None,
        })
    }

    pub fn appended(&self, pointer: &str) -> Vec<&Value> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FieldOp::Append(p, v) if p == pointer => Some(v),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn apply(&self, document: &mut Value) -> Result<()> {
        for op in &self.ops {
            match op {
                FieldOp::Set(pointer, value) => set_pointer(document, pointer, value.clone())?,
                FieldOp::Append(pointer, value) => {
                    match document.pointer_mut(pointer) {
                        Some(Value::Array(items)) => items.push(value.clone()),
                        _ => {
                            return Err(AdapterError::TemplateError {
                                pointer: pointer.clone(),
                            })
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn set_pointer(document: &mut Value, pointer: &str, value: Value) -> Result<()> {
    let slot_error = || AdapterError::TemplateError {
        pointer: pointer.to_string(),
    };
    let (parent, key) = pointer.rsplit_once('/').ok_or_else(slot_error)?;

    match document.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        Some(Value::Array(items)) => {
            let index: usize = key.parse().map_err(|_| slot_error())?;
            let slot = items.get_mut(index).ok_or_else(slot_error)?;
            *slot = value;
            Ok(())
        }
        _ => Err(slot_error()),
    }
}

// ---- documents ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Ven,
    Oppa,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ven => "VEN",
            Self::Oppa => "OPPA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedDocument {
    pub tp_documento: DocumentType,
    /// 實際送出的號碼：`P` 去掉前兩碼，`V`/`E` 保留原字串
    pub nu_documento: String,
}

pub fn map_document(field: &str, raw: &str) -> Result<MappedDocument> {
    validate_document(field, raw)?;
    match raw.chars().next() {
        Some('V') | Some('E') => Ok(MappedDocument {
            tp_documento: DocumentType::Ven,
            nu_documento: raw.to_string(),
        }),
        Some('P') => Ok(MappedDocument {
            tp_documento: DocumentType::Oppa,
            nu_documento: raw.get(2..).unwrap_or_default().to_string(),
        }),
        other => Err(AdapterError::validation(
            field,
            format!(
                "document prefix '{}' has no provider document type",
                other.unwrap_or(' ')
            ),
        )),
    }
}

// ---- dates, names, frequencies ----

pub fn format_date(field: &str, value: &DateValue) -> Result<String> {
    match value {
        DateValue::Date(date) => Ok(date.format(DATE_FORMAT).to_string()),
        DateValue::Text(text) => {
            validate_date_text(field, text)?;
            let date = NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| {
                AdapterError::validation(field, format!("'{}' is not a calendar date: {}", text, e))
            })?;
            Ok(date.format(DATE_FORMAT).to_string())
        }
    }
}

pub fn full_name(first_name: &str, first_surname: &str) -> String {
    format!("{} {}", first_name, first_surname)
}

impl Frequency {
    pub fn plan_code(&self) -> u16 {
        match self {
            Self::Mensual => 201,
            Self::Trimestral => 202,
            Self::Semestral => 203,
            Self::Anual => 204,
        }
    }

    pub fn installment_letter(&self) -> &'static str {
        match self {
            Self::Mensual => "M",
            Self::Trimestral => "T",
            Self::Semestral => "S",
            Self::Anual => "A",
        }
    }
}

fn datum(code: &str, value: impl Into<Value>) -> Value {
    json!({ "cd_dato": code, "nu_bien": "1", "valor": value.into() })
}

// ---- core service operations ----

const PERSON: &str = "/persona/0";

pub fn create_person(request: &CreatePersonRequest) -> Result<FieldSet> {
    let person = &request.persona;
    validate_required_text("persona.nm_primer_nombre", &person.nm_primer_nombre)?;
    validate_required_text("persona.nm_primer_apellido", &person.nm_primer_apellido)?;
    let document = map_document("persona.documento.nu_documento", &person.documento.nu_documento)?;
    let birth_date = format_date("persona.fe_nacimiento", &person.fe_nacimiento)?;
    let registered = format_date("fe_registro", &request.fe_registro)?;

    // 供應商的拆段規則：第一碼與第三碼之後
    let number = &document.nu_documento;
    let section1 = number.get(..1).unwrap_or_default();
    let section2 = number.get(2..).unwrap_or_default();

    let mut fields = FieldSet::new();
    fields
        .set(format!("{PERSON}/nm_primer_nombre"), person.nm_primer_nombre.as_str())
        .set(format!("{PERSON}/nm_primer_apellido"), person.nm_primer_apellido.as_str())
        .set(format!("{PERSON}/cd_sexo"), person.cd_sexo.as_str())
        .set(format!("{PERSON}/fe_nacimiento"), birth_date)
        .set(format!("{PERSON}/fe_registro"), registered)
        .set(
            format!("{PERSON}/persona_email/0/de_email"),
            person.contacto.de_email.as_str(),
        )
        .set(
            format!("{PERSON}/persona_telefono/0/nu_area"),
            person.contacto.nu_area_telefono.as_str(),
        )
        .set(
            format!("{PERSON}/persona_telefono/0/nu_telefono"),
            person.contacto.nu_telefono.as_str(),
        )
        .set(format!("{PERSON}/nu_documento"), number.as_str())
        .set(format!("{PERSON}/tp_documento"), document.tp_documento.as_str())
        .set(format!("{PERSON}/nu_documento_seccion1"), section1)
        .set(format!("{PERSON}/nu_documento_seccion2"), section2)
        .set(format!("{PERSON}/cd_nacionalidad"), "VEN")
        .set(format!("{PERSON}/cd_pais_nacimiento"), "VEN");

    if let Some(middle) = &person.nm_segundo_nombre {
        fields.set(format!("{PERSON}/nm_segundo_nombre"), middle.as_str());
    }
    if let Some(second_surname) = &person.nm_segundo_apellido {
        fields.set(format!("{PERSON}/nm_segundo_apellido"), second_surname.as_str());
    }
    Ok(fields)
}

pub fn query_person(request: &QueryPersonRequest) -> Result<FieldSet> {
    let document = map_document("num_documento", &request.num_documento)?;
    let mut fields = FieldSet::new();
    fields
        .set("/persona/tp_documento", document.tp_documento.as_str())
        .set("/persona/nu_documento", document.nu_documento);
    Ok(fields)
}

const GENERAL: &str = "/coll_generales/generales/0";

/// 意外險報價（v1）。樣板中 `datos[0]` 為保額、`datos[3]` 為出生日期
pub fn quotation(request: &QuotationRequest, default_insured_sum: u64) -> Result<FieldSet> {
    let holder = &request.persona;
    let terms = &request.poliza;
    let document = map_document("persona.documento.nu_documento", &holder.documento.nu_documento)?;
    let birth_date = format_date("persona.fecha_nacimiento", &holder.fecha_nacimiento)?;
    let from = format_date("poliza.fe_desde", &terms.fe_desde)?;
    let until = format_date("poliza.fe_hasta", &terms.fe_hasta)?;
    let name = full_name(&holder.nm_primer_nombre, &holder.nm_primer_apellido);
    let insured_sum = terms.suma_asegurada.unwrap_or(default_insured_sum);

    let mut fields = FieldSet::new();
    fields
        .set("/coll_datos/datos/0/valor", insured_sum)
        .set("/coll_datos/datos/3/valor", birth_date)
        .set("/coll_bienes/bienes/0/de_bien", name.as_str())
        .set(format!("{GENERAL}/fe_desde"), from)
        .set(format!("{GENERAL}/fe_hasta"), until)
        .set(format!("{GENERAL}/cd_plan_pago"), terms.frecuencia_cuota.plan_code())
        .set(format!("{GENERAL}/nm_cliente"), name)
        .set(format!("{GENERAL}/nu_documento"), document.nu_documento.as_str())
        .set(format!("{GENERAL}/tp_documento"), document.tp_documento.as_str())
        .set(
            format!("{GENERAL}/nu_documento_contratante"),
            document.nu_documento.as_str(),
        )
        .set(
            format!("{GENERAL}/tp_documento_contratante"),
            document.tp_documento.as_str(),
        );
    Ok(fields)
}

fn relative_birth_date(
    relatives: &[(Relationship, &Beneficiary)],
    wanted: Relationship,
    flag: &str,
) -> Result<String> {
    let (index, (_, beneficiary)) = relatives
        .iter()
        .enumerate()
        .find(|(_, (relationship, _))| *relationship == wanted)
        .ok_or_else(|| {
            AdapterError::validation(
                flag,
                format!("flag is set but no {} beneficiary was supplied", wanted.as_str()),
            )
        })?;
    format_date(
        &format!("beneficiarios[{}].fe_nacimiento", index),
        &beneficiary.fe_nacimiento,
    )
}

/// 全球健康險報價（v2）
pub fn global_quotation(request: &GlobalQuotationRequest) -> Result<FieldSet> {
    let titular = &request.titular;
    let contracting = request.contratante.as_ref().unwrap_or(titular);
    let terms = &request.poliza;

    let titular_doc = map_document("titular.documento.nu_documento", &titular.documento.nu_documento)?;
    let contracting_doc = map_document(
        "contratante.documento.nu_documento",
        &contracting.documento.nu_documento,
    )?;
    let titular_birth = format_date("titular.fecha_nacimiento", &titular.fecha_nacimiento)?;
    let from = format_date("poliza.fe_desde", &terms.fe_desde)?;
    let until = format_date("poliza.fe_hasta", &terms.fe_hasta)?;
    let titular_name = full_name(&titular.nm_primer_nombre, &titular.nm_primer_apellido);

    let relatives = request
        .beneficiarios
        .iter()
        .enumerate()
        .map(|(i, b)| {
            Relationship::parse(&format!("beneficiarios[{}].cd_parentesco", i), &b.cd_parentesco)
                .map(|r| (r, b))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut fields = FieldSet::new();
    let datos = "/coll_datos/datos";

    if request.cantidad_hijos > 0 {
        fields.append(datos, datum("710003", request.cantidad_hijos.to_string()));
    }
    let flagged = [
        (request.tiene_conyugue, Relationship::Spouse, "tiene_conyugue"),
        (request.tiene_padre, Relationship::Father, "tiene_padre"),
        (request.tiene_madre, Relationship::Mother, "tiene_madre"),
    ];
    for (set, relationship, flag) in flagged {
        if !set {
            continue;
        }
        let birth_date = relative_birth_date(&relatives, relationship, flag)?;
        if let Some(code) = relationship.birth_datum() {
            fields.append(datos, datum(code, birth_date));
        }
    }
    fields
        .append(datos, datum("710000", "1"))
        .append(datos, datum("710037", titular_birth))
        .append(datos, datum("710036", titular.sexo.as_str()));

    fields
        .set("/coll_bienes/bienes/0/de_bien", titular_name.as_str())
        .set(
            format!("{GENERAL}/cd_plan_pago"),
            terms.frecuencia_cuota.plan_code().to_string(),
        )
        .set(format!("{GENERAL}/fe_desde"), from)
        .set(format!("{GENERAL}/fe_hasta"), until)
        .set(format!("{GENERAL}/ca_cuota"), "1")
        .set(
            format!("{GENERAL}/cd_frecuencia_cuota"),
            terms.frecuencia_cuota.installment_letter(),
        )
        .set(format!("{GENERAL}/nm_cliente"), titular_name)
        .set(format!("{GENERAL}/nu_documento"), titular_doc.nu_documento)
        .set(format!("{GENERAL}/tp_documento"), titular_doc.tp_documento.as_str())
        .set(
            format!("{GENERAL}/nu_documento_contratante"),
            contracting_doc.nu_documento,
        )
        .set(
            format!("{GENERAL}/tp_documento_contratante"),
            contracting_doc.tp_documento.as_str(),
        );

    for (index, (relationship, beneficiary)) in relatives.iter().enumerate() {
        let document = map_document(
            &format!("beneficiarios[{}].nu_documento", index),
            &beneficiary.nu_documento,
        )?;
        let birth_date = format_date(
            &format!("beneficiarios[{}].fe_nacimiento", index),
            &beneficiary.fe_nacimiento,
        )?;
        fields.append(
            "/coll_grpaseg/grpaseg",
            json!({
                "cd_parentesco": relationship.code(),
                "nu_consecutivo_asegurado": (index + 1).to_string(),
                "nu_bien": "1",
                "nu_documento": document.nu_documento,
                "fe_nacimiento": birth_date,
                "nm_primer_nombre": beneficiary.nm_primer_nombre,
                "cd_sexo": beneficiary.cd_sexo.as_str(),
                "tp_documento": document.tp_documento.as_str(),
                "in_accion": "I",
                "nm_primer_apellido": beneficiary.nm_primer_apellido,
            }),
        );
    }
    Ok(fields)
}

pub fn issue_policy(request: &IssuePolicyRequest) -> FieldSet {
    let mut fields = FieldSet::new();
    fields
        .set(format!("{GENERAL}/cd_entidad"), request.cd_entidad)
        .set(format!("{GENERAL}/nu_cotizacion"), request.nu_cotizacion);
    fields
}

const POLICY_RECEIPT: &str = "/polizas-recibos/0";

pub fn query_policy(request: &QueryPolicyRequest) -> FieldSet {
    let mut fields = FieldSet::new();
    fields
        .set(format!("{POLICY_RECEIPT}/cd_entidad"), request.cd_entidad)
        .set(format!("{POLICY_RECEIPT}/cd_area"), request.cd_area)
        .set(format!("{POLICY_RECEIPT}/poliza"), request.poliza)
        .set(format!("{POLICY_RECEIPT}/certificado"), request.certificado);
    if let Some(receipt) = request.nu_recibo {
        fields.set(format!("{POLICY_RECEIPT}/nu_recibo"), receipt);
    }
    fields
}

pub fn query_receipts(request: &QueryReceiptsRequest) -> FieldSet {
    let mut fields = FieldSet::new();
    fields
        .set(format!("{POLICY_RECEIPT}/cd_entidad"), request.cd_entidad)
        .set(format!("{POLICY_RECEIPT}/cd_area"), request.cd_area)
        .set(format!("{POLICY_RECEIPT}/poliza"), request.poliza)
        .set(format!("{POLICY_RECEIPT}/certificado"), request.certificado);
    fields
}

pub fn query_quotation(request: &QueryQuotationRequest) -> FieldSet {
    let mut fields = FieldSet::new();
    fields
        .set("/cd_entidad", request.cd_entidad)
        .set("/nu_cotizacion", request.nu_cotizacion);
    fields
}

pub fn include_annex(request: &IncludeAnnexRequest) -> Result<FieldSet> {
    validate_required_text("nm_primer_nombre", &request.nm_primer_nombre)?;
    validate_required_text("nm_primer_apellido", &request.nm_primer_apellido)?;
    let mut fields = FieldSet::new();
    fields
        .set("/cd_entidad", request.cd_entidad)
        .set("/cd_area", request.cd_area)
        .set("/nu_poliza", request.nu_poliza)
        .set("/datos_dinamicos/0/va_dato", request.nu_poliza.to_string())
        .set(
            "/datos_dinamicos/1/va_dato",
            full_name(&request.nm_primer_nombre, &request.nm_primer_apellido),
        );
    Ok(fields)
}

pub fn policy_schedule(request: &PolicyScheduleRequest) -> Result<FieldSet> {
    let mut fields = FieldSet::new();
    fields.set("/datos_poliza", serde_json::to_value(&request.datos_poliza)?);
    Ok(fields)
}

// ---- payment gateway operations ----

pub fn register_payment(request: &RegisterPaymentRequest, kind: InstrumentKind) -> Result<FieldSet> {
    let mut fields = FieldSet::new();
    fields
        .set(
            "/datos/poliza_recibo_cuota",
            json!([serde_json::to_value(&request.recibo_poliza_pago)?]),
        )
        .set("/datos/tipo_instrumento_pago", kind.as_str())
        .set("/datos/moneda_pago", serde_json::to_value(request.pago.moneda_pago)?);
    Ok(fields)
}

pub fn generate_otp(kind: InstrumentKind) -> FieldSet {
    let mut fields = FieldSet::new();
    fields.set("/datos/tipo_instrumento_pago", kind.as_str());
    fields
}

pub fn exchange_rate(request: &ExchangeRateRequest) -> Result<FieldSet> {
    let mut fields = FieldSet::new();
    fields.set("/tasa/fe_tasa", format_date("fe_tasa", &request.fe_tasa)?);
    Ok(fields)
}

pub fn notify_payment(request: &NotifyPaymentRequest) -> Result<FieldSet> {
    if request.poliza_recibo_cuota.is_empty() {
        return Err(AdapterError::validation(
            "poliza_recibo_cuota",
            "at least one receipt installment is required",
        ));
    }
    validate_required_text("nombre_pagador", &request.nombre_pagador)?;

    let mut fields = FieldSet::new();
    fields
        .set(
            "/datos/poliza_recibo_cuota",
            serde_json::to_value(&request.poliza_recibo_cuota)?,
        )
        .set("/datos/tipo_instrumento_pago", request.tipo_instrumento_pago.as_str())
        .set("/datos/nombre_pagador", request.nombre_pagador.as_str());
    Ok(fields)
}
