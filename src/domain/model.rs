use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 日期可以是結構化日期（`1990-03-15`）或 `dd/mm/yyyy` 文字
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Date(NaiveDate),
    Text(String),
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<&str> for DateValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Mensual,
    Trimestral,
    Semestral,
    Anual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Bs,
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Cc,
    Ca,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub nu_documento: String,
}

// ---- persons ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub nu_area_telefono: String,
    pub nu_telefono: String,
    pub de_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonData {
    pub nm_primer_nombre: String,
    #[serde(default)]
    pub nm_segundo_nombre: Option<String>,
    pub nm_primer_apellido: String,
    #[serde(default)]
    pub nm_segundo_apellido: Option<String>,
    pub cd_sexo: Sex,
    pub fe_nacimiento: DateValue,
    pub documento: Document,
    pub contacto: Contact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePersonRequest {
    pub persona: PersonData,
    pub fe_registro: DateValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPersonRequest {
    pub num_documento: String,
}

// ---- quotations ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTerms {
    pub fe_desde: DateValue,
    pub fe_hasta: DateValue,
    pub frecuencia_cuota: Frequency,
    /// 未提供時使用設定檔中的預設保額
    #[serde(default)]
    pub suma_asegurada: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyHolder {
    pub nm_primer_nombre: String,
    pub nm_primer_apellido: String,
    pub documento: Document,
    pub fecha_nacimiento: DateValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationRequest {
    pub persona: PolicyHolder,
    pub poliza: PolicyTerms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuredParty {
    pub nm_primer_nombre: String,
    pub nm_primer_apellido: String,
    pub documento: Document,
    pub fecha_nacimiento: DateValue,
    pub sexo: Sex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beneficiary {
    /// CONYUGUE / HIJO / PADRE / MADRE / OTROS
    pub cd_parentesco: String,
    pub nu_documento: String,
    pub fe_nacimiento: DateValue,
    pub nm_primer_nombre: String,
    pub nm_primer_apellido: String,
    pub cd_sexo: Sex,
}

/// 全球健康險報價：主被保險人、要保人與受益人
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalQuotationRequest {
    #[serde(alias = "persona")]
    pub titular: InsuredParty,
    /// 缺省時要保人即為主被保險人
    #[serde(default)]
    pub contratante: Option<InsuredParty>,
    pub poliza: PolicyTerms,
    #[serde(default)]
    pub cantidad_hijos: u32,
    #[serde(default, alias = "tiene_conyuge")]
    pub tiene_conyugue: bool,
    #[serde(default)]
    pub tiene_padre: bool,
    #[serde(default)]
    pub tiene_madre: bool,
    #[serde(default)]
    pub beneficiarios: Vec<Beneficiary>,
}

// ---- policies ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuePolicyRequest {
    pub cd_entidad: i64,
    pub nu_cotizacion: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPolicyRequest {
    pub cd_entidad: i64,
    pub cd_area: i64,
    pub poliza: i64,
    pub certificado: i64,
    #[serde(default)]
    pub nu_recibo: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReceiptsRequest {
    pub cd_entidad: i64,
    pub cd_area: i64,
    pub poliza: i64,
    pub certificado: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryQuotationRequest {
    pub cd_entidad: i64,
    pub nu_cotizacion: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeAnnexRequest {
    pub cd_entidad: i64,
    pub cd_area: i64,
    pub nu_poliza: i64,
    pub nm_primer_nombre: String,
    pub nm_primer_apellido: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyKey {
    pub cd_entidad: i64,
    pub cd_area: i64,
    pub nu_poliza: i64,
    pub nu_certificado: i64,
    pub nu_endoso: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyScheduleRequest {
    pub datos_poliza: PolicyKey,
}

// ---- payments ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub cd_entidad: i64,
    pub cd_area: i64,
    pub nu_poliza: i64,
    pub nu_certificado: i64,
    pub cd_recibo: i64,
    pub nu_convenio_pago: i64,
    pub nu_cuota: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilePaymentInput {
    #[serde(default)]
    pub numero: Option<u64>,
    pub tp_identidad: String,
    pub doc_identidad: String,
    pub nu_telefono: String,
    pub cd_banco: String,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebitCardInput {
    pub numero: u64,
    pub fe_vencimiento: String,
    pub cd_verificacion: u32,
    pub nombre_tarjeta: String,
    pub tp_identidad: String,
    pub doc_identidad: String,
    pub tp_cuenta: AccountType,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCardInput {
    pub numero: u64,
    pub fe_vencimiento: String,
    pub cd_verificacion: u32,
    pub nombre_tarjeta: String,
    pub tp_identidad: String,
    pub doc_identidad: String,
}

/// 呼叫端送來的所有工具槽位；實際送出的只有 `tipo_instrumento_pago` 指定的那一個
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentSlots {
    #[serde(default)]
    pub instrumento_tdd: Option<DebitCardInput>,
    #[serde(default)]
    pub instrumento_tdc: Option<CreditCardInput>,
    #[serde(default)]
    pub instrumento_c2p: Option<MobilePaymentInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentData {
    pub moneda_pago: Currency,
    pub tipo_instrumento_pago: String,
    pub instrumento_pago: InstrumentSlots,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPaymentRequest {
    pub recibo_poliza_pago: PaymentReceipt,
    pub pago: PaymentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpHolder {
    pub tp_identidad: String,
    pub doc_identidad: String,
    pub nu_telefono: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRequest {
    /// C2P / TDD
    pub tipo_instrumento: String,
    pub instrumento: OtpHolder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateRequest {
    pub fe_tasa: DateValue,
}

fn default_entity() -> String {
    "1".to_string()
}

fn default_area() -> String {
    "71".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptInstallment {
    #[serde(default = "default_entity")]
    pub cd_entidad: String,
    #[serde(default = "default_area")]
    pub cd_area: String,
    pub nu_poliza: String,
    #[serde(default = "default_entity")]
    pub nu_certificado: String,
    pub cd_recibo: String,
    pub nu_convenio_pago: String,
    #[serde(default = "default_entity")]
    pub nu_cuota: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotice {
    pub moneda_pago: Currency,
    pub monto_pago: String,
    pub cd_aprobacion: String,
    #[serde(default)]
    pub moneda_recibo: Option<String>,
    #[serde(default)]
    pub monto_recibo: Option<String>,
    #[serde(default)]
    pub tasa_cambio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyPaymentRequest {
    pub poliza_recibo_cuota: Vec<ReceiptInstallment>,
    #[serde(default)]
    pub tipo_instrumento_pago: String,
    pub nombre_pagador: String,
    /// USD / BS
    pub tipo_pago: String,
    pub notificacion_pago: PaymentNotice,
}
