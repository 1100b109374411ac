use crate::domain::model::{
    AccountType, Currency, InstrumentSlots, NotifyPaymentRequest, OtpRequest, PaymentData,
};
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::{
    validate_bank_code, validate_card_expiry, validate_identity_number, validate_identity_type,
    validate_phone, validate_required_text,
};
use serde::Serialize;
use serde_json::Value;

const INSTRUMENT_KEYS: &[&str] = &["instrumento_c2p", "instrumento_tdd", "instrumento_tdc"];
const NOTICE_KEYS: &[&str] = &["notificar_estandar", "notificar_multimoneda"];

/// 已選定的互斥區段：插入 `parent` 物件底下的唯一一個 `key`，
/// 並清掉 `siblings` 中其他同組的 key
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPayload {
    parent: &'static str,
    siblings: &'static [&'static str],
    key: String,
    section: Value,
}

impl VariantPayload {
    /// 外部標記的 serde enum 序列化後只會有一個 key，即區段名稱
    fn from_tagged<V: Serialize>(
        parent: &'static str,
        siblings: &'static [&'static str],
        variant: &V,
    ) -> Result<Self> {
        match serde_json::to_value(variant)? {
            Value::Object(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((key, section)), None) => Ok(Self {
                        parent,
                        siblings,
                        key,
                        section,
                    }),
                    _ => Err(AdapterError::TemplateError {
                        pointer: parent.to_string(),
                    }),
                }
            }
            _ => Err(AdapterError::TemplateError {
                pointer: parent.to_string(),
            }),
        }
    }

    pub fn parent(&self) -> &'static str {
        self.parent
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 與 `key` 互斥、不得同時出現的 key
    pub fn siblings(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.siblings.iter().copied().filter(|k| *k != self.key)
    }

    pub fn section(&self) -> &Value {
        &self.section
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    C2p,
    Tdd,
    Tdc,
}

impl InstrumentKind {
    pub fn parse(field: &str, raw: &str) -> Result<Self> {
        match raw {
            "C2P" => Ok(Self::C2p),
            "TDD" => Ok(Self::Tdd),
            "TDC" => Ok(Self::Tdc),
            other => Err(AdapterError::validation(
                field,
                format!("unknown payment instrument '{}'", other),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C2p => "C2P",
            Self::Tdd => "TDD",
            Self::Tdc => "TDC",
        }
    }

    fn slot_name(&self) -> &'static str {
        match self {
            Self::C2p => "instrumento_c2p",
            Self::Tdd => "instrumento_tdd",
            Self::Tdc => "instrumento_tdc",
        }
    }
}

fn missing_slot(kind: InstrumentKind) -> AdapterError {
    AdapterError::validation(
        format!("instrumento_pago.{}", kind.slot_name()),
        format!(
            "tipo_instrumento_pago is {} but no {} was supplied",
            kind.as_str(),
            kind.slot_name()
        ),
    )
}

// ---- register-payment ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobilePayment {
    pub tp_identidad: String,
    pub doc_identidad: String,
    pub nu_telefono: String,
    pub cd_banco: String,
    pub otp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebitCard {
    pub numero: u64,
    pub fe_vencimiento: String,
    pub cd_verificacion: u32,
    pub nombre_tarjeta: String,
    pub tp_identidad: String,
    pub doc_identidad: String,
    pub tp_cuenta: AccountType,
    pub otp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditCard {
    pub numero: u64,
    pub fe_vencimiento: String,
    pub cd_verificacion: u32,
    pub nombre_tarjeta: String,
    pub tp_identidad: String,
    pub doc_identidad: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PaymentInstrument {
    #[serde(rename = "instrumento_c2p")]
    C2p(MobilePayment),
    #[serde(rename = "instrumento_tdd")]
    Tdd(DebitCard),
    #[serde(rename = "instrumento_tdc")]
    Tdc(CreditCard),
}

impl PaymentInstrument {
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Self::C2p(_) => InstrumentKind::C2p,
            Self::Tdd(_) => InstrumentKind::Tdd,
            Self::Tdc(_) => InstrumentKind::Tdc,
        }
    }

    pub fn to_variant(&self) -> Result<VariantPayload> {
        VariantPayload::from_tagged("/datos", INSTRUMENT_KEYS, self)
    }
}

fn check_identity(slot: &str, tp_identidad: &str, doc_identidad: &str) -> Result<()> {
    validate_identity_type(&format!("{}.tp_identidad", slot), tp_identidad)?;
    validate_identity_number(&format!("{}.doc_identidad", slot), doc_identidad)
}

fn check_card(slot: &str, fe_vencimiento: &str, nombre_tarjeta: &str) -> Result<()> {
    validate_card_expiry(&format!("{}.fe_vencimiento", slot), fe_vencimiento)?;
    validate_required_text(&format!("{}.nombre_tarjeta", slot), nombre_tarjeta)
}

/// 依 `tipo_instrumento_pago` 取出對應的槽位並驗證；其他槽位即使有資料也不會送出
pub fn select_payment_instrument(payment: &PaymentData) -> Result<PaymentInstrument> {
    let kind = InstrumentKind::parse("pago.tipo_instrumento_pago", &payment.tipo_instrumento_pago)?;
    let InstrumentSlots {
        instrumento_tdd,
        instrumento_tdc,
        instrumento_c2p,
    } = &payment.instrumento_pago;

    match kind {
        InstrumentKind::C2p => {
            let input = instrumento_c2p.as_ref().ok_or_else(|| missing_slot(kind))?;
            check_identity("instrumento_c2p", &input.tp_identidad, &input.doc_identidad)?;
            validate_phone("instrumento_c2p.nu_telefono", &input.nu_telefono)?;
            validate_bank_code("instrumento_c2p.cd_banco", &input.cd_banco)?;
            validate_required_text("instrumento_c2p.otp", &input.otp)?;
            Ok(PaymentInstrument::C2p(MobilePayment {
                tp_identidad: input.tp_identidad.clone(),
                doc_identidad: input.doc_identidad.clone(),
                nu_telefono: input.nu_telefono.clone(),
                cd_banco: input.cd_banco.clone(),
                otp: input.otp.clone(),
            }))
        }
        InstrumentKind::Tdd => {
            let input = instrumento_tdd.as_ref().ok_or_else(|| missing_slot(kind))?;
            check_identity("instrumento_tdd", &input.tp_identidad, &input.doc_identidad)?;
            check_card("instrumento_tdd", &input.fe_vencimiento, &input.nombre_tarjeta)?;
            validate_required_text("instrumento_tdd.otp", &input.otp)?;
            Ok(PaymentInstrument::Tdd(DebitCard {
                numero: input.numero,
                fe_vencimiento: input.fe_vencimiento.clone(),
                cd_verificacion: input.cd_verificacion,
                nombre_tarjeta: input.nombre_tarjeta.clone(),
                tp_identidad: input.tp_identidad.clone(),
                doc_identidad: input.doc_identidad.clone(),
                tp_cuenta: input.tp_cuenta,
                otp: input.otp.clone(),
            }))
        }
        InstrumentKind::Tdc => {
            let input = instrumento_tdc.as_ref().ok_or_else(|| missing_slot(kind))?;
            check_identity("instrumento_tdc", &input.tp_identidad, &input.doc_identidad)?;
            check_card("instrumento_tdc", &input.fe_vencimiento, &input.nombre_tarjeta)?;
            Ok(PaymentInstrument::Tdc(CreditCard {
                numero: input.numero,
                fe_vencimiento: input.fe_vencimiento.clone(),
                cd_verificacion: input.cd_verificacion,
                nombre_tarjeta: input.nombre_tarjeta.clone(),
                tp_identidad: input.tp_identidad.clone(),
                doc_identidad: input.doc_identidad.clone(),
            }))
        }
    }
}

// ---- generate-OTP ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpSubject {
    pub tp_identidad: String,
    pub doc_identidad: String,
    pub nu_telefono: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OtpInstrument {
    #[serde(rename = "instrumento_c2p")]
    C2p(OtpSubject),
    #[serde(rename = "instrumento_tdd")]
    Tdd(OtpSubject),
}

impl OtpInstrument {
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Self::C2p(_) => InstrumentKind::C2p,
            Self::Tdd(_) => InstrumentKind::Tdd,
        }
    }

    pub fn to_variant(&self) -> Result<VariantPayload> {
        VariantPayload::from_tagged("/datos", INSTRUMENT_KEYS, self)
    }
}

pub fn select_otp_instrument(request: &OtpRequest) -> Result<OtpInstrument> {
    let kind = InstrumentKind::parse("tipo_instrumento", &request.tipo_instrumento)?;
    let holder = &request.instrumento;
    check_identity("instrumento", &holder.tp_identidad, &holder.doc_identidad)?;
    validate_phone("instrumento.nu_telefono", &holder.nu_telefono)?;

    let subject = OtpSubject {
        tp_identidad: holder.tp_identidad.clone(),
        doc_identidad: holder.doc_identidad.clone(),
        nu_telefono: holder.nu_telefono.clone(),
    };
    match kind {
        InstrumentKind::C2p => Ok(OtpInstrument::C2p(subject)),
        InstrumentKind::Tdd => Ok(OtpInstrument::Tdd(subject)),
        InstrumentKind::Tdc => Err(AdapterError::validation(
            "tipo_instrumento",
            "one-time passwords are only issued for C2P or TDD, got 'TDC'",
        )),
    }
}

// ---- notify-payment ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardNotice {
    pub moneda_pago: Currency,
    pub monto_pago: String,
    pub cd_aprobacion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiCurrencyNotice {
    pub moneda_pago: Currency,
    pub monto_pago: String,
    pub cd_aprobacion: String,
    pub moneda_recibo: String,
    pub monto_recibo: String,
    pub tasa_cambio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PaymentNotification {
    #[serde(rename = "notificar_estandar")]
    Standard(StandardNotice),
    #[serde(rename = "notificar_multimoneda")]
    MultiCurrency(MultiCurrencyNotice),
}

impl PaymentNotification {
    pub fn to_variant(&self) -> Result<VariantPayload> {
        VariantPayload::from_tagged("/datos", NOTICE_KEYS, self)
    }
}

fn required_notice_field(field: &str, value: &Option<String>) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.clone()),
        _ => Err(AdapterError::validation(
            format!("notificacion_pago.{}", field),
            "required when tipo_pago is BS",
        )),
    }
}

pub fn select_notification(request: &NotifyPaymentRequest) -> Result<PaymentNotification> {
    let notice = &request.notificacion_pago;
    match request.tipo_pago.as_str() {
        "USD" => Ok(PaymentNotification::Standard(StandardNotice {
            moneda_pago: notice.moneda_pago,
            monto_pago: notice.monto_pago.clone(),
            cd_aprobacion: notice.cd_aprobacion.clone(),
        })),
        "BS" => Ok(PaymentNotification::MultiCurrency(MultiCurrencyNotice {
            moneda_pago: notice.moneda_pago,
            monto_pago: notice.monto_pago.clone(),
            cd_aprobacion: notice.cd_aprobacion.clone(),
            moneda_recibo: required_notice_field("moneda_recibo", &notice.moneda_recibo)?,
            monto_recibo: required_notice_field("monto_recibo", &notice.monto_recibo)?,
            tasa_cambio: required_notice_field("tasa_cambio", &notice.tasa_cambio)?,
        })),
        other => Err(AdapterError::validation(
            "tipo_pago",
            format!("unknown payment type '{}', expected USD or BS", other),
        )),
    }
}

// ---- beneficiaries ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    Spouse,
    Child,
    Father,
    Mother,
    Other,
}

impl Relationship {
    pub fn parse(field: &str, raw: &str) -> Result<Self> {
        match raw {
            "CONYUGUE" | "CONYUGE" => Ok(Self::Spouse),
            "HIJO" => Ok(Self::Child),
            "PADRE" => Ok(Self::Father),
            "MADRE" => Ok(Self::Mother),
            "OTROS" => Ok(Self::Other),
            other => Err(AdapterError::validation(
                field,
                format!("unknown relationship '{}'", other),
            )),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Spouse => 2,
            Self::Child => 3,
            Self::Father => 6,
            Self::Mother => 7,
            Self::Other => 13,
        }
    }

    /// 報價資料中記錄此親屬出生日期的 `cd_dato`
    pub fn birth_datum(&self) -> Option<&'static str> {
        match self {
            Self::Spouse => Some("710051"),
            Self::Father => Some("710057"),
            Self::Mother => Some("710060"),
            Self::Child | Self::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spouse => "CONYUGUE",
            Self::Child => "HIJO",
            Self::Father => "PADRE",
            Self::Mother => "MADRE",
            Self::Other => "OTROS",
        }
    }
}
