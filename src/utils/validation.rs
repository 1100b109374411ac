use crate::utils::error::{AdapterError, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

static DOCUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[VEPJ]-\d{5,30}$").expect("document pattern"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("date pattern"));
static IDENTITY_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[VE]$").expect("identity type pattern"));
static IDENTITY_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5,30}$").expect("identity number pattern"));
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^58(412|414|416|422|424|426)\d{7}$").expect("phone pattern")
});
static BANK_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(0102|0104|0105|0108|0114|0115|0116|0128|0134|0137|0138|0146|0151|0156|0157|0163|0166|0168|0169|0171|0172|0173|0174|0175|0177|0191)$",
    )
    .expect("bank code pattern")
});
static CARD_EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])-\d{4}$").expect("card expiry pattern"));

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AdapterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AdapterError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AdapterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(AdapterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AdapterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 未替換的 `${VAR}` 代表環境變數不存在
pub fn validate_resolved(field_name: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(AdapterError::MissingConfigError {
            field: format!("{} ({})", field_name, value),
        });
    }
    Ok(())
}

// ---- request field checks: these fail as ValidationError, never reach the network ----

fn check_pattern(field_name: &str, value: &str, re: &Regex, expected: &str) -> Result<()> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(AdapterError::validation(
            field_name,
            format!("'{}' does not match {}", value, expected),
        ))
    }
}

pub fn validate_document(field_name: &str, value: &str) -> Result<()> {
    check_pattern(field_name, value, &DOCUMENT_RE, "<V|E|P|J>-<5 to 30 digits>")
}

pub fn validate_date_text(field_name: &str, value: &str) -> Result<()> {
    check_pattern(field_name, value, &DATE_RE, "dd/mm/yyyy")
}

pub fn validate_identity_type(field_name: &str, value: &str) -> Result<()> {
    check_pattern(field_name, value, &IDENTITY_TYPE_RE, "V or E")
}

pub fn validate_identity_number(field_name: &str, value: &str) -> Result<()> {
    check_pattern(field_name, value, &IDENTITY_NUMBER_RE, "5 to 30 digits")
}

pub fn validate_phone(field_name: &str, value: &str) -> Result<()> {
    check_pattern(
        field_name,
        value,
        &PHONE_RE,
        "58 followed by a mobile operator prefix and 7 digits",
    )
}

pub fn validate_bank_code(field_name: &str, value: &str) -> Result<()> {
    check_pattern(field_name, value, &BANK_CODE_RE, "a registered bank code")
}

pub fn validate_card_expiry(field_name: &str, value: &str) -> Result<()> {
    check_pattern(field_name, value, &CARD_EXPIRY_RE, "mm-yyyy")
}

pub fn validate_required_text(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AdapterError::validation(field_name, "value is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("services.core.endpoint", "https://example.com").is_ok());
        assert!(validate_url("services.core.endpoint", "http://example.com").is_ok());
        assert!(validate_url("services.core.endpoint", "").is_err());
        assert!(validate_url("services.core.endpoint", "invalid-url").is_err());
        assert!(validate_url("services.core.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("provider.timeout_seconds", 180, 1).is_ok());
        assert!(validate_positive_number("provider.timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_document() {
        assert!(validate_document("nu_documento", "V-19909380").is_ok());
        assert!(validate_document("nu_documento", "J-123456789").is_ok());
        assert!(validate_document("nu_documento", "V19909380").is_err());
        assert!(validate_document("nu_documento", "X-19909380").is_err());
        assert!(validate_document("nu_documento", "V-1234").is_err());
    }

    #[test]
    fn test_validate_payment_fields() {
        assert!(validate_phone("nu_telefono", "584141234567").is_ok());
        assert!(validate_phone("nu_telefono", "584131234567").is_err());
        assert!(validate_bank_code("cd_banco", "0105").is_ok());
        assert!(validate_bank_code("cd_banco", "9999").is_err());
        assert!(validate_card_expiry("fe_vencimiento", "09-2027").is_ok());
        assert!(validate_card_expiry("fe_vencimiento", "13-2027").is_err());
    }

    #[test]
    fn test_unresolved_env_placeholder() {
        assert!(validate_resolved("services.core.subscription_key", "${SM_KEY}").is_err());
        assert!(validate_resolved("services.core.subscription_key", "abc123").is_ok());
    }
}
