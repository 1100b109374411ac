use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_resolved, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

/// 啟動時建立一次，之後以參考傳給 registry 與 engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub services: ServiceSettings,
    /// 覆寫個別操作的路徑，key 為 `<operation>.<version>`，例如 `"create-quotation.v2"`
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub application: String,
    pub user: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_insured_sum")]
    pub default_insured_sum: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub core: ServiceEndpoint,
    pub payment_gateway: ServiceEndpoint,
    pub subscription: ServiceEndpoint,
    pub payment_notification: ServiceEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub endpoint: String,
    pub subscription_key: String,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_timeout_seconds() -> u64 {
    180
}

fn default_insured_sum() -> u64 {
    250
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AdapterError::ConfigError {
            message: format!("Cannot read settings file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AdapterError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SM_SUBSCRIPTION_KEY})；找不到的保留原樣，由 validate 報錯
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn is_production(&self) -> bool {
        self.provider.environment == "production"
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_seconds)
    }

    pub fn path_override(&self, operation: &str, version: &str) -> Option<&str> {
        self.paths
            .get(&format!("{}.{}", operation, version))
            .map(String::as_str)
    }

    fn services(&self) -> [(&'static str, &ServiceEndpoint); 4] {
        [
            ("services.core", &self.services.core),
            ("services.payment_gateway", &self.services.payment_gateway),
            ("services.subscription", &self.services.subscription),
            (
                "services.payment_notification",
                &self.services.payment_notification,
            ),
        ]
    }

    /// 驗證設定的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("provider.application", &self.provider.application)?;
        validate_non_empty_string("provider.user", &self.provider.user)?;
        validate_resolved("provider.application", &self.provider.application)?;
        validate_resolved("provider.user", &self.provider.user)?;
        validate_positive_number("provider.timeout_seconds", self.provider.timeout_seconds, 1)?;
        validate_positive_number(
            "provider.default_insured_sum",
            self.provider.default_insured_sum,
            1,
        )?;

        for (section, service) in self.services() {
            let endpoint_field = format!("{}.endpoint", section);
            let key_field = format!("{}.subscription_key", section);
            validate_resolved(&endpoint_field, &service.endpoint)?;
            validate_url(&endpoint_field, &service.endpoint)?;
            validate_resolved(&key_field, &service.subscription_key)?;
            validate_non_empty_string(&key_field, &service.subscription_key)?;
        }

        for (key, path) in &self.paths {
            if !path.starts_with('/') {
                return Err(AdapterError::InvalidConfigValueError {
                    field: format!("paths.{}", key),
                    value: path.clone(),
                    reason: "Path must start with '/'".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn sample_toml(base_url: &str) -> String {
        format!(
            r#"
[provider]
application = "PORTAL"
user = "INTEGRADOR"

[services.core]
endpoint = "{base}/core"
subscription_key = "core-key"

[services.payment_gateway]
endpoint = "{base}/pasarela"
subscription_key = "gateway-key"

[services.subscription]
endpoint = "{base}/suscripcion"
subscription_key = "subscription-key"

[services.payment_notification]
endpoint = "{base}/notificacion"
subscription_key = "notification-key"
"#,
            base = base_url
        )
    }

    #[test]
    fn test_parse_settings_with_defaults() {
        let settings = Settings::from_toml_str(&sample_toml("https://api.example.com")).unwrap();

        assert_eq!(settings.provider.application, "PORTAL");
        assert_eq!(settings.provider.timeout_seconds, 180);
        assert_eq!(settings.provider.default_insured_sum, 250);
        assert!(!settings.is_production());
        assert_eq!(settings.services.core.endpoint, "https://api.example.com/core");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SM_ADAPTER_TEST_CORE_KEY", "secret-from-env");

        let content = sample_toml("https://api.example.com")
            .replace("\"core-key\"", "\"${SM_ADAPTER_TEST_CORE_KEY}\"");
        let settings = Settings::from_toml_str(&content).unwrap();
        assert_eq!(settings.services.core.subscription_key, "secret-from-env");

        std::env::remove_var("SM_ADAPTER_TEST_CORE_KEY");
    }

    #[test]
    fn test_unresolved_env_var_fails_validation() {
        let content = sample_toml("https://api.example.com")
            .replace("\"gateway-key\"", "\"${SM_ADAPTER_TEST_UNSET_KEY}\"");
        let settings = Settings::from_toml_str(&content).unwrap();

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, AdapterError::MissingConfigError { .. }));
        assert!(err.to_string().contains("services.payment_gateway"));
    }

    #[test]
    fn test_settings_validation() {
        let content = sample_toml("invalid-url");
        let settings = Settings::from_toml_str(&content).unwrap();
        assert!(settings.validate().is_err());

        let content = format!(
            "{}\n[paths]\n\"create-person.v1\" = \"crearpersona\"\n",
            sample_toml("https://api.example.com")
        );
        let settings = Settings::from_toml_str(&content).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content = sample_toml("https://api.example.com").replace(
            "user = \"INTEGRADOR\"",
            "user = \"INTEGRADOR\"\nenvironment = \"production\"\ntimeout_seconds = 30",
        );
        temp_file.write_all(content.as_bytes()).unwrap();

        let settings = Settings::from_file(temp_file.path()).unwrap();
        assert!(settings.is_production());
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_settings_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("adapter.toml");

        let err = Settings::from_file(&missing).unwrap_err();
        assert!(matches!(err, AdapterError::ConfigError { .. }));
        assert!(err.to_string().contains("adapter.toml"));
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Configuration);
    }
}
