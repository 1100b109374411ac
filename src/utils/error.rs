use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Unknown operation '{operation}'")]
    UnknownOperation { operation: String },

    #[error("Operation '{operation}' is not available in version {version}")]
    UnsupportedOperation { operation: String, version: String },

    #[error("Payload template has no slot at '{pointer}'")]
    TemplateError { pointer: String },
}

pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Network,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AdapterError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) => ErrorCategory::Network,
            Self::IoError(_) | Self::SerializationError(_) | Self::TemplateError { .. } => {
                ErrorCategory::Data
            }
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownOperation { .. }
            | Self::UnsupportedOperation { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Medium,
            ErrorCategory::Network | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(_) => "Could not reach the provider".to_string(),
            Self::IoError(e) => format!("Could not read an input file: {}", e),
            Self::SerializationError(e) => format!("Malformed JSON input: {}", e),
            Self::TemplateError { pointer } => format!("Internal payload template error at {}", pointer),
            Self::ValidationError { field, message } => {
                format!("Invalid request field '{}': {}", field, message)
            }
            Self::UnknownOperation { operation } => {
                format!("'{}' is not a known operation", operation)
            }
            Self::UnsupportedOperation { operation, version } => {
                format!("'{}' has no {} endpoint", operation, version)
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Invalid settings: {}", self),
        }
    }

    /// 不含請求值的版本，給處理付款資料的操作寫入日誌
    pub fn redacted(&self) -> String {
        match self {
            Self::ValidationError { field, .. } => {
                format!("Validation error on '{}' (value withheld)", field)
            }
            Self::SerializationError(_) => {
                "Serialization error: request does not match the expected shape".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the settings file and the environment variables it references"
            }
            ErrorCategory::Validation => "Fix the request payload and submit it again",
            ErrorCategory::Network => "Verify provider connectivity, then retry the call",
            ErrorCategory::Data => "Check that the input file exists and contains valid JSON",
        }
    }
}
