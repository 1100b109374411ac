use crate::core::registry::{ApiVersion, Operation};
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::Validate;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "sm-adapter")]
#[command(about = "Send one insurance-provider operation and print the normalized outcome")]
pub struct CliConfig {
    /// 操作名稱，例如 query-person、create-quotation、register-payment
    pub operation: String,

    #[arg(long, short = 'c', default_value = "adapter.toml")]
    pub config: PathBuf,

    #[arg(long, short = 'r', help = "JSON request file; '-' reads stdin")]
    pub request: String,

    #[arg(long, default_value = "v1")]
    pub api_version: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines instead of the compact layout")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn operation(&self) -> Result<Operation> {
        self.operation.parse()
    }

    pub fn api_version(&self) -> Result<ApiVersion> {
        self.api_version.parse()
    }

    /// 讀取請求內容
    pub fn read_request(&self) -> Result<Value> {
        let content = if self.request == "-" {
            std::io::read_to_string(std::io::stdin())?
        } else {
            std::fs::read_to_string(&self.request)?
        };
        Ok(serde_json::from_str(&content)?)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        self.operation()?;
        self.api_version()?;

        if !self.config.is_file() {
            return Err(AdapterError::InvalidConfigValueError {
                field: "config".to_string(),
                value: self.config.display().to_string(),
                reason: "Settings file does not exist".to_string(),
            });
        }
        Ok(())
    }
}
