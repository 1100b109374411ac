use clap::Parser;
use sm_adapter::utils::error::AdapterError;
use sm_adapter::utils::{logger, validation::Validate};
use sm_adapter::{CliConfig, Outcome, Settings, SmAdapter};

fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Success { .. } => 0,
        Outcome::ValidationFailed { .. } => 2,
        Outcome::UpstreamRejected { .. } | Outcome::NotFound { .. } => 3,
        Outcome::Timeout | Outcome::TransportError { .. } => 4,
    }
}

fn fail_setup(e: &AdapterError) -> ! {
    tracing::error!(
        "❌ Setup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting sm-adapter CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        fail_setup(&e);
    }

    let settings = Settings::from_file(&config.config).unwrap_or_else(|e| fail_setup(&e));
    let adapter = SmAdapter::from_settings(settings).unwrap_or_else(|e| fail_setup(&e));
    let operation = config.operation().unwrap_or_else(|e| fail_setup(&e));
    let version = config.api_version().unwrap_or_else(|e| fail_setup(&e));

    // 請求檔讀不到或不是 JSON，視為請求驗證失敗
    let outcome = match config.read_request() {
        Ok(request) => adapter.execute(operation, version, request).await,
        Err(e) => {
            tracing::error!("❌ Could not load request: {}", e);
            Outcome::ValidationFailed {
                detail: e.user_friendly_message(),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    let code = exit_code(&outcome);
    if code > 0 {
        std::process::exit(code);
    }
    Ok(())
}
