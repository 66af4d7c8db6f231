use clap::Parser;
use species_census::utils::error::ErrorSeverity;
use species_census::utils::{logger, validation::Validate};
use species_census::{CensusEngine, CensusPipeline, CliConfig, LocalStorage};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    let log_file = config.log_file.as_deref().map(Path::new);
    let log_guard = logger::init_cli_logger(config.verbose, log_file)?;

    tracing::info!("Starting species-census CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        log_guard.teardown()?;
        std::process::exit(1);
    }

    let storage = LocalStorage::default();
    let pipeline = CensusPipeline::new(storage, config);
    let engine = CensusEngine::new(pipeline);

    let exit_code = match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Census completed successfully!");
            println!("✅ Census completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            0
        }
        Err(e) => {
            tracing::error!(
                "❌ Census failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            }
        }
    };

    log_guard.teardown()?;
    if exit_code > 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
