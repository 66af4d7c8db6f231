use anyhow::Context;
use clap::Parser;
use species_census::core::ConfigProvider;
use species_census::utils::error::ErrorSeverity;
use species_census::utils::{logger, validation::Validate};
use species_census::{CensusEngine, CensusPipeline, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-census")]
#[command(about = "Species census with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "census.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Recompute even when output files already exist
    #[arg(long)]
    overwrite: bool,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;

    let log_file = config.log_file();
    let log_guard = logger::init_cli_logger(args.verbose || config.verbose(), log_file.as_deref())?;

    tracing::info!("🚀 Starting TOML-based census");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 應用命令列覆蓋設定
    if args.overwrite {
        config.output.overwrite = Some(true);
        tracing::info!("🔧 Overwrite enabled from command line");
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        log_guard.teardown()?;
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        log_guard.teardown()?;
        return Ok(());
    }

    let pipeline = CensusPipeline::new(LocalStorage::default(), config);
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

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Census: {}", config.census.name);
    if let Some(description) = &config.census.description {
        println!("  Description: {}", description);
    }
    println!(
        "  Dataset A: {} ({})",
        config.dataset_a_name(),
        config.dataset_a_path()
    );
    println!(
        "  Dataset B: {} ({})",
        config.dataset_b_name(),
        config.dataset_b_path()
    );
    println!("  Output: {}", config.output_path());
    println!("  Threshold: {}", config.threshold());
    println!("  Workers: {}", config.workers());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("🔗 Cross-reference:");
    println!("  {} vs {}", config.dataset_a_path(), config.dataset_b_path());
    if config.target_classes().is_empty() {
        println!("  Classes: all");
    } else {
        println!("  Classes: {}", config.target_classes().join(", "));
    }

    println!();
    println!("📊 Composition analysis:");
    match config.composition_path() {
        Some(path) => {
            println!("  Source: {}", path);
            println!("  Dominant threshold: {:.0}%", config.threshold() * 100.0);
            let coverage: Vec<String> = config
                .coverage_thresholds()
                .iter()
                .map(|t| format!("{:.0}%", t * 100.0))
                .collect();
            println!("  Coverage points: {}", coverage.join(", "));
        }
        None => println!("  No composition file configured, stage will be skipped"),
    }

    println!();
    println!("💾 Output:");
    println!("  Path: {}", config.output_path());
    println!("  Overwrite existing: {}", config.overwrite());

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
