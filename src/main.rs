use clap::Parser;
use lexiprobe::app::pipelines::plan_jobs;
use lexiprobe::app::stages;
use lexiprobe::config::cli::Command;
use lexiprobe::domain::model::{CategoryMap, PromptTemplate};
use lexiprobe::utils::error::{ErrorSeverity, ProbeError};
use lexiprobe::utils::{logger, validation::Validate};
use lexiprobe::{Cli, ProbeConfig, Result};
use std::path::Path;

#[tokio::main]
async fn main() {
    // .env 不存在時忽略
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, cli.log_json);

    tracing::info!("Starting lexiprobe CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let mut config = match ProbeConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    cli.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&cli.command, &config).await {
        Ok(()) => {
            tracing::info!("✅ lexiprobe finished successfully!");
            println!("✅ Done!");
        }
        Err(e) => exit_with(&e),
    }
}

async fn run(command: &Command, config: &ProbeConfig) -> Result<()> {
    let root = Path::new(".");
    match command {
        Command::Ask(args) if args.plan => print_plan(config),
        Command::Ask(_) => {
            let summary = stages::run_ask(config, root).await?;
            println!("📁 Ask: {} saved under {}", summary, config.ask.output_dir);
            Ok(())
        }
        Command::Combine => {
            let output_dir = stages::run_combine(config, root).await?;
            println!("📁 Combine: word lists saved to {}", output_dir);
            Ok(())
        }
        Command::Render(_) => {
            let summary = stages::run_render(config, root).await?;
            println!("📁 Render: {} written", summary);
            Ok(())
        }
        Command::All { ask, .. } if ask.plan => print_plan(config),
        Command::All { .. } => {
            let summaries = stages::run_all(config, root).await?;
            println!("📁 All stages: {}", summaries.join(", "));
            Ok(())
        }
    }
}

fn print_plan(config: &ProbeConfig) -> Result<()> {
    let categories = CategoryMap::from_file(&config.inputs.categories_path)?;
    PromptTemplate::from_file(&config.inputs.prompt_path)?;

    println!("📋 Ask plan");
    println!("  Endpoint: {}/chat/completions", config.api.base_url.trim_end_matches('/'));
    println!("  Model: {}", config.api.model);
    println!("  Temperature: {}", config.ask.temperature);
    println!("  Max tokens: {:?}", config.ask.max_tokens);
    println!("  Top p: {:?}", config.ask.top_p);
    println!("  Response format: {:?}", config.ask.response_format);
    println!("  Output dir: {}", config.ask.output_dir);
    println!("  Concurrent requests: {}", config.ask.concurrent_requests());
    println!("  Dry run: {}", config.ask.dry_run);
    println!("  Skip existing: {}", config.ask.skip_existing);

    let jobs = plan_jobs(&categories, &config.ask);
    println!("  Requests ({}):", jobs.len());
    for job in &jobs {
        println!("    - {}/{}", config.ask.output_dir.trim_end_matches('/'), job.path);
    }

    Ok(())
}

fn exit_with(e: &ProbeError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ lexiprobe failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
