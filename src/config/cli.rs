use crate::config::toml_config::ProbeConfig;
use crate::domain::model::ResponseFormat;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "lexiprobe")]
#[command(about = "Probe an LLM with category values, combine the answers and render sentiment word clouds")]
pub struct Cli {
    /// Path to TOML configuration file (defaults to ./lexiprobe.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Request one completion per category value
    Ask(AskArgs),
    /// Merge per-value answer files into group word lists
    Combine,
    /// Render sentiment-colored word clouds
    Render(RenderArgs),
    /// Run ask, combine and render in order
    All {
        #[command(flatten)]
        ask: AskArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct AskArgs {
    /// Only process the first value of the first category
    #[arg(long)]
    pub dry_run: bool,

    /// Skip values whose output file already exists
    #[arg(long)]
    pub skip_existing: bool,

    /// Print the request plan without calling the API
    #[arg(long)]
    pub plan: bool,

    /// Store raw text answers (.txt) instead of JSON objects
    #[arg(long)]
    pub text: bool,

    /// Override ask.concurrent_requests
    #[arg(long)]
    pub concurrent_requests: Option<usize>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RenderArgs {
    /// Classify words missing from the lexicon with the completion API
    #[arg(long)]
    pub ai_fallback: bool,

    /// Override render.font_path
    #[arg(long)]
    pub font: Option<String>,
}

impl AskArgs {
    pub fn apply(&self, config: &mut ProbeConfig) {
        if self.dry_run {
            config.ask.dry_run = true;
            tracing::info!("🔧 Dry-run mode enabled from command line");
        }
        if self.skip_existing {
            config.ask.skip_existing = true;
        }
        if self.text {
            config.ask.response_format = ResponseFormat::Text;
        }
        if let Some(concurrent) = self.concurrent_requests {
            config.ask.concurrent_requests = Some(concurrent);
        }
    }
}

impl RenderArgs {
    pub fn apply(&self, config: &mut ProbeConfig) {
        if self.ai_fallback {
            config.render.ai_fallback = true;
        }
        if let Some(font) = &self.font {
            config.render.font_path = Some(font.clone());
        }
    }
}

impl Cli {
    /// 命令列參數覆蓋設定檔
    pub fn apply_overrides(&self, config: &mut ProbeConfig) {
        match &self.command {
            Command::Ask(args) => args.apply(config),
            Command::Render(args) => args.apply(config),
            Command::All { ask, render } => {
                ask.apply(config);
                render.apply(config);
            }
            Command::Combine => {}
        }
    }
}
