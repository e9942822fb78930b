#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use subalign::app_config::{LogLevel, ProviderKind};
use subalign::{Config, Controller};

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Ollama => ProviderKind::Ollama,
            CliProvider::OpenAI => ProviderKind::OpenAI,
            CliProvider::Anthropic => ProviderKind::Anthropic,
            CliProvider::LMStudio => ProviderKind::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align a candidate transcript to an anchor subtitle track
    Align(AlignArgs),

    /// Validate every test case in a corpus directory
    CheckCorpus {
        /// Corpus directory
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,
    },

    /// Generate shell completions for subalign
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct AlignArgs {
    /// Anchor SRT file (authoritative timing)
    #[arg(value_name = "ANCHOR")]
    anchor: PathBuf,

    /// Candidate SRT file (transcript to align)
    #[arg(value_name = "CANDIDATE")]
    candidate: PathBuf,

    /// Output SRT file; defaults to <CANDIDATE stem>.aligned.srt
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Corpus directory for few-shot examples, replay and recording
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Answer only from recorded test cases, never call a provider
    #[arg(long, requires = "corpus")]
    replay: bool,

    /// Record new oracle answers as unverified test cases
    #[arg(long, conflicts_with = "replay")]
    record: bool,

    /// Name under which new cases are recorded; defaults to the candidate file stem
    #[arg(long)]
    name: Option<String>,

    /// Oracle provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Model name to use
    #[arg(short, long)]
    model: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subalign - oracle-driven subtitle alignment
#[derive(Parser, Debug)]
#[command(name = "subalign")]
#[command(version)]
#[command(about = "Align a noisy transcript to an authoritative subtitle track")]
#[command(long_about = "subalign reconciles a candidate transcript with an anchor subtitle track,
producing one candidate line per anchor line with the anchor's timing.

EXAMPLES:
    subalign align zh.srt yue.srt                        # Align using default config
    subalign align zh.srt yue.srt -o out.srt -f          # Overwrite out.srt
    subalign align zh.srt yue.srt -p openai -m gpt-4o    # Use a specific provider and model
    subalign align zh.srt yue.srt --corpus cases --record  # Record new answers for review
    subalign align zh.srt yue.srt --corpus cases --replay  # Replay recorded answers only
    subalign check-corpus cases                          # Validate recorded test cases
    subalign completions bash > subalign.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    /// Emoji and ANSI color for a level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The level is lowered to the configured one once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subalign", &mut std::io::stdout());
            Ok(())
        }
        Commands::CheckCorpus { directory } => {
            let failures = Controller::check_corpus(&directory)?;
            if failures > 0 {
                return Err(anyhow!("{} invalid test cases", failures));
            }
            Ok(())
        }
        Commands::Align(args) => run_align(args).await,
    }
}

async fn run_align(options: AlignArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.oracle.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.oracle.active_provider_config_mut().model = model.clone();
    }
    if let Some(corpus) = &options.corpus {
        config.corpus.directory = Some(corpus.clone());
    }
    if options.replay {
        config.corpus.replay_only = true;
    }
    if options.record {
        config.corpus.record_new_cases = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    let stem = options
        .candidate
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "aligned".to_string());
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| options.candidate.with_file_name(format!("{}.aligned.srt", stem)));
    let name = options.name.clone().unwrap_or(stem);

    info!("Aligning {} to {}", options.candidate.display(), options.anchor.display());
    controller
        .run(&options.anchor, &options.candidate, &output, &name, options.force_overwrite)
        .await
}
