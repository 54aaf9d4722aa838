// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use subtrans::app_config::{self, Config, TranslationProvider};
use subtrans::translation::{BatchOptions, ProgressLogger, TranslationBackend, TranslationService, translate_collection};
use subtrans::SubtitleCollection;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
    #[value(name = "deepseek")]
    DeepSeek,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::DeepSeek => TranslationProvider::DeepSeek,
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

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an SRT subtitle file
    Translate(TranslateArgs),

    /// Check that the configured translation backend is reachable
    Check(ConfigArgs),

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every command that loads the configuration
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key for hosted providers
    #[arg(long, env = "SUBTRANS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input SRT file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (default: <stem>.<target>.srt next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, env = "SUBTRANS_SOURCE_LANGUAGE")]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, env = "SUBTRANS_TARGET_LANGUAGE")]
    target_language: Option<String>,

    /// Title sent along as translation context
    #[arg(long)]
    title: Option<String>,

    /// Number of entries per batch request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of batches translated at the same time
    #[arg(long)]
    concurrency: Option<usize>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

/// subtrans - SRT subtitle translation with AI
///
/// Translates SRT subtitle files with a language model while keeping the
/// numbering, timings and inline tags of every entry.
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "AI-powered SRT subtitle translation tool")]
#[command(long_about = "subtrans translates SRT subtitle files using AI providers.

EXAMPLES:
    subtrans translate movie.srt                     # Translate using default config
    subtrans translate -f movie.srt                  # Force overwrite existing output
    subtrans translate -p deepseek movie.srt         # Use a specific provider
    subtrans translate -s en -t es movie.srt         # Translate from English to Spanish
    subtrans translate --title \"Heat\" movie.srt      # Give the model the title as context
    subtrans check                                   # Probe the configured backend
    subtrans completions bash > subtrans.bash        # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    deepseek  - DeepSeek API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
// Filtering follows `log::max_level()`, so the level can change after install
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger with a starting level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
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
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @struct: Progress sink drawing a batch progress bar on the terminal
struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressLogger for ConsoleProgress {
    fn info(&self, message: &str) {
        self.bar.suspend(|| info!("{}", message));
    }

    fn success(&self, message: &str) {
        self.bar.suspend(|| info!("✅ {}", message));
    }

    fn warning(&self, message: &str) {
        self.bar.suspend(|| warn!("{}", message));
    }

    fn error(&self, message: &str) {
        self.bar.suspend(|| error!("{}", message));
    }

    fn batch_progress(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Check(args) => run_check(args).await,
    }
}

/// Load the configuration file and apply the shared command line overrides
fn load_config(args: &ConfigArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &args.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&args.config_path)?;

    if let Some(provider) = &args.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &args.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(api_key) = &args.api_key {
        config.translation.active_provider_config_mut().api_key = api_key.clone();
    }

    if let Some(level) = &args.log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;

    if let Some(source_language) = &args.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &args.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch.batch_size = batch_size;
    }
    if let Some(concurrency) = args.concurrency {
        config.batch.concurrent_requests = concurrency;
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    if !args.input.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", args.input));
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, &config.target_language));

    if output.exists() && !args.force_overwrite {
        warn!("Output file already exists: {:?}. Use -f to force overwrite.", output);
        return Ok(());
    }

    let mut collection = SubtitleCollection::from_file(&args.input, &config.source_language)?;
    debug!("{}", collection);

    let service = TranslationService::new(&config)?;
    info!(
        "Translating {:?} from {} to {} with {} ({})",
        args.input,
        config.source_language,
        config.target_language,
        service.provider_name(),
        config.translation.get_model()
    );

    let mut options = BatchOptions::from(&config.batch);
    if let Some(title) = &args.title {
        options = options.with_context(title.clone());
    }

    let progress = ConsoleProgress::new();
    let result = translate_collection(&mut collection, &service, &options, &progress).await;
    progress.finish();
    let report = result?;

    if report.entries == 0 {
        warn!("Nothing to translate in {:?}", args.input);
        return Ok(());
    }

    collection.write_to_srt(&output)?;
    debug!("{}", service.token_usage().summary());
    info!("Success: {:?}", output);

    Ok(())
}

async fn run_check(args: ConfigArgs) -> Result<()> {
    let config = load_config(&args)?;
    config.validate().context("Configuration validation failed")?;

    let service = TranslationService::new(&config)?;
    info!("Checking {} with model {}", service.provider_name(), config.translation.get_model());

    service.check_availability().await?;
    info!("✅ {} is available", service.provider_name());

    Ok(())
}

/// `<stem>.<target>.srt` next to the input file
fn default_output_path(input: &Path, target_language: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".to_string());
    input.with_file_name(format!("{}.{}.srt", stem, target_language.to_lowercase()))
}
