// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use tokio::sync::watch;

use rubyvtt::app_config::{self, AnalyzerProvider, Config};
use rubyvtt::app_controller::Controller;
use rubyvtt::timecode::format_timecode;

/// CLI Wrapper for AnalyzerProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliAnalyzerProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliAnalyzerProvider> for AnalyzerProvider {
    fn from(cli_provider: CliAnalyzerProvider) -> Self {
        match cli_provider {
            CliAnalyzerProvider::Ollama => AnalyzerProvider::Ollama,
            CliAnalyzerProvider::OpenAI => AnalyzerProvider::OpenAI,
            CliAnalyzerProvider::Anthropic => AnalyzerProvider::Anthropic,
            CliAnalyzerProvider::LMStudio => AnalyzerProvider::LMStudio,
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
    /// Convert a subtitle file to WebVTT
    Export {
        /// Subtitle file to read
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Where to write the document (stdout when omitted)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Add ruby readings through the analyzer
        #[arg(short, long)]
        annotate: bool,
    },

    /// Store the cues of a subtitle file for a medium
    Import {
        /// Subtitle file to read
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Medium the cues belong to
        #[arg(value_name = "MEDIUM_ID")]
        medium_id: i64,

        /// Language code (config default_language when omitted)
        #[arg(value_name = "LANG")]
        lang: Option<String>,

        /// Delete the medium's existing cues in this language first
        #[arg(short, long)]
        replace: bool,
    },

    /// Annotate the stored cues of a medium and write a WebVTT document
    Annotate {
        /// Medium to annotate
        #[arg(value_name = "MEDIUM_ID")]
        medium_id: i64,

        /// Language code (config default_language when omitted)
        #[arg(value_name = "LANG")]
        lang: Option<String>,
    },

    /// Show the stored cues on screen at a point in time
    At {
        /// Medium to look up
        #[arg(value_name = "MEDIUM_ID")]
        medium_id: i64,

        /// Time in seconds
        #[arg(value_name = "SECONDS")]
        seconds: f64,

        /// Language code (config default_language when omitted)
        #[arg(value_name = "LANG")]
        lang: Option<String>,
    },

    /// Check that the configured analyzer answers
    Check,

    /// Generate shell completions for rubyvtt
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// rubyvtt - furigana for subtitles
///
/// Parses SRT-style subtitles, adds ruby readings with a language model and
/// writes WebVTT documents.
#[derive(Parser, Debug)]
#[command(name = "rubyvtt")]
#[command(version)]
#[command(about = "Subtitle cues to WebVTT with LLM-generated ruby readings")]
#[command(long_about = "rubyvtt parses subtitle files, stores their cues per medium and renders WebVTT documents whose words carry ruby readings produced by a language model.

EXAMPLES:
    rubyvtt export episode.srt                     # Plain WebVTT on stdout
    rubyvtt export -a episode.srt episode.vtt      # Annotated WebVTT file
    rubyvtt import episode.srt 42                  # Store cues for medium 42 (lang ja)
    rubyvtt import -r episode.srt 42 ja            # Replace the stored cues
    rubyvtt annotate 42                            # Write subtitles/42.ja.vtt
    rubyvtt at 42 83.5                             # Cue on screen at 83.5s
    rubyvtt completions bash > rubyvtt.bash        # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    openai    - OpenAI-compatible API (requires API key)
    ollama    - Local Ollama server
    anthropic - Anthropic API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Analyzer provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliAnalyzerProvider>,

    /// Model name to use for analysis
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key for the selected provider
    #[arg(long, env = "RUBYVTT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌",
            Level::Warn => "🚧",
            Level::Info => " ",
            Level::Debug => "🔍",
            Level::Trace => "📋",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // Trace is the ceiling; the effective level is set once the config is known
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: CommandLineOptions) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "rubyvtt", &mut std::io::stdout());
        return Ok(());
    }

    // If log level is set via command line, apply it immediately
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&cli)?;
    let controller = Controller::with_config(config)?.with_cancellation(cancel_on_ctrl_c());

    match cli.command {
        Commands::Export { input, output, annotate } => {
            controller.export(&input, output.as_deref(), annotate).await?;
        }
        Commands::Import { input, medium_id, lang, replace } => {
            let message = controller.import(&input, medium_id, lang.as_deref(), replace).await?;
            println!("{}", message);
        }
        Commands::Annotate { medium_id, lang } => {
            let summary = controller.annotate_medium(medium_id, lang.as_deref()).await?;
            info!(
                "Success: {} ({}/{} cues annotated, {} degraded)",
                summary.path.display(),
                summary.annotated,
                summary.total,
                summary.degraded
            );
            if !summary.failures.is_empty() {
                warn!("{} cue(s) could not be annotated", summary.failures.len());
            }
        }
        Commands::At { medium_id, seconds, lang } => {
            let cues = controller.cues_at(medium_id, lang.as_deref(), seconds).await?;
            if cues.is_empty() {
                warn!("No cue at {} for medium_id={}", format_timecode(seconds), medium_id);
            }
            for cue in cues {
                println!(
                    "{} --> {}\n{}\n",
                    format_timecode(cue.start_time),
                    format_timecode(cue.end_time),
                    cue.subtitle_text
                );
            }
        }
        Commands::Check => controller.test_connection().await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Load the config file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let (mut config, created) = Config::load_or_create(&cli.config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", cli.config_path);
    }

    if let Some(provider) = &cli.provider {
        config.analyzer.provider = provider.clone().into();
    }

    if let Some(model) = &cli.model {
        config.analyzer.active_provider_config_mut().model = model.clone();
    }

    if let Some(api_key) = &cli.api_key {
        config.analyzer.active_provider_config_mut().api_key = api_key.clone();
    }

    match &cli.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// A receiver that turns true on the first Ctrl-C
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping annotation");
            let _ = tx.send(true);
        }
    });
    rx
}
