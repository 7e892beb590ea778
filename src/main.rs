// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use vault_translator::app_config::{self, Config};
use vault_translator::app_controller::Controller;
use vault_translator::errors::{ErrorClass, PipelineError};
use vault_translator::pipeline::ApplyMode;

/// CLI Wrapper for ApplyMode to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliApplyMode {
    Replace,
    Append,
    Parallel,
}

impl From<CliApplyMode> for ApplyMode {
    fn from(mode: CliApplyMode) -> Self {
        match mode {
            CliApplyMode::Replace => ApplyMode::Replace,
            CliApplyMode::Append => ApplyMode::Append,
            CliApplyMode::Parallel => ApplyMode::Parallel,
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

#[derive(clap::Args, Debug)]
struct TranslateOptions {
    /// Target language (e.g. 'French', 'fr'); config default when omitted
    #[arg(short, long)]
    target_language: Option<String>,

    /// How the translation is written back
    #[arg(short, long, value_enum, default_value = "replace")]
    mode: CliApplyMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate one note
    Translate {
        /// Note address (obsidian://open?vault=...&file=...)
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        options: TranslateOptions,
    },

    /// Translate several notes, a few at a time
    Batch {
        /// Note addresses
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        options: TranslateOptions,
    },

    /// Translate every note below a vault directory
    Folder {
        /// Directory relative to the vault root
        #[arg(value_name = "DIR", default_value = "")]
        directory: String,

        #[command(flatten)]
        options: TranslateOptions,
    },

    /// Delete expired backups in a vault directory
    Prune {
        /// Directory relative to the vault root
        #[arg(value_name = "DIR", default_value = "")]
        directory: String,

        /// Retention in days; config value when omitted
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// List notes containing a term
    Search {
        /// Case-insensitive search term; empty lists every note
        #[arg(value_name = "TERM")]
        term: String,

        /// Directory relative to the vault root
        #[arg(short, long, default_value = "")]
        directory: String,
    },

    /// Check that the configured provider accepts requests
    Check,

    /// Generate shell completions for vault-translator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// vault-translator - translate Obsidian notes with AI
///
/// Translates the body of Markdown notes while keeping front matter, code and
/// link structure intact. Every rewritten note is backed up first.
#[derive(Parser, Debug)]
#[command(name = "vault-translator")]
#[command(version)]
#[command(about = "AI-powered Obsidian note translation")]
#[command(long_about = "vault-translator translates notes inside an Obsidian vault using the Anthropic API.

EXAMPLES:
    vault-translator translate 'obsidian://open?vault=Main&file=notes/a.md' -t French
    vault-translator translate 'obsidian://open?vault=Main&file=a.md' -t de -m parallel
    vault-translator batch URL1 URL2 URL3 -t Spanish -m append
    vault-translator folder journal -t Japanese -m parallel
    vault-translator prune notes --days 7
    vault-translator search 'todo' -d projects
    vault-translator check
    vault-translator completions bash > vault-translator.bash

CONFIGURATION:
    Settings are read from conf.json when it exists, then overridden by the
    environment: OBSIDIAN_VAULT_PATH, OBSIDIAN_VAULT_NAME, ANTHROPIC_API_KEY,
    ANTHROPIC_MODEL and BACKUP_RETENTION_DAYS.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

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
        // Accept everything here; `set_max_level` does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Colour code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
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
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Process exit code for a failed command
fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<PipelineError>().map(PipelineError::class) {
        Some(ErrorClass::InvalidInput) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let cli = CommandLineOptions::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            exit_code_for(&e)
        }
    }
}

fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load(&cli.config_path)?
        .apply_env()
        .context("Invalid environment override")?;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run(cli: CommandLineOptions) -> Result<ExitCode> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "vault-translator", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    let controller = Controller::with_config(&config);

    match cli.command {
        Commands::Translate { url, options } => {
            controller
                .translate(&url, options.target_language.as_deref(), options.mode.into())
                .await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Batch { urls, options } => {
            let summary = controller
                .translate_batch(&urls, options.target_language.as_deref(), options.mode.into())
                .await;
            Ok(if summary.failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Folder { directory, options } => {
            let summary = controller
                .translate_folder(&directory, options.target_language.as_deref(), options.mode.into())
                .await?;
            Ok(if summary.failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Prune { directory, days } => {
            controller
                .prune(&directory, days.unwrap_or(config.backup_retention_days))
                .await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Search { term, directory } => {
            controller.search(&term, &directory).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            controller.check().await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}
