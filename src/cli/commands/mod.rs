use crate::cli::Output;
use crate::config::RecastConfig;
use anyhow::{Context as _, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::Path;

pub mod config;
pub mod plan;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(
    name = "recast",
    version = env!("CARGO_PKG_VERSION"),
    about = "Adaptive parallel object transformation",
    long_about = "Recast converts record lists between types by name-matched property copy, \
                  switching to memory-aware parallel batches for large inputs."
)]
pub struct Cli {
    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert synthetic customer records and report what happened
    Run(run::RunArgs),
    /// Show the batch size every strategy would pick
    Plan(plan::PlanArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Show version information
    Version,
}

/// Everything a command needs besides its own arguments
pub struct Context {
    pub config: RecastConfig,
    pub output: Output,
    pub format: OutputFormat,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        setup_logging(self.verbose, self.quiet, &config);

        let ctx = Context {
            config,
            output: Output::new(self.verbose > 0, self.quiet),
            format: self.format,
        };

        match self.command {
            Some(Commands::Run(args)) => run::execute(args, &ctx),
            Some(Commands::Plan(args)) => plan::execute(args, &ctx),
            Some(Commands::Config(args)) => config::execute(args, &ctx),
            Some(Commands::Version) => version::execute(&ctx),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}

fn load_config(custom_config: Option<&str>) -> Result<RecastConfig> {
    if let Some(path) = custom_config
        && !Path::new(path).exists()
    {
        bail!("Configuration file not found: {}", path);
    }
    RecastConfig::load_with_custom_config(custom_config).context("Failed to load configuration")
}

fn setup_logging(verbose: u8, quiet: bool, config: &RecastConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            return tracing_subscriber::EnvFilter::new("error");
        }
        match verbose {
            0 => {
                let level = config
                    .settings()
                    .map(|settings| settings.logging.level)
                    .unwrap_or_else(|_| "info".to_string());
                tracing_subscriber::EnvFilter::try_new(&level)
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            }
            1 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // Logs go to stderr so stdout stays clean for --format json
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
