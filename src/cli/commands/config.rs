//! Configuration command implementations

use super::{Context, OutputFormat};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Show the merged configuration (TOML, or JSON with --format json)
    Show,
    /// Check that the merged configuration is usable
    Validate,
}

pub fn execute(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show(ctx),
        ConfigCommands::Validate => validate(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let settings = ctx.config.settings().context("Invalid configuration")?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        OutputFormat::Text => print!("{}", toml::to_string_pretty(&settings)?),
    }

    Ok(())
}

fn validate(ctx: &Context) -> Result<()> {
    let output = &ctx.output;
    output.header("Validating Configuration");

    let settings = match ctx.config.settings() {
        Ok(settings) => settings,
        Err(e) => {
            output.error(&format!("Configuration is invalid: {}", e));
            return Err(e).context("Invalid configuration");
        }
    };

    output.success("Configuration is valid");
    output.category("Converter");
    let converter = &settings.converter;
    output.key_value("Strategy:", converter.strategy.as_str(), true);
    output.key_value("Page size:", &converter.page_size.to_string(), false);
    output.key_value("Pool size:", &converter.pool_size.to_string(), false);
    output.key_value("Threshold:", &converter.threshold.to_string(), false);
    output.key_value("Parallel:", &converter.parallel.to_string(), false);
    output.key_value("Memory budget:", &format!("{} MB", converter.max_memory_mb), false);
    output.category("Estimator");
    output.key_value("Max depth:", &settings.estimator.max_depth.to_string(), false);
    output.key_value(
        "Max class depth:",
        &settings.estimator.max_class_depth.to_string(),
        false,
    );
    output.blank_line();

    Ok(())
}
