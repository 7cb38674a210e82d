//! Run command implementation
//!
//! Converts synthetic customers into summaries with the configured (or
//! overridden) converter settings and reports what the transformer did.

use super::{Context, OutputFormat};
use crate::cli::demo::{self, Customer, CustomerSummary};
use crate::config::ConverterConfig;
use crate::strategy::StrategyType;
use crate::transform::{ConversionSummary, Transformer};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::time::Instant;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of customer records to convert
    #[arg(long, default_value_t = 10_000)]
    pub count: usize,

    /// Page size strategy (default, dynamic, cpu_based, memory_based, hybrid)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Nominal records per batch
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Worker threads
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Record count that activates the parallel path
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Always take the parallel path
    #[arg(long)]
    pub parallel: bool,

    /// Memory budget for memory-aware strategies (MB)
    #[arg(long)]
    pub max_memory_mb: Option<u64>,

    /// Records measured for the average size (0 = all)
    #[arg(long)]
    pub sample_limit: Option<usize>,

    /// Flag every K-th customer so its conversion fails (0 = none)
    #[arg(long, default_value_t = 0)]
    pub fail_every: usize,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded settings
    fn apply(&self, mut config: ConverterConfig) -> ConverterConfig {
        if let Some(strategy) = &self.strategy {
            config.strategy = StrategyType::from_name(strategy);
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(max_memory_mb) = self.max_memory_mb {
            config.max_memory_mb = max_memory_mb;
        }
        if let Some(sample_limit) = self.sample_limit {
            config.sample_limit = sample_limit;
        }
        config.parallel |= self.parallel;
        config
    }
}

#[derive(Debug, Serialize)]
struct RunReport {
    count: usize,
    strategy: StrategyType,
    #[serde(flatten)]
    summary: ConversionSummary,
    elapsed_ms: u128,
}

pub fn execute(args: RunArgs, ctx: &Context) -> Result<()> {
    let settings = ctx.config.settings().context("Invalid configuration")?;
    let config = args.apply(settings.converter);

    let transformer = Transformer::builder(config)
        .estimator(settings.estimator.estimator())
        .build()
        .context("Failed to create transformer")?;

    let customers = demo::customers(args.count, args.fail_every);
    tracing::debug!(count = customers.len(), "Generated customers");

    let count_tags = |customer: &Customer, summary: &mut CustomerSummary| -> Result<()> {
        summary.tag_count = customer.tags.len();
        Ok(())
    };

    let started = Instant::now();
    let report = transformer
        .convert_all_detailed(&customers, CustomerSummary::default, Some(&count_tags))
        .context("Conversion failed")?;
    let elapsed = started.elapsed();
    transformer.shutdown();

    let run = RunReport {
        count: args.count,
        strategy: transformer.strategy_type(),
        summary: report.summary(),
        elapsed_ms: elapsed.as_millis(),
    };

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    let output = &ctx.output;
    output.header("Conversion");
    output.key_value("Records:", &run.count.to_string(), false);
    output.key_value("Path:", &run.summary.path.to_string(), true);
    output.key_value("Strategy:", run.strategy.as_str(), false);
    output.key_value("Batch size:", &run.summary.batch_size.to_string(), false);
    output.key_value("Batches:", &run.summary.batches.to_string(), false);
    output.key_value("Converted:", &run.summary.converted.to_string(), true);
    output.key_value("Dropped:", &run.summary.dropped.to_string(), false);
    output.key_value("Elapsed:", &format!("{:.2?}", elapsed), false);
    output.blank_line();

    if report.is_complete() {
        output.success("All records converted");
    } else {
        output.warning(&format!(
            "{} records dropped (first at index {})",
            report.dropped(),
            run.summary.failed_indices[0]
        ));
        for failure in report.failures.iter().take(3) {
            output.verbose(&format!("#{}: {}", failure.index, failure.error));
        }
    }

    Ok(())
}
