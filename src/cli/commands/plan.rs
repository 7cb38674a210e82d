//! Plan command implementation
//!
//! Shows the batch size every strategy would choose for a synthetic input,
//! without converting anything.

use super::{Context, OutputFormat};
use crate::cli::demo;
use crate::estimate::format_size;
use crate::parallel::ExecutionPath;
use crate::profile::{SystemMemoryProbe, SystemProfile};
use crate::strategy::{PageSizeRequest, SizeSample, SourceSample, StrategyRegistry, StrategyType};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Number of customer records to plan for
    #[arg(long, default_value_t = 10_000)]
    pub count: usize,

    /// Nominal records per batch
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Worker threads
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Memory budget for memory-aware strategies (MB)
    #[arg(long)]
    pub max_memory_mb: Option<u64>,
}

#[derive(Debug, Serialize)]
struct StrategyPlan {
    strategy: StrategyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    count: usize,
    average_size: Option<u64>,
    path: ExecutionPath,
    configured: StrategyType,
    strategies: Vec<StrategyPlan>,
}

pub fn execute(args: PlanArgs, ctx: &Context) -> Result<()> {
    let settings = ctx.config.settings().context("Invalid configuration")?;
    let converter = settings.converter;

    let page_size = args.page_size.unwrap_or(converter.page_size);
    let pool_size = args.pool_size.unwrap_or(converter.pool_size);
    let max_memory_mb = args.max_memory_mb.unwrap_or(converter.max_memory_mb);

    let customers = demo::customers(args.count, 0);
    let sample = SourceSample::new(&customers, settings.estimator.estimator())
        .with_limit(converter.sample_limit);
    let request = PageSizeRequest::new(page_size, pool_size, max_memory_mb, &sample);

    let registry = StrategyRegistry::new(Arc::new(SystemMemoryProbe::new()));
    let strategies: Vec<StrategyPlan> = registry
        .iter()
        .map(|strategy| match strategy.calculate_page_size(&request) {
            Ok(size) => StrategyPlan {
                strategy: strategy.strategy_type(),
                batch_size: Some(size),
                error: None,
            },
            Err(e) => StrategyPlan {
                strategy: strategy.strategy_type(),
                batch_size: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let report = PlanReport {
        count: args.count,
        average_size: sample.average_size(),
        path: ExecutionPath::select(converter.parallel, args.count, converter.threshold),
        configured: converter.strategy,
        strategies,
    };

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let output = &ctx.output;
    output.header("Batch Plan");
    output.key_value("Records:", &report.count.to_string(), false);
    output.key_value(
        "Average size:",
        &report
            .average_size
            .map(format_size)
            .unwrap_or_else(|| "n/a".to_string()),
        true,
    );
    output.key_value("Path:", &report.path.to_string(), false);
    output.key_value("System:", &SystemProfile::get().summary(), false);

    output.category("Strategies");
    for plan in &report.strategies {
        let marker = if plan.strategy == report.configured {
            " (configured)"
        } else {
            ""
        };
        match (&plan.batch_size, &plan.error) {
            (Some(size), _) => output.action_result(
                plan.strategy.as_str(),
                &format!("{} records per batch{}", size, marker),
                true,
            ),
            (None, error) => output.action_result(
                plan.strategy.as_str(),
                error.as_deref().unwrap_or("no result"),
                false,
            ),
        }
    }
    output.blank_line();

    Ok(())
}
