//! DNS inventory command line entry point
//!
//! Loads the TOML configuration, wires the AWS adapters into the core services,
//! runs one inventory and prints the run summary as JSON on stdout.
//!
//! Exit status: `0` when the run completed (account failures are listed in the
//! summary), `2` when it was cancelled by the deadline or Ctrl-C (the partial
//! summary is still printed), `1` for every other run-fatal error.

mod args;
mod wiring;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dns_inventory_core::{CoreError, InventoryConfig, InventoryService, RunSummary};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use args::Args;

const EXIT_CANCELLED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // 日志输出到 stderr，stdout 只留给摘要 JSON
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_directive()));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();

    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("cannot read {}", args.config.display()))?;
    let mut config = InventoryConfig::from_toml_str(&text)
        .with_context(|| format!("invalid configuration {}", args.config.display()))?;
    if let Some(secs) = args.deadline_secs {
        config.crawl.deadline_secs = Some(secs);
        config.validate()?;
    }

    let credentials = wiring::credentials_from(|name| std::env::var(name).ok())?;
    let ctx = Arc::new(wiring::build_context(&config, credentials)?);

    tracing::info!(
        "Starting DNS inventory (region {}, partition {}, {} allowed account(s){})",
        config.aws.region,
        config.aws.partition,
        config.accounts.allowed.len(),
        if args.dry_run { ", dry run" } else { "" }
    );

    let cancel = CancellationToken::new();
    let deadline = config.crawl.deadline_secs.map(Duration::from_secs);
    let watcher = wiring::spawn_cancel_watch(cancel.clone(), deadline, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    });

    let service = InventoryService::new(ctx, config).with_dry_run(args.dry_run);
    let result = service.run(cancel.clone()).await;

    // 运行结束后停止监听
    cancel.cancel();
    wiring::join_cancel_watch(watcher).await;

    match result {
        Ok(summary) => {
            print_summary(&summary)?;
            if summary.failures.is_empty() {
                tracing::info!(
                    "Run {} finished: {} account(s), {} row(s)",
                    summary.run_id,
                    summary.accounts_processed,
                    summary.rows_total
                );
            } else {
                tracing::warn!(
                    "Run {} finished with {} failed account(s)",
                    summary.run_id,
                    summary.failures.len()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(CoreError::Cancelled { reason, partial }) => {
            tracing::error!("Run cancelled: {reason}");
            if let Some(summary) = partial {
                print_summary(&summary)?;
            }
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_summary(summary: &RunSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary).context("cannot serialize run summary")?;
    println!("{json}");
    Ok(())
}
