//! 命令行参数

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Inventory DNS zones and records across AWS accounts and deliver the report.
#[derive(Debug, Parser)]
#[command(name = "dns-inventory", version, about)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "dns-inventory.toml")]
    pub config: PathBuf,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Crawl and build the report, but do not upload or send anything
    #[arg(long)]
    pub dry_run: bool,

    /// Override `crawl.deadline_secs`
    #[arg(long, value_name = "SECS")]
    pub deadline_secs: Option<u64>,
}

impl Args {
    /// Filter directive used when `RUST_LOG` is not set.
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
