//! DNS Inventory Core Library
//!
//! Business logic of a multi-account DNS inventory run:
//! - Backoff Executor: retry under throttling with doubling delays
//! - Credential Broker: per-account assume-role sessions
//! - Paginated Enumerator: zones, records and directory accounts as lazy streams
//! - Account Crawler: bounded worker pool with per-account failure isolation
//! - Artifact builder, archiver and batcher
//! - Delivery Strategy Selector and delivery service
//!
//! Remote interfaces are reached only through the traits of `dns-inventory-provider`,
//! injected via [`ServiceContext`].

pub mod config;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use config::InventoryConfig;
pub use error::{CoreError, CoreResult};
pub use services::{InventoryService, ServiceContext};
pub use traits::{ArtifactSerializer, CsvArtifactSerializer};
pub use types::RunSummary;
