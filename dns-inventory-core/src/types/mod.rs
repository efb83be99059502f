//! 类型定义模块

mod account;
mod artifact;
mod inventory;
mod summary;

pub use account::{Account, AccountFailure, AccountOutcome};
pub use artifact::{Artifact, Batch};
pub use inventory::{AccountInventory, Record, Row, Zone, ZoneInventory};
pub use summary::{DeliveryReport, ReportMessage, RunSummary};

// Re-export provider 库的公共类型
pub use dns_inventory_provider::{
    AliasTarget, Attachment, DirectoryAccount, HostedZone, Notification, RecordCursor, RecordSet,
    SessionCredentials,
};
