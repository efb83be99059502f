//! 投递策略选择

use serde::Serialize;

use crate::config::{ArchiveStrategy, DeliveryMode, DeliverySection};
use crate::error::{CoreError, CoreResult};

/// How the report reaches the recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStrategy {
    /// Attachments, packed into batches.
    AttachDirect,
    /// One zip per logical group, then re-evaluate.
    ArchiveByGroup,
    /// One zip for everything, then re-evaluate.
    ArchiveAll,
    /// Upload and send presigned links.
    LinkExternal,
}

impl DeliveryStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AttachDirect => "attach_direct",
            Self::ArchiveByGroup => "archive_by_group",
            Self::ArchiveAll => "archive_all",
            Self::LinkExternal => "link_external",
        }
    }
}

/// Inputs of the selection besides the artifact totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub mode: DeliveryMode,
    pub archive_strategy: ArchiveStrategy,
    pub max_size: u64,
    pub max_count: usize,
    pub store_available: bool,
    pub attachments_supported: bool,
}

impl DeliveryPolicy {
    pub fn from_config(
        delivery: &DeliverySection,
        store_available: bool,
        attachments_supported: bool,
    ) -> Self {
        Self {
            mode: delivery.mode,
            archive_strategy: delivery.archive_strategy,
            max_size: delivery.max_size_bytes,
            max_count: delivery.max_count,
            store_available,
            attachments_supported,
        }
    }

    /// Same policy with archiving switched off, for the second pass.
    #[must_use]
    pub const fn without_archiving(self) -> Self {
        Self {
            archive_strategy: ArchiveStrategy::None,
            ..self
        }
    }
}

/// Pick a strategy for `total_artifacts` artifacts of `aggregate_size` effective bytes.
///
/// Rules in order: attach when forced or when everything fits one batch;
/// archive when configured; link when a store exists; otherwise overflow.
/// Channels without attachment support skip straight to linking.
pub fn select(
    total_artifacts: usize,
    aggregate_size: u64,
    policy: &DeliveryPolicy,
) -> CoreResult<DeliveryStrategy> {
    let fits = aggregate_size <= policy.max_size && total_artifacts <= policy.max_count;

    if policy.attachments_supported {
        match policy.mode {
            DeliveryMode::Attach => return Ok(DeliveryStrategy::AttachDirect),
            DeliveryMode::Auto if fits => return Ok(DeliveryStrategy::AttachDirect),
            _ => {}
        }
        if policy.mode != DeliveryMode::Link {
            match policy.archive_strategy {
                ArchiveStrategy::PerGroup => return Ok(DeliveryStrategy::ArchiveByGroup),
                ArchiveStrategy::All => return Ok(DeliveryStrategy::ArchiveAll),
                ArchiveStrategy::None => {}
            }
        }
    }

    if policy.store_available {
        return Ok(DeliveryStrategy::LinkExternal);
    }

    Err(CoreError::DeliveryOverflow(format!(
        "{total_artifacts} artifact(s), {aggregate_size} bytes exceed the attachment limits \
         ({} bytes, {} items) and no object store is configured",
        policy.max_size, policy.max_count
    )))
}
