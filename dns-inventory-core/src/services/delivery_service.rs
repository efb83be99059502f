//! 报表投递服务

use std::fmt::Write;
use std::sync::Arc;

use dns_inventory_provider::{Notification, log_sanitizer};

use crate::config::InventoryConfig;
use crate::error::{CoreError, CoreResult};
use crate::services::archiver::{archive_all, archive_per_group};
use crate::services::delivery_selector::{DeliveryPolicy, DeliveryStrategy, select};
use crate::services::{ArtifactBatcher, BackoffExecutor, ServiceContext};
use crate::types::{Artifact, DeliveryReport, ReportMessage};

/// 报表投递服务
pub struct DeliveryService {
    ctx: Arc<ServiceContext>,
    config: Arc<InventoryConfig>,
    backoff: BackoffExecutor,
}

impl DeliveryService {
    #[must_use]
    pub fn new(
        ctx: Arc<ServiceContext>,
        config: Arc<InventoryConfig>,
        backoff: BackoffExecutor,
    ) -> Self {
        Self {
            ctx,
            config,
            backoff,
        }
    }

    fn policy(&self) -> DeliveryPolicy {
        DeliveryPolicy::from_config(
            &self.config.delivery,
            self.ctx.object_store.is_some(),
            self.ctx.transport.supports_attachments(),
        )
    }

    /// First-pass strategy for `artifacts`, without sending anything.
    pub fn plan(&self, artifacts: &[Artifact]) -> CoreResult<DeliveryStrategy> {
        let batcher = ArtifactBatcher::from_config(&self.config.delivery)?;
        select(
            artifacts.len(),
            batcher.aggregate_size(artifacts),
            &self.policy(),
        )
    }

    /// Send the report: attach, archive then re-plan, or link.
    pub async fn deliver(
        &self,
        artifacts: Vec<Artifact>,
        message: &ReportMessage,
        date: &str,
    ) -> CoreResult<DeliveryReport> {
        let batcher = ArtifactBatcher::from_config(&self.config.delivery)?;

        if artifacts.is_empty() {
            self.send(message.subject.clone(), message.body.clone(), Vec::new(), 1, 1)
                .await?;
            return Ok(DeliveryReport {
                strategy: DeliveryStrategy::AttachDirect.as_str().to_string(),
                archived: false,
                notifications_sent: 1,
                artifacts_delivered: 0,
                object_keys: Vec::new(),
            });
        }

        let policy = self.policy();
        let mut strategy = select(
            artifacts.len(),
            batcher.aggregate_size(&artifacts),
            &policy,
        )?;
        log::info!(
            "Delivery plan: {} for {} artifact(s)",
            strategy.as_str(),
            artifacts.len()
        );

        let mut archived = false;
        let artifacts = match strategy {
            DeliveryStrategy::ArchiveByGroup | DeliveryStrategy::ArchiveAll => {
                let archives = if strategy == DeliveryStrategy::ArchiveByGroup {
                    archive_per_group(&artifacts, date)?
                } else {
                    archive_all(&artifacts, date)?
                };
                archived = true;
                strategy = select(
                    archives.len(),
                    batcher.aggregate_size(&archives),
                    &policy.without_archiving(),
                )?;
                log::info!(
                    "Archived into {} file(s), delivering via {}",
                    archives.len(),
                    strategy.as_str()
                );
                archives
            }
            _ => artifacts,
        };

        let mut report = match strategy {
            DeliveryStrategy::AttachDirect => {
                self.send_attachments(&batcher, artifacts, message).await?
            }
            DeliveryStrategy::LinkExternal => self.send_links(artifacts, message, date).await?,
            other => {
                return Err(CoreError::Delivery(format!(
                    "strategy {} selected after archiving",
                    other.as_str()
                )));
            }
        };
        report.archived = archived;
        Ok(report)
    }

    async fn send_attachments(
        &self,
        batcher: &ArtifactBatcher,
        artifacts: Vec<Artifact>,
        message: &ReportMessage,
    ) -> CoreResult<DeliveryReport> {
        let delivered = artifacts.len();
        let batches = batcher.pack(artifacts)?;
        let total = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            let attachments = batch.artifacts.iter().map(Artifact::to_attachment).collect();
            self.send(
                message.part_subject(index + 1, total),
                message.body.clone(),
                attachments,
                index + 1,
                total,
            )
            .await?;
        }

        Ok(DeliveryReport {
            strategy: DeliveryStrategy::AttachDirect.as_str().to_string(),
            archived: false,
            notifications_sent: total,
            artifacts_delivered: delivered,
            object_keys: Vec::new(),
        })
    }

    async fn send_links(
        &self,
        artifacts: Vec<Artifact>,
        message: &ReportMessage,
        date: &str,
    ) -> CoreResult<DeliveryReport> {
        let store = self.ctx.object_store.as_ref().ok_or_else(|| {
            CoreError::DeliveryOverflow("link delivery needs an object store".to_string())
        })?;
        let ttl = self.config.delivery.link_ttl_secs;

        let mut keys = Vec::with_capacity(artifacts.len());
        let mut links = String::new();
        for artifact in &artifacts {
            let key = format!("{}{date}/{}", self.config.report.key_prefix, artifact.identifier);
            let stored = self
                .backoff
                .execute(&format!("put({key})"), || {
                    store.put(&key, artifact.payload.clone(), &artifact.mime_type)
                })
                .await
                .map_err(|e| upload_error(&key, e))?;
            let url = self
                .backoff
                .execute(&format!("presign({stored})"), || store.presign(&stored, ttl))
                .await
                .map_err(|e| upload_error(&stored, e))?;
            log::debug!("Uploaded {stored}: {}", log_sanitizer::redact_url(&url));

            let _ = write!(links, "\n- {}\n  <{url}>", artifact.identifier);
            keys.push(stored);
        }

        let body = format!(
            "{}\n\nDownload links (valid for {}):{links}\n",
            message.body.trim_end(),
            describe_ttl(ttl)
        );
        self.send(message.subject.clone(), body, Vec::new(), 1, 1)
            .await?;

        Ok(DeliveryReport {
            strategy: DeliveryStrategy::LinkExternal.as_str().to_string(),
            archived: false,
            notifications_sent: 1,
            artifacts_delivered: artifacts.len(),
            object_keys: keys,
        })
    }

    async fn send(
        &self,
        subject: String,
        body: String,
        attachments: Vec<dns_inventory_provider::Attachment>,
        part: usize,
        total: usize,
    ) -> CoreResult<()> {
        let transport = &self.ctx.transport;
        let notification = Notification {
            subject,
            body,
            attachments,
        };
        self.backoff
            .execute(&format!("deliver({})", transport.name()), || {
                transport.deliver(&notification)
            })
            .await
            .map_err(|e| match e {
                CoreError::Cancelled { .. } => e,
                other => CoreError::Delivery(format!(
                    "{} part {part}/{total} ({} attachment bytes): {other}",
                    transport.name(),
                    notification.attachment_bytes()
                )),
            })?;
        log::info!(
            "Delivered part {part}/{total} via {} ({} attachment(s))",
            transport.name(),
            notification.attachments.len()
        );
        Ok(())
    }
}

fn upload_error(key: &str, error: CoreError) -> CoreError {
    match error {
        CoreError::Cancelled { .. } => error,
        other => CoreError::Delivery(format!("upload of {key} failed: {other}")),
    }
}

fn describe_ttl(secs: u64) -> String {
    const DAY: u64 = 86_400;
    const HOUR: u64 = 3_600;
    match secs {
        s if s >= DAY && s % DAY == 0 => format!("{} day(s)", s / DAY),
        s if s >= HOUR && s % HOUR == 0 => format!("{} hour(s)", s / HOUR),
        s => format!("{s} second(s)"),
    }
}
