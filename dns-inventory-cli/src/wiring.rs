//! AWS 适配器装配

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dns_inventory_core::ServiceContext;
use dns_inventory_core::config::{InventoryConfig, TransportKind};
use dns_inventory_provider::{
    AwsClient, NotificationTransport, OrganizationsDirectory, Partition, Route53ClientFactory,
    S3ObjectStore, SesTransport, SessionCredentials, SnsTransport, StsCredentialExchange,
};
use tokio_util::sync::CancellationToken;

const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// Caller identity from the standard AWS environment variables.
pub fn credentials_from(lookup: impl Fn(&str) -> Option<String>) -> Result<SessionCredentials> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let access_key =
        non_empty(ACCESS_KEY_VAR).with_context(|| format!("{ACCESS_KEY_VAR} is not set"))?;
    let secret_key =
        non_empty(SECRET_KEY_VAR).with_context(|| format!("{SECRET_KEY_VAR} is not set"))?;

    let credentials = SessionCredentials::new(access_key, secret_key);
    Ok(match non_empty(SESSION_TOKEN_VAR) {
        Some(token) => credentials.with_session_token(token),
        None => credentials,
    })
}

/// Build the service context: STS, Route 53, the configured transport, and
/// Organizations / S3 only when the configuration can use them.
pub fn build_context(
    config: &InventoryConfig,
    credentials: SessionCredentials,
) -> Result<ServiceContext> {
    let partition = Partition::from_str(&config.aws.partition)?;
    let base = AwsClient::builder(credentials)
        .region(config.aws.region.clone())
        .partition(partition)
        .build()
        .context("failed to create HTTP client")?;

    let delivery = &config.delivery;
    let transport: Arc<dyn NotificationTransport> = match delivery.transport {
        TransportKind::Ses => {
            let sender = delivery
                .sender
                .clone()
                .context("delivery.sender is required for ses")?;
            Arc::new(SesTransport::new(
                base.clone(),
                sender,
                delivery.recipients.clone(),
            ))
        }
        TransportKind::Sns => {
            let topic_arn = delivery
                .topic_arn
                .clone()
                .context("delivery.topic_arn is required for sns")?;
            Arc::new(SnsTransport::new(base.clone(), topic_arn))
        }
    };

    let mut ctx = ServiceContext::new(
        Arc::new(StsCredentialExchange::new(base.clone())),
        Arc::new(Route53ClientFactory::new(base.clone())),
        transport,
    );

    if !config.accounts.force_allowed_only {
        ctx = ctx.with_account_directory(Arc::new(OrganizationsDirectory::new(base.clone())));
    }
    if let Some(bucket) = &delivery.bucket {
        ctx = ctx.with_object_store(Arc::new(S3ObjectStore::new(base, bucket.clone())));
    }

    Ok(ctx)
}

/// Cancel `cancel` when the deadline passes or `interrupt` resolves, whichever comes first.
pub fn spawn_cancel_watch<F>(
    cancel: CancellationToken,
    deadline: Option<Duration>,
    interrupt: F,
) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            () = cancel.cancelled() => return,
            () = expired => tracing::warn!("Run deadline reached, cancelling"),
            () = interrupt => tracing::warn!("Interrupted, cancelling"),
        }
        cancel.cancel();
    })
}

/// Wait for the watcher; a panicked or aborted watcher is logged, not propagated.
pub async fn join_cancel_watch(handle: tokio::task::JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Cancel watcher ended abnormally: {e}");
            false
        }
    }
}
