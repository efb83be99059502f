//! 跨账号临时凭证

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dns_inventory_provider::{AssumeRoleRequest, CredentialExchange, SessionCredentials};

use crate::config::AwsSection;
use crate::error::{CoreError, CoreResult};
use crate::services::BackoffExecutor;
use crate::types::Account;

/// STS 会话名上限
const MAX_SESSION_NAME_CHARS: usize = 64;

/// Temporary credentials scoped to one account.
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: String,
    pub session_name: String,
    pub credentials: SessionCredentials,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// `AccountAccessDenied` once `now` is past the expiry.
    pub fn ensure_valid(&self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.expires_at {
            Some(expires_at) if now >= expires_at => Err(CoreError::AccountAccessDenied {
                account_id: self.account_id.clone(),
                reason: format!("session expired at {}", expires_at.to_rfc3339()),
            }),
            _ => Ok(()),
        }
    }
}

/// Exchanges the caller identity for per-account sessions. Sessions are not cached.
pub struct CredentialBroker {
    exchange: Arc<dyn CredentialExchange>,
    backoff: BackoffExecutor,
    partition: String,
    role_name: String,
    external_id: Option<String>,
    duration_secs: u32,
}

impl CredentialBroker {
    pub fn new(exchange: Arc<dyn CredentialExchange>, backoff: BackoffExecutor, aws: &AwsSection) -> Self {
        Self {
            exchange,
            backoff,
            partition: aws.partition.clone(),
            role_name: aws.role_name.clone(),
            external_id: aws.external_id.clone(),
            duration_secs: aws.session_duration_secs,
        }
    }

    pub fn role_arn(&self, account_id: &str) -> String {
        format!(
            "arn:{}:iam::{account_id}:role/{}",
            self.partition, self.role_name
        )
    }

    /// `dns-inventory-<account>-<unix millis>`, cut to the STS limit.
    pub fn session_name(account_id: &str, now: DateTime<Utc>) -> String {
        format!("dns-inventory-{account_id}-{}", now.timestamp_millis())
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || "+=,.@-_".contains(*c))
            .take(MAX_SESSION_NAME_CHARS)
            .collect()
    }

    pub async fn acquire(&self, account: &Account) -> CoreResult<Session> {
        let request = AssumeRoleRequest {
            role_arn: self.role_arn(&account.id),
            session_name: Self::session_name(&account.id, Utc::now()),
            external_id: self.external_id.clone(),
            duration_secs: self.duration_secs,
        };
        log::debug!(
            "Assuming {} as {}",
            request.role_arn,
            request.session_name
        );

        let operation = format!("assume_role({})", account.id);
        let credentials = self
            .backoff
            .execute(&operation, || self.exchange.assume_role(&request))
            .await
            .map_err(|e| match e {
                CoreError::Provider(p) if p.is_access_denied() => CoreError::AccountAccessDenied {
                    account_id: account.id.clone(),
                    reason: p.to_string(),
                },
                other => other,
            })?;

        log::info!(
            "Session {} acquired for account {} (expires {:?})",
            request.session_name,
            account.id,
            credentials.expiration
        );
        Ok(Session {
            account_id: account.id.clone(),
            session_name: request.session_name,
            expires_at: credentials.expiration,
            credentials,
        })
    }
}
