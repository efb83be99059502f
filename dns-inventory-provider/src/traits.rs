use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::types::{
    AccountPage, AssumeRoleRequest, Notification, RecordCursor, RecordPage, SessionCredentials,
    ZonePage,
};

/// 原始 API 错误（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// 错误码（各服务格式不同）
    pub code: Option<String>,
    /// 原始错误消息
    pub message: String,
    /// HTTP 状态码
    pub status: u16,
}

impl RawApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            status,
        }
    }

    pub fn with_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            status,
        }
    }
}

/// 错误上下文信息（内部使用）
/// 用于在映射错误时提供额外信息
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// 资源标识（zone id、bucket、topic）
    pub resource: Option<String>,
    /// 参数名（用于 `InvalidParameter`）
    pub param: Option<String>,
}

impl ErrorContext {
    pub fn resource(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            param: None,
        }
    }
}

/// 服务错误映射 Trait（内部使用）
/// 各服务实现此 trait 以将原始 API 错误映射到统一错误类型
pub(crate) trait ServiceErrorMapper {
    /// 返回服务标识符
    fn service_name(&self) -> &'static str;

    /// 将原始 API 错误映射到统一错误类型
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    /// 快捷方法：解析错误
    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            service: self.service_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// 快捷方法：未知错误（fallback）
    fn unknown_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::Unknown {
            service: self.service_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// Temporary-credential exchange (assume-role).
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Exchange the caller identity for credentials scoped to the target role.
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<SessionCredentials>;
}

/// Zone and record listing for one account.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// One page of hosted zones. `marker` is `None` on the first call.
    async fn list_hosted_zones(&self, marker: Option<&str>) -> Result<ZonePage>;

    /// One page of record sets of `zone_id`. `cursor` is `None` on the first call.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&RecordCursor>,
    ) -> Result<RecordPage>;
}

/// Builds an [`InventoryApi`] bound to a set of session credentials.
pub trait InventoryClientFactory: Send + Sync {
    fn client_for(&self, credentials: &SessionCredentials) -> Result<Arc<dyn InventoryApi>>;
}

/// Directory of delegated accounts.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// One page of accounts. `next_token` is `None` on the first call.
    async fn list_accounts(&self, next_token: Option<&str>) -> Result<AccountPage>;
}

/// External object store used for link delivery.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `key`, returning the stored key.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Time-limited retrieval URL for `key`.
    async fn presign(&self, key: &str, ttl_secs: u64) -> Result<String>;
}

/// Notification channel.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Transport identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Whether the channel can carry file attachments.
    fn supports_attachments(&self) -> bool;

    async fn deliver(&self, notification: &Notification) -> Result<()>;
}
