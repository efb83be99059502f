use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ 凭证相关类型 ============

/// Access key material used to sign requests.
///
/// Used both for the long-lived caller identity and for the temporary
/// credentials returned by an assume-role exchange. `Debug` redacts secrets.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for temporary credentials.
    pub session_token: Option<String>,
    /// Present for temporary credentials.
    pub expiration: Option<DateTime<Utc>>,
}

impl SessionCredentials {
    /// Long-lived credentials without a session token.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    /// Attach a session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Parameters of one assume-role exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub external_id: Option<String>,
    pub duration_secs: u32,
}

// ============ 托管区域 / 记录集 ============

/// A hosted zone as returned by the inventory API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedZone {
    /// Bare zone id (without the `/hostedzone/` prefix).
    pub id: String,
    pub name: String,
    pub is_private: bool,
    /// Record count hint, when the API returns one.
    pub record_count: Option<u64>,
}

/// One page of hosted zones.
#[derive(Debug, Clone, Default)]
pub struct ZonePage {
    pub zones: Vec<HostedZone>,
    pub is_truncated: bool,
    /// Opaque marker for the next page.
    pub next_marker: Option<String>,
}

/// Compound continuation for record set listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCursor {
    pub name: String,
    pub record_type: String,
    /// Set identifier, only present for routing-policy records.
    pub identifier: Option<String>,
}

/// Alias target of an alias record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasTarget {
    pub dns_name: String,
    pub hosted_zone_id: String,
    pub evaluate_target_health: bool,
}

/// A record set as returned by the inventory API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    pub name: String,
    pub record_type: String,
    pub ttl: Option<u32>,
    /// Values in API order.
    pub values: Vec<String>,
    pub alias_target: Option<AliasTarget>,
    /// Routing policy attributes (set identifier, weight, region, ...).
    pub routing: BTreeMap<String, String>,
}

/// One page of record sets.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<RecordSet>,
    pub is_truncated: bool,
    pub next: Option<RecordCursor>,
}

// ============ 账号目录 ============

/// Account entry from the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryAccount {
    pub id: String,
    pub name: String,
    /// `ACTIVE`, `SUSPENDED`, `PENDING_CLOSURE`.
    pub status: String,
    pub email: Option<String>,
}

impl DirectoryAccount {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("ACTIVE")
    }
}

/// One page of directory accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountPage {
    pub accounts: Vec<DirectoryAccount>,
    pub next_token: Option<String>,
}

// ============ 通知 ============

/// File attached to a notification.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

/// A message handed to a notification transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl Notification {
    /// Sum of raw attachment sizes.
    pub fn attachment_bytes(&self) -> usize {
        self.attachments.iter().map(|a| a.bytes.len()).sum()
    }
}
