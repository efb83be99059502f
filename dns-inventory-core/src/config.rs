//! 运行配置（TOML）
//!
//! 配置在启动时构建一次，经构造函数传入各服务，不使用全局状态。

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

mod defaults {
    pub fn region() -> String {
        "us-east-1".to_string()
    }

    pub fn partition() -> String {
        "aws".to_string()
    }

    pub const fn session_duration_secs() -> u32 {
        3600
    }

    pub const fn force_allowed_only() -> bool {
        true
    }

    pub const fn max_attempts() -> u32 {
        8
    }

    pub const fn base_delay_ms() -> u64 {
        1000
    }

    pub const fn max_workers() -> usize {
        4
    }

    pub const fn include_master() -> bool {
        true
    }

    pub fn subject_prefix() -> String {
        "[DNS]".to_string()
    }

    pub fn key_prefix() -> String {
        "dns-inventory/".to_string()
    }

    /// 10 MiB
    pub const fn max_size_bytes() -> u64 {
        10 * 1024 * 1024
    }

    pub const fn max_count() -> usize {
        10
    }

    /// base64 + MIME 换行
    pub const fn encoding_overhead() -> f64 {
        1.37
    }

    /// 7 天，预签名 URL 上限
    pub const fn link_ttl_secs() -> u64 {
        604_800
    }
}

/// Session duration bounds accepted by the credential exchange.
pub const SESSION_DURATION_RANGE: std::ops::RangeInclusive<u32> = 900..=43_200;
/// Presigned URL lifetime bounds.
pub const LINK_TTL_RANGE: std::ops::RangeInclusive<u64> = 1..=604_800;

/// 完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    pub aws: AwsSection,
    #[serde(default)]
    pub accounts: AccountsSection,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub crawl: CrawlSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub delivery: DeliverySection,
}

/// `[aws]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsSection {
    #[serde(default = "defaults::region")]
    pub region: String,
    /// `aws` / `aws-cn` / `aws-us-gov`
    #[serde(default = "defaults::partition")]
    pub partition: String,
    /// 成员账号中被 assume 的角色名
    pub role_name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default = "defaults::session_duration_secs")]
    pub session_duration_secs: u32,
}

impl Default for AwsSection {
    fn default() -> Self {
        Self {
            region: defaults::region(),
            partition: defaults::partition(),
            role_name: String::new(),
            external_id: None,
            session_duration_secs: defaults::session_duration_secs(),
        }
    }
}

/// `[accounts]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountsSection {
    /// 只盘点白名单账号，不回退到账号目录
    #[serde(default = "defaults::force_allowed_only")]
    pub force_allowed_only: bool,
    #[serde(default)]
    pub allowed: Vec<AllowedAccount>,
}

impl Default for AccountsSection {
    fn default() -> Self {
        Self {
            force_allowed_only: defaults::force_allowed_only(),
            allowed: Vec::new(),
        }
    }
}

/// 白名单条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowedAccount {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// `[retry]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// 总尝试次数（含第一次）
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub const fn base_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.base_delay_ms)
    }
}

/// `[crawl]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlSection {
    #[serde(default = "defaults::max_workers")]
    pub max_workers: usize,
    /// 整体截止时间，到期后取消运行
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            max_workers: defaults::max_workers(),
            deadline_secs: None,
        }
    }
}

/// 报表粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// 每个区域一个文件
    #[default]
    Zone,
    /// 每个账号一个文件
    Account,
}

/// `[report]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSection {
    #[serde(default)]
    pub granularity: Granularity,
    /// 额外生成汇总文件 `ALL.csv`
    #[serde(default = "defaults::include_master")]
    pub include_master: bool,
    #[serde(default = "defaults::subject_prefix")]
    pub subject_prefix: String,
    /// 对象存储键前缀
    #[serde(default = "defaults::key_prefix")]
    pub key_prefix: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            include_master: defaults::include_master(),
            subject_prefix: defaults::subject_prefix(),
            key_prefix: defaults::key_prefix(),
        }
    }
}

/// 投递模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Attach,
    Link,
    #[default]
    Auto,
}

/// 归档策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStrategy {
    #[default]
    None,
    /// 每个逻辑分组（账号）一个 zip
    PerGroup,
    /// 全部打进一个 zip
    All,
}

/// 通知通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Ses,
    Sns,
}

/// `[delivery]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliverySection {
    #[serde(default)]
    pub mode: DeliveryMode,
    #[serde(default)]
    pub archive_strategy: ArchiveStrategy,
    #[serde(default = "defaults::max_size_bytes")]
    pub max_size_bytes: u64,
    #[serde(default = "defaults::max_count")]
    pub max_count: usize,
    #[serde(default = "defaults::encoding_overhead")]
    pub encoding_overhead: f64,
    #[serde(default = "defaults::link_ttl_secs")]
    pub link_ttl_secs: u64,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub topic_arn: Option<String>,
    /// 链接投递使用的存储桶
    #[serde(default)]
    pub bucket: Option<String>,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            archive_strategy: ArchiveStrategy::default(),
            max_size_bytes: defaults::max_size_bytes(),
            max_count: defaults::max_count(),
            encoding_overhead: defaults::encoding_overhead(),
            link_ttl_secs: defaults::link_ttl_secs(),
            transport: TransportKind::default(),
            sender: None,
            recipients: Vec::new(),
            topic_arn: None,
            bucket: None,
        }
    }
}

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::Config(msg.into())
}

fn is_blank(value: Option<&String>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

impl InventoryConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| invalid(format!("cannot parse toml: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.aws.validate()?;
        self.accounts.validate()?;
        self.retry.validate()?;
        self.crawl.validate()?;
        self.delivery.validate()?;
        Ok(())
    }
}

impl AwsSection {
    fn validate(&self) -> CoreResult<()> {
        if self.role_name.trim().is_empty() {
            return Err(invalid("aws.role_name must not be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(invalid("aws.region must not be empty"));
        }
        if !matches!(self.partition.as_str(), "aws" | "aws-cn" | "aws-us-gov") {
            return Err(invalid(format!(
                "aws.partition '{}' is not one of aws, aws-cn, aws-us-gov",
                self.partition
            )));
        }
        if !SESSION_DURATION_RANGE.contains(&self.session_duration_secs) {
            return Err(invalid(format!(
                "aws.session_duration_secs {} is outside {}..={}",
                self.session_duration_secs,
                SESSION_DURATION_RANGE.start(),
                SESSION_DURATION_RANGE.end()
            )));
        }
        Ok(())
    }
}

impl AccountsSection {
    fn validate(&self) -> CoreResult<()> {
        for account in &self.allowed {
            if account.id.len() != 12 || !account.id.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!(
                    "accounts.allowed: '{}' is not a 12-digit account id",
                    account.id
                )));
            }
        }
        Ok(())
    }
}

impl RetryPolicy {
    fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

impl CrawlSection {
    fn validate(&self) -> CoreResult<()> {
        if self.max_workers == 0 {
            return Err(invalid("crawl.max_workers must be at least 1"));
        }
        if self.deadline_secs == Some(0) {
            return Err(invalid("crawl.deadline_secs must be positive"));
        }
        Ok(())
    }
}

impl DeliverySection {
    fn validate(&self) -> CoreResult<()> {
        if self.max_count == 0 {
            return Err(invalid("delivery.max_count must be at least 1"));
        }
        if self.max_size_bytes == 0 {
            return Err(invalid("delivery.max_size_bytes must be at least 1"));
        }
        if !self.encoding_overhead.is_finite() || self.encoding_overhead < 1.0 {
            return Err(invalid(format!(
                "delivery.encoding_overhead {} must be a finite number >= 1.0",
                self.encoding_overhead
            )));
        }
        if !LINK_TTL_RANGE.contains(&self.link_ttl_secs) {
            return Err(invalid(format!(
                "delivery.link_ttl_secs {} is outside {}..={}",
                self.link_ttl_secs,
                LINK_TTL_RANGE.start(),
                LINK_TTL_RANGE.end()
            )));
        }
        match self.transport {
            TransportKind::Ses => {
                if is_blank(self.sender.as_ref()) {
                    return Err(invalid("delivery.sender is required for the ses transport"));
                }
                if self.recipients.is_empty() {
                    return Err(invalid(
                        "delivery.recipients is required for the ses transport",
                    ));
                }
                if let Some(index) = self.recipients.iter().position(|r| r.trim().is_empty()) {
                    return Err(invalid(format!("delivery.recipients[{index}] is blank")));
                }
            }
            TransportKind::Sns => {
                if is_blank(self.topic_arn.as_ref()) {
                    return Err(invalid("delivery.topic_arn is required for the sns transport"));
                }
                if self.mode == DeliveryMode::Attach {
                    return Err(invalid(
                        "delivery.mode = attach is not possible with the sns transport",
                    ));
                }
            }
        }
        if self.mode == DeliveryMode::Link && is_blank(self.bucket.as_ref()) {
            return Err(invalid("delivery.bucket is required when delivery.mode = link"));
        }
        Ok(())
    }
}
