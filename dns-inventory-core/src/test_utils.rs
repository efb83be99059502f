//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dns_inventory_provider::{
    AccountDirectory, AccountPage, AssumeRoleRequest, CredentialExchange, DirectoryAccount,
    HostedZone, InventoryApi, InventoryClientFactory, Notification, NotificationTransport,
    ObjectStore, ProviderError, RecordCursor, RecordPage, RecordSet, Result, SessionCredentials,
    ZonePage,
};
use tokio::sync::RwLock;

use crate::config::{AwsSection, DeliverySection, InventoryConfig};
use crate::services::ServiceContext;
use crate::traits::CsvArtifactSerializer;

// ===== 构造辅助 =====

pub fn hosted_zone(id: &str, name: &str) -> HostedZone {
    HostedZone {
        id: id.to_string(),
        name: name.to_string(),
        is_private: false,
        record_count: None,
    }
}

pub fn record_set(name: &str, record_type: &str, values: &[&str]) -> RecordSet {
    RecordSet {
        name: name.to_string(),
        record_type: record_type.to_string(),
        ttl: Some(300),
        values: values.iter().map(ToString::to_string).collect(),
        alias_target: None,
        routing: BTreeMap::new(),
    }
}

fn account_id_of(role_arn: &str) -> String {
    role_arn.split(':').nth(4).unwrap_or_default().to_string()
}

// ===== MockCredentialExchange =====

/// 按 role ARN 中的账号 ID 发放凭证；`access_key_id` 即账号 ID
pub struct MockCredentialExchange {
    requests: RwLock<Vec<AssumeRoleRequest>>,
    failures: RwLock<HashMap<String, ProviderError>>,
    /// 账号 → 剩余限流次数
    throttles: RwLock<HashMap<String, u32>>,
}

impl MockCredentialExchange {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(Vec::new()),
            failures: RwLock::new(HashMap::new()),
            throttles: RwLock::new(HashMap::new()),
        }
    }

    pub async fn fail_for(&self, account_id: &str, error: ProviderError) {
        self.failures
            .write()
            .await
            .insert(account_id.to_string(), error);
    }

    pub async fn throttle_for(&self, account_id: &str, times: u32) {
        self.throttles
            .write()
            .await
            .insert(account_id.to_string(), times);
    }

    pub async fn requests(&self) -> Vec<AssumeRoleRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl CredentialExchange for MockCredentialExchange {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<SessionCredentials> {
        self.requests.write().await.push(request.clone());
        let account_id = account_id_of(&request.role_arn);

        if let Some(remaining) = self.throttles.write().await.get_mut(&account_id)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ProviderError::Throttled {
                service: "sts".to_string(),
                raw_code: Some("Throttling".to_string()),
                retry_after: None,
                raw_message: Some("Rate exceeded".to_string()),
            });
        }
        if let Some(error) = self.failures.read().await.get(&account_id) {
            return Err(error.clone());
        }

        let mut credentials = SessionCredentials::new(account_id, "mock-secret")
            .with_session_token("mock-token");
        credentials.expiration = Some(Utc::now() + Duration::hours(1));
        Ok(credentials)
    }
}

// ===== MockInventoryApi =====

/// 固定页大小的区域/记录列表
pub struct MockInventoryApi {
    page_size: usize,
    zones: RwLock<Vec<HostedZone>>,
    records: RwLock<HashMap<String, Vec<RecordSet>>>,
    record_error: RwLock<Option<ProviderError>>,
    calls: AtomicUsize,
}

impl MockInventoryApi {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            zones: RwLock::new(Vec::new()),
            records: RwLock::new(HashMap::new()),
            record_error: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn add_zone(&self, zone: HostedZone) {
        self.zones.write().await.push(zone);
    }

    pub async fn set_records(&self, zone_id: &str, records: Vec<RecordSet>) {
        self.records
            .write()
            .await
            .insert(zone_id.to_string(), records);
    }

    /// 之后所有 `list_record_sets` 调用都返回此错误
    pub async fn fail_records(&self, error: ProviderError) {
        *self.record_error.write().await = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn cursor_of(record: &RecordSet) -> RecordCursor {
    RecordCursor {
        name: record.name.clone(),
        record_type: record.record_type.clone(),
        identifier: record.routing.get("set_identifier").cloned(),
    }
}

#[async_trait]
impl InventoryApi for MockInventoryApi {
    async fn list_hosted_zones(&self, marker: Option<&str>) -> Result<ZonePage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let zones = self.zones.read().await;
        let start = marker.and_then(|m| m.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(zones.len());
        let is_truncated = end < zones.len();
        Ok(ZonePage {
            zones: zones[start.min(end)..end].to_vec(),
            is_truncated,
            next_marker: is_truncated.then(|| end.to_string()),
        })
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&RecordCursor>,
    ) -> Result<RecordPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.record_error.read().await.clone() {
            return Err(error);
        }
        let all = self.records.read().await;
        let records = all.get(zone_id).cloned().unwrap_or_default();
        let start = cursor
            .and_then(|c| records.iter().position(|r| &cursor_of(r) == c))
            .unwrap_or(0);
        let end = (start + self.page_size).min(records.len());
        let is_truncated = end < records.len();
        Ok(RecordPage {
            records: records[start.min(end)..end].to_vec(),
            is_truncated,
            next: records.get(end).filter(|_| is_truncated).map(cursor_of),
        })
    }
}

// ===== MockInventoryClientFactory =====

/// 按 `access_key_id`（账号 ID）选择 API
#[derive(Default)]
pub struct MockInventoryClientFactory {
    apis: HashMap<String, Arc<MockInventoryApi>>,
}

impl MockInventoryClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account(mut self, account_id: &str, api: Arc<MockInventoryApi>) -> Self {
        self.apis.insert(account_id.to_string(), api);
        self
    }
}

impl InventoryClientFactory for MockInventoryClientFactory {
    fn client_for(&self, credentials: &SessionCredentials) -> Result<Arc<dyn InventoryApi>> {
        self.apis
            .get(&credentials.access_key_id)
            .map(|api| api.clone() as Arc<dyn InventoryApi>)
            .ok_or_else(|| ProviderError::InvalidCredentials {
                service: "route53".to_string(),
                raw_message: Some(format!("unknown key {}", credentials.access_key_id)),
            })
    }
}

// ===== MockAccountDirectory =====

pub struct MockAccountDirectory {
    pages: Vec<Vec<DirectoryAccount>>,
    calls: AtomicUsize,
}

impl MockAccountDirectory {
    pub fn new(pages: Vec<Vec<DirectoryAccount>>) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountDirectory for MockAccountDirectory {
    async fn list_accounts(&self, next_token: Option<&str>) -> Result<AccountPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = next_token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let next = index + 1;
        Ok(AccountPage {
            accounts: self.pages.get(index).cloned().unwrap_or_default(),
            next_token: (next < self.pages.len()).then(|| next.to_string()),
        })
    }
}

// ===== MockObjectStore =====

pub struct MockObjectStore {
    objects: RwLock<Vec<(String, Vec<u8>, String)>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Vec::new()),
        }
    }

    /// `(key, content_type)`，按上传顺序
    pub async fn keys(&self) -> Vec<(String, String)> {
        self.objects
            .read()
            .await
            .iter()
            .map(|(k, _, t)| (k.clone(), t.clone()))
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.objects
            .write()
            .await
            .push((key.to_string(), bytes, content_type.to_string()));
        Ok(key.to_string())
    }

    async fn presign(&self, key: &str, ttl_secs: u64) -> Result<String> {
        Ok(format!("https://bucket.example/{key}?X-Amz-Expires={ttl_secs}"))
    }
}

// ===== MockTransport =====

pub struct MockTransport {
    attachments: bool,
    sent: RwLock<Vec<Notification>>,
    error: RwLock<Option<ProviderError>>,
}

impl MockTransport {
    pub fn new(attachments: bool) -> Self {
        Self {
            attachments,
            sent: RwLock::new(Vec::new()),
            error: RwLock::new(None),
        }
    }

    pub async fn set_error(&self, error: Option<ProviderError>) {
        *self.error.write().await = error;
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl NotificationTransport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn supports_attachments(&self) -> bool {
        self.attachments
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if let Some(error) = self.error.read().await.clone() {
            return Err(error);
        }
        self.sent.write().await.push(notification.clone());
        Ok(())
    }
}

// ===== 工厂方法 =====

/// 测试用配置：两个白名单账号，SES 投递
pub fn test_config() -> InventoryConfig {
    let mut config = InventoryConfig {
        aws: AwsSection {
            role_name: "DnsInventoryRead".to_string(),
            ..AwsSection::default()
        },
        delivery: DeliverySection {
            sender: Some("reports@example.com".to_string()),
            recipients: vec!["ops@example.com".to_string()],
            ..DeliverySection::default()
        },
        ..InventoryConfig::default()
    };
    config.accounts.allowed = vec![
        crate::config::AllowedAccount {
            id: "111111111111".to_string(),
            label: Some("prod".to_string()),
        },
        crate::config::AllowedAccount {
            id: "222222222222".to_string(),
            label: None,
        },
    ];
    config
}

/// Mocks behind a [`ServiceContext`].
pub struct TestMocks {
    pub exchange: Arc<MockCredentialExchange>,
    pub store: Arc<MockObjectStore>,
    pub transport: Arc<MockTransport>,
}

/// 创建测试用 `ServiceContext`（带对象存储）
pub fn create_test_context(
    factory: MockInventoryClientFactory,
    attachments: bool,
) -> (Arc<ServiceContext>, TestMocks) {
    let exchange = Arc::new(MockCredentialExchange::new());
    let store = Arc::new(MockObjectStore::new());
    let transport = Arc::new(MockTransport::new(attachments));

    let ctx = Arc::new(
        ServiceContext::new(exchange.clone(), Arc::new(factory), transport.clone())
            .with_object_store(store.clone())
            .with_serializer(Arc::new(CsvArtifactSerializer)),
    );

    (
        ctx,
        TestMocks {
            exchange,
            store,
            transport,
        },
    )
}
