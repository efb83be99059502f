//! 业务逻辑服务层

pub mod archiver;
mod artifact_builder;
mod backoff;
mod batcher;
mod crawler;
mod credential_broker;
pub mod delivery_selector;
mod delivery_service;
pub mod enumerator;
mod inventory_service;

pub use artifact_builder::{ArtifactBuilder, MASTER_GROUP};
pub use backoff::BackoffExecutor;
pub use batcher::ArtifactBatcher;
pub use crawler::{AccountCrawler, CrawlReport};
pub use credential_broker::{CredentialBroker, Session};
pub use delivery_selector::{DeliveryPolicy, DeliveryStrategy};
pub use delivery_service::DeliveryService;
pub use enumerator::{Enumerator, Page, paginate};
pub use inventory_service::InventoryService;

use std::sync::Arc;

use dns_inventory_provider::{
    AccountDirectory, CredentialExchange, InventoryClientFactory, NotificationTransport,
    ObjectStore,
};

use crate::traits::{ArtifactSerializer, CsvArtifactSerializer};

/// 服务上下文 - 持有所有远程接口
///
/// 入口层负责创建此上下文，并注入具体的适配器实现。
#[derive(Clone)]
pub struct ServiceContext {
    /// 临时凭证交换
    pub credential_exchange: Arc<dyn CredentialExchange>,
    /// 按会话凭证创建区域/记录客户端
    pub inventory_clients: Arc<dyn InventoryClientFactory>,
    /// 账号目录（白名单为空时使用）
    pub account_directory: Option<Arc<dyn AccountDirectory>>,
    /// 对象存储（链接投递）
    pub object_store: Option<Arc<dyn ObjectStore>>,
    /// 通知通道
    pub transport: Arc<dyn NotificationTransport>,
    /// 报表序列化
    pub serializer: Arc<dyn ArtifactSerializer>,
}

impl ServiceContext {
    /// 创建服务上下文（CSV 序列化，无账号目录与对象存储）
    #[must_use]
    pub fn new(
        credential_exchange: Arc<dyn CredentialExchange>,
        inventory_clients: Arc<dyn InventoryClientFactory>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        Self {
            credential_exchange,
            inventory_clients,
            account_directory: None,
            object_store: None,
            transport,
            serializer: Arc::new(CsvArtifactSerializer),
        }
    }

    #[must_use]
    pub fn with_account_directory(mut self, directory: Arc<dyn AccountDirectory>) -> Self {
        self.account_directory = Some(directory);
        self
    }

    #[must_use]
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn ArtifactSerializer>) -> Self {
        self.serializer = serializer;
        self
    }
}
