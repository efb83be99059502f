//! # dns-inventory-provider
//!
//! Remote API abstraction for multi-account DNS inventory runs.
//!
//! The crate defines one async trait per remote interface an inventory run
//! consumes, a unified [`ProviderError`], and AWS implementations of every trait:
//!
//! | Trait | AWS adapter |
//! |-------|-------------|
//! | [`CredentialExchange`] | [`StsCredentialExchange`] |
//! | [`InventoryApi`] / [`InventoryClientFactory`] | [`Route53Client`] / [`Route53ClientFactory`] |
//! | [`AccountDirectory`] | [`OrganizationsDirectory`] |
//! | [`ObjectStore`] | [`S3ObjectStore`] |
//! | [`NotificationTransport`] | [`SesTransport`], [`SnsTransport`] |
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls. Recommended for cross-compilation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dns_inventory_provider::{
//!     AssumeRoleRequest, AwsClient, CredentialExchange, InventoryApi, InventoryClientFactory,
//!     Route53ClientFactory, SessionCredentials, StsCredentialExchange,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let base = AwsClient::builder(SessionCredentials::new("AKID", "secret"))
//!         .region("us-east-1")
//!         .build()?;
//!
//!     // 1. Assume the inventory role in a member account
//!     let sts = StsCredentialExchange::new(base.clone());
//!     let creds = sts
//!         .assume_role(&AssumeRoleRequest {
//!             role_arn: "arn:aws:iam::111122223333:role/DnsInventoryRead".to_string(),
//!             session_name: "dns-inventory-111122223333".to_string(),
//!             external_id: None,
//!             duration_secs: 3600,
//!         })
//!         .await?;
//!
//!     // 2. List the first page of hosted zones with the scoped credentials
//!     let route53 = Route53ClientFactory::new(base).client_for(&creds)?;
//!     let page = route53.list_hosted_zones(None).await?;
//!     for zone in &page.zones {
//!         println!("{} ({})", zone.name, zone.id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every remote failure is a [`ProviderError`] and falls into one of three
//! classes ([`ErrorClass`]):
//!
//! - [`ProviderError::Throttled`]: HTTP 429 or a throttling error code; retry after backoff
//! - [`ProviderError::AccessDenied`] / [`ProviderError::InvalidCredentials`]: fatal for the account
//! - everything else: fatal for the account
//!
//! This crate never retries; the caller's backoff executor does.

mod error;
mod http_client;
mod providers;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{ErrorClass, ProviderError, Result};

// Re-export public traits (internal error-mapping traits are not exported)
pub use traits::{
    AccountDirectory, CredentialExchange, InventoryApi, InventoryClientFactory,
    NotificationTransport, ObjectStore,
};

// Re-export types
pub use types::{
    AccountPage, AliasTarget, AssumeRoleRequest, Attachment, DirectoryAccount, HostedZone,
    Notification, RecordCursor, RecordPage, RecordSet, SessionCredentials, ZonePage,
};

// Re-export AWS adapters
pub use providers::aws::{
    AwsClient, AwsClientBuilder, OrganizationsDirectory, Partition, Route53Client,
    Route53ClientFactory, S3ObjectStore, SesTransport, SnsTransport, StsCredentialExchange,
};

// Re-export utils module
pub use utils::log_sanitizer;
