//! AWS service adapters
//!
//! Thin SigV4-signed clients for the remote interfaces an inventory run consumes:
//!
//! | Adapter | Service | Protocol |
//! |---------|---------|----------|
//! | [`StsCredentialExchange`] | STS `AssumeRole` | query / XML |
//! | [`Route53Client`] | Route 53 `ListHostedZones`, `ListResourceRecordSets` | REST / XML |
//! | [`OrganizationsDirectory`] | Organizations `ListAccounts` | JSON 1.1 |
//! | [`S3ObjectStore`] | S3 `PutObject` + presigned GET | REST |
//! | [`SesTransport`] | SES v2 `SendEmail` (raw MIME) | REST / JSON |
//! | [`SnsTransport`] | SNS `Publish` | query / XML |

mod error;
mod http;
mod organizations;
mod route53;
mod s3;
mod ses;
mod sign;
mod sns;
mod sts;
/// AWS wire formats.
pub(crate) mod types;

use std::fmt;
use std::str::FromStr;

use reqwest::Client;

use crate::error::{ProviderError, Result};
use crate::http_client::create_http_client;
use crate::types::SessionCredentials;

pub use organizations::OrganizationsDirectory;
pub use route53::{Route53Client, Route53ClientFactory};
pub use s3::S3ObjectStore;
pub use ses::SesTransport;
pub use sns::SnsTransport;
pub use sts::StsCredentialExchange;

/// AWS partition; decides ARNs, endpoint suffixes and global-service regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partition {
    #[default]
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::AwsCn => "aws-cn",
            Self::AwsUsGov => "aws-us-gov",
        }
    }

    /// Endpoint DNS suffix.
    pub(crate) fn dns_suffix(self) -> &'static str {
        match self {
            Self::AwsCn => "amazonaws.com.cn",
            Self::Aws | Self::AwsUsGov => "amazonaws.com",
        }
    }

    /// Signing region of global services (Route 53, Organizations).
    pub(crate) fn global_region(self) -> &'static str {
        match self {
            Self::Aws => "us-east-1",
            Self::AwsCn => "cn-northwest-1",
            Self::AwsUsGov => "us-gov-west-1",
        }
    }
}

impl FromStr for Partition {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aws" => Ok(Self::Aws),
            "aws-cn" => Ok(Self::AwsCn),
            "aws-us-gov" => Ok(Self::AwsUsGov),
            other => Err(ProviderError::InvalidParameter {
                service: "aws".to_string(),
                param: "partition".to_string(),
                detail: format!("不支持的分区: {other}"),
            }),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared state of every AWS adapter: HTTP client, signing identity and region.
///
/// ```rust,no_run
/// use dns_inventory_provider::{AwsClient, Partition, SessionCredentials};
///
/// let client = AwsClient::builder(SessionCredentials::new("AKID", "secret"))
///     .region("eu-west-1")
///     .partition(Partition::Aws)
///     .build()?;
/// # Ok::<(), dns_inventory_provider::ProviderError>(())
/// ```
#[derive(Clone)]
pub struct AwsClient {
    pub(crate) client: Client,
    pub(crate) credentials: SessionCredentials,
    pub(crate) region: String,
    pub(crate) partition: Partition,
}

impl fmt::Debug for AwsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsClient")
            .field("credentials", &self.credentials)
            .field("region", &self.region)
            .field("partition", &self.partition)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AwsClient`].
pub struct AwsClientBuilder {
    credentials: SessionCredentials,
    region: String,
    partition: Partition,
}

impl AwsClientBuilder {
    fn new(credentials: SessionCredentials) -> Self {
        Self {
            credentials,
            region: "us-east-1".to_string(),
            partition: Partition::Aws,
        }
    }

    /// Regional endpoint to use (default: `us-east-1`).
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Partition (default: `aws`).
    #[must_use]
    pub fn partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    /// Build the [`AwsClient`] instance.
    pub fn build(self) -> Result<AwsClient> {
        Ok(AwsClient {
            client: create_http_client()?,
            credentials: self.credentials,
            region: self.region,
            partition: self.partition,
        })
    }
}

impl AwsClient {
    /// Returns a builder for customizing the client configuration.
    pub fn builder(credentials: SessionCredentials) -> AwsClientBuilder {
        AwsClientBuilder::new(credentials)
    }

    /// Same HTTP client and region, different signing identity.
    #[must_use]
    pub fn with_credentials(&self, credentials: SessionCredentials) -> Self {
        Self {
            client: self.client.clone(),
            credentials,
            region: self.region.clone(),
            partition: self.partition,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// `<service>.<region>.<suffix>`
    pub(crate) fn regional_host(&self, service: &str) -> String {
        format!("{service}.{}.{}", self.region, self.partition.dns_suffix())
    }
}

/// `application/x-www-form-urlencoded` body for query-protocol services.
pub(crate) fn form_encode(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
