//! S3 `PutObject` and presigned GET URLs

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;

use crate::error::{ProviderError, Result};
use crate::traits::{ErrorContext, ObjectStore};
use crate::utils::log_sanitizer::redact_url;

use super::AwsClient;
use super::error::{AwsErrorMapper, ErrorProtocol};
use super::http::AwsRequest;
use super::sign::{MAX_PRESIGN_EXPIRES_SECS, Scope, encode_path, presign_url};

const MAPPER: AwsErrorMapper = AwsErrorMapper::new("s3", ErrorProtocol::Xml);

/// Object store backed by one S3 bucket (virtual-hosted style addressing).
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    aws: AwsClient,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(aws: AwsClient, bucket: impl Into<String>) -> Self {
        Self {
            aws,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn host(&self) -> String {
        format!("{}.{}", self.bucket, self.aws.regional_host("s3"))
    }

    fn object_path(key: &str) -> String {
        format!("/{}", encode_path(key.trim_start_matches('/')))
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(ProviderError::InvalidParameter {
                service: MAPPER.service.to_string(),
                param: "key".to_string(),
                detail: "object key is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        Self::validate_key(key)?;
        let size = bytes.len();
        self.aws
            .send(
                AwsRequest {
                    method: Method::PUT,
                    host: self.host(),
                    path: Self::object_path(key),
                    query: Vec::new(),
                    headers: vec![("content-type".to_string(), content_type.to_string())],
                    body: bytes,
                    scope: Scope {
                        region: &self.aws.region,
                        service: "s3",
                    },
                    action: "PutObject",
                    content_sha256_header: true,
                },
                MAPPER,
                ErrorContext::resource(format!("s3://{}/{key}", self.bucket)),
            )
            .await?;
        log::info!("[s3] Uploaded s3://{}/{key} ({size} bytes)", self.bucket);
        Ok(key.to_string())
    }

    async fn presign(&self, key: &str, ttl_secs: u64) -> Result<String> {
        Self::validate_key(key)?;
        if ttl_secs == 0 || ttl_secs > MAX_PRESIGN_EXPIRES_SECS {
            return Err(ProviderError::InvalidParameter {
                service: MAPPER.service.to_string(),
                param: "ttl_secs".to_string(),
                detail: format!("must be within 1..={MAX_PRESIGN_EXPIRES_SECS}, got {ttl_secs}"),
            });
        }
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let url = presign_url(
            &self.aws.credentials,
            Scope {
                region: &self.aws.region,
                service: "s3",
            },
            &self.host(),
            &Self::object_path(key),
            ttl_secs,
            &amz_date,
        )?;
        log::debug!("[s3] Presigned {}", redact_url(&url));
        Ok(url)
    }
}
