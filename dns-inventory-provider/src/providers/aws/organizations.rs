//! Organizations `ListAccounts` (JSON 1.1)

use async_trait::async_trait;
use reqwest::Method;

use crate::error::{ProviderError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{AccountDirectory, ErrorContext};
use crate::types::{AccountPage, DirectoryAccount};

use super::error::{AwsErrorMapper, ErrorProtocol};
use super::http::AwsRequest;
use super::sign::Scope;
use super::types::{ListAccountsRequest, ListAccountsResponse};
use super::AwsClient;

const MAPPER: AwsErrorMapper = AwsErrorMapper::new("organizations", ErrorProtocol::Json);
const TARGET: &str = "AWSOrganizationsV20161128.ListAccounts";
const MAX_RESULTS: u32 = 20;

/// Account directory backed by AWS Organizations (management account credentials).
#[derive(Debug, Clone)]
pub struct OrganizationsDirectory {
    aws: AwsClient,
}

impl OrganizationsDirectory {
    pub fn new(aws: AwsClient) -> Self {
        Self { aws }
    }

    fn host(&self) -> String {
        let partition = self.aws.partition;
        format!(
            "organizations.{}.{}",
            partition.global_region(),
            partition.dns_suffix()
        )
    }
}

fn convert_page(resp: ListAccountsResponse) -> AccountPage {
    AccountPage {
        accounts: resp
            .accounts
            .into_iter()
            .map(|a| DirectoryAccount {
                id: a.id,
                name: a.name,
                status: a.status,
                email: a.email,
            })
            .collect(),
        next_token: resp.next_token.filter(|t| !t.is_empty()),
    }
}

#[async_trait]
impl AccountDirectory for OrganizationsDirectory {
    async fn list_accounts(&self, next_token: Option<&str>) -> Result<AccountPage> {
        let body = serde_json::to_vec(&ListAccountsRequest {
            next_token,
            max_results: MAX_RESULTS,
        })
        .map_err(|e| ProviderError::SerializationError {
            service: MAPPER.service.to_string(),
            detail: e.to_string(),
        })?;

        let region = self.aws.partition.global_region();
        let text = self
            .aws
            .send(
                AwsRequest {
                    method: Method::POST,
                    host: self.host(),
                    path: "/".to_string(),
                    query: Vec::new(),
                    headers: vec![
                        (
                            "content-type".to_string(),
                            "application/x-amz-json-1.1".to_string(),
                        ),
                        ("x-amz-target".to_string(), TARGET.to_string()),
                    ],
                    body,
                    scope: Scope {
                        region,
                        service: "organizations",
                    },
                    action: "ListAccounts",
                    content_sha256_header: false,
                },
                MAPPER,
                ErrorContext::default(),
            )
            .await?;

        let resp: ListAccountsResponse = HttpUtils::parse_json(&text, MAPPER.service)?;
        Ok(convert_page(resp))
    }
}
