//! 签名请求发送

use chrono::Utc;
use reqwest::Method;

use crate::error::Result;
use crate::http_client::HttpUtils;
use crate::traits::ErrorContext;

use super::AwsClient;
use super::error::AwsErrorMapper;
use super::sign::{Scope, authorization_header, canonical_query, hash_hex};

/// One request to an AWS endpoint, before signing.
pub(crate) struct AwsRequest<'a> {
    pub method: Method,
    pub host: String,
    /// Already percent-encoded path.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Extra headers to sign and send (`content-type`, `x-amz-target`, ...).
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub scope: Scope<'a>,
    /// Action name for logs.
    pub action: &'a str,
    /// S3 requires the payload hash as a header.
    pub content_sha256_header: bool,
}

impl AwsClient {
    /// Sign and send `request`; non-2xx responses are mapped through `mapper`.
    pub(crate) async fn send(
        &self,
        request: AwsRequest<'_>,
        mapper: AwsErrorMapper,
        context: ErrorContext,
    ) -> Result<String> {
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hash_hex(&request.body);

        let mut headers = request.headers;
        headers.push(("host".to_string(), request.host.clone()));
        headers.push(("x-amz-date".to_string(), amz_date.clone()));
        if request.content_sha256_header {
            headers.push(("x-amz-content-sha256".to_string(), payload_hash.clone()));
        }
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let authorization = authorization_header(
            &self.credentials,
            request.scope,
            request.method.as_str(),
            &request.path,
            &request.query,
            &headers,
            &payload_hash,
            &amz_date,
        )?;

        let url = if request.query.is_empty() {
            format!("https://{}{}", request.host, request.path)
        } else {
            format!(
                "https://{}{}?{}",
                request.host,
                request.path,
                canonical_query(&request.query)
            )
        };

        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &headers {
            // reqwest 根据 URL 自动设置 Host
            if name != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder = builder
            .header("authorization", authorization)
            .body(request.body);

        let (status, text) = HttpUtils::execute_request(
            builder,
            mapper.service,
            request.method.as_str(),
            request.action,
        )
        .await?;

        if (200..300).contains(&status) {
            return Ok(text);
        }

        let err = mapper.error_from_response(status, &text, context);
        if err.is_expected() {
            log::warn!("[{}] {} failed: {err}", mapper.service, request.action);
        } else {
            log::error!("[{}] {} failed: {err}", mapper.service, request.action);
        }
        Err(err)
    }
}
