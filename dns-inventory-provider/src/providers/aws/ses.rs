//! SES v2 `SendEmail` with a raw MIME message (attachments supported)

use std::fmt::Write;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;

use crate::error::{ProviderError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, NotificationTransport};
use crate::types::Notification;

use super::AwsClient;
use super::error::{AwsErrorMapper, ErrorProtocol};
use super::http::AwsRequest;
use super::sign::Scope;
use super::types::{Destination, EmailContent, RawMessage, SendEmailRequest, SendEmailResponse};

const MAPPER: AwsErrorMapper = AwsErrorMapper::new("ses", ErrorProtocol::Json);
/// MIME base64 行宽
const MIME_LINE_WIDTH: usize = 76;

/// Email transport backed by SES v2.
#[derive(Debug, Clone)]
pub struct SesTransport {
    aws: AwsClient,
    sender: String,
    recipients: Vec<String>,
}

impl SesTransport {
    pub fn new(aws: AwsClient, sender: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            aws,
            sender: sender.into(),
            recipients,
        }
    }
}

/// Base64 wrapped at 76 columns with CRLF line endings.
fn wrapped_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MIME_LINE_WIDTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(MIME_LINE_WIDTH) {
        // base64 输出只含 ASCII
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Build a `multipart/mixed` message: one text part plus one base64 part per attachment.
pub(crate) fn build_mime(
    sender: &str,
    recipients: &[String],
    notification: &Notification,
    boundary: &str,
) -> String {
    let mut msg = String::new();
    let _ = write!(msg, "From: {sender}\r\n");
    let _ = write!(msg, "To: {}\r\n", recipients.join(", "));
    let _ = write!(msg, "Subject: {}\r\n", encode_header(&notification.subject));
    msg.push_str("MIME-Version: 1.0\r\n");
    let _ = write!(
        msg,
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    );

    let _ = write!(msg, "--{boundary}\r\n");
    msg.push_str("Content-Type: text/plain; charset=UTF-8\r\n");
    msg.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    msg.push_str(&wrapped_base64(notification.body.as_bytes()));

    for attachment in &notification.attachments {
        let name = encode_header(&attachment.name);
        let _ = write!(msg, "--{boundary}\r\n");
        let _ = write!(msg, "Content-Type: {}; name=\"{name}\"\r\n", attachment.mime);
        msg.push_str("Content-Transfer-Encoding: base64\r\n");
        let _ = write!(
            msg,
            "Content-Disposition: attachment; filename=\"{name}\"\r\n\r\n"
        );
        msg.push_str(&wrapped_base64(&attachment.bytes));
    }

    let _ = write!(msg, "--{boundary}--\r\n");
    msg
}

#[async_trait]
impl NotificationTransport for SesTransport {
    fn name(&self) -> &'static str {
        "ses"
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if self.recipients.is_empty() {
            return Err(ProviderError::InvalidParameter {
                service: MAPPER.service.to_string(),
                param: "recipients".to_string(),
                detail: "no recipients configured".to_string(),
            });
        }

        let boundary = format!("=_dns_inventory_{}", uuid::Uuid::new_v4().simple());
        let mime = build_mime(&self.sender, &self.recipients, notification, &boundary);
        let body = serde_json::to_vec(&SendEmailRequest {
            from_email_address: &self.sender,
            destination: Destination {
                to_addresses: &self.recipients,
            },
            content: EmailContent {
                raw: RawMessage {
                    data: STANDARD.encode(mime.as_bytes()),
                },
            },
        })
        .map_err(|e| ProviderError::SerializationError {
            service: MAPPER.service.to_string(),
            detail: e.to_string(),
        })?;

        let text = self
            .aws
            .send(
                AwsRequest {
                    method: Method::POST,
                    host: self.aws.regional_host("email"),
                    path: "/v2/email/outbound-emails".to_string(),
                    query: Vec::new(),
                    headers: vec![(
                        "content-type".to_string(),
                        "application/json".to_string(),
                    )],
                    body,
                    scope: Scope {
                        region: &self.aws.region,
                        service: "ses",
                    },
                    action: "SendEmail",
                    content_sha256_header: false,
                },
                MAPPER,
                ErrorContext::default(),
            )
            .await?;

        let resp: SendEmailResponse = HttpUtils::parse_json(&text, MAPPER.service)?;
        log::info!(
            "[ses] Sent '{}' to {} recipient(s), {} attachment(s), message id {:?}",
            notification.subject,
            self.recipients.len(),
            notification.attachments.len(),
            resp.message_id
        );
        Ok(())
    }
}
