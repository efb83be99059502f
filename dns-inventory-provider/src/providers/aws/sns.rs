//! SNS `Publish` (text only)

use async_trait::async_trait;
use reqwest::Method;

use crate::error::{ProviderError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, NotificationTransport};
use crate::types::Notification;

use super::error::{AwsErrorMapper, ErrorProtocol};
use super::http::AwsRequest;
use super::sign::Scope;
use super::types::PublishResponse;
use super::{AwsClient, form_encode};

const MAPPER: AwsErrorMapper = AwsErrorMapper::new("sns", ErrorProtocol::Xml);
const API_VERSION: &str = "2010-03-31";
/// SNS 邮件主题最长 100 字符
pub(crate) const MAX_SUBJECT_CHARS: usize = 100;

/// Notification transport publishing to an SNS topic.
#[derive(Debug, Clone)]
pub struct SnsTransport {
    aws: AwsClient,
    topic_arn: String,
}

impl SnsTransport {
    pub fn new(aws: AwsClient, topic_arn: impl Into<String>) -> Self {
        Self {
            aws,
            topic_arn: topic_arn.into(),
        }
    }
}

/// SNS subjects must be ASCII-printable, single-line and at most 100 chars.
fn sanitize_subject(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .take(MAX_SUBJECT_CHARS)
        .collect()
}

#[async_trait]
impl NotificationTransport for SnsTransport {
    fn name(&self) -> &'static str {
        "sns"
    }

    fn supports_attachments(&self) -> bool {
        false
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if !notification.attachments.is_empty() {
            return Err(ProviderError::InvalidParameter {
                service: MAPPER.service.to_string(),
                param: "attachments".to_string(),
                detail: "SNS cannot carry attachments".to_string(),
            });
        }

        let subject = sanitize_subject(&notification.subject);
        let params = [
            ("Action", "Publish"),
            ("Version", API_VERSION),
            ("TopicArn", self.topic_arn.as_str()),
            ("Subject", subject.as_str()),
            ("Message", notification.body.as_str()),
        ];

        let text = self
            .aws
            .send(
                AwsRequest {
                    method: Method::POST,
                    host: self.aws.regional_host("sns"),
                    path: "/".to_string(),
                    query: Vec::new(),
                    headers: vec![(
                        "content-type".to_string(),
                        "application/x-www-form-urlencoded; charset=utf-8".to_string(),
                    )],
                    body: form_encode(&params).into_bytes(),
                    scope: Scope {
                        region: &self.aws.region,
                        service: "sns",
                    },
                    action: "Publish",
                    content_sha256_header: false,
                },
                MAPPER,
                ErrorContext::resource(&self.topic_arn),
            )
            .await?;

        let resp: PublishResponse = HttpUtils::parse_xml(&text, MAPPER.service)?;
        log::info!(
            "[sns] Published '{subject}' to {} (message id {:?})",
            self.topic_arn,
            resp.publish_result.message_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attachment, SessionCredentials};

    #[test]
    fn subject_is_truncated_and_ascii() {
        let long = "x".repeat(150);
        assert_eq!(sanitize_subject(&long).len(), MAX_SUBJECT_CHARS);
        assert_eq!(sanitize_subject("DNS\nInventory — ok"), "DNS?Inventory ? ok");
    }

    #[test]
    fn parse_publish_response() {
        let xml = r#"<PublishResponse xmlns="https://sns.amazonaws.com/doc/2010-03-31/">
  <PublishResult><MessageId>567910cd-659e-55d4-8ccb-5aaf14f5d0f1</MessageId></PublishResult>
  <ResponseMetadata><RequestId>d74b8436-ae13-5ab4-a9ff-ce54dfea72a0</RequestId></ResponseMetadata>
</PublishResponse>"#;
        let resp: PublishResponse = HttpUtils::parse_xml(xml, "sns").unwrap();
        assert_eq!(
            resp.publish_result.message_id.as_deref(),
            Some("567910cd-659e-55d4-8ccb-5aaf14f5d0f1")
        );
    }

    #[tokio::test]
    async fn attachments_rejected_before_any_request() {
        let aws = AwsClient::builder(SessionCredentials::new("a", "b"))
            .build()
            .unwrap();
        let transport = SnsTransport::new(aws, "arn:aws:sns:us-east-1:1:topic");
        assert!(!transport.supports_attachments());
        let err = transport
            .deliver(&Notification {
                subject: "s".into(),
                body: "b".into(),
                attachments: vec![Attachment {
                    name: "a.csv".into(),
                    bytes: vec![1],
                    mime: "text/csv".into(),
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidParameter { .. }));
    }
}
