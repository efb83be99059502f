//! AWS 错误映射
//!
//! 参考: <https://docs.aws.amazon.com/STS/latest/APIReference/CommonErrors.html>
//!
//! ## 错误码分类
//!
//! - **限流**：Throttling, ThrottlingException, TooManyRequestsException,
//!   RequestLimitExceeded, PriorRequestNotComplete, SlowDown
//! - **权限拒绝**：AccessDenied, AccessDeniedException, AuthorizationError, ...
//! - **凭证无效**：InvalidClientTokenId, SignatureDoesNotMatch, ExpiredToken, ...
//! - **资源不存在**：NoSuchHostedZone, NoSuchBucket, NotFound, ...
//! - **参数错误**：InvalidInput, ValidationError, InvalidParameterValue, ...
//!
//! 无法解析出错误码时按 HTTP 状态码兜底。

use serde::Deserialize;

use crate::error::ProviderError;
use crate::traits::{ErrorContext, RawApiError, ServiceErrorMapper};

/// Error body encoding of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorProtocol {
    /// `<ErrorResponse><Error><Code/><Message/></Error></ErrorResponse>` or bare `<Error>`.
    Xml,
    /// `{"__type": "...", "message": "..."}`.
    Json,
}

/// Error mapper bound to one AWS service.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AwsErrorMapper {
    pub service: &'static str,
    pub protocol: ErrorProtocol,
}

impl AwsErrorMapper {
    pub const fn new(service: &'static str, protocol: ErrorProtocol) -> Self {
        Self { service, protocol }
    }

    /// Parse a non-2xx response body into a [`RawApiError`].
    pub fn raw_from_body(&self, status: u16, body: &str) -> RawApiError {
        let parsed = match self.protocol {
            ErrorProtocol::Xml => parse_xml_error(body),
            ErrorProtocol::Json => parse_json_error(body),
        };
        match parsed {
            Some((Some(code), message)) => RawApiError::with_code(status, code, message),
            Some((None, message)) => RawApiError::new(status, message),
            None => RawApiError::new(status, format!("HTTP {status}: {body}")),
        }
    }

    /// Shortcut: parse and map in one step.
    pub fn error_from_response(&self, status: u16, body: &str, context: ErrorContext) -> ProviderError {
        self.map_error(self.raw_from_body(status, body), context)
    }
}

/// Codes AWS services use to signal throttling.
pub(crate) const THROTTLE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "PriorRequestNotComplete",
    "SlowDown",
];

pub(crate) fn is_throttle_code(code: &str) -> bool {
    THROTTLE_CODES.contains(&code)
}

impl ServiceErrorMapper for AwsErrorMapper {
    fn service_name(&self) -> &'static str {
        self.service
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let service = self.service_name().to_string();
        let code = raw.code.clone();
        match code.as_deref() {
            // ============ 限流 ============
            Some(c) if is_throttle_code(c) => ProviderError::Throttled {
                service,
                raw_code: raw.code,
                retry_after: None,
                raw_message: Some(raw.message),
            },

            // ============ 权限拒绝 ============
            Some(
                "AccessDenied"
                | "AccessDeniedException"
                | "AccessDeniedForDependencyException"
                | "AuthorizationError"
                | "UnauthorizedOperation"
                | "AllAccessDisabled"
                | "AccountSuspendedException",
            ) => ProviderError::AccessDenied {
                service,
                raw_code: raw.code,
                raw_message: Some(raw.message),
            },

            // ============ 凭证无效 / 过期 ============
            Some(
                "InvalidClientTokenId"
                | "SignatureDoesNotMatch"
                | "IncompleteSignature"
                | "InvalidSignatureException"
                | "MissingAuthenticationToken"
                | "UnrecognizedClientException"
                | "InvalidAccessKeyId"
                | "InvalidToken"
                | "ExpiredToken"
                | "ExpiredTokenException"
                | "RequestExpired"
                | "TokenRefreshRequired",
            ) => ProviderError::InvalidCredentials {
                service,
                raw_message: Some(raw.message),
            },

            // ============ 资源不存在 ============
            Some(
                "NoSuchHostedZone"
                | "NoSuchBucket"
                | "NoSuchKey"
                | "NotFound"
                | "NotFoundException"
                | "NoSuchEntity"
                | "AccountNotFoundException",
            ) => ProviderError::NotFound {
                service,
                resource: context.resource.unwrap_or_default(),
                raw_message: Some(raw.message),
            },

            // ============ 参数无效 ============
            Some(
                "InvalidInput"
                | "InvalidParameter"
                | "InvalidParameterValue"
                | "InvalidParameterException"
                | "InvalidParameterCombination"
                | "InvalidArgument"
                | "InvalidPaginationToken"
                | "InvalidInputException"
                | "ValidationError"
                | "ValidationException"
                | "MalformedPolicyDocument"
                | "PackedPolicyTooLarge"
                | "BadRequestException"
                | "MessageRejected"
                | "EntityTooLarge",
            ) => ProviderError::InvalidParameter {
                service,
                param: context.param.unwrap_or_else(|| "request".to_string()),
                detail: raw.message,
            },

            // ============ 服务端故障 ============
            Some(
                "ServiceUnavailable"
                | "ServiceUnavailableException"
                | "InternalFailure"
                | "InternalError"
                | "InternalErrorException"
                | "ServiceFailure"
                | "ServiceException",
            ) => ProviderError::NetworkError {
                service,
                detail: raw.message,
            },

            Some(_) => self.unknown_error(raw),

            // ============ 无错误码：按状态码兜底 ============
            None => match raw.status {
                401 => ProviderError::InvalidCredentials {
                    service,
                    raw_message: Some(raw.message),
                },
                403 => ProviderError::AccessDenied {
                    service,
                    raw_code: None,
                    raw_message: Some(raw.message),
                },
                404 => ProviderError::NotFound {
                    service,
                    resource: context.resource.unwrap_or_default(),
                    raw_message: Some(raw.message),
                },
                500..=599 => ProviderError::NetworkError {
                    service,
                    detail: raw.message,
                },
                _ => self.unknown_error(raw),
            },
        }
    }
}

// ============ 错误体解析 ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XmlErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Query-protocol services wrap the error in `<ErrorResponse>`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XmlErrorResponse {
    error: XmlErrorDetail,
}

fn parse_xml_error(body: &str) -> Option<(Option<String>, String)> {
    let detail = quick_xml::de::from_str::<XmlErrorResponse>(body)
        .map(|r| r.error)
        .or_else(|_| quick_xml::de::from_str::<XmlErrorDetail>(body))
        .ok()?;
    if detail.code.is_none() && detail.message.is_none() {
        return None;
    }
    Some((detail.code, detail.message.unwrap_or_default()))
}

/// Strip namespace / URI decorations from a JSON error type:
/// `com.amazonaws.x#AccessDeniedException:http://...` → `AccessDeniedException`.
fn normalize_json_error_type(raw: &str) -> String {
    let without_ns = raw.rsplit('#').next().unwrap_or(raw);
    without_ns.split(':').next().unwrap_or(without_ns).to_string()
}

fn parse_json_error(body: &str) -> Option<(Option<String>, String)> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let obj = value.as_object()?;

    let code = ["__type", "code", "Code"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(serde_json::Value::as_str))
        .map(normalize_json_error_type);
    let message = ["message", "Message"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(serde_json::Value::as_str))
        .map(ToString::to_string);

    if code.is_none() && message.is_none() {
        return None;
    }
    Some((code, message.unwrap_or_default()))
}
