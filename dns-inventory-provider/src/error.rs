use serde::{Deserialize, Serialize};

/// Unified error type for all remote API operations.
///
/// Each variant carries a `service` field naming the remote service that produced
/// the error (`sts`, `route53`, `organizations`, `s3`, `ses`, `sns`), plus
/// variant-specific context. All variants are serializable for structured
/// failure reporting.
///
/// # Classification
///
/// Callers only need three classes (see [`ErrorClass`]):
/// - [`Throttled`](Self::Throttled): the remote asked us to slow down; retryable.
/// - [`AccessDenied`](Self::AccessDenied) / [`InvalidCredentials`](Self::InvalidCredentials):
///   fatal for the account being processed.
/// - everything else: fatal for the account being processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// A network-level error occurred (DNS resolution failure, connection refused, 5xx gateway).
    NetworkError {
        /// Service that produced the error.
        service: String,
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Service that produced the error.
        service: String,
        /// Error details.
        detail: String,
    },

    /// The remote throttled the request (HTTP 429 or a throttling error code).
    Throttled {
        /// Service that produced the error.
        service: String,
        /// Raw throttling code (`Throttling`, `SlowDown`, ...), if available.
        raw_code: Option<String>,
        /// Suggested wait time in seconds, if the API provided one.
        retry_after: Option<u64>,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The caller is authenticated but not allowed to perform the operation.
    AccessDenied {
        /// Service that produced the error.
        service: String,
        /// Raw error code from the API, if available.
        raw_code: Option<String>,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The credentials are invalid, expired, or the signature did not match.
    InvalidCredentials {
        /// Service that produced the error.
        service: String,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The addressed resource (zone, bucket, topic) does not exist.
    NotFound {
        /// Service that produced the error.
        service: String,
        /// Identifier of the missing resource.
        resource: String,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// A request parameter was rejected.
    InvalidParameter {
        /// Service that produced the error.
        service: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// Failed to parse the API response.
    ParseError {
        /// Service that produced the error.
        service: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Service that produced the error.
        service: String,
        /// Details about the serialization failure.
        detail: String,
    },

    /// An unrecognized error from the API.
    Unknown {
        /// Service that produced the error.
        service: String,
        /// Raw error code from the API, if available.
        raw_code: Option<String>,
        /// Raw error message from the API.
        raw_message: String,
    },
}

/// Coarse classification of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Retry after backoff.
    Throttled,
    /// Fatal for the current account.
    AccessDenied,
    /// Fatal for the current account.
    Other,
}

impl ProviderError {
    /// Maps the error onto the three classes the inventory run cares about.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Throttled { .. } => ErrorClass::Throttled,
            Self::AccessDenied { .. } | Self::InvalidCredentials { .. } => ErrorClass::AccessDenied,
            _ => ErrorClass::Other,
        }
    }

    /// Whether the remote signalled throttling.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.class() == ErrorClass::Throttled
    }

    /// Whether the remote refused the caller's identity or permissions.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        self.class() == ErrorClass::AccessDenied
    }

    /// 是否为预期行为（权限、资源不存在等），用于日志分级。
    ///
    /// 返回 `true` 时应使用 `warn` 级别，`false` 时使用 `error` 级别。
    /// **新增变体时请同步更新此方法。**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Throttled { .. }
                | Self::AccessDenied { .. }
                | Self::InvalidCredentials { .. }
                | Self::NotFound { .. }
                | Self::InvalidParameter { .. }
        )
    }

    /// Name of the service that produced the error.
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::NetworkError { service, .. }
            | Self::Timeout { service, .. }
            | Self::Throttled { service, .. }
            | Self::AccessDenied { service, .. }
            | Self::InvalidCredentials { service, .. }
            | Self::NotFound { service, .. }
            | Self::InvalidParameter { service, .. }
            | Self::ParseError { service, .. }
            | Self::SerializationError { service, .. }
            | Self::Unknown { service, .. } => service,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { service, detail } => {
                write!(f, "[{service}] Network error: {detail}")
            }
            Self::Timeout { service, detail } => {
                write!(f, "[{service}] Request timeout: {detail}")
            }
            Self::Throttled {
                service,
                raw_code,
                retry_after,
                ..
            } => {
                let code = raw_code.as_deref().unwrap_or("throttled");
                if let Some(secs) = retry_after {
                    write!(f, "[{service}] Throttled ({code}, retry after {secs}s)")
                } else {
                    write!(f, "[{service}] Throttled ({code})")
                }
            }
            Self::AccessDenied {
                service,
                raw_message,
                ..
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{service}] Access denied: {msg}")
                } else {
                    write!(f, "[{service}] Access denied")
                }
            }
            Self::InvalidCredentials {
                service,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{service}] Invalid credentials: {msg}")
                } else {
                    write!(f, "[{service}] Invalid credentials")
                }
            }
            Self::NotFound {
                service,
                resource,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{service}] '{resource}' not found: {msg}")
                } else {
                    write!(f, "[{service}] '{resource}' not found")
                }
            }
            Self::InvalidParameter {
                service,
                param,
                detail,
            } => {
                write!(f, "[{service}] Invalid parameter '{param}': {detail}")
            }
            Self::ParseError { service, detail } => {
                write!(f, "[{service}] Parse error: {detail}")
            }
            Self::SerializationError { service, detail } => {
                write!(f, "[{service}] Serialization error: {detail}")
            }
            Self::Unknown {
                service,
                raw_message,
                ..
            } => {
                write!(f, "[{service}] {raw_message}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Convenience type alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_network_error() {
        let e = ProviderError::NetworkError {
            service: "route53".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(e.to_string(), "[route53] Network error: connection refused");
    }

    #[test]
    fn display_throttled_with_retry() {
        let e = ProviderError::Throttled {
            service: "route53".to_string(),
            raw_code: Some("Throttling".to_string()),
            retry_after: Some(2),
            raw_message: None,
        };
        assert_eq!(
            e.to_string(),
            "[route53] Throttled (Throttling, retry after 2s)"
        );
    }

    #[test]
    fn display_throttled_without_code() {
        let e = ProviderError::Throttled {
            service: "sts".to_string(),
            raw_code: None,
            retry_after: None,
            raw_message: None,
        };
        assert_eq!(e.to_string(), "[sts] Throttled (throttled)");
    }

    #[test]
    fn display_access_denied_with_message() {
        let e = ProviderError::AccessDenied {
            service: "sts".to_string(),
            raw_code: Some("AccessDenied".to_string()),
            raw_message: Some("not authorized to perform sts:AssumeRole".to_string()),
        };
        assert_eq!(
            e.to_string(),
            "[sts] Access denied: not authorized to perform sts:AssumeRole"
        );
    }

    #[test]
    fn display_not_found() {
        let e = ProviderError::NotFound {
            service: "route53".to_string(),
            resource: "Z123".to_string(),
            raw_message: None,
        };
        assert_eq!(e.to_string(), "[route53] 'Z123' not found");
    }

    #[test]
    fn display_unknown() {
        let e = ProviderError::Unknown {
            service: "s3".to_string(),
            raw_code: Some("E001".to_string()),
            raw_message: "something broke".to_string(),
        };
        assert_eq!(e.to_string(), "[s3] something broke");
    }

    #[test]
    fn classification() {
        let throttled = ProviderError::Throttled {
            service: "t".into(),
            raw_code: None,
            retry_after: None,
            raw_message: None,
        };
        let denied = ProviderError::AccessDenied {
            service: "t".into(),
            raw_code: None,
            raw_message: None,
        };
        let invalid = ProviderError::InvalidCredentials {
            service: "t".into(),
            raw_message: None,
        };
        let network = ProviderError::NetworkError {
            service: "t".into(),
            detail: "x".into(),
        };

        assert_eq!(throttled.class(), ErrorClass::Throttled);
        assert!(throttled.is_throttled());
        assert_eq!(denied.class(), ErrorClass::AccessDenied);
        assert_eq!(invalid.class(), ErrorClass::AccessDenied);
        assert!(invalid.is_access_denied());
        assert_eq!(network.class(), ErrorClass::Other);
        assert!(!network.is_throttled());
    }

    #[test]
    fn service_accessor() {
        let e = ProviderError::ParseError {
            service: "organizations".into(),
            detail: "bad json".into(),
        };
        assert_eq!(e.service(), "organizations");
    }

    #[test]
    fn serialize_tagged_json() {
        let e = ProviderError::Throttled {
            service: "route53".to_string(),
            raw_code: Some("Throttling".to_string()),
            retry_after: None,
            raw_message: Some("Rate exceeded".to_string()),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"code\":\"Throttled\""));
        assert!(json.contains("\"raw_code\":\"Throttling\""));

        let back: ProviderError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), e.to_string());
    }
}
