//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use dns_inventory_provider::ProviderError;

use crate::types::RunSummary;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Retry cap reached while the remote kept throttling
    #[error("{operation}: still throttled after {attempts} attempts ({last_error})")]
    Exhausted {
        operation: String,
        attempts: u32,
        last_error: ProviderError,
    },

    /// Role could not be assumed in the account, or the session expired
    #[error("Access denied for account {account_id}: {reason}")]
    AccountAccessDenied { account_id: String, reason: String },

    /// Pagination contract broken by the remote
    #[error("Enumeration failed for {scope}: {reason}")]
    EnumerationFailed { scope: String, reason: String },

    /// One artifact alone exceeds the delivery size limit
    #[error("Artifact {identifier} is too large: {effective_size} bytes (max {max_size})")]
    ArtifactTooLarge {
        identifier: String,
        effective_size: u64,
        max_size: u64,
    },

    /// No delivery strategy can carry the report
    #[error("Delivery overflow: {0}")]
    DeliveryOverflow(String),

    /// Cooperative cancellation (deadline or interrupt)
    #[error("Run cancelled: {reason}")]
    Cancelled {
        reason: String,
        /// Filled in by the run service once the crawl has drained.
        partial: Option<Box<RunSummary>>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Archive (zip) error
    #[error("Archive error: {0}")]
    Archive(String),

    /// Delivery error (upload or notification)
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Provider error (converting from library)
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl CoreError {
    /// `Cancelled` without a partial summary yet.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
            partial: None,
        }
    }

    /// Whether the error belongs to a single account and must not abort the run.
    #[must_use]
    pub fn is_account_scoped(&self) -> bool {
        matches!(
            self,
            Self::Exhausted { .. }
                | Self::AccountAccessDenied { .. }
                | Self::EnumerationFailed { .. }
                | Self::Provider(_)
        )
    }

    /// Whether it is expected behavior (permissions, throttling, config), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Exhausted { .. }
            | Self::AccountAccessDenied { .. }
            | Self::Cancelled { .. }
            | Self::Config(_)
            | Self::DeliveryOverflow(_) => true,
            Self::Provider(e) => e.is_expected(),
            _ => false,
        }
    }

    /// Short machine-readable kind, used in the failure log.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exhausted { .. } => "exhausted",
            Self::AccountAccessDenied { .. } => "access_denied",
            Self::EnumerationFailed { .. } => "enumeration_failed",
            Self::ArtifactTooLarge { .. } => "artifact_too_large",
            Self::DeliveryOverflow(_) => "delivery_overflow",
            Self::Cancelled { .. } => "cancelled",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Archive(_) => "archive",
            Self::Delivery(_) => "delivery",
            Self::Provider(_) => "provider",
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn throttled() -> ProviderError {
        ProviderError::Throttled {
            service: "route53".to_string(),
            raw_code: Some("Throttling".to_string()),
            retry_after: None,
            raw_message: None,
        }
    }

    #[test]
    fn account_scope_classification() {
        let exhausted = CoreError::Exhausted {
            operation: "list_zones".to_string(),
            attempts: 8,
            last_error: throttled(),
        };
        assert!(exhausted.is_account_scoped());
        assert!(exhausted.is_expected());

        assert!(CoreError::Provider(throttled()).is_account_scoped());
        assert!(!CoreError::cancelled("deadline").is_account_scoped());
        assert!(!CoreError::DeliveryOverflow("no store".into()).is_account_scoped());
        assert!(!CoreError::Config("bad".into()).is_account_scoped());
    }

    #[test]
    fn serializes_with_code_tag() {
        let err = CoreError::AccountAccessDenied {
            account_id: "111122223333".to_string(),
            reason: "denied".to_string(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "AccountAccessDenied");
        assert_eq!(value["details"]["account_id"], "111122223333");
        assert_eq!(err.kind(), "access_denied");
    }

    #[test]
    fn display_carries_context() {
        let err = CoreError::ArtifactTooLarge {
            identifier: "ALL.csv".to_string(),
            effective_size: 9,
            max_size: 7,
        };
        assert_eq!(
            err.to_string(),
            "Artifact ALL.csv is too large: 9 bytes (max 7)"
        );
    }
}
