//! Service adapters.

/// AWS adapters (STS, Route 53, Organizations, S3, SES v2, SNS).
pub mod aws;
