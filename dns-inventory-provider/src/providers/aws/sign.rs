//! AWS Signature Version 4
//!
//! Reference: <https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_sigv-create-signed-request.html>

use std::fmt::Write;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{ProviderError, Result};
use crate::types::SessionCredentials;
use crate::utils::log_sanitizer::truncate_for_log;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const ALGORITHM: &str = "AWS4-HMAC-SHA256";
/// Payload hash used for presigned URLs.
pub(crate) const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
/// 预签名 URL 的最长有效期（7 天）
pub(crate) const MAX_PRESIGN_EXPIRES_SECS: u64 = 604_800;

/// HMAC-SHA256 计算
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| ProviderError::SerializationError {
        service: "sigv4".to_string(),
        detail: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Lowercase hex SHA-256 of `bytes`.
pub(crate) fn hash_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Percent-encode every path segment, keeping `/` separators.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Derive the signing key: kDate → kRegion → kService → kSigning.
pub(crate) fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Sorted, percent-encoded query string.
pub(crate) fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the canonical request; returns `(canonical_request, signed_headers)`.
fn canonical_request(
    method: &str,
    uri: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
    payload_hash: &str,
) -> (String, String) {
    let canonical_uri = if uri.is_empty() { "/" } else { uri };

    let mut sorted_headers: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), normalize_header_value(v)))
        .collect();
    sorted_headers.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers = sorted_headers
        .iter()
        .fold(String::new(), |mut acc, (k, v)| {
            let _ = writeln!(acc, "{k}:{v}");
            acc
        });

    let signed_headers = sorted_headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical = format!(
        "{method}\n{canonical_uri}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        canonical_query(query)
    );
    (canonical, signed_headers)
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hash_hex(canonical_request.as_bytes())
    )
}

/// Signing region and service of a request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

impl Scope<'_> {
    fn credential_scope(&self, amz_date: &str) -> String {
        let date = amz_date.get(..8).unwrap_or(amz_date);
        format!("{date}/{}/{}/aws4_request", self.region, self.service)
    }

    fn signature(
        &self,
        credentials: &SessionCredentials,
        amz_date: &str,
        string_to_sign: &str,
    ) -> Result<String> {
        let date = amz_date.get(..8).unwrap_or(amz_date);
        let key = signing_key(
            &credentials.secret_access_key,
            date,
            self.region,
            self.service,
        )?;
        Ok(hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?))
    }
}

/// Compute the `Authorization` header for a request.
///
/// `headers` must already contain every header to be signed (at least `host`
/// and `x-amz-date`, plus `x-amz-security-token` for temporary credentials).
#[allow(clippy::too_many_arguments)]
pub(crate) fn authorization_header(
    credentials: &SessionCredentials,
    scope: Scope<'_>,
    method: &str,
    uri: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
    payload_hash: &str,
    amz_date: &str,
) -> Result<String> {
    let (canonical, signed_headers) = canonical_request(method, uri, query, headers, payload_hash);
    log::debug!("CanonicalRequest:\n{}", truncate_for_log(&canonical));

    let credential_scope = scope.credential_scope(amz_date);
    let to_sign = string_to_sign(amz_date, &credential_scope, &canonical);
    log::debug!("StringToSign:\n{to_sign}");

    let signature = scope.signature(credentials, amz_date, &to_sign)?;

    Ok(format!(
        "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    ))
}

/// Build a presigned GET URL (query-string authentication, host header only).
pub(crate) fn presign_url(
    credentials: &SessionCredentials,
    scope: Scope<'_>,
    host: &str,
    uri: &str,
    expires_secs: u64,
    amz_date: &str,
) -> Result<String> {
    let credential_scope = scope.credential_scope(amz_date);
    let mut query = vec![
        ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
        (
            "X-Amz-Credential".to_string(),
            format!("{}/{credential_scope}", credentials.access_key_id),
        ),
        ("X-Amz-Date".to_string(), amz_date.to_string()),
        (
            "X-Amz-Expires".to_string(),
            expires_secs.min(MAX_PRESIGN_EXPIRES_SECS).to_string(),
        ),
        ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
    ];
    if let Some(token) = &credentials.session_token {
        query.push(("X-Amz-Security-Token".to_string(), token.clone()));
    }

    let headers = [("host".to_string(), host.to_string())];
    let (canonical, _) = canonical_request("GET", uri, &query, &headers, UNSIGNED_PAYLOAD);
    let to_sign = string_to_sign(amz_date, &credential_scope, &canonical);
    let signature = scope.signature(credentials, amz_date, &to_sign)?;

    Ok(format!(
        "https://{host}{uri}?{}&X-Amz-Signature={signature}",
        canonical_query(&query)
    ))
}
