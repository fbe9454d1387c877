//! AWS Signature Version 4 primitives.
//!
//! These are the building blocks shared by the presigner and the presigned URL
//! checker:
//!
//! 1. [`format_amz_date`] renders the request instant as `YYYYMMDDTHHMMSSZ`.
//! 2. [`build_credential_scope`] binds a signature to `date/region/service`.
//! 3. [`build_string_to_sign`] wraps the hashed canonical request.
//! 4. [`derive_signing_key`] runs the four-stage HMAC-SHA256 chain.
//! 5. [`compute_signature`] produces the final hex signature.

use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// The only signing algorithm produced or accepted.
pub const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash sentinel used by presigned URLs: the body is never hashed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Service name in the credential scope.
pub const S3_SERVICE: &str = "s3";

/// Terminator of every credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// Compact ISO 8601 basic format used by `X-Amz-Date`.
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

type HmacSha256 = Hmac<Sha256>;

/// Format `now` as an `X-Amz-Date` timestamp and return it with its date stamp.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use keygate_auth::sigv4::format_amz_date;
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
/// let (amz_date, date_stamp) = format_amz_date(now);
/// assert_eq!(amz_date, "20240115T120000Z");
/// assert_eq!(date_stamp, "20240115");
/// ```
#[must_use]
pub fn format_amz_date(now: DateTime<Utc>) -> (String, String) {
    let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
    let date_stamp = amz_date[..8].to_owned();
    (amz_date, date_stamp)
}

/// Build the credential scope `date/region/service/aws4_request`.
#[must_use]
pub fn build_credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{date_stamp}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// Build the SigV4 string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256\n
/// <timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SIGNING_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// The key is derived fresh for every call and never cached.
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// HMAC-SHA256 `data` with `signing_key` and return lowercase hex.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// SHA-256 of `payload` as lowercase hex.
///
/// # Examples
///
/// ```
/// use keygate_auth::sigv4::hash_hex;
///
/// assert_eq!(
///     hash_hex(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Compute HMAC-SHA256 and return the raw bytes.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as KeyInit>::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
