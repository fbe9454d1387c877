//! Presigned URL checking: the storage side of [`presign_get`](crate::presign::presign_get).
//!
//! Given a presigned URL (or the request a storage backend received for one) and
//! the secret key, rebuild the canonical request from what is on the wire and
//! recompute the signature. The gateway never calls this; it exists so that a
//! fake storage backend can hold the signer to the same rules a real one does.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use percent_encoding::percent_decode_str;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{
    SIGNED_HEADERS, build_canonical_request, normalize_uri_path, sort_raw_query_string,
};
use crate::error::PresignedError;
use crate::sigv4::{
    AMZ_DATE_FORMAT, SCOPE_TERMINATOR, SIGNING_ALGORITHM, UNSIGNED_PAYLOAD,
    build_credential_scope, build_string_to_sign, compute_signature, derive_signing_key, hash_hex,
};

/// Parsed components of the `X-Amz-*` query parameters.
#[derive(Debug, Clone)]
pub struct ParsedPresignedParams {
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (`YYYYMMDD`).
    pub date: String,
    /// Region from the credential scope.
    pub region: String,
    /// Service from the credential scope.
    pub service: String,
    /// `X-Amz-Date` timestamp.
    pub timestamp: String,
    /// `X-Amz-Expires` in seconds.
    pub expires: u64,
    /// Signed header names, lowercase.
    pub signed_headers: Vec<String>,
    /// Hex signature from `X-Amz-Signature`.
    pub signature: String,
}

/// What a successfully checked presigned URL grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedScope {
    /// Access key that signed the URL.
    pub access_key_id: String,
    /// Region from the credential scope.
    pub region: String,
    /// Canonical (encoded) path, `/bucket/key`.
    pub canonical_uri: String,
    /// Last instant at which the URL is accepted.
    pub expires_at: DateTime<Utc>,
}

/// Parse presigned URL query parameters.
///
/// # Errors
///
/// Returns [`PresignedError::MissingQueryParam`] if a required parameter is
/// absent or unparsable, [`PresignedError::UnsupportedAlgorithm`] for anything
/// but `AWS4-HMAC-SHA256`, [`PresignedError::UnsupportedSignedHeaders`] unless
/// `X-Amz-SignedHeaders` is exactly `host`, or
/// [`PresignedError::InvalidCredential`] if the credential is not
/// `AKID/date/region/service/aws4_request`.
pub fn parse_presigned_params(query: &str) -> Result<ParsedPresignedParams, PresignedError> {
    let params: HashMap<&str, String> = query
        .split('&')
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key, percent_decode_str(value).decode_utf8_lossy().into_owned()))
        })
        .collect();

    let algorithm = required(&params, "X-Amz-Algorithm")?;
    if algorithm != SIGNING_ALGORITHM {
        return Err(PresignedError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let credential = required(&params, "X-Amz-Credential")?;
    let timestamp = required(&params, "X-Amz-Date")?;
    let expires = required(&params, "X-Amz-Expires")?
        .parse::<u64>()
        .map_err(|_| PresignedError::MissingQueryParam("X-Amz-Expires (invalid integer)".to_owned()))?;
    let signed_headers: Vec<String> = required(&params, "X-Amz-SignedHeaders")?
        .split(';')
        .map(str::to_ascii_lowercase)
        .collect();
    if signed_headers != [SIGNED_HEADERS] {
        return Err(PresignedError::UnsupportedSignedHeaders(signed_headers.join(";")));
    }
    let signature = required(&params, "X-Amz-Signature")?;

    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    let [access_key_id, date, region, service, terminator] = cred_parts[..] else {
        return Err(PresignedError::InvalidCredential);
    };
    if terminator != SCOPE_TERMINATOR || access_key_id.is_empty() {
        return Err(PresignedError::InvalidCredential);
    }

    Ok(ParsedPresignedParams {
        access_key_id: access_key_id.to_owned(),
        date: date.to_owned(),
        region: region.to_owned(),
        service: service.to_owned(),
        timestamp: timestamp.to_owned(),
        expires,
        signed_headers,
        signature: signature.to_owned(),
    })
}

/// Check a complete presigned GET URL against `secret_access_key` at `now`.
///
/// The signed `host` is taken from the URL's authority with the scheme's
/// default port removed.
///
/// # Errors
///
/// Returns [`PresignedError::InvalidUrl`] if the URL has no host, any parsing
/// error from [`parse_presigned_params`], [`PresignedError::RequestExpired`]
/// once `now` passes `X-Amz-Date + X-Amz-Expires`, or
/// [`PresignedError::SignatureDoesNotMatch`].
pub fn verify_presigned_url(
    url: &str,
    secret_access_key: &str,
    now: DateTime<Utc>,
) -> Result<PresignedScope, PresignedError> {
    let uri: http::Uri = url
        .parse()
        .map_err(|e| PresignedError::InvalidUrl(format!("{e}")))?;
    let host = uri
        .host()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| PresignedError::InvalidUrl("missing host".to_owned()))?
        .to_ascii_lowercase();
    let default_port = if uri.scheme_str() == Some("http") { 80 } else { 443 };
    let host = match uri.port_u16() {
        Some(port) if port != default_port => format!("{host}:{port}"),
        _ => host,
    };

    verify_presigned_parts(
        "GET",
        &host,
        uri.path(),
        uri.query().unwrap_or(""),
        secret_access_key,
        now,
    )
}

/// Check a request as received by a storage backend: the `Host` header is the
/// signed host.
///
/// # Errors
///
/// As [`verify_presigned_url`]; a missing `Host` header is
/// [`PresignedError::InvalidUrl`].
pub fn verify_presigned_request(
    parts: &http::request::Parts,
    secret_access_key: &str,
    now: DateTime<Utc>,
) -> Result<PresignedScope, PresignedError> {
    let host = parts
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(http::uri::Authority::as_str))
        .ok_or_else(|| PresignedError::InvalidUrl("missing host".to_owned()))?;

    verify_presigned_parts(
        parts.method.as_str(),
        host,
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        secret_access_key,
        now,
    )
}

fn verify_presigned_parts(
    method: &str,
    host: &str,
    path: &str,
    query: &str,
    secret_access_key: &str,
    now: DateTime<Utc>,
) -> Result<PresignedScope, PresignedError> {
    let parsed = parse_presigned_params(query)?;

    debug!(
        access_key_id = %parsed.access_key_id,
        region = %parsed.region,
        expires = parsed.expires,
        "Checking presigned URL"
    );

    let expires_at = check_expiration(&parsed.timestamp, parsed.expires, now)?;

    let canonical_uri = normalize_uri_path(path);
    let canonical_query = sort_raw_query_string(&query_without_signature(query));
    let canonical_request = build_canonical_request(
        method,
        &canonical_uri,
        &canonical_query,
        host,
        UNSIGNED_PAYLOAD,
    );

    let credential_scope = build_credential_scope(&parsed.date, &parsed.region, &parsed.service);
    let string_to_sign = build_string_to_sign(
        &parsed.timestamp,
        &credential_scope,
        &hash_hex(canonical_request.as_bytes()),
    );

    let signing_key = derive_signing_key(
        secret_access_key,
        &parsed.date,
        &parsed.region,
        &parsed.service,
    );
    let expected_signature = compute_signature(&signing_key, &string_to_sign);

    if bool::from(parsed.signature.as_bytes().ct_eq(expected_signature.as_bytes())) {
        Ok(PresignedScope {
            access_key_id: parsed.access_key_id,
            region: parsed.region,
            canonical_uri,
            expires_at,
        })
    } else {
        debug!(canonical_request, "Presigned URL signature mismatch");
        Err(PresignedError::SignatureDoesNotMatch)
    }
}

fn required<'a>(params: &'a HashMap<&str, String>, name: &str) -> Result<&'a str, PresignedError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| PresignedError::MissingQueryParam(name.to_owned()))
}

fn query_without_signature(query: &str) -> String {
    query
        .split('&')
        .filter(|param| !param.starts_with("X-Amz-Signature="))
        .collect::<Vec<_>>()
        .join("&")
}

fn check_expiration(
    timestamp: &str,
    expires: u64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, PresignedError> {
    let signed_at = NaiveDateTime::parse_from_str(timestamp, AMZ_DATE_FORMAT)
        .map_err(|_| PresignedError::MissingQueryParam("X-Amz-Date (invalid format)".to_owned()))?
        .and_utc();
    let lifetime = i64::try_from(expires).map_err(|_| PresignedError::RequestExpired)?;
    let expires_at = signed_at + chrono::Duration::seconds(lifetime);

    if now > expires_at {
        return Err(PresignedError::RequestExpired);
    }
    Ok(expires_at)
}
