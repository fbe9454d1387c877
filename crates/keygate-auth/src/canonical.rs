//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request is the byte-exact string that gets hashed and signed:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Two directions are supported. The signer builds every component from typed
//! inputs ([`build_canonical_uri`], [`build_canonical_query_string`]). The
//! presigned URL checker rebuilds them from a URL it received
//! ([`normalize_uri_path`], [`sort_raw_query_string`]).

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters that are percent-encoded in URI segments and query components.
///
/// Everything except the RFC 3986 unreserved set (`A-Z a-z 0-9 - _ . ~`) is
/// encoded, which includes the sub-delimiters `!`, `'`, `(`, `)` and `*`.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The only header covered by a presigned GET signature.
pub const SIGNED_HEADERS: &str = "host";

/// Build the full canonical request string from already-canonical components.
///
/// `host` is the sole signed header and must already be lowercase with any
/// default port removed. `canonical_uri` and `canonical_query` are used as-is.
///
/// # Examples
///
/// ```
/// use keygate_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/assets/logo.png",
///     "",
///     "s3.amazonaws.com",
///     "UNSIGNED-PAYLOAD",
/// );
/// assert_eq!(canonical, "GET\n/assets/logo.png\n\nhost:s3.amazonaws.com\n\nhost\nUNSIGNED-PAYLOAD");
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    host: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\nhost:{host}\n\n{SIGNED_HEADERS}\n{payload_hash}"
    )
}

/// Build the path-style canonical URI `/bucket/key` for an object.
///
/// The key is encoded segment by segment so that `/` separators survive
/// literally while every other reserved character is percent-encoded.
///
/// # Examples
///
/// ```
/// use keygate_auth::canonical::build_canonical_uri;
///
/// assert_eq!(
///     build_canonical_uri("assets", "docs/report (final)!.pdf"),
///     "/assets/docs/report%20%28final%29%21.pdf"
/// );
/// ```
#[must_use]
pub fn build_canonical_uri(bucket: &str, key: &str) -> String {
    format!("/{bucket}/{}", encode_object_key(key))
}

/// Percent-encode an object key, leaving `/` separators untouched.
#[must_use]
pub fn encode_object_key(key: &str) -> String {
    key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Build the canonical query string from raw (unencoded) parameters.
///
/// Parameters are ordered by raw name using byte-wise comparison, then each
/// name and value is percent-encoded and the pairs are joined with `&`.
///
/// # Examples
///
/// ```
/// use keygate_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(
///     build_canonical_query_string(&[("b", "x/y"), ("a", "1")]),
///     "a=1&b=x%2Fy"
/// );
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Re-canonicalize a URI path received on the wire.
///
/// Each segment is percent-decoded and re-encoded so that equivalent spellings
/// (`%20` vs a raw space) produce the same canonical form. Empty paths become `/`.
///
/// # Examples
///
/// ```
/// use keygate_auth::canonical::normalize_uri_path;
///
/// assert_eq!(normalize_uri_path("/assets/a%20b.txt"), "/assets/a%20b.txt");
/// assert_eq!(normalize_uri_path(""), "/");
/// ```
#[must_use]
pub fn normalize_uri_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Sort an already-encoded query string by parameter name, then by value.
///
/// Values are preserved exactly as they appear on the wire; the checker must
/// hash the same bytes the signer hashed.
#[must_use]
pub fn sort_raw_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode a single URI segment or query component (RFC 3986).
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}
