//! Response construction for the gateway.
//!
//! Denials are short `text/plain` bodies. Object responses relay the upstream
//! body with route-specific caching headers; upstream error bodies are never
//! forwarded.

use http::header::{self, HeaderMap, HeaderValue};
use http::{Response, StatusCode};

use crate::body::GatewayBody;
use crate::fetch::FetchedObject;

/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = "keygate";

/// Content type used when storage does not report one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `Cache-Control` for objects served by the public route.
pub const PUBLIC_CACHE_CONTROL: &str = "public, max-age=31536000";

/// `Cache-Control` for objects served by the private route.
pub const PRIVATE_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate";

/// `CDN-Cache-Control` for objects served by the private route.
pub const PRIVATE_CDN_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Connection-scoped headers that must not be relayed.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Plain-text bodies of every non-object response.
pub mod messages {
    /// Empty object key.
    pub const MISSING_KEY: &str = "Missing object key";
    /// Object key that is not valid percent-encoded UTF-8.
    pub const INVALID_KEY: &str = "Invalid object key encoding";
    /// Public route with no allow-listed folders.
    pub const ALLOWLIST_EMPTY: &str = "Server misconfigured: ALLOWED_FOLDERS is empty";
    /// Signing settings rejected by the signer.
    pub const SIGNING_MISCONFIGURED: &str = "Server misconfigured: invalid signing settings";
    /// Key outside the route's folders.
    pub const INVALID_FOLDER: &str = "Access denied: invalid folder";
    /// Private route without a `token` query parameter.
    pub const MISSING_TOKEN: &str = "Missing token";
    /// Token failed verification for any reason other than scope.
    pub const INVALID_TOKEN: &str = "Invalid or expired token";
    /// Token is valid but scoped to another object.
    pub const SCOPE_MISMATCH: &str = "Scope mismatch";
    /// Storage answered with a non-success status.
    pub const NOT_FOUND_OR_DENIED: &str = "File not found or access denied";
    /// Storage could not be reached.
    pub const BAD_GATEWAY: &str = "Bad gateway";
    /// Unknown path.
    pub const NOT_FOUND: &str = "Not found";
    /// Known path, method other than GET.
    pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
}

/// Build a `text/plain` response.
#[must_use]
pub fn text_response(status: StatusCode, message: &'static str) -> Response<GatewayBody> {
    let mut response = Response::new(GatewayBody::from_string(message));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// `405` with an `Allow: GET` header.
#[must_use]
pub fn method_not_allowed_response() -> Response<GatewayBody> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, messages::METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET"));
    response
}

/// Produce a health check response.
#[must_use]
pub fn health_check_response() -> Response<GatewayBody> {
    let mut response = Response::new(GatewayBody::from_string(
        r#"{"status":"running","service":"keygate"}"#,
    ));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Relay an object fetched for the public route.
///
/// Always `200`; only the content type survives from upstream.
#[must_use]
pub fn public_object_response(object: FetchedObject) -> Response<GatewayBody> {
    let content_type = object
        .headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = Response::new(object.body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(PUBLIC_CACHE_CONTROL),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response
}

/// Relay an object fetched for the private route.
///
/// The upstream status and end-to-end headers are kept; caching is disabled for
/// browsers and enabled for the CDN.
#[must_use]
pub fn private_object_response(object: FetchedObject) -> Response<GatewayBody> {
    let mut response = Response::new(object.body);
    *response.status_mut() = object.status;
    *response.headers_mut() = end_to_end_headers(object.headers);

    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(PRIVATE_CACHE_CONTROL),
    );
    headers.insert(
        "cdn-cache-control",
        HeaderValue::from_static(PRIVATE_CDN_CACHE_CONTROL),
    );
    response
}

/// Drop hop-by-hop headers, including any named by `Connection`.
fn end_to_end_headers(mut headers: HeaderMap) -> HeaderMap {
    let named: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP_HEADERS
        .iter()
        .copied()
        .chain(named.iter().map(String::as_str))
    {
        headers.remove(name);
    }
    headers
}

/// Add common response headers to every gateway response.
#[must_use]
pub fn add_common_headers(
    mut response: Response<GatewayBody>,
    request_id: &str,
) -> Response<GatewayBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));

    response
}
