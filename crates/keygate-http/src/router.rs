//! Route resolution for gateway requests.
//!
//! ```text
//! GET /health, /_health            -> Health
//! GET /api/s3/private/<key...>     -> Private (token from ?token=)
//! GET /api/s3/<key...>             -> Public
//! anything else                    -> NotFound
//! ```
//!
//! The object key is the remainder of the path after the route prefix,
//! percent-decoded as UTF-8. A key with a `.` or `..` segment is rejected
//! as [`GatewayRoute::InvalidKey`]. Non-GET requests to a known path resolve to
//! [`GatewayRoute::MethodNotAllowed`].

use std::fmt;

use http::{Method, Uri};
use percent_encoding::percent_decode_str;

const HEALTH_PATHS: [&str; 2] = ["/health", "/_health"];
const API_PREFIX: &str = "/api/s3";
const PRIVATE_PREFIX: &str = "/private";

/// The resolved destination of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayRoute {
    /// Liveness probe.
    Health,
    /// Folder-allowlisted object, no token required.
    Public {
        /// Decoded object key, possibly empty.
        key: String,
    },
    /// Token-gated object.
    Private {
        /// Decoded object key, possibly empty.
        key: String,
        /// The `token` query parameter, if present and non-empty.
        token: Option<String>,
    },
    /// The key is not valid percent-encoded UTF-8, or has a dot segment.
    InvalidKey,
    /// Known path, unsupported method.
    MethodNotAllowed,
    /// Unknown path.
    NotFound,
}

impl GatewayRoute {
    /// Short route name for log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Public { .. } => "public",
            Self::Private { .. } => "private",
            Self::InvalidKey => "invalid_key",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for GatewayRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a request line to a [`GatewayRoute`].
#[must_use]
pub fn resolve(method: &Method, uri: &Uri) -> GatewayRoute {
    let path = uri.path();

    let route = if HEALTH_PATHS.contains(&path) {
        GatewayRoute::Health
    } else if let Some(rest) = strip_segment_prefix(path, API_PREFIX) {
        match strip_segment_prefix(rest, PRIVATE_PREFIX) {
            Some(private_rest) => match decode_key(private_rest) {
                Some(key) => GatewayRoute::Private {
                    key,
                    token: token_param(uri.query()),
                },
                None => GatewayRoute::InvalidKey,
            },
            None => match decode_key(rest) {
                Some(key) => GatewayRoute::Public { key },
                None => GatewayRoute::InvalidKey,
            },
        }
    } else {
        return GatewayRoute::NotFound;
    };

    if *method == Method::GET {
        route
    } else {
        GatewayRoute::MethodNotAllowed
    }
}

/// Strip `prefix` when it is followed by `/` or the end of the path.
fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn decode_key(rest: &str) -> Option<String> {
    let raw = rest.strip_prefix('/').unwrap_or(rest);
    let key = percent_decode_str(raw).decode_utf8().ok()?;
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return None;
    }
    Some(key.into_owned())
}

/// The first `token` query parameter, treating an empty value as absent.
fn token_param(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(name, _)| name == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}
