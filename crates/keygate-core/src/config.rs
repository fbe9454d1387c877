//! Gateway configuration.
//!
//! Provides [`GatewayConfig`] for the Keygate server and the [`SigningConfig`]
//! it carries for presigning. Values are loaded from environment variables;
//! nothing below the server reads the environment itself.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::allowlist::FolderAllowlist;
use crate::error::{KeygateError, KeygateResult};

/// Default presigned URL lifetime: 12 hours.
pub const DEFAULT_PRESIGN_EXPIRES: u64 = 43_200;

/// Storage credentials and target used to presign outbound GETs.
///
/// Secrets are redacted from `Debug` output and never serialized.
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    /// Bucket holding every served object.
    #[builder(setter(into))]
    pub bucket: String,

    /// Region in the credential scope.
    #[builder(default = String::from("us-east-1"), setter(into))]
    pub region: String,

    /// Base URL of the storage endpoint (e.g. `"https://s3.amazonaws.com"`).
    #[builder(setter(into))]
    pub endpoint: String,

    /// Access key ID.
    #[builder(setter(into))]
    pub access_key_id: String,

    /// Secret access key.
    #[serde(skip_serializing, default)]
    #[builder(setter(into))]
    pub secret_access_key: String,

    /// Optional session token for temporary credentials.
    #[serde(skip_serializing, default)]
    #[builder(default, setter(strip_option, into))]
    pub session_token: Option<String>,

    /// Presigned URL lifetime in seconds.
    #[builder(default = DEFAULT_PRESIGN_EXPIRES)]
    pub presign_expires: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::from("us-east-1"),
            endpoint: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: None,
            presign_expires: DEFAULT_PRESIGN_EXPIRES,
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("presign_expires", &self.presign_expires)
            .finish()
    }
}

/// Keygate server configuration.
///
/// # Examples
///
/// ```
/// use keygate_core::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:3000");
/// assert_eq!(config.signing.presign_expires, 43_200);
/// assert!(config.allowed_folders.is_empty());
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the gateway.
    #[builder(default = String::from("0.0.0.0:3000"), setter(into))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"), setter(into))]
    pub log_level: String,

    /// Presigning target and credentials.
    pub signing: SigningConfig,

    /// Top-level folders served by the public route.
    #[builder(default)]
    pub allowed_folders: FolderAllowlist,

    /// Top-level folders served by the token-gated private route.
    #[builder(default)]
    pub private_folders: FolderAllowlist,

    /// HMAC secret for access tokens. Without it every private request is denied.
    #[serde(skip_serializing, default)]
    #[builder(default, setter(strip_option, into))]
    pub jwt_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:3000"),
            log_level: String::from("info"),
            signing: SigningConfig::default(),
            allowed_folders: FolderAllowlist::default(),
            private_folders: FolderAllowlist::default(),
            jwt_secret: None,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("log_level", &self.log_level)
            .field("signing", &self.signing)
            .field("allowed_folders", &self.allowed_folders)
            .field("private_folders", &self.private_folders)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:3000` |
    /// | `LOG_LEVEL` | `info` |
    /// | `BUCKET_NAME` | (empty) |
    /// | `S3_REGION` | `us-east-1` |
    /// | `S3_ENDPOINT` | (empty) |
    /// | `AWS_ACCESS_KEY_ID` | (empty) |
    /// | `AWS_SECRET_ACCESS_KEY` | (empty) |
    /// | `AWS_SESSION_TOKEN` | unset |
    /// | `PRESIGN_EXPIRES` | `43200` |
    /// | `ALLOWED_FOLDERS` | (empty) |
    /// | `PRIVATE_FOLDERS` | (empty) |
    /// | `JWT_SECRET` | unset |
    ///
    /// Empty `AWS_SESSION_TOKEN` and `JWT_SECRET` values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("BUCKET_NAME") {
            config.signing.bucket = v;
        }
        if let Some(v) = non_empty("S3_REGION") {
            config.signing.region = v;
        }
        if let Some(v) = lookup("S3_ENDPOINT") {
            config.signing.endpoint = v;
        }
        if let Some(v) = lookup("AWS_ACCESS_KEY_ID") {
            config.signing.access_key_id = v;
        }
        if let Some(v) = lookup("AWS_SECRET_ACCESS_KEY") {
            config.signing.secret_access_key = v;
        }
        config.signing.session_token = non_empty("AWS_SESSION_TOKEN");
        if let Some(v) = non_empty("PRESIGN_EXPIRES") {
            match v.trim().parse::<u64>() {
                Ok(n) => config.signing.presign_expires = n,
                Err(_) => warn!(value = %v, "Ignoring unparsable PRESIGN_EXPIRES"),
            }
        }
        if let Some(v) = lookup("ALLOWED_FOLDERS") {
            config.allowed_folders = FolderAllowlist::parse(&v);
        }
        if let Some(v) = lookup("PRIVATE_FOLDERS") {
            config.private_folders = FolderAllowlist::parse(&v);
        }
        config.jwt_secret = non_empty("JWT_SECRET");

        config
    }

    /// Check that the server can start with this configuration.
    ///
    /// An empty `ALLOWED_FOLDERS` or a missing `JWT_SECRET` is not an error
    /// here: the affected route reports it per request instead.
    ///
    /// # Errors
    ///
    /// Returns [`KeygateError::Config`] if the listen address does not parse,
    /// a required signing setting is empty, the endpoint is not an `http(s)`
    /// URL, or the presign lifetime is zero.
    pub fn validate(&self) -> KeygateResult<()> {
        self.listen_addr()?;

        let missing: Vec<&str> = [
            ("BUCKET_NAME", self.signing.bucket.as_str()),
            ("S3_ENDPOINT", self.signing.endpoint.as_str()),
            ("AWS_ACCESS_KEY_ID", self.signing.access_key_id.as_str()),
            ("AWS_SECRET_ACCESS_KEY", self.signing.secret_access_key.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(KeygateError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let endpoint = self.signing.endpoint.to_ascii_lowercase();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(KeygateError::Config(format!(
                "S3_ENDPOINT {:?} must be an http or https URL",
                self.signing.endpoint
            )));
        }

        if self.signing.presign_expires == 0 {
            return Err(KeygateError::Config(
                "PRESIGN_EXPIRES must be a positive number of seconds".to_owned(),
            ));
        }

        Ok(())
    }

    /// The parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`KeygateError::Config`] if `gateway_listen` is not a socket address.
    pub fn listen_addr(&self) -> KeygateResult<SocketAddr> {
        self.gateway_listen.parse().map_err(|e| {
            KeygateError::Config(format!(
                "invalid GATEWAY_LISTEN {:?}: {e}",
                self.gateway_listen
            ))
        })
    }
}
