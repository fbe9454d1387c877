//! The gateway HTTP service implementing hyper's `Service` trait.
//!
//! [`GatewayService`] runs every request through the same pipeline:
//!
//! 1. Route resolution (health, public, private)
//! 2. Folder allowlist check
//! 3. Token verification (private route only)
//! 4. Presigning the storage GET
//! 5. One outbound fetch via the [`ObjectFetcher`]
//! 6. Response mapping and common headers (`x-request-id`, `Server`)
//!
//! The clock is read once per request; that instant is used both to verify the
//! token and to sign the URL.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::StatusCode;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use keygate_auth::{AuthError, SigningRequest, presign_get, verify_token};
use keygate_core::{GatewayConfig, SigningConfig, top_level_folder};

use crate::body::GatewayBody;
use crate::fetch::{FetchedObject, ObjectFetcher};
use crate::response::{
    add_common_headers, health_check_response, messages, method_not_allowed_response,
    private_object_response, public_object_response, text_response,
};
use crate::router::{GatewayRoute, resolve};

/// The gateway service.
///
/// # Type Parameters
///
/// - `F`: The outbound transport implementing [`ObjectFetcher`].
#[derive(Debug)]
pub struct GatewayService<F: ObjectFetcher> {
    fetcher: Arc<F>,
    config: Arc<GatewayConfig>,
}

impl<F: ObjectFetcher> GatewayService<F> {
    /// Create a new gateway service with the given fetcher and configuration.
    #[must_use]
    pub fn new(fetcher: F, config: GatewayConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config: Arc::new(config),
        }
    }

    /// Handle a request at the current instant.
    pub async fn handle(&self, parts: &http::request::Parts) -> http::Response<GatewayBody> {
        self.handle_at(parts, Utc::now()).await
    }

    /// Handle a request as if it arrived at `now`.
    pub async fn handle_at(
        &self,
        parts: &http::request::Parts,
        now: DateTime<Utc>,
    ) -> http::Response<GatewayBody> {
        let request_id = Uuid::new_v4().to_string();
        let response =
            process_request(parts, self.fetcher.as_ref(), &self.config, &request_id, now).await;
        add_common_headers(response, &request_id)
    }
}

impl<F: ObjectFetcher> Clone for GatewayService<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            config: Arc::clone(&self.config),
        }
    }
}

impl<F: ObjectFetcher> Service<http::Request<Incoming>> for GatewayService<F> {
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            // GET has no meaningful body; it is dropped unread.
            let (parts, _body) = req.into_parts();
            Ok(service.handle(&parts).await)
        })
    }
}

/// Process a request through the gateway pipeline.
async fn process_request<F: ObjectFetcher>(
    parts: &http::request::Parts,
    fetcher: &F,
    config: &GatewayConfig,
    request_id: &str,
    now: DateTime<Utc>,
) -> http::Response<GatewayBody> {
    let route = resolve(&parts.method, &parts.uri);
    debug!(method = %parts.method, path = parts.uri.path(), %route, request_id, "resolved gateway route");

    match route {
        GatewayRoute::Health => health_check_response(),
        GatewayRoute::NotFound => text_response(StatusCode::NOT_FOUND, messages::NOT_FOUND),
        GatewayRoute::MethodNotAllowed => method_not_allowed_response(),
        GatewayRoute::InvalidKey => text_response(StatusCode::BAD_REQUEST, messages::INVALID_KEY),
        GatewayRoute::Public { key } => serve_public(&key, fetcher, config, request_id, now).await,
        GatewayRoute::Private { key, token } => {
            serve_private(&key, token.as_deref(), fetcher, config, request_id, now).await
        }
    }
}

async fn serve_public<F: ObjectFetcher>(
    key: &str,
    fetcher: &F,
    config: &GatewayConfig,
    request_id: &str,
    now: DateTime<Utc>,
) -> http::Response<GatewayBody> {
    if key.is_empty() {
        return text_response(StatusCode::BAD_REQUEST, messages::MISSING_KEY);
    }
    if config.allowed_folders.is_empty() {
        error!(request_id, "public route requested but ALLOWED_FOLDERS is empty");
        return text_response(StatusCode::INTERNAL_SERVER_ERROR, messages::ALLOWLIST_EMPTY);
    }
    if !config.allowed_folders.permits(key) {
        warn!(
            key,
            folder = top_level_folder(key),
            reason = "folder_not_allowed",
            request_id,
            "denied public request"
        );
        return text_response(StatusCode::FORBIDDEN, messages::INVALID_FOLDER);
    }

    info!(key, request_id, "serving public object");

    match fetch_signed(key, fetcher, &config.signing, request_id, now).await {
        Ok(object) => public_object_response(object),
        Err(response) => response,
    }
}

async fn serve_private<F: ObjectFetcher>(
    key: &str,
    token: Option<&str>,
    fetcher: &F,
    config: &GatewayConfig,
    request_id: &str,
    now: DateTime<Utc>,
) -> http::Response<GatewayBody> {
    if key.is_empty() {
        return text_response(StatusCode::BAD_REQUEST, messages::MISSING_KEY);
    }
    if !config.private_folders.permits(key) {
        warn!(
            key,
            folder = top_level_folder(key),
            reason = "folder_not_allowed",
            request_id,
            "denied private request"
        );
        return text_response(StatusCode::FORBIDDEN, messages::INVALID_FOLDER);
    }
    let Some(token) = token else {
        return text_response(StatusCode::UNAUTHORIZED, messages::MISSING_TOKEN);
    };

    let Some(secret) = config.jwt_secret.as_deref() else {
        warn!(key, reason = "jwt_secret_unset", request_id, "denied private request");
        return text_response(StatusCode::FORBIDDEN, messages::INVALID_TOKEN);
    };

    if let Err(err) = verify_token(token, secret, key, now) {
        warn!(key, reason = err.kind(), error = %err, request_id, "denied private request");
        let message = match err {
            AuthError::ScopeMismatch => messages::SCOPE_MISMATCH,
            _ => messages::INVALID_TOKEN,
        };
        return text_response(StatusCode::FORBIDDEN, message);
    }

    info!(key, request_id, "serving private object");

    match fetch_signed(key, fetcher, &config.signing, request_id, now).await {
        Ok(object) => private_object_response(object),
        Err(response) => response,
    }
}

/// Presign `key`, fetch it, and return the object only if storage answered 2xx.
///
/// Every failure is already mapped to the response the client should see.
async fn fetch_signed<F: ObjectFetcher>(
    key: &str,
    fetcher: &F,
    signing: &SigningConfig,
    request_id: &str,
    now: DateTime<Utc>,
) -> Result<FetchedObject, http::Response<GatewayBody>> {
    let presigned = presign_get(&signing_request(signing, key), now).map_err(|err| {
        error!(key, reason = err.kind(), error = %err, request_id, "failed to presign object URL");
        text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            messages::SIGNING_MISCONFIGURED,
        )
    })?;

    let object = fetcher.fetch(presigned.as_str()).await.map_err(|err| {
        error!(key, error = %err, request_id, "failed to reach storage");
        text_response(StatusCode::BAD_GATEWAY, messages::BAD_GATEWAY)
    })?;

    if !object.status.is_success() {
        warn!(
            key,
            upstream_status = object.status.as_u16(),
            request_id,
            "storage rejected presigned GET"
        );
        return Err(text_response(
            StatusCode::NOT_FOUND,
            messages::NOT_FOUND_OR_DENIED,
        ));
    }

    debug!(key, status = object.status.as_u16(), request_id, "fetched object from storage");
    Ok(object)
}

/// Combine the configured signing target with one object key.
fn signing_request(signing: &SigningConfig, key: &str) -> SigningRequest {
    SigningRequest {
        bucket: signing.bucket.clone(),
        object_key: key.to_owned(),
        region: signing.region.clone(),
        endpoint: signing.endpoint.clone(),
        access_key_id: signing.access_key_id.clone(),
        secret_access_key: signing.secret_access_key.clone(),
        session_token: signing.session_token.clone(),
        expiry_seconds: signing.presign_expires,
    }
}
