//! Outbound object retrieval.
//!
//! The gateway fetches each object with one GET of a presigned URL. The
//! [`ObjectFetcher`] trait is the boundary between the HTTP layer and the
//! network, so the service can be exercised without a storage backend.

use std::future::Future;
use std::pin::Pin;

use http::{HeaderMap, StatusCode};

use crate::body::GatewayBody;

/// Boxed error used for transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised before storage produced a response.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] BoxError),

    /// Storage could not be reached or the exchange failed.
    #[error("upstream request failed: {0}")]
    Transport(#[source] BoxError),
}

/// Status, headers, and body as received from storage.
#[derive(Debug)]
pub struct FetchedObject {
    /// Upstream status code.
    pub status: StatusCode,
    /// Upstream response headers.
    pub headers: HeaderMap,
    /// Upstream body, relayed as it arrives.
    pub body: GatewayBody,
}

/// Future returned by [`ObjectFetcher::fetch`].
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<FetchedObject, FetchError>> + Send>>;

/// Performs the single outbound GET for a presigned URL.
///
/// Implementations must not retry and must not follow the request with any
/// other call: the presigned URL authorizes exactly one GET.
pub trait ObjectFetcher: Send + Sync + 'static {
    /// GET `url` and return the response head with a streaming body.
    fn fetch(&self, url: &str) -> FetchFuture;
}

/// [`ObjectFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Create a fetcher with a default client.
    ///
    /// Redirects are not followed: a redirect from storage is passed back as a
    /// non-success status.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::Client(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ObjectFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        let request = self.client.get(url);
        Box::pin(async move {
            // The URL carries credentials; keep it out of error messages.
            let response = request
                .send()
                .await
                .map_err(|e| FetchError::Transport(Box::new(e.without_url())))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = GatewayBody::from_stream(response.bytes_stream());

            Ok(FetchedObject {
                status,
                headers,
                body,
            })
        })
    }
}
