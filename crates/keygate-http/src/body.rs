//! Gateway response body types.
//!
//! [`GatewayBody`] supports three modes:
//!
//! - **Buffered**: plain-text denials and the health check payload.
//! - **Streaming**: object bytes relayed from storage as they arrive.
//! - **Empty**: bodies with no content.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http_body::Frame;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};

/// Response body for every gateway response.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Default)]
pub enum GatewayBody {
    /// Fully buffered bytes.
    Buffered(Full<Bytes>),
    /// Bytes relayed from an upstream stream.
    Streaming(UnsyncBoxBody<Bytes, std::io::Error>),
    /// No content.
    #[default]
    Empty,
}

impl fmt::Debug for GatewayBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(full) => f.debug_tuple("Buffered").field(full).finish(),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

impl GatewayBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Relay a stream of byte chunks.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let frames = stream.map_ok(Frame::data).map_err(std::io::Error::other);
        Self::Streaming(StreamBody::new(frames).boxed_unsync())
    }

    /// Collect the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by a streaming body.
    pub async fn collect_bytes(self) -> Result<Bytes, std::io::Error> {
        Ok(self.collect().await?.to_bytes())
    }
}

impl http_body::Body for GatewayBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming(body) => Pin::new(body).poll_frame(cx),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming(body) => body.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming(body) => body.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
