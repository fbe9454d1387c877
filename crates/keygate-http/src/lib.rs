//! Gateway routing, object relay, and hyper service for Keygate.
//!
//! - **Routing** ([`router`]): maps a request line to the health check, the
//!   public route, or the token-gated private route, and extracts the object key.
//! - **Fetching** ([`fetch`]): the [`ObjectFetcher`](fetch::ObjectFetcher) seam and
//!   its `reqwest` implementation performing the single presigned GET.
//! - **Responses** ([`response`]): plain-text denials, caching headers, and
//!   header relaying rules.
//! - **Service** ([`service`]): [`GatewayService`](service::GatewayService), the
//!   hyper `Service` tying the pipeline together.
//! - **Body** ([`body`]): [`GatewayBody`](body::GatewayBody), buffered or streamed.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayService (hyper Service)
//!     -> resolve route (health / public / private)
//!     -> folder allowlist
//!     -> verify_token (private only)
//!     -> presign_get
//!     -> ObjectFetcher::fetch (one GET, no retry)
//!     -> common headers (x-request-id, Server)
//!   <- HTTP Response (object bytes streamed)
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use keygate_core::GatewayConfig;
//! use keygate_http::fetch::ReqwestFetcher;
//! use keygate_http::service::GatewayService;
//!
//! let fetcher = ReqwestFetcher::new().expect("HTTP client");
//! let service = GatewayService::new(fetcher, GatewayConfig::from_env());
//! // Use `service` with hyper server.
//! ```

pub mod body;
pub mod fetch;
pub mod response;
pub mod router;
pub mod service;

pub use body::GatewayBody;
pub use fetch::{FetchError, FetchedObject, ObjectFetcher, ReqwestFetcher};
pub use router::GatewayRoute;
pub use service::GatewayService;
