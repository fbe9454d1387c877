//! Error types for presigning and token verification.
//!
//! [`AuthError`] is the failure taxonomy of the signing-and-verification engine.
//! Every variant is distinguishable so callers can log the precise reason even
//! when the HTTP boundary collapses several of them into one generic denial.
//!
//! [`PresignedError`] covers the storage-side check of a presigned URL, which is
//! a separate concern from issuing one.

/// Errors produced by [`presign_get`](crate::presign::presign_get) and
/// [`verify_token`](crate::token::verify_token).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The signing request was rejected before any cryptographic work
    /// (empty object key, zero expiry, unusable endpoint).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The token does not have three non-empty segments, or the header/payload
    /// is not a base64url-encoded JSON object.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The HMAC over `header.payload` does not match, the signature segment is
    /// not base64url, or the header declares an algorithm other than `HS256`.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The `exp` claim is absent or not strictly in the future.
    #[error("token has expired")]
    TokenExpired,

    /// The `sub` claim does not equal the requested object key.
    #[error("token subject does not match the requested object")]
    ScopeMismatch,
}

impl AuthError {
    /// A short, stable identifier for this failure kind, suitable for log fields
    /// and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::MalformedToken(_) => "malformed_token",
            Self::SignatureInvalid => "signature_invalid",
            Self::TokenExpired => "token_expired",
            Self::ScopeMismatch => "scope_mismatch",
        }
    }
}

/// Errors that can occur while checking a presigned URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresignedError {
    /// The URL could not be parsed or has no host.
    #[error("Invalid presigned URL: {0}")]
    InvalidUrl(String),

    /// The signing algorithm is not `AWS4-HMAC-SHA256`.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// `X-Amz-SignedHeaders` names anything other than `host`.
    #[error("Unsupported signed headers: {0}")]
    UnsupportedSignedHeaders(String),

    /// The `X-Amz-Credential` value is not `AKID/date/region/service/aws4_request`.
    #[error("Invalid credential format")]
    InvalidCredential,

    /// A required query parameter is missing or unparsable.
    #[error("Missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// The current time exceeds `X-Amz-Date` + `X-Amz-Expires`.
    #[error("Request has expired")]
    RequestExpired,

    /// The recomputed signature does not match `X-Amz-Signature`.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,
}
