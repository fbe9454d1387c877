//! HS256 compact access token verification.
//!
//! Tokens are `header.payload.signature`, each segment base64url encoded. A
//! token authorizes exactly one object: its `sub` claim must equal the requested
//! key byte for byte, and its `exp` claim must be strictly in the future.
//!
//! Checks run in a fixed order so the failure kind is predictable:
//! structure, header algorithm, signature, payload, expiry, subject.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use crate::error::AuthError;
use crate::sigv4::hmac_sha256;

/// The only accepted `alg` header value.
pub const TOKEN_ALGORITHM: &str = "HS256";

/// Base64url engine that emits no padding and accepts input with or without it.
pub const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The payload of a verified token.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the object key this token authorizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry as Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,
    /// Every other payload member, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    fn from_payload(mut payload: Map<String, Value>) -> Self {
        let sub = payload
            .remove("sub")
            .and_then(|v| v.as_str().map(str::to_owned));
        let exp = payload.remove("exp").and_then(|v| v.as_f64());
        Self {
            sub,
            exp,
            extra: payload,
        }
    }

    /// Whether `exp` is strictly after `now`. A missing `exp` counts as expired.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.exp
            .is_some_and(|exp| exp * 1000.0 > now.timestamp_millis() as f64)
    }
}

/// Verify `token` against `secret` and require it to be scoped to
/// `expected_subject` at instant `now`.
///
/// # Errors
///
/// - [`AuthError::InvalidInput`] if `secret` is empty.
/// - [`AuthError::MalformedToken`] if the token is not three non-empty
///   segments, or the header/payload is not a base64url-encoded JSON object.
/// - [`AuthError::SignatureInvalid`] if the header does not declare `HS256`,
///   the signature segment does not decode, or the HMAC does not match.
/// - [`AuthError::TokenExpired`] if `exp` is missing or not after `now`.
/// - [`AuthError::ScopeMismatch`] if `sub` differs from `expected_subject`.
pub fn verify_token(
    token: &str,
    secret: &str,
    expected_subject: &str,
    now: DateTime<Utc>,
) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidInput(
            "token secret must not be empty".to_owned(),
        ));
    }

    let (header_b64, payload_b64, signature_b64) = split_token(token)?;

    let header = decode_json_object(header_b64, "header")?;
    if header.get("alg").and_then(Value::as_str) != Some(TOKEN_ALGORITHM) {
        return Err(AuthError::SignatureInvalid);
    }

    let signature = BASE64_URL
        .decode(signature_b64)
        .map_err(|_| AuthError::SignatureInvalid)?;
    let signing_input = format!("{header_b64}.{payload_b64}");
    let expected = hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    if !bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
        return Err(AuthError::SignatureInvalid);
    }

    let claims = Claims::from_payload(decode_json_object(payload_b64, "payload")?);

    if !claims.is_live_at(now) {
        return Err(AuthError::TokenExpired);
    }
    if claims.sub.as_deref() != Some(expected_subject) {
        return Err(AuthError::ScopeMismatch);
    }

    Ok(claims)
}

fn split_token(token: &str) -> Result<(&str, &str, &str), AuthError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
            Ok((h, p, s))
        }
        _ => Err(AuthError::MalformedToken(
            "expected three non-empty dot-separated segments".to_owned(),
        )),
    }
}

fn decode_json_object(segment: &str, what: &str) -> Result<Map<String, Value>, AuthError> {
    let bytes = BASE64_URL
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{what} is not base64url: {e}")))?;
    serde_json::from_slice::<Map<String, Value>>(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("{what} is not a JSON object: {e}")))
}
