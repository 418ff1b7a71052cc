use std::fmt;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;
use tracing::debug;

/// Expiry assigned to tokens whose payload cannot be decoded; always in the past.
pub const EXPIRED_SENTINEL: Timestamp = Timestamp::UNIX_EPOCH;

const PAYLOAD_CONFIG: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PAYLOAD_CONFIG);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PAYLOAD_CONFIG);

/// Why a token's expiry could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    SegmentCount(usize),
    Base64(String),
    Json(String),
    MissingExpiry,
    ExpiryOutOfRange(i64),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::SegmentCount(n) => write!(f, "expected 3 segments, found {n}"),
            DecodeError::Base64(msg) => write!(f, "payload is not base64: {msg}"),
            DecodeError::Json(msg) => write!(f, "payload is not a JSON object: {msg}"),
            DecodeError::MissingExpiry => write!(f, "payload has no positive 'exp' claim"),
            DecodeError::ExpiryOutOfRange(exp) => write!(f, "'exp' {exp} is out of range"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Reads the `exp` claim from a `header.payload.signature` token.
///
/// The signature is not verified.
pub fn decode_expiry(token: &str) -> Result<Timestamp, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }
    let payload = segments[1];
    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .or_else(|_| STANDARD_LENIENT.decode(payload))
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| DecodeError::Json(e.to_string()))?;
    match claims.exp {
        Some(exp) if exp > 0 => {
            Timestamp::from_second(exp).map_err(|_| DecodeError::ExpiryOutOfRange(exp))
        }
        _ => Err(DecodeError::MissingExpiry),
    }
}

/// A verification token and the expiry derived from its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: Timestamp,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: Timestamp) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Builds a token from its raw value. An undecodable payload yields a
    /// token that is already expired, so callers refresh instead of failing.
    pub fn from_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let expires_at = match decode_expiry(&value) {
            Ok(at) => at,
            Err(err) => {
                debug!(error = %err, "token.decode_failed; treating as expired");
                EXPIRED_SENTINEL
            }
        };
        Self { value, expires_at }
    }

    /// Returns the raw token value suitable for the auth header.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Time left until expiry; negative once expired.
    pub fn remaining(&self, now: Timestamp) -> SignedDuration {
        self.expires_at.duration_since(now)
    }

    /// True when the token is non-empty and expires more than `buffer` after `now`.
    pub fn is_usable(&self, now: Timestamp, buffer: SignedDuration) -> bool {
        !self.value.is_empty() && self.remaining(now) > buffer
    }
}
