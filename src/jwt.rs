//! Credential decoding.
//!
//! The backend issues a JWT at login. The client only reads the claims segment.
//! By default nothing is verified: neither the signature nor `exp`. When a shared
//! secret is configured the codec also validates both with `jsonwebtoken`.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Claims carried by a backend credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireClaims")]
pub struct SessionClaims {
    /// Subject (user id)
    #[serde(rename = "sub")]
    pub subject_id: String,
    /// Display name
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub email: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Expiration time (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Claims as issuers actually send them: the subject may appear as `sub`, `id`
/// or `_id` (often several at once) and timestamps may be fractional.
#[derive(Deserialize)]
struct WireClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    object_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    email: String,
    role: Role,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    iat: Option<u64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    exp: Option<u64>,
}

impl TryFrom<WireClaims> for SessionClaims {
    type Error = String;

    fn try_from(wire: WireClaims) -> Result<Self, Self::Error> {
        let subject_id = [wire.sub, wire.id, wire.object_id]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .ok_or_else(|| "missing subject (sub, id or _id)".to_string())?;

        Ok(Self {
            subject_id,
            display_name: wire.name,
            email: wire.email,
            role: wire.role,
            iat: wire.iat,
            exp: wire.exp,
        })
    }
}

/// Whole seconds from an integer or float timestamp. Anything else reads as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v.as_u64() {
        Some(secs) => Some(secs),
        None => v
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs as u64),
    }))
}

impl SessionClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Configuration for verified decoding.
#[derive(Clone)]
pub struct JwtConfig {
    decoding_key: DecodingKey,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Validate signature and expiry of a credential.
    pub fn validate(&self, credential: &str) -> Result<SessionClaims, DecodeError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<SessionClaims>(credential, &self.decoding_key, &validation)
                .map_err(DecodeError::Rejected)?;

        Ok(token_data.claims)
    }
}

/// Decodes credentials into session claims.
#[derive(Clone, Default)]
pub enum TokenCodec {
    /// Read the claims segment only.
    #[default]
    Unverified,
    /// Read the claims segment, then check signature and expiry.
    Verified(JwtConfig),
}

impl TokenCodec {
    pub fn verified(secret: &[u8]) -> Self {
        TokenCodec::Verified(JwtConfig::new(secret))
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, TokenCodec::Verified(_))
    }

    pub fn decode(&self, credential: &str) -> Result<SessionClaims, DecodeError> {
        let claims = decode(credential)?;
        match self {
            TokenCodec::Unverified => Ok(claims),
            TokenCodec::Verified(config) => config.validate(credential),
        }
    }
}

/// Decode the claims segment of a credential without any verification.
pub fn decode(credential: &str) -> Result<SessionClaims, DecodeError> {
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let payload = decode_segment(segments[1])
        .ok_or_else(|| DecodeError::malformed("claims segment is not valid base64"))?;

    serde_json::from_slice(&payload)
        .map_err(|e| DecodeError::malformed(format!("claims segment is not valid claims: {}", e)))
}

/// JWTs use the URL-safe alphabet, but some issuers pad or use the standard one.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}

/// Errors that can occur while decoding a credential.
#[derive(Debug)]
pub enum DecodeError {
    /// Not a three-segment token, or the claims segment could not be read
    MalformedCredential { reason: String },
    /// Well-formed, but the signature or expiry check failed
    Rejected(jsonwebtoken::errors::Error),
}

impl DecodeError {
    fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::MalformedCredential {
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, DecodeError::MalformedCredential { .. })
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MalformedCredential { reason } => {
                write!(f, "Malformed credential: {}", reason)
            }
            DecodeError::Rejected(e) => write!(f, "Credential rejected: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}
