// Bearer token claims
//
// The token is a three-segment JWT. Only the payload segment is decoded; the
// signature belongs to the backend and is never checked here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("expected 3 segments, found {0}")]
    Segments(usize),

    #[error("payload is not base64url: {0}")]
    Encoding(String),

    #[error("payload is not a claims object: {0}")]
    Claims(String),

    #[error("expiry {0} is out of range")]
    Expiry(i64),
}

/// Claims carried in the token payload
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub role: String,
    pub company_id: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

impl TokenClaims {
    /// Decode the payload segment of `token`
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::Segments(segments.len()));
        }

        // Some issuers keep the padding; the no-pad engine rejects it.
        let payload = segments[1].trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .ok_or(TokenError::Expiry(self.exp))
    }
}
