//! Bearer-token claims decoding.
//!
//! Decodes the payload segment of an access token without verifying the
//! signature - the server is the authority on validity, the client only
//! needs the expiry to schedule refreshes. Adding verification here would
//! change observable behavior for tokens that decode but do not verify, so
//! it is deliberately absent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Minutes before expiry at which a token counts as expiring soon
pub const DEFAULT_REFRESH_THRESHOLD_MINUTES: i64 = 5;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("token does not have three segments")]
    SegmentCount,

    #[error("token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("token payload is not a claims object: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Claims the client consumes. Extra fields are opaque and ignored;
/// only `exp` is semantically required.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Subject identifier
    #[serde(default)]
    pub sub: Option<String>,
}

/// Decode the claims of a bearer token. No signature verification.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::SegmentCount);
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Expiry of a token, when it decodes.
pub fn expiry_time(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode(token).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

/// Freshness of an access token, derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Decodes and expires comfortably in the future
    Valid,
    /// Still usable, but within the refresh threshold of expiry
    ExpiringSoon,
    /// Past expiry, missing, or undecodable (fail closed)
    Expired,
}

impl TokenState {
    pub fn evaluate(token: &str, threshold_minutes: i64) -> Self {
        let Ok(claims) = decode(token) else {
            return TokenState::Expired;
        };

        let now = Utc::now().timestamp();
        if claims.exp <= now {
            TokenState::Expired
        } else if claims.exp <= now + threshold_minutes * 60 {
            TokenState::ExpiringSoon
        } else {
            TokenState::Valid
        }
    }
}

/// Build an unsigned token with the given expiry, for tests.
#[cfg(test)]
pub(crate) fn unsigned_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp, "sub": "42" }).to_string());
    format!("{header}.{payload}.sig")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_well_formed_token() {
        let token = unsigned_token(1_900_000_000);
        let claims = decode(&token).expect("decode");
        assert_eq!(claims.exp, 1_900_000_000);
        assert_eq!(claims.sub.as_deref(), Some("42"));
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert!(matches!(decode("onlyone"), Err(DecodeError::SegmentCount)));
        assert!(matches!(decode("a.b"), Err(DecodeError::SegmentCount)));
        assert!(matches!(decode("a.b.c.d"), Err(DecodeError::SegmentCount)));
    }

    #[test]
    fn test_decode_rejects_bad_payload() {
        assert!(matches!(
            decode("a.!!!not-base64!!!.c"),
            Err(DecodeError::Base64(_))
        ));

        let not_json = URL_SAFE_NO_PAD.encode("plain text");
        assert!(matches!(
            decode(&format!("a.{not_json}.c")),
            Err(DecodeError::Claims(_))
        ));
    }

    #[test]
    fn test_decode_requires_exp() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"42"}"#);
        assert!(matches!(
            decode(&format!("a.{payload}.c")),
            Err(DecodeError::Claims(_))
        ));
    }

    #[test]
    fn test_state_valid_beyond_threshold() {
        let token = unsigned_token(Utc::now().timestamp() + 3600);
        assert_eq!(TokenState::evaluate(&token, 5), TokenState::Valid);
    }

    #[test]
    fn test_state_expiring_soon_within_threshold() {
        let token = unsigned_token(Utc::now().timestamp() + 120);
        assert_eq!(TokenState::evaluate(&token, 5), TokenState::ExpiringSoon);
    }

    #[test]
    fn test_state_expired_in_past() {
        let token = unsigned_token(Utc::now().timestamp() - 10);
        assert_eq!(TokenState::evaluate(&token, 5), TokenState::Expired);
    }

    #[test]
    fn test_state_malformed_is_expired() {
        assert_eq!(TokenState::evaluate("garbage", 5), TokenState::Expired);
        assert_eq!(TokenState::evaluate("", 5), TokenState::Expired);
    }

    #[test]
    fn test_expiry_time_round_trips() {
        let exp = 1_900_000_000;
        let token = unsigned_token(exp);
        assert_eq!(expiry_time(&token).expect("expiry").timestamp(), exp);
        assert_eq!(expiry_time("garbage"), None);
    }
}
