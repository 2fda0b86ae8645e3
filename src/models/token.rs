use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::user::Role;

/// Which of the two tokens in a credential pair is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signature tier, carried as the `Authorization` prefix.
///
/// Each tier owns an independent access/refresh secret pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureLevel {
    Bearer,
    System,
}

impl SignatureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureLevel::Bearer => "Bearer",
            SignatureLevel::System => "System",
        }
    }
}

impl fmt::Display for SignatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureLevel {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bearer" => Ok(SignatureLevel::Bearer),
            "System" => Ok(SignatureLevel::System),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

/// JWT claims carried by both tokens of a credential pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account id)
    pub sub: Uuid,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token id shared by the access/refresh pair of one login event;
    /// revocation is keyed on it.
    #[serde(default)]
    pub jti: String,
}

/// Access/refresh token pair minted by one login event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Server-side record that permanently invalidates a token id.
///
/// Append-only; may be purged once `expires_at` passes, since expired tokens
/// already fail signature verification on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub jti: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_level_round_trip() {
        assert_eq!("Bearer".parse::<SignatureLevel>().unwrap(), SignatureLevel::Bearer);
        assert_eq!("System".parse::<SignatureLevel>().unwrap(), SignatureLevel::System);
        assert_eq!(SignatureLevel::Bearer.as_str(), "Bearer");
    }

    #[test]
    fn unknown_prefix_is_invalid_token() {
        let err = "Basic".parse::<SignatureLevel>().unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
