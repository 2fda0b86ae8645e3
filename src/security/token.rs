use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::TokenSettings;
use crate::db::DirectoryStore;
use crate::error::{AuthError, Result};
use crate::models::{Account, Claims, CredentialPair, SignatureLevel, TokenKind};
use crate::security::revocation::RevocationStore;

/// Clock-skew tolerance (seconds) when comparing a token's issue time against
/// the account's credential epoch.
const EPOCH_SKEW_SECS: i64 = 1;

/// Secret pair for one signature tier.
#[derive(Clone)]
pub struct SigningKeys {
    access: String,
    refresh: String,
}

impl SigningKeys {
    fn secret(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

/// Closed lookup table from signature tier to its secret pair.
#[derive(Clone)]
pub struct TokenKeys {
    bearer: SigningKeys,
    system: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn from_settings(settings: &TokenSettings) -> Self {
        Self {
            bearer: SigningKeys {
                access: settings.access_user_token_secret.clone(),
                refresh: settings.refresh_user_token_secret.clone(),
            },
            system: SigningKeys {
                access: settings.access_system_token_secret.clone(),
                refresh: settings.refresh_system_token_secret.clone(),
            },
            access_ttl: Duration::seconds(settings.access_ttl_secs),
            refresh_ttl: Duration::seconds(settings.refresh_ttl_secs),
        }
    }

    fn for_level(&self, level: SignatureLevel) -> &SigningKeys {
        match level {
            SignatureLevel::Bearer => &self.bearer,
            SignatureLevel::System => &self.system,
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

/// Mints access/refresh credential pairs with role-scoped signing material.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: TokenKeys,
}

impl TokenIssuer {
    pub fn new(keys: TokenKeys) -> Self {
        Self { keys }
    }

    /// Mint a credential pair for one login event.
    ///
    /// Both tokens share a freshly generated `jti`, so revoking one kills the
    /// other. The signing tier is derived from the account's role.
    pub fn issue(&self, account: &Account) -> Result<CredentialPair> {
        let level = account.role.signature_level();
        let keys = self.keys.for_level(level);
        let jti = Uuid::new_v4().to_string();
        let now = Utc::now();

        let access_token = self.sign(
            Claims {
                sub: account.id,
                role: account.role,
                iat: now.timestamp(),
                exp: (now + self.keys.access_ttl).timestamp(),
                jti: jti.clone(),
            },
            keys.secret(TokenKind::Access),
        )?;

        let refresh_token = self.sign(
            Claims {
                sub: account.id,
                role: account.role,
                iat: now.timestamp(),
                exp: (now + self.keys.refresh_ttl).timestamp(),
                jti,
            },
            keys.secret(TokenKind::Refresh),
        )?;

        Ok(CredentialPair {
            access_token,
            refresh_token,
        })
    }

    fn sign(&self, claims: Claims, secret: &str) -> Result<String> {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|_| AuthError::Internal("Failed to sign token".to_string()))
    }
}

/// Verifies a presented credential and resolves it to an account.
///
/// This is the one place stateless signature checks meet stateful
/// revocation/epoch checks: a cryptographically perfect token can still be
/// rejected here, which is exactly how logout and revoke work.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: TokenKeys,
    store: Arc<dyn DirectoryStore>,
    revocations: RevocationStore,
}

impl TokenVerifier {
    pub fn new(keys: TokenKeys, store: Arc<dyn DirectoryStore>) -> Self {
        let revocations = RevocationStore::new(store.clone());
        Self {
            keys,
            store,
            revocations,
        }
    }

    /// Decode an `Authorization` value of the form `<Level> <token>` and run
    /// every trust gate, in order. Each gate is a hard failure.
    pub async fn decode(
        &self,
        authorization: &str,
        expected: TokenKind,
    ) -> Result<(Claims, Account)> {
        let mut parts = authorization.split_whitespace();
        let (prefix, token) = match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(token), None) => (prefix, token),
            _ => return Err(AuthError::InvalidToken),
        };

        let level: SignatureLevel = prefix.parse()?;
        let secret = self.keys.for_level(level).secret(expected);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        let claims = decoded.claims;

        if claims.jti.trim().is_empty() || claims.iat == 0 {
            return Err(AuthError::InvalidToken);
        }

        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(AuthError::Unauthorized);
        }

        let account = self
            .store
            .find_account_by_id(claims.sub)
            .await?
            .filter(Account::is_active)
            .ok_or_else(|| AuthError::BadRequest("Not a registered account".to_string()))?;

        if let Some(epoch) = account.credentials_changed_at {
            let issued_at = Utc
                .timestamp_opt(claims.iat, 0)
                .single()
                .ok_or(AuthError::InvalidToken)?;
            if epoch - Duration::seconds(EPOCH_SKEW_SECS) > issued_at {
                return Err(AuthError::Unauthorized);
            }
        }

        Ok((claims, account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TokenSettings {
        TokenSettings {
            access_user_token_secret: "user-access-secret".to_string(),
            refresh_user_token_secret: "user-refresh-secret".to_string(),
            access_system_token_secret: "system-access-secret".to_string(),
            refresh_system_token_secret: "system-refresh-secret".to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 60 * 60 * 24 * 365,
        }
    }

    fn account(role: crate::models::Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            user_name: "nora".to_string(),
            email: "nora@example.com".to_string(),
            role,
            password_hash: None,
            confirmed_at: Some(Utc::now()),
            deleted_at: None,
            credentials_changed_at: None,
            pending_email: None,
            two_step_enabled: false,
        }
    }

    #[test]
    fn pair_shares_one_jti() {
        let issuer = TokenIssuer::new(TokenKeys::from_settings(&settings()));
        let pair = issuer.issue(&account(crate::models::Role::User)).unwrap();

        let decode = |token: &str, secret: &str| {
            let mut validation = Validation::new(Algorithm::HS256);
            validation.leeway = 0;
            jsonwebtoken::decode::<Claims>(
                token,
                &DecodingKey::from_secret(secret.as_bytes()),
                &validation,
            )
            .unwrap()
            .claims
        };

        let access = decode(&pair.access_token, "user-access-secret");
        let refresh = decode(&pair.refresh_token, "user-refresh-secret");
        assert_eq!(access.jti, refresh.jti);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn admin_tokens_use_system_secrets() {
        let issuer = TokenIssuer::new(TokenKeys::from_settings(&settings()));
        let pair = issuer.issue(&account(crate::models::Role::Admin)).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        assert!(jsonwebtoken::decode::<Claims>(
            &pair.access_token,
            &DecodingKey::from_secret(b"system-access-secret"),
            &validation,
        )
        .is_ok());
        assert!(jsonwebtoken::decode::<Claims>(
            &pair.access_token,
            &DecodingKey::from_secret(b"user-access-secret"),
            &validation,
        )
        .is_err());
    }
}
