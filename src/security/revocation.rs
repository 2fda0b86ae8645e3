use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use crate::db::DirectoryStore;
use crate::error::{AuthError, Result};
use crate::models::{Claims, RevocationRecord};

/// Revocation records live as long as the longest-lived token that could
/// carry the jti, counted from its issue time.
const REVOCATION_TTL_SECS: i64 = 60 * 60 * 24 * 365;

/// Durable record of invalidated token ids.
///
/// A jti present here makes any token sharing it permanently unusable, no
/// matter how valid its signature still is. Entries are append-only; the
/// store may purge them after `expires_at`.
#[derive(Clone)]
pub struct RevocationStore {
    store: Arc<dyn DirectoryStore>,
}

impl RevocationStore {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Revoke the token pair behind these claims. Idempotent.
    pub async fn revoke(&self, claims: &Claims) -> Result<RevocationRecord> {
        if claims.jti.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let issued_at = Utc
            .timestamp_opt(claims.iat, 0)
            .single()
            .ok_or(AuthError::InvalidToken)?;

        let record = RevocationRecord {
            jti: claims.jti.clone(),
            user_id: claims.sub,
            expires_at: issued_at + Duration::seconds(REVOCATION_TTL_SECS),
        };

        self.store.insert_revocation(record.clone()).await?;
        tracing::info!(jti = %record.jti, user_id = %record.user_id, "Token revoked");
        Ok(record)
    }

    pub async fn is_revoked(&self, jti: &str) -> Result<bool> {
        Ok(self.store.find_revocation(jti).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Role;
    use uuid::Uuid;

    fn claims() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[tokio::test]
    async fn revoke_then_lookup() {
        let store = Arc::new(MemoryStore::new());
        let revocations = RevocationStore::new(store);
        let claims = claims();

        assert!(!revocations.is_revoked(&claims.jti).await.unwrap());
        revocations.revoke(&claims).await.unwrap();
        assert!(revocations.is_revoked(&claims.jti).await.unwrap());
    }

    #[tokio::test]
    async fn double_revoke_is_not_an_error() {
        let store = Arc::new(MemoryStore::new());
        let revocations = RevocationStore::new(store);
        let claims = claims();

        revocations.revoke(&claims).await.unwrap();
        revocations.revoke(&claims).await.unwrap();
        assert!(revocations.is_revoked(&claims.jti).await.unwrap());
    }

    #[tokio::test]
    async fn missing_jti_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let revocations = RevocationStore::new(store);
        let mut claims = claims();
        claims.jti = String::new();

        assert!(matches!(
            revocations.revoke(&claims).await.unwrap_err(),
            AuthError::InvalidToken
        ));
    }
}
