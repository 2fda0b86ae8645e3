use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::DirectoryStore;
use crate::error::{AuthError, Result};
use crate::models::{Account, OtpChallenge, OtpPurpose, RevocationRecord};

/// In-memory [`DirectoryStore`] used by tests and local development.
///
/// Each map write replaces a whole record under one lock acquisition, which
/// mirrors the per-record atomic update semantics the production document
/// store provides.
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    revocations: RwLock<HashMap<String, RevocationRecord>>,
    challenges: RwLock<HashMap<(Uuid, OtpPurpose), OtpChallenge>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account, replacing any existing record with the same id.
    pub async fn insert_account(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }

    /// Snapshot of an account, for assertions.
    pub async fn account(&self, id: Uuid) -> Option<Account> {
        self.accounts.read().await.get(&id).cloned()
    }

    /// Drop revocation records whose expiry has passed. Best-effort
    /// housekeeping; correctness never depends on it.
    pub async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.revocations.write().await;
        let before = guard.len();
        guard.retain(|_, record| record.expires_at > now);
        before - guard.len()
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_revocation(&self, jti: &str) -> Result<Option<RevocationRecord>> {
        Ok(self.revocations.read().await.get(jti).cloned())
    }

    async fn insert_revocation(&self, record: RevocationRecord) -> Result<()> {
        self.revocations
            .write()
            .await
            .entry(record.jti.clone())
            .or_insert(record);
        Ok(())
    }

    async fn read_otp_challenge(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>> {
        Ok(self
            .challenges
            .read()
            .await
            .get(&(user_id, purpose))
            .cloned())
    }

    async fn upsert_otp_challenge(&self, challenge: OtpChallenge) -> Result<()> {
        self.challenges
            .write()
            .await
            .insert((challenge.user_id, challenge.purpose), challenge);
        Ok(())
    }

    async fn update_otp_challenge_if(
        &self,
        challenge: OtpChallenge,
        expected_sent_at: DateTime<Utc>,
        expected_resend_count: u32,
    ) -> Result<bool> {
        let mut guard = self.challenges.write().await;
        let key = (challenge.user_id, challenge.purpose);
        match guard.get(&key) {
            Some(current)
                if current.sent_at == expected_sent_at
                    && current.resend_count == expected_resend_count =>
            {
                guard.insert(key, challenge);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_otp_challenge(&self, user_id: Uuid, purpose: OtpPurpose) -> Result<()> {
        self.challenges.write().await.remove(&(user_id, purpose));
        Ok(())
    }

    async fn update_credential_epoch(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_account(user_id, |account| {
            account.credentials_changed_at = Some(at);
        })
        .await
    }

    async fn mark_email_confirmed(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_account(user_id, |account| {
            account.confirmed_at = Some(at);
        })
        .await
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        self.with_account(user_id, |account| {
            account.password_hash = Some(password_hash.to_string());
        })
        .await
    }

    async fn set_pending_email(&self, user_id: Uuid, email: Option<String>) -> Result<()> {
        self.with_account(user_id, |account| {
            account.pending_email = email;
        })
        .await
    }

    async fn update_email(&self, user_id: Uuid, email: &str) -> Result<()> {
        self.with_account(user_id, |account| {
            account.email = email.to_string();
            account.pending_email = None;
        })
        .await
    }

    async fn set_two_step(&self, user_id: Uuid, enabled: bool) -> Result<()> {
        self.with_account(user_id, |account| {
            account.two_step_enabled = enabled;
        })
        .await
    }
}

impl MemoryStore {
    async fn with_account<F>(&self, user_id: Uuid, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Account),
    {
        let mut guard = self.accounts.write().await;
        let account = guard
            .get_mut(&user_id)
            .ok_or_else(|| AuthError::NotFound("account".to_string()))?;
        mutate(account);
        Ok(())
    }
}
