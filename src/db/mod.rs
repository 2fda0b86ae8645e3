use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Account, OtpChallenge, OtpPurpose, RevocationRecord};

pub mod memory;

pub use memory::MemoryStore;

/// Narrow query interface the trust subsystem consumes from the document
/// store.
///
/// The store is an external collaborator; this trait is the whole coupling
/// surface. Per-record updates are expected to be atomic; concurrent
/// operations on the same subject rely on that, not on serialization here.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_revocation(&self, jti: &str) -> Result<Option<RevocationRecord>>;

    /// Insert a revocation record. Re-revoking an already revoked id is a
    /// no-op, not an error.
    async fn insert_revocation(&self, record: RevocationRecord) -> Result<()>;

    async fn read_otp_challenge(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>>;

    /// Replace the active challenge for `(user, purpose)` in one write.
    async fn upsert_otp_challenge(&self, challenge: OtpChallenge) -> Result<()>;

    /// Conditionally replace the active challenge: the write applies only if
    /// the stored record still carries `expected_sent_at` and
    /// `expected_resend_count`. Returns whether it applied. Counter and
    /// cool-down updates go through this so concurrent reissues cannot lose
    /// an increment.
    async fn update_otp_challenge_if(
        &self,
        challenge: OtpChallenge,
        expected_sent_at: DateTime<Utc>,
        expected_resend_count: u32,
    ) -> Result<bool>;

    async fn clear_otp_challenge(&self, user_id: Uuid, purpose: OtpPurpose) -> Result<()>;

    /// Bump the credential epoch; every token issued earlier is dead.
    async fn update_credential_epoch(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn mark_email_confirmed(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()>;

    async fn set_pending_email(&self, user_id: Uuid, email: Option<String>) -> Result<()>;

    /// Commit a pending email change as the account's address.
    async fn update_email(&self, user_id: Uuid, email: &str) -> Result<()>;

    async fn set_two_step(&self, user_id: Uuid, enabled: bool) -> Result<()>;
}
