use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::DirectoryStore;
use crate::error::{AuthError, Result};
use crate::models::{OtpChallenge, OtpPurpose};
use crate::security::otp;

/// Rate-limited one-time-code challenge protocol.
///
/// One state machine serves every purpose (email confirmation, password
/// reset, email change, two-step verification); each `(account, purpose)`
/// pair owns an independent challenge record and counter.
///
/// The policy it enforces: the initial code plus `max_resends` further codes
/// per window, then a timed block. A live challenge keeps its counter no
/// matter which path reissues it. The call that finds the block elapsed lifts
/// it and issues with the counter at 1; that code is the attempt already
/// spent.
#[derive(Clone)]
pub struct OtpChallengeManager {
    store: Arc<dyn DirectoryStore>,
}

impl OtpChallengeManager {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Start a challenge, returning the plaintext code for out-of-band
    /// delivery. The plaintext is never stored and never readable back
    /// through any data path.
    ///
    /// While a live challenge exists, issuing again spends the same budget
    /// as a resend; the counter survives and the ceiling applies.
    pub async fn issue(&self, user_id: Uuid, purpose: OtpPurpose) -> Result<String> {
        let existing = self.store.read_otp_challenge(user_id, purpose).await?;
        let now = Utc::now();

        match existing {
            None => self.write_fresh(user_id, purpose, 0).await,
            Some(challenge) if challenge.is_blocked(now) => Err(AuthError::OtpBlocked),
            // Block elapsed: lift it and count the code we are about to send.
            Some(challenge) if challenge.block_until.is_some() => {
                tracing::debug!(%user_id, purpose = purpose.as_str(), "OTP block lifted");
                self.write_fresh(user_id, purpose, 1).await
            }
            Some(challenge) if challenge.is_expired(now) => {
                self.write_fresh(user_id, purpose, 0).await
            }
            Some(_) => self.bump(user_id, purpose).await,
        }
    }

    /// Reissue an active challenge under the resend counter.
    pub async fn resend(&self, user_id: Uuid, purpose: OtpPurpose) -> Result<String> {
        if self
            .store
            .read_otp_challenge(user_id, purpose)
            .await?
            .is_none()
        {
            return Err(AuthError::NotFound(
                "No active code for this account".to_string(),
            ));
        }
        self.bump(user_id, purpose).await
    }

    /// Advance the resend counter and reissue the code, or start the
    /// cool-down at the ceiling.
    ///
    /// Every counter write is a compare-and-set against the snapshot it was
    /// derived from; a lost race re-reads and re-applies the gates, so two
    /// concurrent reissues can never collapse into one increment.
    async fn bump(&self, user_id: Uuid, purpose: OtpPurpose) -> Result<String> {
        let policy = purpose.policy();

        loop {
            let Some(current) = self.store.read_otp_challenge(user_id, purpose).await? else {
                return self.write_fresh(user_id, purpose, 0).await;
            };
            let now = Utc::now();

            if current.is_blocked(now) {
                return Err(AuthError::OtpBlocked);
            }

            if current.block_until.is_some() {
                // Block elapsed; this call's code is attempt 1.
                tracing::debug!(%user_id, purpose = purpose.as_str(), "OTP block lifted");
                return self.write_fresh(user_id, purpose, 1).await;
            }

            if current.resend_count >= policy.max_resends {
                let mut blocked = current.clone();
                blocked.block_until = Some(now + policy.block_window);
                if self
                    .store
                    .update_otp_challenge_if(blocked, current.sent_at, current.resend_count)
                    .await?
                {
                    tracing::warn!(%user_id, purpose = purpose.as_str(), "OTP resend ceiling hit, cool-down started");
                    return Err(AuthError::OtpMaxAttempts);
                }
                continue;
            }

            let code = otp::generate_code();
            let next = OtpChallenge {
                user_id,
                purpose,
                code_hash: otp::hash_code(&code),
                sent_at: now,
                expires_at: now + policy.code_window,
                resend_count: current.resend_count + 1,
                block_until: None,
            };
            if self
                .store
                .update_otp_challenge_if(next, current.sent_at, current.resend_count)
                .await?
            {
                return Ok(code);
            }
        }
    }

    /// Check a candidate against the active challenge.
    ///
    /// Success does not consume the challenge; the caller clears it once the
    /// gated action completes.
    pub async fn verify(&self, user_id: Uuid, purpose: OtpPurpose, candidate: &str) -> Result<()> {
        let challenge = self
            .store
            .read_otp_challenge(user_id, purpose)
            .await?
            .ok_or_else(|| AuthError::NotFound("No active code for this account".to_string()))?;

        if challenge.is_expired(Utc::now()) {
            return Err(AuthError::BadRequest("Expired OTP code".to_string()));
        }

        if !otp::verify_code(candidate, &challenge.code_hash) {
            return Err(AuthError::BadRequest("Invalid OTP code".to_string()));
        }

        Ok(())
    }

    pub async fn clear(&self, user_id: Uuid, purpose: OtpPurpose) -> Result<()> {
        self.store.clear_otp_challenge(user_id, purpose).await
    }

    async fn write_fresh(
        &self,
        user_id: Uuid,
        purpose: OtpPurpose,
        resend_count: u32,
    ) -> Result<String> {
        let code = otp::generate_code();
        let now = Utc::now();
        let policy = purpose.policy();

        self.store
            .upsert_otp_challenge(OtpChallenge {
                user_id,
                purpose,
                code_hash: otp::hash_code(&code),
                sent_at: now,
                expires_at: now + policy.code_window,
                resend_count,
                block_until: None,
            })
            .await?;

        Ok(code)
    }
}
